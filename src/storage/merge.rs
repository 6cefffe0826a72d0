use rustc_hash::FxHashMap;

use crate::storage::ModelRecord;

/// Merges the record lists of both backends.
///
/// Records are de-duplicated by id with the remote copy winning, then sorted
/// newest first. Neither input is assumed to be sorted.
#[must_use]
pub fn merge_records(local: Vec<ModelRecord>, remote: Vec<ModelRecord>) -> Vec<ModelRecord> {
    let mut by_id: FxHashMap<String, ModelRecord> =
        FxHashMap::with_capacity_and_hasher(local.len() + remote.len(), Default::default());

    for record in local {
        by_id.insert(record.id.clone(), record);
    }
    for record in remote {
        by_id.insert(record.id.clone(), record);
    }

    let mut merged: Vec<ModelRecord> = by_id.into_values().collect();
    // Ties broken by id so the order is stable across calls.
    merged.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged
}
