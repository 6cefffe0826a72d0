//! Persistence
//!
//! Saved models live in an on-device store (raw bytes) and, optionally, a
//! remote store (durable URLs). Both backends are plain trait objects handed
//! to a [`Library`], which owns the save/list/delete policy:
//!
//! - saving writes locally first; the remote upload is best-effort
//! - listing merges both backends (see [`merge_records`])
//! - deleting removes from both, tolerating a one-sided miss

mod library;
mod local;
mod merge;
mod remote;

pub use library::{Library, SaveOutcome};
#[cfg(not(target_arch = "wasm32"))]
pub use local::FsLocalStore;
pub use local::{LocalEntry, LocalStore, MemoryLocalStore};
pub use merge::merge_records;
pub use remote::{HttpRemoteStore, RemoteStore};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::describe::Description;
use crate::utils::time::now_millis;

/// Content type used when nothing more specific is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Metadata of one saved model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: String,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Name of the primary scene file among `files`.
    pub scene_file: String,
    /// Every stored file name, scene file included.
    pub files: Vec<String>,
    #[serde(default)]
    pub description: Option<Description>,
    /// File name -> durable URL. Empty for local-only records.
    #[serde(default)]
    pub urls: BTreeMap<String, String>,
}

impl ModelRecord {
    /// A fresh record with a random id, stamped now.
    #[must_use]
    pub fn new(name: &str, scene_file: &str, files: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now_millis(),
            scene_file: scene_file.to_string(),
            files,
            description: None,
            urls: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: Description) -> Self {
        self.description = Some(description);
        self
    }

    /// Whether the record carries durable URLs for its files.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        !self.urls.is_empty()
    }
}

/// One stored file.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub content_type: Option<String>,
}

impl StoredFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            content_type: None,
        }
    }

    /// The declared type, or one inferred from the file name.
    #[must_use]
    pub fn content_type(&self) -> &str {
        content_type_for(&self.name, self.content_type.as_deref())
    }
}

/// Picks a MIME type: `hint` unless it is absent or generic, else by extension.
#[must_use]
pub fn content_type_for<'a>(name: &str, hint: Option<&'a str>) -> &'a str {
    if let Some(hint) = hint {
        let essence = hint.split(';').next().unwrap_or(hint).trim();
        if !essence.is_empty() && !essence.eq_ignore_ascii_case(OCTET_STREAM) {
            return hint;
        }
    }

    let path = name.split(['?', '#']).next().unwrap_or(name);
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "glb" => crate::assets::resolver::GLB_CONTENT_TYPE,
        "gltf" => crate::assets::resolver::GLTF_CONTENT_TYPE,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "ktx2" => "image/ktx2",
        "json" => "application/json",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_inference() {
        assert_eq!(content_type_for("duck.GLB", None), "model/gltf-binary");
        assert_eq!(content_type_for("models/duck.gltf", None), "model/gltf+json");
        assert_eq!(content_type_for("tex/base.JPG?v=2", None), "image/jpeg");
        assert_eq!(content_type_for("scene.bin", None), OCTET_STREAM);
        assert_eq!(content_type_for("README", None), OCTET_STREAM);
    }

    #[test]
    fn generic_hint_is_replaced() {
        assert_eq!(content_type_for("a.png", Some("application/octet-stream")), "image/png");
        assert_eq!(content_type_for("a.png", Some("")), "image/png");
        assert_eq!(content_type_for("a.png", Some("image/x-custom")), "image/x-custom");
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = ModelRecord::new("Duck", "duck.gltf", vec!["duck.gltf".into(), "duck.bin".into()]);
        let json = serde_json::to_string(&record).unwrap();
        let back: ModelRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(!back.is_remote());
    }
}
