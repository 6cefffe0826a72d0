use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::assets::bundle::AssetBundle;
use crate::assets::io::ByteSource;
use crate::errors::{Result, StorageError};
use crate::storage::{ModelRecord, StoredFile};
use crate::utils::BoxFuture;

/// On-device record store. Records keep raw bytes, never URLs.
pub trait LocalStore: Send + Sync {
    /// Stores `record` together with the bytes of every file it names.
    fn put<'a>(&'a self, record: &'a ModelRecord, files: &'a [StoredFile])
    -> BoxFuture<'a, Result<()>>;

    /// Every stored record, in no particular order.
    fn get_all(&self) -> BoxFuture<'_, Result<Vec<ModelRecord>>>;

    /// One record with its file bytes.
    fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<LocalEntry>>;

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// A stored record with its bytes.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub record: ModelRecord,
    pub files: Vec<StoredFile>,
}

impl LocalEntry {
    /// Re-materialises the stored files as a bundle, scene file first.
    #[must_use]
    pub fn to_bundle(&self) -> AssetBundle {
        let (scene, rest): (Vec<&StoredFile>, Vec<&StoredFile>) = self
            .files
            .iter()
            .partition(|f| f.name == self.record.scene_file);

        AssetBundle::from_files(scene.into_iter().chain(rest).map(|f| {
            let source = ByteSource::local_typed(f.bytes.clone(), f.content_type());
            (f.name.clone(), source)
        }))
    }
}

fn check_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
        return Err(StorageError::Local(format!("invalid record id '{id}'")).into());
    }
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store, used where no file system is available and in tests.
#[derive(Default)]
pub struct MemoryLocalStore {
    entries: RwLock<FxHashMap<String, LocalEntry>>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LocalStore for MemoryLocalStore {
    fn put<'a>(
        &'a self,
        record: &'a ModelRecord,
        files: &'a [StoredFile],
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            check_id(&record.id)?;
            let entry = LocalEntry {
                record: record.clone(),
                files: files.to_vec(),
            };
            self.entries.write().insert(record.id.clone(), entry);
            Ok(())
        })
    }

    fn get_all(&self) -> BoxFuture<'_, Result<Vec<ModelRecord>>> {
        Box::pin(async move {
            Ok(self
                .entries
                .read()
                .values()
                .map(|entry| entry.record.clone())
                .collect())
        })
    }

    fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<LocalEntry>> {
        Box::pin(async move {
            self.entries
                .read()
                .get(id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.to_string()).into())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            match self.entries.write().remove(id) {
                Some(_) => Ok(()),
                None => Err(StorageError::NotFound(id.to_string()).into()),
            }
        })
    }
}

// ============================================================================
// File-system store
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
pub use fs::FsLocalStore;

#[cfg(not(target_arch = "wasm32"))]
mod fs {
    use std::path::{Path, PathBuf};

    use super::{LocalEntry, LocalStore, check_id};
    use crate::errors::{Error, Result, StorageError};
    use crate::storage::{ModelRecord, StoredFile};
    use crate::utils::BoxFuture;

    const RECORD_FILE: &str = "record.json";
    const FILES_DIR: &str = "files";

    /// Directory-per-record store:
    ///
    /// ```text
    /// <root>/<id>/record.json
    /// <root>/<id>/files/<percent-encoded file name>
    /// ```
    ///
    /// `record.json` is written last, so a save interrupted half-way is not listed.
    #[derive(Debug, Clone)]
    pub struct FsLocalStore {
        root: PathBuf,
    }

    fn local_err(context: &str, e: impl std::fmt::Display) -> Error {
        StorageError::Local(format!("{context}: {e}")).into()
    }

    impl FsLocalStore {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        #[must_use]
        pub fn root(&self) -> &Path {
            &self.root
        }

        fn record_dir(&self, id: &str) -> PathBuf {
            self.root.join(id)
        }

        fn file_path(&self, id: &str, name: &str) -> PathBuf {
            self.record_dir(id)
                .join(FILES_DIR)
                .join(urlencoding::encode(name).as_ref())
        }

        async fn read_record(dir: &Path) -> Result<ModelRecord> {
            let text = tokio::fs::read(dir.join(RECORD_FILE))
                .await
                .map_err(|e| local_err(&dir.display().to_string(), e))?;
            Ok(serde_json::from_slice(&text)?)
        }
    }

    impl LocalStore for FsLocalStore {
        fn put<'a>(
            &'a self,
            record: &'a ModelRecord,
            files: &'a [StoredFile],
        ) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                check_id(&record.id)?;
                let dir = self.record_dir(&record.id);
                tokio::fs::create_dir_all(dir.join(FILES_DIR))
                    .await
                    .map_err(|e| local_err("create record directory", e))?;

                for file in files {
                    tokio::fs::write(self.file_path(&record.id, &file.name), &file.bytes[..])
                        .await
                        .map_err(|e| local_err(&format!("write {}", file.name), e))?;
                }

                let json = serde_json::to_vec_pretty(record)?;
                tokio::fs::write(dir.join(RECORD_FILE), json)
                    .await
                    .map_err(|e| local_err("write record", e))?;

                log::debug!("Stored record {} ({} file(s)) locally", record.id, files.len());
                Ok(())
            })
        }

        fn get_all(&self) -> BoxFuture<'_, Result<Vec<ModelRecord>>> {
            Box::pin(async move {
                let mut dir = match tokio::fs::read_dir(&self.root).await {
                    Ok(dir) => dir,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                    Err(e) => return Err(local_err("list records", e)),
                };

                let mut records = Vec::new();
                while let Some(entry) = dir
                    .next_entry()
                    .await
                    .map_err(|e| local_err("list records", e))?
                {
                    let path = entry.path();
                    if !path.join(RECORD_FILE).is_file() {
                        continue;
                    }
                    match Self::read_record(&path).await {
                        Ok(record) => records.push(record),
                        Err(e) => log::warn!("Skipping unreadable record {}: {e}", path.display()),
                    }
                }
                Ok(records)
            })
        }

        fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<LocalEntry>> {
            Box::pin(async move {
                check_id(id)?;
                let dir = self.record_dir(id);
                if !dir.join(RECORD_FILE).is_file() {
                    return Err(StorageError::NotFound(id.to_string()).into());
                }
                let record = Self::read_record(&dir).await?;

                let mut files = Vec::with_capacity(record.files.len());
                for name in &record.files {
                    let bytes = tokio::fs::read(self.file_path(id, name))
                        .await
                        .map_err(|e| local_err(&format!("read {name}"), e))?;
                    files.push(StoredFile::new(name.clone(), bytes));
                }
                Ok(LocalEntry { record, files })
            })
        }

        fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                check_id(id)?;
                match tokio::fs::remove_dir_all(self.record_dir(id)).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(StorageError::NotFound(id.to_string()).into())
                    }
                    Err(e) => Err(local_err("delete record", e)),
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_puts_scene_file_first() {
        let mut record = ModelRecord::new("Duck", "duck.gltf", vec![]);
        record.files = vec!["duck.bin".into(), "duck.gltf".into()];
        let entry = LocalEntry {
            record,
            files: vec![
                StoredFile::new("duck.bin", vec![0u8; 4]),
                StoredFile::new("duck.gltf", b"{}".to_vec()),
            ],
        };
        let bundle = entry.to_bundle();
        assert_eq!(bundle.files()[0].name, "duck.gltf");
        assert_eq!(bundle.primary().unwrap().name, "duck.gltf");
        match &bundle.files()[0].source {
            ByteSource::Local { content_type, .. } => {
                assert_eq!(content_type.as_deref(), Some("model/gltf+json"));
            }
            ByteSource::Remote(_) => panic!("stored files are local"),
        }
    }

    #[test]
    fn ids_cannot_escape_the_root() {
        assert!(check_id("../etc").is_err());
        assert!(check_id("..").is_err());
        assert!(check_id("").is_err());
        assert!(check_id("3f2a-11").is_ok());
    }
}
