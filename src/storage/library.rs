use std::sync::Arc;

use crate::assets::bundle::AssetBundle;
use crate::assets::io::{ByteSource, FetchChain};
use crate::describe::Description;
use crate::errors::{Error, Result, StorageError};
use crate::settings::StorageSettings;
use crate::storage::{
    LocalEntry, LocalStore, MemoryLocalStore, ModelRecord, RemoteStore, StoredFile, merge_records,
};

/// Where a save landed.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The saved record; carries durable URLs when the remote save succeeded.
    pub record: ModelRecord,
    pub stored_locally: bool,
    pub stored_remotely: bool,
}

/// Saved-model collection over an on-device store and an optional remote one.
///
/// Both backends are injected; nothing here reaches for process-wide state.
#[derive(Clone)]
pub struct Library {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    fetch: FetchChain,
}

fn is_not_found(e: &Error) -> bool {
    matches!(e, Error::Storage(StorageError::NotFound(_)))
}

impl Library {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self {
            local,
            remote: None,
            fetch: FetchChain::new(),
        }
    }

    /// Builds the backends named in `settings`.
    pub fn from_settings(settings: &StorageSettings, fetch: FetchChain) -> Result<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        let local: Arc<dyn LocalStore> =
            Arc::new(crate::storage::FsLocalStore::new(settings.local_root.clone()));
        #[cfg(target_arch = "wasm32")]
        let local: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());

        let mut library = Self::new(local).with_fetch(fetch);
        if let Some(remote) = &settings.remote {
            library = library.with_remote(Arc::new(crate::storage::HttpRemoteStore::new(remote)?));
        }
        Ok(library)
    }

    /// A local-only library backed by memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLocalStore::new()))
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Chain used to read remote bundle files when saving.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchChain) -> Self {
        self.fetch = fetch;
        self
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    // ========================================================================
    // Save
    // ========================================================================

    /// Saves every file of `bundle`.
    ///
    /// The local write happens first and never waits on the remote store. A
    /// one-sided failure is logged and reported in the outcome; only a failure
    /// of every configured backend is an error.
    pub async fn save(
        &self,
        name: &str,
        bundle: &AssetBundle,
        description: Option<Description>,
    ) -> Result<SaveOutcome> {
        let scene_file = bundle.primary()?.name.clone();

        let mut files = Vec::with_capacity(bundle.files().len());
        for file in bundle.files() {
            let fetched = file.source.read(&self.fetch).await?;
            files.push(StoredFile {
                name: file.name.clone(),
                bytes: fetched.bytes,
                content_type: fetched.content_type,
            });
        }

        let mut record = ModelRecord::new(
            name,
            &scene_file,
            files.iter().map(|f| f.name.clone()).collect(),
        );
        record.description = description;

        let local = self.local.put(&record, &files).await;

        let Some(remote) = &self.remote else {
            local?;
            log::info!("Saved '{name}' locally as {}", record.id);
            return Ok(SaveOutcome {
                record,
                stored_locally: true,
                stored_remotely: false,
            });
        };

        let remote_result = Self::save_remote(remote.as_ref(), &record, &files).await;

        match (local, remote_result) {
            (Ok(()), Ok(remote_record)) => {
                log::info!("Saved '{name}' locally and remotely as {}", record.id);
                Ok(SaveOutcome {
                    record: remote_record,
                    stored_locally: true,
                    stored_remotely: true,
                })
            }
            (Ok(()), Err(e)) => {
                log::warn!("{}; '{name}' kept locally only", StorageError::Remote(e.to_string()));
                Ok(SaveOutcome {
                    record,
                    stored_locally: true,
                    stored_remotely: false,
                })
            }
            (Err(e), Ok(remote_record)) => {
                log::warn!("{}; '{name}' kept remotely only", StorageError::Local(e.to_string()));
                Ok(SaveOutcome {
                    record: remote_record,
                    stored_locally: false,
                    stored_remotely: true,
                })
            }
            (Err(local), Err(remote)) => Err(StorageError::Both {
                local: local.to_string(),
                remote: remote.to_string(),
            }
            .into()),
        }
    }

    async fn save_remote(
        remote: &dyn RemoteStore,
        record: &ModelRecord,
        files: &[StoredFile],
    ) -> Result<ModelRecord> {
        let mut record = record.clone();
        for file in files {
            let path = format!("{}/{}", record.id, file.name);
            let url = remote
                .upload_blob(&path, file.bytes.clone(), file.content_type())
                .await?;
            record.urls.insert(file.name.clone(), url);
        }
        remote.create_record(&record).await?;
        Ok(record)
    }

    // ========================================================================
    // List / Load / Delete
    // ========================================================================

    /// Records from both backends, merged (remote wins) and newest first.
    pub async fn list_records(&self) -> Result<Vec<ModelRecord>> {
        let local = self.local.get_all().await;
        let Some(remote) = &self.remote else {
            return Ok(merge_records(local?, Vec::new()));
        };

        match (local, remote.list_records().await) {
            (Ok(local), Ok(remote)) => Ok(merge_records(local, remote)),
            (Ok(local), Err(e)) => {
                log::warn!("Remote listing failed, showing local records only: {e}");
                Ok(merge_records(local, Vec::new()))
            }
            (Err(e), Ok(remote)) => {
                log::warn!("Local listing failed, showing remote records only: {e}");
                Ok(merge_records(Vec::new(), remote))
            }
            (Err(local), Err(remote)) => Err(StorageError::Both {
                local: local.to_string(),
                remote: remote.to_string(),
            }
            .into()),
        }
    }

    /// The locally stored bytes of one record.
    pub async fn load_local(&self, id: &str) -> Result<LocalEntry> {
        self.local.load(id).await
    }

    /// A bundle that reopens `record`: local bytes when present, durable URLs otherwise.
    pub async fn bundle_for(&self, record: &ModelRecord) -> Result<AssetBundle> {
        match self.local.load(&record.id).await {
            Ok(entry) => return Ok(entry.to_bundle()),
            Err(e) if !is_not_found(&e) || record.urls.is_empty() => return Err(e),
            Err(_) => {}
        }

        let scene_url = record
            .urls
            .get(&record.scene_file)
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", record.id, record.scene_file)))?;

        let mut bundle = AssetBundle::new().with_file(&record.scene_file, ByteSource::remote(scene_url));
        for (name, url) in &record.urls {
            if *name != record.scene_file {
                bundle.push(name, ByteSource::remote(url));
            }
        }
        Ok(bundle)
    }

    /// Deletes a record everywhere it exists.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let local = self.local.delete(id).await;
        let Some(remote) = &self.remote else {
            return local;
        };
        let remote = remote.delete_record(id).await;

        match (local, remote) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(l), Err(r)) if is_not_found(&l) && is_not_found(&r) => {
                Err(StorageError::NotFound(id.to_string()).into())
            }
            (Err(l), Err(r)) if !is_not_found(&l) && !is_not_found(&r) => {
                Err(StorageError::Both {
                    local: l.to_string(),
                    remote: r.to_string(),
                }
                .into())
            }
            // One side missing, the other failed.
            (Err(e), Err(other)) => Err(if is_not_found(&e) { other } else { e }),
            (Ok(()), Err(e)) | (Err(e), Ok(())) => {
                if !is_not_found(&e) {
                    log::warn!("Record {id} deleted on one backend only: {e}");
                }
                Ok(())
            }
        }
    }
}
