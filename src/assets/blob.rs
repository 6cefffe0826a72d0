//! Transient handles
//!
//! A [`BlobUrl`] is a process-local reference to immutable bytes held by a
//! [`BlobStore`], in the spirit of a browser object URL. Scene descriptions
//! refer to buffers and images through these URLs once the resolver has
//! rewritten them, so a loader can read everything without touching the
//! network.
//!
//! Minting is crate-private: every handle is created through a
//! [`ResolutionScope`](crate::assets::lifecycle::ResolutionScope), which
//! records it for release.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use uuid::Uuid;

const BLOB_PREFIX: &str = "blob:wonderbox/";

/// Reference to bytes held by a [`BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl {
    id: Uuid,
    url: String,
}

impl BlobUrl {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            url: format!("{BLOB_PREFIX}{id}"),
        }
    }

    /// Parses a `blob:wonderbox/<uuid>` string.
    #[must_use]
    pub fn parse(url: &str) -> Option<Self> {
        let id = Uuid::parse_str(url.strip_prefix(BLOB_PREFIX)?).ok()?;
        Some(Self::new(id))
    }

    #[must_use]
    pub fn is_blob_url(url: &str) -> bool {
        url.starts_with(BLOB_PREFIX)
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl std::fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Bytes behind a [`BlobUrl`].
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Arc<[u8]>,
    pub content_type: String,
}

/// Thread-safe blob table shared by clones.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    inner: Arc<RwLock<FxHashMap<Uuid, Blob>>>,
}

impl BlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// [Write] Stores bytes and returns a fresh handle.
    pub(crate) fn mint(&self, bytes: impl Into<Arc<[u8]>>, content_type: &str) -> BlobUrl {
        let url = BlobUrl::new(Uuid::new_v4());
        self.inner.write().insert(
            url.id,
            Blob {
                bytes: bytes.into(),
                content_type: content_type.to_string(),
            },
        );
        url
    }

    /// [Write] Releases a handle. Returns whether it was still live.
    pub(crate) fn revoke(&self, url: &BlobUrl) -> bool {
        self.inner.write().remove(&url.id).is_some()
    }

    /// [Read] Looks up a handle given as a URL string.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Blob> {
        let url = BlobUrl::parse(url)?;
        self.inner.read().get(&url.id).cloned()
    }

    #[must_use]
    pub fn contains(&self, url: &BlobUrl) -> bool {
        self.inner.read().contains_key(&url.id)
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
