//! Lifecycle Manager
//!
//! Tracks every transient handle minted during a resolution pass and releases
//! them when the pass's scene is discarded.
//!
//! # Design Principles
//! - A pass is a [`ResolutionScope`]; handles can only be minted through one
//! - Starting a pass abandons every older in-flight pass (generation counter)
//! - A scope that is dropped without being committed releases its handles,
//!   whether it failed, was abandoned or simply went out of scope
//! - Committing a live scope makes it the active pass and releases the
//!   previously active one; the active pass's handles are never released early

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::assets::blob::{BlobStore, BlobUrl};

#[derive(Debug, Default)]
struct LifecycleInner {
    /// Generation of the newest pass; older scopes are stale.
    generation: AtomicU64,
    active: Mutex<Option<ActivePass>>,
}

/// The pass whose handles back the scene currently on display.
#[derive(Debug)]
pub struct ActivePass {
    pub generation: u64,
    pub handles: Vec<BlobUrl>,
}

/// Returned by [`LifecycleManager::commit`] when a newer pass has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superseded;

/// Scoped handle list for one resolution pass.
#[derive(Debug)]
pub struct ResolutionScope {
    generation: u64,
    blobs: BlobStore,
    inner: Arc<LifecycleInner>,
    handles: Vec<BlobUrl>,
}

impl ResolutionScope {
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Liveness flag: false once a newer pass started or the view was torn down.
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.generation.load(Ordering::Acquire) == self.generation
    }

    /// Mints a transient handle owned by this pass.
    pub fn mint(&mut self, bytes: impl Into<Arc<[u8]>>, content_type: &str) -> BlobUrl {
        let url = self.blobs.mint(bytes, content_type);
        self.handles.push(url.clone());
        url
    }

    #[must_use]
    pub fn handles(&self) -> &[BlobUrl] {
        &self.handles
    }

    #[must_use]
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }
}

impl Drop for ResolutionScope {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        log::debug!(
            "Releasing {} transient handle(s) from uncommitted pass {}",
            self.handles.len(),
            self.generation
        );
        for url in self.handles.drain(..) {
            self.blobs.revoke(&url);
        }
    }
}

/// Hands out resolution scopes and owns the active pass.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    blobs: BlobStore,
    inner: Arc<LifecycleInner>,
}

impl LifecycleManager {
    #[must_use]
    pub fn new(blobs: BlobStore) -> Self {
        Self {
            blobs,
            inner: Arc::new(LifecycleInner::default()),
        }
    }

    /// Starts a new pass, abandoning any pass still in flight.
    #[must_use]
    pub fn acquire(&self) -> ResolutionScope {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("Starting resolution pass {generation}");
        ResolutionScope {
            generation,
            blobs: self.blobs.clone(),
            inner: Arc::clone(&self.inner),
            handles: Vec::new(),
        }
    }

    /// Whether `generation` is still the newest pass.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::Acquire) == generation
    }

    /// Installs a live scope as the active pass and releases the previous one.
    ///
    /// A stale scope is dropped, releasing its own handles.
    pub fn commit(&self, mut scope: ResolutionScope) -> Result<u64, Superseded> {
        let mut active = self.inner.active.lock();
        if !scope.is_live() {
            return Err(Superseded);
        }
        let next = ActivePass {
            generation: scope.generation,
            handles: std::mem::take(&mut scope.handles),
        };
        if let Some(previous) = active.replace(next) {
            self.release(previous);
        }
        Ok(scope.generation)
    }

    /// Releases the active pass without starting a new one (e.g. after a failed load).
    pub fn release_active(&self) {
        let previous = self.inner.active.lock().take();
        if let Some(previous) = previous {
            self.release(previous);
        }
    }

    /// Abandons in-flight passes and releases the active one.
    pub fn teardown(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.release_active();
    }

    /// Handles held by the active pass.
    #[must_use]
    pub fn active_handles(&self) -> Vec<BlobUrl> {
        self.inner
            .active
            .lock()
            .as_ref()
            .map(|pass| pass.handles.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn active_generation(&self) -> Option<u64> {
        self.inner.active.lock().as_ref().map(|pass| pass.generation)
    }

    fn release(&self, pass: ActivePass) {
        log::debug!(
            "Releasing {} transient handle(s) from pass {}",
            pass.handles.len(),
            pass.generation
        );
        for url in &pass.handles {
            self.blobs.revoke(url);
        }
    }
}
