//! Viewer Session
//!
//! Owns the scene on display and drives the pipeline for it:
//! resolve the bundle, load the resolved handle, bind appearance channels.
//!
//! # Concurrency
//!
//! Every operation takes `&self`, so a session can be shared between tasks.
//! Opening a bundle starts a new resolution pass, which abandons any pass
//! still in flight; an abandoned pass finishes without touching the session
//! and its transient handles are released when its scope drops. Bind passes
//! carry their own generation the same way, so only the newest bind may
//! mutate the material graph.
//!
//! The session lock is never held across an await point.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::assets::bundle::AssetBundle;
use crate::assets::io::FetchChain;
use crate::assets::lifecycle::{LifecycleManager, ResolutionScope};
use crate::assets::loaders::GltfSceneLoader;
use crate::assets::resolver::{ResolvedScene, SceneFormat, SceneResolver};
use crate::assets::server::AssetServer;
use crate::errors::{AssetError, Result};
use crate::scene::{BindReport, ChannelSet, Scene, TextureBinder};
use crate::settings::Settings;

/// What the view shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewState {
    /// Nothing opened yet, or torn down.
    #[default]
    Empty,
    Loading,
    Ready { name: String, format: SceneFormat },
    /// Error panel with a retry action.
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The bundle's scene is now on display.
    Ready,
    /// A newer open (or a teardown) took over; nothing was changed.
    Superseded,
    /// `retry` was called with no bundle to retry.
    NothingToRetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Applied(BindReport),
    /// A newer bind or open took over; the scene was left alone.
    Superseded,
    /// No scene is loaded. The channel set is kept for the record only.
    NoScene,
}

struct ActiveScene {
    generation: u64,
    resolved: ResolvedScene,
    scene: Scene,
}

#[derive(Default)]
struct SessionState {
    view: ViewState,
    active: Option<ActiveScene>,
    last_bundle: Option<AssetBundle>,
    channels: ChannelSet,
}

pub struct ViewerSession {
    assets: AssetServer,
    lifecycle: LifecycleManager,
    resolver: SceneResolver,
    loader: GltfSceneLoader,
    binder: TextureBinder,
    bind_generation: AtomicU64,
    state: Mutex<SessionState>,
}

impl ViewerSession {
    #[must_use]
    pub fn new(fetch: FetchChain) -> Self {
        Self::with_assets(AssetServer::new(), fetch)
    }

    #[must_use]
    pub fn with_assets(assets: AssetServer, fetch: FetchChain) -> Self {
        Self {
            lifecycle: LifecycleManager::new(assets.blobs().clone()),
            resolver: SceneResolver::new(fetch.clone()),
            loader: GltfSceneLoader::new(assets.clone(), fetch.clone()),
            binder: TextureBinder::new(assets.clone(), fetch),
            assets,
            bind_generation: AtomicU64::new(0),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Session with the fetch chain and initial flip flag from `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let session = Self::new(FetchChain::from_settings(&settings.fetch));
        session.state.lock().channels.flip_y = settings.flip_y;
        session
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn assets(&self) -> &AssetServer {
        &self.assets
    }

    #[must_use]
    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    #[must_use]
    pub fn state(&self) -> ViewState {
        self.state.lock().view.clone()
    }

    #[must_use]
    pub fn channels(&self) -> ChannelSet {
        self.state.lock().channels.clone()
    }

    #[must_use]
    pub fn resolved(&self) -> Option<ResolvedScene> {
        self.state.lock().active.as_ref().map(|a| a.resolved.clone())
    }

    /// Runs `f` against the scene on display.
    pub fn with_scene<R>(&self, f: impl FnOnce(&Scene) -> R) -> Option<R> {
        self.state.lock().active.as_ref().map(|a| f(&a.scene))
    }

    // ========================================================================
    // Open / Retry / Teardown
    // ========================================================================

    /// Resolves and loads `bundle`, replacing the scene on display.
    ///
    /// Channels are reset (the flip flag is kept). A fatal failure clears the
    /// previous scene, moves the view to [`ViewState::Failed`] and is returned.
    pub async fn open(&self, bundle: AssetBundle) -> Result<OpenOutcome> {
        let mut scope = {
            let mut state = self.state.lock();
            state.view = ViewState::Loading;
            state.last_bundle = Some(bundle.clone());
            let flip_y = state.channels.flip_y;
            state.channels = ChannelSet::new().with_flip_y(flip_y);
            self.bind_generation.fetch_add(1, Ordering::AcqRel);
            self.lifecycle.acquire()
        };

        let result = self.resolve_and_load(&bundle, &mut scope).await;

        let mut state = self.state.lock();
        if !scope.is_live() {
            log::debug!("Resolution pass {} superseded", scope.generation());
            return Ok(OpenOutcome::Superseded);
        }

        match result {
            Ok((resolved, scene)) => {
                let Ok(generation) = self.lifecycle.commit(scope) else {
                    return Ok(OpenOutcome::Superseded);
                };
                state.view = ViewState::Ready {
                    name: resolved.name.clone(),
                    format: resolved.format,
                };
                state.active = Some(ActiveScene {
                    generation,
                    resolved,
                    scene,
                });
                Ok(OpenOutcome::Ready)
            }
            Err(e) if e.is_abandoned() => Ok(OpenOutcome::Superseded),
            Err(e) => {
                log::error!("Failed to open bundle: {e}");
                state.active = None;
                self.lifecycle.release_active();
                state.view = ViewState::Failed {
                    message: e.to_string(),
                };
                Err(e)
            }
        }
    }

    async fn resolve_and_load(
        &self,
        bundle: &AssetBundle,
        scope: &mut ResolutionScope,
    ) -> Result<(ResolvedScene, Scene)> {
        let resolved = self.resolver.resolve(bundle, scope).await?;
        if !scope.is_live() {
            return Err(AssetError::Abandoned.into());
        }
        let scene = self.loader.load(&resolved.name, &resolved.handle).await?;
        if !scope.is_live() {
            return Err(AssetError::Abandoned.into());
        }
        Ok((resolved, scene))
    }

    /// Opens the last bundle again (the error panel's retry action).
    pub async fn retry(&self) -> Result<OpenOutcome> {
        let bundle = self.state.lock().last_bundle.clone();
        match bundle {
            Some(bundle) => self.open(bundle).await,
            None => Ok(OpenOutcome::NothingToRetry),
        }
    }

    /// Abandons in-flight work and releases everything the view holds.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        self.lifecycle.teardown();
        self.bind_generation.fetch_add(1, Ordering::AcqRel);
        state.active = None;
        state.last_bundle = None;
        state.view = ViewState::Empty;
        log::debug!("Viewer session torn down");
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Replaces the channel set and rebinds the scene on display.
    pub async fn set_channels(&self, set: ChannelSet) -> BindOutcome {
        let (generation, scene_generation) = {
            let mut state = self.state.lock();
            state.channels = set.clone();
            let Some(active) = &state.active else {
                return BindOutcome::NoScene;
            };
            (
                self.bind_generation.fetch_add(1, Ordering::AcqRel) + 1,
                active.generation,
            )
        };

        let textures = self.binder.load(&set).await;

        let mut state = self.state.lock();
        if self.bind_generation.load(Ordering::Acquire) != generation {
            return BindOutcome::Superseded;
        }
        let Some(active) = state
            .active
            .as_mut()
            .filter(|a| a.generation == scene_generation)
        else {
            return BindOutcome::Superseded;
        };

        let (bound, failed) = (textures.channels(), textures.failed);
        BindOutcome::Applied(BindReport {
            bound,
            failed,
            materials_changed: TextureBinder::apply(&mut active.scene, textures),
        })
    }

    /// Toggles the global vertical flip and rebinds.
    pub async fn set_flip_y(&self, flip_y: bool) -> BindOutcome {
        let set = self.channels().with_flip_y(flip_y);
        self.set_channels(set).await
    }
}
