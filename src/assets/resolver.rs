//! Scene Resolver
//!
//! Turns an [`AssetBundle`] into one self-contained scene handle.
//!
//! # Pass
//!
//! 1. pick the primary entry (scene extension), else [`AssetError::NoPrimaryFile`]
//! 2. read its bytes (direct for local files, through the fetch chain otherwise)
//! 3. sniff the first four bytes; a binary-scene signature is wrapped as-is
//! 4. otherwise parse as JSON; a parse failure falls back to the binary path
//! 5. rewrite every `buffers[].uri` and `images[].uri` that is not a `data:` URI:
//!    registry hit → local bytes become a transient handle, remote entries
//!    keep their URL; registry miss → fetch the reference and wrap the bytes,
//!    keeping the literal reference if that fetch fails. References of a
//!    remote scene are joined onto its URL and must stay on the web (or on
//!    the scene's own scheme), so a hosted file cannot pull in local paths
//! 6. re-serialize and wrap the document as the resolved handle
//!
//! Only a failure in step 2 aborts the pass. Every handle is minted through
//! the caller's [`ResolutionScope`], so an aborted or abandoned pass leaks nothing.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::assets::blob::{BlobStore, BlobUrl};
use crate::assets::bundle::AssetBundle;
use crate::assets::io::{ByteSource, FetchChain};
use crate::assets::lifecycle::ResolutionScope;
use crate::assets::registry::{Resolution, ResourceRegistry};
use crate::errors::{AssetError, Error, Result};

/// First four bytes of a binary glTF container.
pub const GLB_MAGIC: [u8; 4] = *b"glTF";

pub const GLB_CONTENT_TYPE: &str = "model/gltf-binary";
pub const GLTF_CONTENT_TYPE: &str = "model/gltf+json";

/// Reference lists rewritten in a text scene description.
const REFERENCE_LISTS: [&str; 2] = ["buffers", "images"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    /// Self-contained binary scene, used as-is.
    Binary,
    /// Text scene description with rewritten references.
    Text,
}

/// Output of a resolution pass.
#[derive(Debug, Clone)]
pub struct ResolvedScene {
    /// Name of the primary file.
    pub name: String,
    pub handle: BlobUrl,
    pub format: SceneFormat,
    /// References that could not be resolved and were left as written.
    pub unresolved: Vec<String>,
}

#[must_use]
pub fn is_binary_scene(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..4] == GLB_MAGIC
}

#[must_use]
pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

#[derive(Clone)]
pub struct SceneResolver {
    fetch: FetchChain,
}

impl SceneResolver {
    #[must_use]
    pub fn new(fetch: FetchChain) -> Self {
        Self { fetch }
    }

    pub async fn resolve(
        &self,
        bundle: &AssetBundle,
        scope: &mut ResolutionScope,
    ) -> Result<ResolvedScene> {
        // 1. Identify primary
        let primary = bundle.primary()?;
        log::debug!("Resolving bundle with primary file {}", primary.name);

        // 2. Fetch bytes
        let bytes = primary.source.read(&self.fetch).await?.bytes;
        if !scope.is_live() {
            return Err(AssetError::Abandoned.into());
        }

        // 3. Sniff format
        if is_binary_scene(&bytes) {
            let handle = scope.mint(bytes, GLB_CONTENT_TYPE);
            log::info!("Resolved binary scene {}", primary.name);
            return Ok(ResolvedScene {
                name: primary.name.clone(),
                handle,
                format: SceneFormat::Binary,
                unresolved: Vec::new(),
            });
        }

        // 4. Structured text
        let mut document = match serde_json::from_slice::<Value>(&bytes) {
            Ok(doc @ Value::Object(_)) => doc,
            Ok(_) => {
                let reason = "top level is not an object";
                return Ok(Self::opaque_fallback(&primary.name, bytes, scope, reason));
            }
            Err(e) => {
                let reason = e.to_string();
                return Ok(Self::opaque_fallback(&primary.name, bytes, scope, &reason));
            }
        };

        // 5. Reference rewriting
        let registry = ResourceRegistry::from_bundle(bundle);
        let base = match &primary.source {
            ByteSource::Remote(url) => url::Url::parse(url).ok(),
            ByteSource::Local { .. } => None,
        };
        let mut rewriter = Rewriter {
            registry: &registry,
            fetch: &self.fetch,
            base: base.as_ref(),
            minted: FxHashMap::default(),
            unresolved: Vec::new(),
        };

        for list in REFERENCE_LISTS {
            let Some(Value::Array(items)) = document.get_mut(list) else {
                continue;
            };
            for item in items.iter_mut() {
                let Some(Value::String(uri)) = item.get_mut("uri") else {
                    continue;
                };
                if is_data_uri(uri) {
                    continue;
                }
                let rewritten = rewriter.rewrite(uri, scope).await;
                if !scope.is_live() {
                    return Err(AssetError::Abandoned.into());
                }
                *uri = rewritten;
            }
        }

        // 6. Re-serialize
        let serialized = serde_json::to_vec(&document).map_err(Error::from)?;
        let handle = scope.mint(serialized, GLTF_CONTENT_TYPE);
        log::info!(
            "Resolved text scene {} ({} unresolved reference(s))",
            primary.name,
            rewriter.unresolved.len()
        );

        Ok(ResolvedScene {
            name: primary.name.clone(),
            handle,
            format: SceneFormat::Text,
            unresolved: rewriter.unresolved,
        })
    }

    fn opaque_fallback(
        name: &str,
        bytes: Arc<[u8]>,
        scope: &mut ResolutionScope,
        reason: &str,
    ) -> ResolvedScene {
        let err = AssetError::ParseFailure(reason.to_string());
        log::warn!("{err}; treating {name} as an opaque binary scene");
        ResolvedScene {
            name: name.to_string(),
            handle: scope.mint(bytes, GLB_CONTENT_TYPE),
            format: SceneFormat::Binary,
            unresolved: Vec::new(),
        }
    }
}

struct Rewriter<'a> {
    registry: &'a ResourceRegistry,
    fetch: &'a FetchChain,
    base: Option<&'a url::Url>,
    /// Registry entry name -> handle, so a file referenced twice is wrapped once.
    minted: FxHashMap<String, BlobUrl>,
    unresolved: Vec<String>,
}

impl Rewriter<'_> {
    async fn rewrite(&mut self, reference: &str, scope: &mut ResolutionScope) -> String {
        if BlobUrl::is_blob_url(reference) && scope.blobs().get(reference).is_some() {
            return reference.to_string();
        }

        let registry = self.registry;
        match registry.resolve(reference) {
            Resolution::Found(entry) => match &entry.source {
                ByteSource::Remote(url) => url.clone(),
                ByteSource::Local {
                    bytes,
                    content_type,
                } => {
                    if let Some(url) = self.minted.get(&entry.name) {
                        return url.to_string();
                    }
                    let content_type = content_type.clone().unwrap_or_else(|| {
                        crate::storage::content_type_for(&entry.name, None).to_string()
                    });
                    let url = scope.mint(bytes.clone(), &content_type);
                    self.minted.insert(entry.name.clone(), url.clone());
                    url.to_string()
                }
            },
            Resolution::Unresolved(reference) => self.fetch_direct(reference, scope).await,
        }
    }

    async fn fetch_direct(&mut self, reference: &str, scope: &mut ResolutionScope) -> String {
        let target = match self.base {
            None => reference.to_string(),
            Some(base) => match base.join(reference) {
                Ok(url) if reachable_from(base, &url) => url.to_string(),
                Ok(url) => {
                    return self.keep_unresolved(
                        reference,
                        &format!("{} reference in a {} scene", url.scheme(), base.scheme()),
                    );
                }
                Err(e) => return self.keep_unresolved(reference, &e.to_string()),
            },
        };

        match self.fetch.fetch(&target).await {
            Ok(fetched) => {
                let content_type = crate::storage::content_type_for(
                    reference,
                    fetched.content_type.as_deref(),
                )
                .to_string();
                scope.mint(fetched.bytes, &content_type).to_string()
            }
            Err(e) => self.keep_unresolved(reference, &e.to_string()),
        }
    }

    fn keep_unresolved(&mut self, reference: &str, reason: &str) -> String {
        let err = AssetError::ReferenceFetchFailure {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };
        log::warn!("{err}; keeping the original reference");
        self.unresolved.push(reference.to_string());
        reference.to_string()
    }
}

/// Whether a scene hosted at `base` may reference `target`.
fn reachable_from(base: &url::Url, target: &url::Url) -> bool {
    let web = |scheme: &str| matches!(scheme, "http" | "https");
    target.scheme() == base.scheme() || (web(base.scheme()) && web(target.scheme()))
}

/// Reads the bytes behind a resolved handle.
pub fn read_handle(blobs: &BlobStore, handle: &BlobUrl) -> Result<Arc<[u8]>> {
    blobs
        .get(handle.as_str())
        .map(|blob| blob.bytes)
        .ok_or_else(|| AssetError::InvalidHandle(handle.to_string()).into())
}
