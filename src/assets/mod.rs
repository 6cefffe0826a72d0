//! Asset Pipeline
//!
//! Leaf to root:
//! - [`classify`]: infers a file's role from its name
//! - [`io`]: byte sources and fetch strategies
//! - [`blob`]: transient handles over in-memory bytes
//! - [`bundle`] / [`registry`]: the files of one model and their lookup table
//! - [`resolver`]: turns a bundle into one self-contained scene handle
//! - [`lifecycle`]: releases the handles of discarded passes
//! - [`server`] / [`loaders`]: texture storage, image decoding, scene loading

pub mod blob;
pub mod bundle;
pub mod classify;
pub mod io;
pub mod lifecycle;
pub mod loaders;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod storage;

pub use blob::{BlobStore, BlobUrl};
pub use bundle::{AssetBundle, BundleFile};
pub use classify::{Role, classify, classify_channels};
#[cfg(not(target_arch = "wasm32"))]
pub use io::FileFetcher;
pub use io::{ByteFetcher, ByteSource, FetchChain, FetchedBytes, HttpFetcher, StaticFetcher};
pub use lifecycle::{LifecycleManager, ResolutionScope, Superseded};
pub use loaders::GltfSceneLoader;
pub use registry::{Resolution, ResourceRegistry};
pub use resolver::{ResolvedScene, SceneFormat, SceneResolver};
pub use server::{AssetServer, TextureHandle, TextureLease};
