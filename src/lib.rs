#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod assets;
pub mod describe;
pub mod errors;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod storage;
pub mod utils;
pub mod viewer;

pub use assets::{AssetBundle, AssetServer, ByteSource, FetchChain, SceneFormat, SceneResolver};
pub use describe::{Describer, Description, HttpDescriber, describe_or_fallback};
pub use errors::{AssetError, Error, LoadFailureKind, Result, StorageError};
pub use resources::{Channel, Channels, ColorSpace, Image, Material, Texture};
pub use scene::{ChannelSet, Scene, TextureBinder};
pub use settings::Settings;
pub use storage::{Library, ModelRecord};
pub use viewer::{BindOutcome, OpenOutcome, ViewState, ViewerSession};
