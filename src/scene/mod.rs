//! Scene Module
//!
//! - [`Scene`]: drawable surfaces and the material graph they share
//! - [`TextureBinder`]: loads appearance-channel images and binds them to the
//!   scene's standard materials
//! - [`ChannelSet`]: which image feeds which channel, plus the flip flag

pub mod binder;
#[allow(clippy::module_inception)]
pub mod scene;

pub use binder::{BindReport, BoundTextures, ChannelAssignment, ChannelSet, TextureBinder};
pub use scene::{Scene, Surface};

use slotmap::new_key_type;

new_key_type! {
    pub struct SurfaceKey;
    pub struct MaterialKey;
}
