//! Core resource definitions
//!
//! CPU-side data the pipeline produces and the renderer consumes:
//! - Image: decoded RGBA8 pixels
//! - Texture: an image plus its color space
//! - Material: standard (PBR) and unlit materials, appearance channels

pub mod image;
pub mod material;
pub mod texture;

pub use image::Image;
pub use material::{
    Channel, Channels, Material, MeshStandardMaterial, MeshUnlitMaterial, TextureMaps,
};
pub use texture::{ColorSpace, Texture};
