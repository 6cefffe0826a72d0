use bitflags::bitflags;

use crate::assets::TextureHandle;
use crate::resources::texture::ColorSpace;

// Appearance channels a single image may feed
bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Channels: u8 {
        const BASE_COLOR = 1 << 0;
        const NORMAL     = 1 << 1;
        const ROUGHNESS  = 1 << 2;
        const METALNESS  = 1 << 3;
        const OCCLUSION  = 1 << 4;
        const EMISSIVE   = 1 << 5;

        /// glTF-style metallicRoughness image.
        const ROUGHNESS_METALNESS = Self::ROUGHNESS.bits() | Self::METALNESS.bits();
        /// Occlusion/roughness/metalness packed into one image.
        const PACKED = Self::ROUGHNESS.bits() | Self::METALNESS.bits() | Self::OCCLUSION.bits();
    }
}

impl Channels {
    /// Iterates the individual channels in the set, in declaration order.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(c.flag()))
    }
}

/// One material property slot that can receive an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    BaseColor,
    Normal,
    Roughness,
    Metalness,
    Occlusion,
    Emissive,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::BaseColor,
        Channel::Normal,
        Channel::Roughness,
        Channel::Metalness,
        Channel::Occlusion,
        Channel::Emissive,
    ];

    #[must_use]
    pub fn flag(self) -> Channels {
        match self {
            Channel::BaseColor => Channels::BASE_COLOR,
            Channel::Normal => Channels::NORMAL,
            Channel::Roughness => Channels::ROUGHNESS,
            Channel::Metalness => Channels::METALNESS,
            Channel::Occlusion => Channels::OCCLUSION,
            Channel::Emissive => Channels::EMISSIVE,
        }
    }

    /// Base color is gamma-encoded; every other channel carries raw data.
    #[must_use]
    pub fn color_space(self) -> ColorSpace {
        match self {
            Channel::BaseColor => ColorSpace::Srgb,
            _ => ColorSpace::Linear,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Channel::BaseColor => "base_color",
            Channel::Normal => "normal",
            Channel::Roughness => "roughness",
            Channel::Metalness => "metalness",
            Channel::Occlusion => "occlusion",
            Channel::Emissive => "emissive",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Texture maps
// ============================================================================

/// The six image slots of a physically-based material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureMaps {
    pub map: Option<TextureHandle>,
    pub normal_map: Option<TextureHandle>,
    pub roughness_map: Option<TextureHandle>,
    pub metalness_map: Option<TextureHandle>,
    pub ao_map: Option<TextureHandle>,
    pub emissive_map: Option<TextureHandle>,
}

impl TextureMaps {
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<TextureHandle> {
        match channel {
            Channel::BaseColor => self.map,
            Channel::Normal => self.normal_map,
            Channel::Roughness => self.roughness_map,
            Channel::Metalness => self.metalness_map,
            Channel::Occlusion => self.ao_map,
            Channel::Emissive => self.emissive_map,
        }
    }

    pub fn set(&mut self, channel: Channel, texture: Option<TextureHandle>) {
        let slot = match channel {
            Channel::BaseColor => &mut self.map,
            Channel::Normal => &mut self.normal_map,
            Channel::Roughness => &mut self.roughness_map,
            Channel::Metalness => &mut self.metalness_map,
            Channel::Occlusion => &mut self.ao_map,
            Channel::Emissive => &mut self.emissive_map,
        };
        *slot = texture;
    }

    /// Channels that currently hold a texture.
    #[must_use]
    pub fn populated(&self) -> Channels {
        Channel::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_some())
            .fold(Channels::empty(), |acc, c| acc | c.flag())
    }
}

// ============================================================================
// Specific Materials
// ============================================================================

// MeshStandardMaterial
// ----------------------------------------------------------------------------
/// Metallic-roughness PBR material.
///
/// `source_maps` keeps the maps the material was loaded with so a bind pass
/// can rebuild `maps` from scratch.
#[derive(Debug, Clone)]
pub struct MeshStandardMaterial {
    pub name: String,
    pub color: [f32; 4],
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: [f32; 3],
    pub maps: TextureMaps,
    pub(crate) source_maps: TextureMaps,
    pub(crate) version: u64,
}

impl MeshStandardMaterial {
    #[must_use]
    pub fn new(name: &str, color: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            color,
            roughness: 1.0,
            metalness: 1.0,
            emissive: [0.0; 3],
            maps: TextureMaps::default(),
            source_maps: TextureMaps::default(),
            version: 0,
        }
    }

    /// Sets the maps that came with the model file.
    pub fn with_source_maps(mut self, maps: TextureMaps) -> Self {
        self.maps = maps;
        self.source_maps = maps;
        self
    }

    #[must_use]
    pub fn source_maps(&self) -> &TextureMaps {
        &self.source_maps
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replaces the bound maps. Returns whether anything changed.
    pub fn replace_maps(&mut self, maps: TextureMaps) -> bool {
        if self.maps == maps {
            return false;
        }
        self.maps = maps;
        self.version += 1;
        true
    }
}

impl Default for MeshStandardMaterial {
    fn default() -> Self {
        Self::new("Default", [1.0; 4])
    }
}

// MeshUnlitMaterial
// ----------------------------------------------------------------------------
/// Flat-shaded material (`KHR_materials_unlit`). Never receives bound channels.
#[derive(Debug, Clone)]
pub struct MeshUnlitMaterial {
    pub name: String,
    pub color: [f32; 4],
    pub map: Option<TextureHandle>,
}

impl MeshUnlitMaterial {
    #[must_use]
    pub fn new(name: &str, color: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            color,
            map: None,
        }
    }
}

// ============================================================================
// Material
// ============================================================================

#[derive(Debug, Clone)]
pub enum Material {
    Standard(MeshStandardMaterial),
    Unlit(MeshUnlitMaterial),
}

impl Material {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Material::Standard(m) => &m.name,
            Material::Unlit(m) => &m.name,
        }
    }

    #[must_use]
    pub fn as_standard(&self) -> Option<&MeshStandardMaterial> {
        match self {
            Material::Standard(m) => Some(m),
            Material::Unlit(_) => None,
        }
    }

    pub fn as_standard_mut(&mut self) -> Option<&mut MeshStandardMaterial> {
        match self {
            Material::Standard(m) => Some(m),
            Material::Unlit(_) => None,
        }
    }
}

impl From<MeshStandardMaterial> for Material {
    fn from(m: MeshStandardMaterial) -> Self {
        Material::Standard(m)
    }
}

impl From<MeshUnlitMaterial> for Material {
    fn from(m: MeshUnlitMaterial) -> Self {
        Material::Unlit(m)
    }
}
