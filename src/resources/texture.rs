use uuid::Uuid;

use crate::resources::image::Image;

/// How the sampler should interpret the stored pixel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Perceptual, gamma-encoded values (base color).
    Srgb,
    /// Raw data (normal, roughness, metalness, occlusion, emissive).
    Linear,
}

impl ColorSpace {
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            ColorSpace::Srgb => 0,
            ColorSpace::Linear => 1,
        }
    }
}

// Namespace for content-addressed texture ids.
const TEXTURE_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c2e_9b7d_4e58_a0c4_52d1_8f3b_7e90);

// ============================================================================
// Texture Asset
// ============================================================================

/// A decoded image paired with its color handling.
#[derive(Debug, Clone)]
pub struct Texture {
    pub uuid: Uuid,
    pub name: String,
    pub image: Image,
    pub color_space: ColorSpace,
}

impl Texture {
    /// Builds a texture whose id is derived from the image content, its
    /// orientation and the color space, so identical inputs share one id.
    #[must_use]
    pub fn new(name: &str, image: Image, color_space: ColorSpace) -> Self {
        let uuid = Self::content_uuid(&image, color_space);
        Self {
            uuid,
            name: name.to_string(),
            image,
            color_space,
        }
    }

    #[must_use]
    pub fn content_uuid(image: &Image, color_space: ColorSpace) -> Uuid {
        let mut key = [0u8; 10];
        key[..8].copy_from_slice(&image.content_hash().to_le_bytes());
        key[8] = u8::from(image.flipped_y());
        key[9] = color_space.tag();
        Uuid::new_v5(&TEXTURE_NAMESPACE, &key)
    }

    #[inline]
    #[must_use]
    pub fn is_srgb(&self) -> bool {
        self.color_space == ColorSpace::Srgb
    }

    #[inline]
    #[must_use]
    pub fn flip_y(&self) -> bool {
        self.image.flipped_y()
    }

    /// 1x1 solid color texture.
    #[must_use]
    pub fn create_solid_color(name: &str, color: [u8; 4], color_space: ColorSpace) -> Texture {
        let hash = xxhash_rust::xxh3::xxh3_64(&color);
        let image = Image::new(name, 1, 1, color.to_vec(), hash, false);
        Self::new(name, image, color_space)
    }
}
