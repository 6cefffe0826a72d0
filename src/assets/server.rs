use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use slotmap::new_key_type;
use std::sync::Arc;

use crate::assets::blob::BlobStore;
use crate::assets::storage::AssetStorage;
use crate::errors::{Error, Result};
use crate::resources::image::Image;
use crate::resources::texture::{ColorSpace, Texture};

// Strongly-typed handles
new_key_type! {
    pub struct TextureHandle;
}

// Asset Server

#[derive(Clone, Default)] // Lightweight; clones share storage
pub struct AssetServer {
    pub textures: Arc<AssetStorage<TextureHandle, Texture>>,
    pub blobs: BlobStore,
    /// Holders per texture. Guards every insert and removal of `textures`.
    texture_refs: Arc<Mutex<FxHashMap<TextureHandle, usize>>>,
}

impl AssetServer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn get_texture(&self, handle: TextureHandle) -> Option<Arc<Texture>> {
        self.textures.get(handle)
    }

    /// Stores a texture built from `image`, reusing the handle of an
    /// identical texture (same content, orientation and color space).
    ///
    /// The texture is pinned: it outlives every [`TextureLease`] that shares it.
    pub fn add_texture_from_image(
        &self,
        name: &str,
        image: Image,
        color_space: ColorSpace,
    ) -> TextureHandle {
        self.retain(Texture::new(name, image, color_space))
    }

    /// Empty lease on this server's textures.
    #[must_use]
    pub fn lease(&self) -> TextureLease {
        TextureLease {
            assets: self.clone(),
            handles: Vec::new(),
        }
    }

    /// Number of holders of `handle`; zero once it has been removed.
    #[must_use]
    pub fn texture_holders(&self, handle: TextureHandle) -> usize {
        self.texture_refs.lock().get(&handle).copied().unwrap_or(0)
    }

    fn retain(&self, texture: Texture) -> TextureHandle {
        let mut refs = self.texture_refs.lock();
        let handle = self.textures.add_with_uuid(texture.uuid, texture);
        *refs.entry(handle).or_insert(0) += 1;
        handle
    }

    fn release(&self, handles: &[TextureHandle]) {
        let mut refs = self.texture_refs.lock();
        let mut removed = 0;
        for &handle in handles {
            let Some(count) = refs.get_mut(&handle) else {
                continue;
            };
            *count -= 1;
            if *count == 0 {
                refs.remove(&handle);
                self.textures.remove(handle);
                removed += 1;
            }
        }
        if removed > 0 {
            log::debug!("Released {removed} texture(s), {} left", self.textures.len());
        }
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    /// Unified image decoding helper (offloads to the blocking pool natively).
    pub async fn decode_image_async(
        bytes: impl Into<Arc<[u8]>>,
        label: String,
        flip_y: bool,
    ) -> Result<Image> {
        let bytes: Arc<[u8]> = bytes.into();
        #[cfg(not(target_arch = "wasm32"))]
        {
            tokio::task::spawn_blocking(move || Self::decode_image_cpu(&bytes, &label, flip_y)).await?
        }
        #[cfg(target_arch = "wasm32")]
        {
            // WASM: runs on the main thread
            Self::decode_image_cpu(&bytes, &label, flip_y)
        }
    }

    /// CPU image decoding logic.
    pub fn decode_image_cpu(bytes: &[u8], label: &str, flip_y: bool) -> Result<Image> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::ImageDecode(format!("Failed to decode image {label}: {e}")))?;

        let img = if flip_y { img.flipv() } else { img };
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Image::new(
            label,
            width,
            height,
            rgba.into_raw(),
            xxhash_rust::xxh3::xxh3_64(bytes),
            flip_y,
        ))
    }
}

// ============================================================================
// Texture Lease
// ============================================================================

/// Counted hold on the textures one pass created or reused.
///
/// Textures are content-addressed and shared between passes, so a texture is
/// removed from the server only when the last lease holding it drops.
pub struct TextureLease {
    assets: AssetServer,
    handles: Vec<TextureHandle>,
}

impl TextureLease {
    /// Stores a texture built from `image` and holds it.
    pub fn add_texture_from_image(
        &mut self,
        name: &str,
        image: Image,
        color_space: ColorSpace,
    ) -> TextureHandle {
        let handle = self.assets.retain(Texture::new(name, image, color_space));
        self.handles.push(handle);
        handle
    }

    #[must_use]
    pub fn handles(&self) -> &[TextureHandle] {
        &self.handles
    }
}

impl std::fmt::Debug for TextureLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureLease")
            .field("handles", &self.handles)
            .finish_non_exhaustive()
    }
}

impl Drop for TextureLease {
    fn drop(&mut self) {
        self.assets.release(&self.handles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(color: [u8; 4]) -> Image {
        let hash = xxhash_rust::xxh3::xxh3_64(&color);
        Image::new("solid", 1, 1, color.to_vec(), hash, false)
    }

    #[test]
    fn last_lease_removes_texture() {
        let assets = AssetServer::new();
        let mut a = assets.lease();
        let mut b = assets.lease();
        let ha = a.add_texture_from_image("red", solid([255, 0, 0, 255]), ColorSpace::Srgb);
        let hb = b.add_texture_from_image("red", solid([255, 0, 0, 255]), ColorSpace::Srgb);
        assert_eq!(ha, hb);
        assert_eq!(a.handles(), b.handles());
        assert_eq!(assets.texture_holders(ha), 2);

        drop(a);
        assert!(assets.get_texture(ha).is_some());
        drop(b);
        assert!(assets.get_texture(ha).is_none());
        assert_eq!(assets.texture_holders(ha), 0);
        assert!(assets.textures.is_empty());
    }

    #[test]
    fn pinned_texture_survives_leases() {
        let assets = AssetServer::new();
        let pinned = assets.add_texture_from_image("gray", solid([9, 9, 9, 255]), ColorSpace::Linear);
        {
            let mut lease = assets.lease();
            lease.add_texture_from_image("gray", solid([9, 9, 9, 255]), ColorSpace::Linear);
        }
        assert!(assets.get_texture(pinned).is_some());
    }
}
