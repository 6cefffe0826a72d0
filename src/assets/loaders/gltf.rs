//! glTF Scene Loader
//!
//! Loads a resolved scene handle into a [`Scene`]. By the time a handle gets
//! here every reference has been rewritten, so buffers and images come from
//! `blob:` handles, `data:` URIs or the binary chunk. An http(s) URL left in
//! place (a remote bundle entry) is fetched; any other leftover reference was
//! already given up on and counts as not found.
//!
//! Failure policy:
//! - a buffer that cannot be read aborts the load (geometry would be garbage)
//! - an image that cannot be read or decoded leaves its texture slot empty

use std::sync::Arc;

use base64::Engine as _;
use rustc_hash::FxHashMap;

use crate::assets::blob::BlobUrl;
use crate::assets::io::{FetchChain, HttpFetcher};
use crate::assets::resolver::read_handle;
use crate::assets::server::{AssetServer, TextureHandle, TextureLease};
use crate::errors::{AssetError, LoadFailureKind, Result};
use crate::resources::material::{Material, MeshStandardMaterial, MeshUnlitMaterial, TextureMaps};
use crate::resources::texture::ColorSpace;
use crate::scene::{MaterialKey, Scene, Surface};

/// Cache key for loaded textures: the same image may be requested in both
/// color spaces (e.g. emissive and base color sharing one file).
type TextureCacheKey = (usize, ColorSpace);

#[derive(Clone)]
pub struct GltfSceneLoader {
    assets: AssetServer,
    fetch: FetchChain,
}

impl GltfSceneLoader {
    #[must_use]
    pub fn new(assets: AssetServer, fetch: FetchChain) -> Self {
        Self { assets, fetch }
    }

    /// Loads the scene behind a transient handle.
    pub async fn load(&self, name: &str, handle: &BlobUrl) -> Result<Scene> {
        let bytes = read_handle(self.assets.blobs(), handle)?;
        self.load_slice(name, &bytes).await
    }

    /// Loads a binary or text scene from memory.
    pub async fn load_slice(&self, name: &str, bytes: &[u8]) -> Result<Scene> {
        let mut gltf = gltf::Gltf::from_slice_without_validation(bytes)?;
        let bin: Option<Arc<[u8]>> = gltf.blob.take().map(Into::into);

        // 1. Buffers (fatal)
        let buffers = self.load_buffers(&gltf, bin).await?;

        // 2. Textures (degrading)
        let (textures, lease) = self.load_textures(&gltf, &buffers).await;

        // 3. Materials
        let mut scene = Scene::new(name);
        let materials: Vec<MaterialKey> = gltf
            .materials()
            .map(|material| scene.add_material(build_material(&material, &textures)))
            .collect();

        // 4. Surfaces
        let mut default_material = None;
        for node in gltf.nodes() {
            let Some(mesh) = node.mesh() else {
                continue;
            };
            let base_name = node.name().or_else(|| mesh.name()).unwrap_or("Mesh");

            for primitive in mesh.primitives() {
                let material = match primitive
                    .material()
                    .index()
                    .and_then(|index| materials.get(index).copied())
                {
                    Some(key) => key,
                    None => *default_material.get_or_insert_with(|| {
                        scene.add_material(MeshStandardMaterial::default())
                    }),
                };

                let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data[..]));
                let vertex_count = reader.read_positions().map_or(0, Iterator::count);
                let index_count = reader
                    .read_indices()
                    .map_or(vertex_count, |indices| indices.into_u32().count());

                scene.add_surface(Surface {
                    name: format!("{base_name}.{}", primitive.index()),
                    material,
                    vertex_count,
                    index_count,
                });
            }
        }

        log::info!(
            "Loaded scene {name}: {} surface(s), {} material(s), {} texture(s)",
            scene.surface_count(),
            scene.material_count(),
            textures.len()
        );
        scene.hold_source_textures(lease);
        Ok(scene)
    }

    // ========================================================================
    // Buffers & Images
    // ========================================================================

    async fn load_buffers(&self, gltf: &gltf::Gltf, bin: Option<Arc<[u8]>>) -> Result<Vec<Arc<[u8]>>> {
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => bin.clone().ok_or_else(|| {
                    AssetError::ParseFailure("missing binary chunk".to_string())
                })?,
                gltf::buffer::Source::Uri(uri) => self.read_uri(uri).await?,
            };
            if data.len() < buffer.length() {
                log::warn!(
                    "Buffer {} is {} bytes, expected {}",
                    buffer.index(),
                    data.len(),
                    buffer.length()
                );
            }
            buffer_data.push(data);
        }
        Ok(buffer_data)
    }

    async fn image_bytes(&self, image: &gltf::Image<'_>, buffers: &[Arc<[u8]>]) -> Result<Arc<[u8]>> {
        match image.source() {
            gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                view.length()
                    .checked_add(start)
                    .and_then(|end| buffers.get(view.buffer().index())?.get(start..end))
                    .map(Arc::from)
                    .ok_or_else(|| {
                        AssetError::ParseFailure(format!(
                            "image {} view is out of range",
                            image.index()
                        ))
                        .into()
                    })
            }
            gltf::image::Source::Uri { uri, .. } => self.read_uri(uri).await,
        }
    }

    async fn read_uri(&self, uri: &str) -> Result<Arc<[u8]>> {
        if let Some(rest) = uri.strip_prefix("data:") {
            return decode_data_uri(rest).map(Into::into);
        }
        if BlobUrl::is_blob_url(uri) {
            return self
                .assets
                .blobs()
                .get(uri)
                .map(|blob| blob.bytes)
                .ok_or_else(|| AssetError::InvalidHandle(uri.to_string()).into());
        }
        if !HttpFetcher::handles(uri) {
            return Err(AssetError::LoadFailure {
                uri: uri.to_string(),
                kind: LoadFailureKind::NotFound,
            }
            .into());
        }
        log::debug!("Fetching referenced URL {uri}");
        Ok(self.fetch.fetch(uri).await?.bytes)
    }

    /// Decodes every image the materials use, once per (image, color space).
    ///
    /// The returned lease holds every texture of the scene.
    async fn load_textures(
        &self,
        gltf: &gltf::Gltf,
        buffers: &[Arc<[u8]>],
    ) -> (FxHashMap<TextureCacheKey, TextureHandle>, TextureLease) {
        let mut requests: Vec<TextureCacheKey> = Vec::new();
        for material in gltf.materials() {
            for key in texture_requests(&material) {
                if !requests.contains(&key) {
                    requests.push(key);
                }
            }
        }

        let mut encoded: FxHashMap<usize, (String, Arc<[u8]>)> = FxHashMap::default();
        for &(index, _) in &requests {
            if encoded.contains_key(&index) {
                continue;
            }
            let Some(image) = gltf.images().nth(index) else {
                log::warn!("Texture references missing image {index}");
                continue;
            };
            match self.image_bytes(&image, buffers).await {
                Ok(bytes) => {
                    let label = image.name().map_or_else(|| format!("image_{index}"), str::to_string);
                    encoded.insert(index, (label, bytes));
                }
                Err(e) => log::warn!("{e}; image {index} left unset"),
            }
        }

        // One decode per image; both color spaces share its pixels.
        let decodes = encoded.iter().map(|(&index, (label, bytes))| async move {
            let result = AssetServer::decode_image_async(Arc::clone(bytes), label.clone(), false).await;
            (index, result)
        });
        let mut decoded = FxHashMap::default();
        for (index, result) in futures::future::join_all(decodes).await {
            match result {
                Ok(image) => {
                    decoded.insert(index, image);
                }
                Err(e) => log::warn!("{e}; image {index} left unset"),
            }
        }

        let mut lease = self.assets.lease();
        let mut textures = FxHashMap::default();
        for key in requests {
            let (Some(image), Some((label, _))) = (decoded.get(&key.0), encoded.get(&key.0)) else {
                continue;
            };
            let handle = lease.add_texture_from_image(label, image.clone(), key.1);
            textures.insert(key, handle);
        }
        (textures, lease)
    }
}

/// Texture slots a material reads, with the color space each needs.
fn texture_requests(material: &gltf::Material<'_>) -> Vec<TextureCacheKey> {
    let pbr = material.pbr_metallic_roughness();
    let mut keys = Vec::new();

    if let Some(info) = pbr.base_color_texture() {
        keys.push((info.texture().source().index(), ColorSpace::Srgb));
    }
    if material.unlit() {
        return keys;
    }
    if let Some(info) = pbr.metallic_roughness_texture() {
        keys.push((info.texture().source().index(), ColorSpace::Linear));
    }
    if let Some(normal) = material.normal_texture() {
        keys.push((normal.texture().source().index(), ColorSpace::Linear));
    }
    if let Some(occlusion) = material.occlusion_texture() {
        keys.push((occlusion.texture().source().index(), ColorSpace::Linear));
    }
    if let Some(info) = material.emissive_texture() {
        keys.push((info.texture().source().index(), ColorSpace::Srgb));
    }
    keys
}

fn build_material(
    material: &gltf::Material<'_>,
    textures: &FxHashMap<TextureCacheKey, TextureHandle>,
) -> Material {
    let name = material.name().unwrap_or("Material");
    let pbr = material.pbr_metallic_roughness();
    let lookup = |texture: gltf::Texture<'_>, color_space: ColorSpace| {
        textures.get(&(texture.source().index(), color_space)).copied()
    };

    if material.unlit() {
        let mut unlit = MeshUnlitMaterial::new(name, pbr.base_color_factor());
        unlit.map = pbr
            .base_color_texture()
            .and_then(|info| lookup(info.texture(), ColorSpace::Srgb));
        return unlit.into();
    }

    let mut maps = TextureMaps {
        map: pbr
            .base_color_texture()
            .and_then(|info| lookup(info.texture(), ColorSpace::Srgb)),
        normal_map: material
            .normal_texture()
            .and_then(|normal| lookup(normal.texture(), ColorSpace::Linear)),
        ao_map: material
            .occlusion_texture()
            .and_then(|occlusion| lookup(occlusion.texture(), ColorSpace::Linear)),
        emissive_map: material
            .emissive_texture()
            .and_then(|info| lookup(info.texture(), ColorSpace::Srgb)),
        ..TextureMaps::default()
    };
    // glTF packs roughness (G) and metalness (B) into one image.
    if let Some(info) = pbr.metallic_roughness_texture() {
        let handle = lookup(info.texture(), ColorSpace::Linear);
        maps.roughness_map = handle;
        maps.metalness_map = handle;
    }

    let mut standard = MeshStandardMaterial::new(name, pbr.base_color_factor()).with_source_maps(maps);
    standard.roughness = pbr.roughness_factor();
    standard.metalness = pbr.metallic_factor();
    standard.emissive = material.emissive_factor();
    standard.into()
}

fn decode_data_uri(rest: &str) -> Result<Vec<u8>> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AssetError::ParseFailure("malformed data URI".to_string()))?;
    if header.ends_with(";base64") {
        Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
    } else {
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}
