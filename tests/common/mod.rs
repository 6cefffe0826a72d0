//! Shared fixtures: tiny images, scene documents and test fetchers.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde_json::json;
use tokio::sync::Notify;

use wonderbox::assets::io::{ByteFetcher, FetchedBytes, StaticFetcher};
use wonderbox::errors::{AssetError, LoadFailureKind, Result};
use wonderbox::utils::BoxFuture;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Images
// ============================================================================

/// A PNG with one column of pixels, top row first.
pub fn png_column(rows: &[[u8; 4]]) -> Vec<u8> {
    let mut img = image::RgbaImage::new(1, rows.len() as u32);
    for (y, color) in rows.iter().enumerate() {
        img.put_pixel(0, y as u32, image::Rgba(*color));
    }
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn png_solid(color: [u8; 4]) -> Vec<u8> {
    png_column(&[color, color])
}

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const GRAY: [u8; 4] = [128, 128, 128, 255];

// ============================================================================
// Scene documents
// ============================================================================

/// Positions of one triangle, little-endian f32.
pub fn triangle_bin() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    positions.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Text scene: one triangle node whose material samples `image_uri` as base
/// color. `buffer_uri: None` means the buffer lives in a GLB binary chunk.
pub fn scene_json(buffer_uri: Option<&str>, image_uri: Option<&str>) -> serde_json::Value {
    let mut buffer = json!({ "byteLength": 36 });
    if let Some(uri) = buffer_uri {
        buffer["uri"] = json!(uri);
    }

    let mut doc = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "Triangle", "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }] }],
        "materials": [{ "name": "Body", "pbrMetallicRoughness": {} }],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        }],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
        "buffers": [buffer],
    });

    if let Some(uri) = image_uri {
        doc["images"] = json!([{ "uri": uri }]);
        doc["textures"] = json!([{ "source": 0 }]);
        doc["materials"][0]["pbrMetallicRoughness"]["baseColorTexture"] = json!({ "index": 0 });
    }
    doc
}

pub fn scene_gltf(buffer_uri: Option<&str>, image_uri: Option<&str>) -> Vec<u8> {
    serde_json::to_vec(&scene_json(buffer_uri, image_uri)).unwrap()
}

/// Binary container holding the triangle scene and its buffer.
pub fn scene_glb() -> Vec<u8> {
    let mut json = serde_json::to_vec(&scene_json(None, None)).unwrap();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let bin = triangle_bin();

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E_4942u32.to_le_bytes());
    glb.extend_from_slice(&bin);
    glb
}

// ============================================================================
// Fetchers
// ============================================================================

/// Counts every fetch before delegating.
#[derive(Default)]
pub struct CountingFetcher {
    inner: StaticFetcher,
    count: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(inner: StaticFetcher) -> Self {
        Self {
            inner,
            count: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ByteFetcher for CountingFetcher {
    fn name(&self) -> &str {
        "counting"
    }

    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<FetchedBytes>> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(uri)
    }
}

/// Holds fetches of one URI until released; every other URI is not found.
pub struct GateFetcher {
    uri: String,
    bytes: Vec<u8>,
    pub entered: Arc<Notify>,
    pub gate: Arc<Notify>,
}

impl GateFetcher {
    pub fn new(uri: &str, bytes: Vec<u8>) -> Self {
        Self {
            uri: uri.to_string(),
            bytes,
            entered: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
        }
    }
}

impl ByteFetcher for GateFetcher {
    fn name(&self) -> &str {
        "gate"
    }

    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<FetchedBytes>> {
        Box::pin(async move {
            if uri != self.uri {
                return Err(not_found(uri));
            }
            self.entered.notify_one();
            self.gate.notified().await;
            Ok(FetchedBytes {
                bytes: self.bytes.clone().into(),
                content_type: None,
            })
        })
    }
}

/// Serves from `inner` only while `online` is set.
pub struct SwitchFetcher {
    inner: StaticFetcher,
    pub online: AtomicBool,
}

impl SwitchFetcher {
    pub fn new(inner: StaticFetcher, online: bool) -> Self {
        Self {
            inner,
            online: AtomicBool::new(online),
        }
    }
}

impl ByteFetcher for SwitchFetcher {
    fn name(&self) -> &str {
        "switch"
    }

    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<FetchedBytes>> {
        if self.online.load(Ordering::SeqCst) {
            self.inner.fetch(uri)
        } else {
            Box::pin(async move { Err(not_found(uri)) })
        }
    }
}

pub fn not_found(uri: &str) -> wonderbox::Error {
    AssetError::LoadFailure {
        uri: uri.to_string(),
        kind: LoadFailureKind::NotFound,
    }
    .into()
}
