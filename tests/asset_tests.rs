//! Asset Storage Tests
//!
//! Tests for:
//! - AssetStorage: add, get, add_with_uuid deduplication
//! - UUID lookup: get_by_uuid, get_handle_by_uuid
//! - Thread safety: concurrent reads via RwLock
//! - AssetServer: content-addressed textures, clones sharing storage
//! - BlobStore / LifecycleManager: handle minting and release

mod common;

use slotmap::new_key_type;
use uuid::Uuid;

use wonderbox::assets::blob::{BlobStore, BlobUrl};
use wonderbox::assets::lifecycle::LifecycleManager;
use wonderbox::assets::storage::AssetStorage;
use wonderbox::assets::AssetServer;
use wonderbox::resources::ColorSpace;

new_key_type! { struct TestHandle; }

// ============================================================================
// AssetStorage Basic CRUD
// ============================================================================

#[test]
fn storage_add_and_get() {
    let storage = AssetStorage::<TestHandle, String>::new();
    let handle = storage.add("hello".to_string());
    let value = storage.get(handle).unwrap();
    assert_eq!(&**value, "hello");
}

#[test]
fn storage_handle_from_other_storage_is_missing() {
    let storage = AssetStorage::<TestHandle, String>::new();
    let handle = storage.add("test".to_string());
    let other = AssetStorage::<TestHandle, String>::new();
    assert!(other.get(handle).is_none());
}

#[test]
fn storage_remove() {
    let storage = AssetStorage::<TestHandle, i32>::new();
    let uuid = Uuid::new_v4();
    let handle = storage.add_with_uuid(uuid, 7);

    assert_eq!(storage.remove(handle).as_deref(), Some(&7));
    assert!(storage.get(handle).is_none());
    assert!(storage.get_by_uuid(&uuid).is_none());
    assert!(storage.is_empty());
}

// ============================================================================
// UUID-Based Storage
// ============================================================================

#[test]
fn storage_add_with_uuid_deduplicates() {
    let storage = AssetStorage::<TestHandle, String>::new();
    let uuid = Uuid::new_v4();

    let h1 = storage.add_with_uuid(uuid, "first".to_string());
    let h2 = storage.add_with_uuid(uuid, "second".to_string());

    assert_eq!(h1, h2, "Same UUID should return same handle");
    assert_eq!(&**storage.get(h1).unwrap(), "first");
    assert_eq!(storage.len(), 1);
}

#[test]
fn storage_get_by_uuid() {
    let storage = AssetStorage::<TestHandle, String>::new();
    let uuid = Uuid::new_v4();
    let handle = storage.add_with_uuid(uuid, "hello".to_string());

    assert_eq!(&**storage.get_by_uuid(&uuid).unwrap(), "hello");
    assert_eq!(storage.get_handle_by_uuid(&uuid), Some(handle));
    assert!(storage.get_by_uuid(&Uuid::new_v4()).is_none());
}

// ============================================================================
// Thread Safety
// ============================================================================

#[test]
fn storage_concurrent_reads() {
    use std::sync::Arc;
    use std::thread;

    let storage = Arc::new(AssetStorage::<TestHandle, i32>::new());
    let handle = storage.add(42);

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let s = Arc::clone(&storage);
            thread::spawn(move || assert_eq!(*s.get(handle).unwrap(), 42))
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}

// ============================================================================
// AssetServer Textures
// ============================================================================

#[test]
fn identical_images_share_one_texture() {
    let server = AssetServer::new();
    let bytes = common::png_solid(common::RED);

    let a = AssetServer::decode_image_cpu(&bytes, "a.png", false).unwrap();
    let b = AssetServer::decode_image_cpu(&bytes, "b.png", false).unwrap();

    let ha = server.add_texture_from_image("a.png", a, ColorSpace::Srgb);
    let hb = server.add_texture_from_image("b.png", b, ColorSpace::Srgb);
    assert_eq!(ha, hb);
    assert_eq!(server.textures.len(), 1);
}

#[test]
fn color_space_and_flip_split_textures() {
    let server = AssetServer::new();
    let bytes = common::png_solid(common::GRAY);

    let plain = AssetServer::decode_image_cpu(&bytes, "orm.png", false).unwrap();
    let flipped = AssetServer::decode_image_cpu(&bytes, "orm.png", true).unwrap();

    let srgb = server.add_texture_from_image("orm.png", plain.clone(), ColorSpace::Srgb);
    let linear = server.add_texture_from_image("orm.png", plain, ColorSpace::Linear);
    let linear_flipped = server.add_texture_from_image("orm.png", flipped, ColorSpace::Linear);

    assert_ne!(srgb, linear);
    assert_ne!(linear, linear_flipped);
    assert!(server.get_texture(srgb).unwrap().is_srgb());
    assert!(server.get_texture(linear_flipped).unwrap().flip_y());
}

#[test]
fn undecodable_bytes_are_an_error() {
    let err = AssetServer::decode_image_cpu(b"not an image", "broken.png", false).unwrap_err();
    assert!(err.to_string().contains("broken.png"));
}

#[tokio::test]
async fn async_decode_flips_rows() {
    let bytes = common::png_column(&[common::RED, common::BLUE]);
    let image = AssetServer::decode_image_async(bytes, "column.png".into(), true)
        .await
        .unwrap();
    assert_eq!(image.pixel(0, 0), Some(common::BLUE));
    assert_eq!(image.pixel(0, 1), Some(common::RED));
}

#[test]
fn asset_server_clone_shares_storage() {
    let server = AssetServer::new();
    let image = AssetServer::decode_image_cpu(&common::png_solid(common::RED), "red", false).unwrap();
    let handle = server.add_texture_from_image("red", image, ColorSpace::Srgb);

    let clone = server.clone();
    assert!(
        clone.get_texture(handle).is_some(),
        "Cloned server should share the same storage"
    );
}

// ============================================================================
// Transient Handles
// ============================================================================

#[test]
fn blob_urls_parse_back() {
    let blobs = BlobStore::new();
    let manager = LifecycleManager::new(blobs.clone());
    let mut scope = manager.acquire();
    let url = scope.mint(vec![1u8, 2, 3], "application/octet-stream");

    assert!(BlobUrl::is_blob_url(url.as_str()));
    assert_eq!(BlobUrl::parse(url.as_str()), Some(url.clone()));
    assert_eq!(&*blobs.get(url.as_str()).unwrap().bytes, &[1, 2, 3]);
    assert!(BlobUrl::parse("https://example.com/a.bin").is_none());
}

#[test]
fn failed_pass_releases_while_active_survives() {
    let blobs = BlobStore::new();
    let manager = LifecycleManager::new(blobs.clone());

    let mut good = manager.acquire();
    let kept = good.mint(vec![1u8], "model/gltf-binary");
    manager.commit(good).unwrap();

    {
        let mut failing = manager.acquire();
        failing.mint(vec![2u8], "model/gltf-binary");
        failing.mint(vec![3u8], "image/png");
        assert_eq!(blobs.len(), 3);
    }

    assert_eq!(blobs.len(), 1);
    assert!(blobs.contains(&kept));
}
