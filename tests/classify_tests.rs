//! Filename Classifier & Registry Tests
//!
//! Tests for:
//! - classify: scene / buffer / appearance / unknown roles
//! - Keyword priority, combined roughness+metalness, packed images
//! - Positional fallback for exporter-style embedded image names
//! - ResourceRegistry: exact, basename and percent-decoded lookup

use wonderbox::assets::classify::{Role, classify, classify_channels};
use wonderbox::assets::io::ByteSource;
use wonderbox::assets::registry::{Resolution, ResourceRegistry};
use wonderbox::resources::Channels;

// ============================================================================
// Roles by extension
// ============================================================================

#[test]
fn scene_extensions_are_primary_candidates() {
    assert_eq!(classify("duck.gltf"), Role::Scene);
    assert_eq!(classify("models/Duck.GLB"), Role::Scene);
}

#[test]
fn non_image_files_are_buffers() {
    assert_eq!(classify("scene.bin"), Role::Buffer);
    // "met" inside a buffer name must not turn it into a texture.
    assert_eq!(classify("helmet.bin"), Role::Buffer);
}

#[test]
fn unrecognized_images_are_unknown() {
    assert_eq!(classify("photo.png"), Role::Unknown);
    assert_eq!(classify_channels("photo.png"), None);
}

// ============================================================================
// Keyword groups
// ============================================================================

#[test]
fn documented_examples() {
    assert_eq!(classify("basecolor.png"), Role::Appearance(Channels::BASE_COLOR));
    assert_eq!(classify("normal_map.png"), Role::Appearance(Channels::NORMAL));
    assert_eq!(classify("ORM_packed.png"), Role::Appearance(Channels::PACKED));
}

#[test]
fn matching_is_case_insensitive() {
    assert_eq!(classify_channels("Duck_ALBEDO.JPG"), Some(Channels::BASE_COLOR));
    assert_eq!(classify_channels("Brick_Nrm.webp"), Some(Channels::NORMAL));
}

#[test]
fn roughness_with_metal_binds_both() {
    assert_eq!(
        classify_channels("metal_roughness.png"),
        Some(Channels::ROUGHNESS_METALNESS)
    );
    assert_eq!(classify_channels("rough.png"), Some(Channels::ROUGHNESS));
    assert_eq!(classify_channels("metallic.png"), Some(Channels::METALNESS));
}

#[test]
fn remaining_groups() {
    assert_eq!(classify_channels("wall_ao.png"), Some(Channels::OCCLUSION));
    assert_eq!(classify_channels("occlusion.png"), Some(Channels::OCCLUSION));
    assert_eq!(classify_channels("lamp_emissive.png"), Some(Channels::EMISSIVE));
    assert_eq!(classify_channels("glow.png"), Some(Channels::EMISSIVE));
    assert_eq!(classify_channels("crate_arm.png"), Some(Channels::PACKED));
}

#[test]
fn earlier_group_wins() {
    // base color outranks roughness
    assert_eq!(classify_channels("base_rough.png"), Some(Channels::BASE_COLOR));
    // normal outranks packed ("normal" contains "orm")
    assert_eq!(classify_channels("normal.png"), Some(Channels::NORMAL));
}

#[test]
fn short_keywords_match_whole_tokens_only() {
    // "met" inside "helmet" is not a metalness marker.
    assert_eq!(
        classify("DamagedHelmet_ORM.png"),
        Role::Appearance(Channels::PACKED)
    );
    assert_eq!(classify_channels("Helmet_AO.png"), Some(Channels::OCCLUSION));
    assert_eq!(classify_channels("helmet_orm.png"), Some(Channels::PACKED));
    assert_eq!(classify_channels("helmet.png"), None);
}

#[test]
fn short_keywords_match_at_token_starts() {
    assert_eq!(classify_channels("Chair_Met.png"), Some(Channels::METALNESS));
    assert_eq!(classify_channels("rock-mtl.jpg"), Some(Channels::METALNESS));
    assert_eq!(classify_channels("wallAO.png"), Some(Channels::OCCLUSION));
    assert_eq!(
        classify_channels("DuckMetalRough.png"),
        Some(Channels::ROUGHNESS_METALNESS)
    );
}

#[test]
fn leading_path_segments_are_ignored() {
    assert_eq!(
        classify_channels("textures/albedo/../rock_normal.png"),
        Some(Channels::NORMAL)
    );
}

// ============================================================================
// Positional fallback
// ============================================================================

#[test]
fn positional_indices() {
    assert_eq!(classify_channels("image_0.png"), Some(Channels::BASE_COLOR));
    assert_eq!(classify_channels("image_1.png"), Some(Channels::ROUGHNESS_METALNESS));
    assert_eq!(classify_channels("embedded2.png"), Some(Channels::NORMAL));
    assert_eq!(classify_channels("Image 3.jpg"), Some(Channels::OCCLUSION));
}

#[test]
fn positional_requires_marker_and_known_index() {
    assert_eq!(classify_channels("image_7.png"), None);
    assert_eq!(classify_channels("texture_0.png"), None);
    assert_eq!(classify_channels("image.png"), None);
}

// ============================================================================
// Registry lookup
// ============================================================================

fn registry() -> ResourceRegistry {
    ResourceRegistry::build([
        ("scene.bin", ByteSource::local(vec![1u8])),
        ("my diffuse.png", ByteSource::local(vec![2u8])),
        ("textures/normal.png", ByteSource::remote("https://cdn.test/normal.png")),
    ])
}

#[test]
fn registry_exact_match() {
    let registry = registry();
    let entry = registry.lookup("scene.bin").unwrap();
    assert_eq!(entry.name, "scene.bin");
    assert_eq!(entry.role, Role::Buffer);
}

#[test]
fn registry_basename_match() {
    let registry = registry();
    assert_eq!(registry.lookup("./buffers/scene.bin").unwrap().name, "scene.bin");
    assert_eq!(registry.lookup("normal.png").unwrap().name, "textures/normal.png");
}

#[test]
fn registry_percent_decoded_match() {
    let registry = registry();
    assert_eq!(
        registry.lookup("textures/my%20diffuse.png").unwrap().name,
        "my diffuse.png"
    );
}

#[test]
fn registry_miss_returns_reference() {
    let registry = registry();
    match registry.resolve("missing.bin") {
        Resolution::Unresolved(reference) => assert_eq!(reference, "missing.bin"),
        Resolution::Found(entry) => panic!("unexpected match {}", entry.name),
    }
}

#[test]
fn registry_first_duplicate_wins() {
    let registry = ResourceRegistry::build([
        ("a/tex.png", ByteSource::local(vec![1u8])),
        ("b/tex.png", ByteSource::local(vec![2u8])),
    ]);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.lookup("tex.png").unwrap().name, "a/tex.png");
}
