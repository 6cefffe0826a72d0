//! Filename Classifier
//!
//! Infers the role of a file in an asset bundle from its name alone.
//!
//! The scene/buffer distinction comes from the extension. For image files the
//! stem is matched against keyword groups in priority order, first group wins:
//!
//! | Group          | Keywords                        | Channels                          |
//! |----------------|---------------------------------|-----------------------------------|
//! | base color     | `base` `color` `albedo` `diffuse` | `BASE_COLOR`                    |
//! | surface detail | `normal` `nrm`                  | `NORMAL`                          |
//! | roughness      | `rough` `rgh`                   | `ROUGHNESS` (+`METALNESS` if a metal keyword co-occurs) |
//! | metalness      | `met` `mtl` `metal`             | `METALNESS`                       |
//! | occlusion      | `ao` `occ` `ambient`            | `OCCLUSION`                       |
//! | emissive       | `emissive` `emit` `glow`        | `EMISSIVE`                        |
//! | packed         | `arm` `orm` `packed`            | `PACKED`                          |
//!
//! Keywords of three letters or fewer only match at the start of a name token
//! (split on `_`, `-`, `.`, spaces, digits and camelCase humps), so `met` finds
//! `Metallic` and `met_rough` but not `Helmet`. Longer keywords match anywhere.
//!
//! Names with an `image`/`embedded` marker and a decimal index fall back to the
//! positional convention used by exporters that dump embedded textures:
//! 0 → base color, 1 → roughness+metalness, 2 → normal, 3 → occlusion.

use std::path::Path;

use crate::resources::Channels;

/// Inferred role of a bundle file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Scene description (`.gltf` / `.glb`), a primary candidate.
    Scene,
    /// Geometry/animation buffer or any other non-image resource.
    Buffer,
    /// Image that feeds the given appearance channels.
    Appearance(Channels),
    /// Image whose name matches no keyword group; bound only by explicit choice.
    Unknown,
}

impl Role {
    #[inline]
    #[must_use]
    pub fn is_scene(self) -> bool {
        self == Role::Scene
    }
}

const SCENE_EXTENSIONS: &[&str] = &["gltf", "glb"];
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "bmp", "tga", "gif", "ktx2", "basis",
];

const BASE_COLOR_KEYWORDS: &[&str] = &["base", "color", "albedo", "diffuse"];
const NORMAL_KEYWORDS: &[&str] = &["normal", "nrm"];
const ROUGHNESS_KEYWORDS: &[&str] = &["rough", "rgh"];
const METAL_KEYWORDS: &[&str] = &["met", "mtl", "metal"];
const OCCLUSION_KEYWORDS: &[&str] = &["ao", "occ", "ambient"];
const EMISSIVE_KEYWORDS: &[&str] = &["emissive", "emit", "glow"];
const PACKED_KEYWORDS: &[&str] = &["arm", "orm", "packed"];
const POSITIONAL_MARKERS: &[&str] = &["image", "embedded"];
const SHORT_KEYWORD_LEN: usize = 3;

/// Classifies a bundle file by name. Case-insensitive, ignores leading path segments.
#[must_use]
pub fn classify(filename: &str) -> Role {
    let ext = extension(filename);
    if SCENE_EXTENSIONS.contains(&ext.as_str()) {
        return Role::Scene;
    }
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Role::Buffer;
    }
    match classify_channels(filename) {
        Some(channels) => Role::Appearance(channels),
        None => Role::Unknown,
    }
}

/// Keyword and positional matching only, regardless of extension.
#[must_use]
pub fn classify_channels(filename: &str) -> Option<Channels> {
    let raw = stem(filename);
    let tokens = tokens(raw);
    let stem = raw.to_ascii_lowercase();
    let has = |keywords: &[&str]| {
        keywords.iter().any(|k| {
            if k.len() <= SHORT_KEYWORD_LEN {
                tokens.iter().any(|t| t.starts_with(k))
            } else {
                stem.contains(k)
            }
        })
    };

    if has(BASE_COLOR_KEYWORDS) {
        return Some(Channels::BASE_COLOR);
    }
    if has(NORMAL_KEYWORDS) {
        return Some(Channels::NORMAL);
    }
    if has(ROUGHNESS_KEYWORDS) {
        return Some(if has(METAL_KEYWORDS) {
            Channels::ROUGHNESS_METALNESS
        } else {
            Channels::ROUGHNESS
        });
    }
    if has(METAL_KEYWORDS) {
        return Some(Channels::METALNESS);
    }
    if has(OCCLUSION_KEYWORDS) {
        return Some(Channels::OCCLUSION);
    }
    if has(EMISSIVE_KEYWORDS) {
        return Some(Channels::EMISSIVE);
    }
    if has(PACKED_KEYWORDS) {
        return Some(Channels::PACKED);
    }
    positional(&stem)
}

/// Lowercase name tokens. A token starts after a non-letter or where a
/// lowercase letter is followed by an uppercase one.
fn tokens(stem: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in stem.chars() {
        if !c.is_ascii_alphabetic() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_ascii_lowercase();
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn positional(stem: &str) -> Option<Channels> {
    let marker_end = POSITIONAL_MARKERS
        .iter()
        .filter_map(|m| stem.find(m).map(|at| at + m.len()))
        .min()?;

    let digits: String = stem[marker_end..]
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();

    match digits.parse::<u32>().ok()? {
        0 => Some(Channels::BASE_COLOR),
        1 => Some(Channels::ROUGHNESS_METALNESS),
        2 => Some(Channels::NORMAL),
        3 => Some(Channels::OCCLUSION),
        _ => None,
    }
}

/// Final path segment of a `/`- or `\`-separated name.
#[must_use]
pub fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn stem(filename: &str) -> &str {
    Path::new(basename(filename))
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

fn extension(filename: &str) -> String {
    Path::new(basename(filename))
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_index_requires_marker() {
        assert_eq!(classify_channels("image_0.png"), Some(Channels::BASE_COLOR));
        assert_eq!(classify_channels("Embedded-2.jpg"), Some(Channels::NORMAL));
        assert_eq!(classify_channels("texture_0.png"), None);
    }

    #[test]
    fn positional_index_out_of_range_is_unknown() {
        assert_eq!(classify("image_7.png"), Role::Unknown);
    }

    #[test]
    fn tokens_split_on_separators_and_humps() {
        assert_eq!(tokens("DamagedHelmet_ORM"), vec!["damaged", "helmet", "orm"]);
        assert_eq!(tokens("brick-wall.2k aoMap"), vec!["brick", "wall", "k", "ao", "map"]);
        assert_eq!(tokens("ALBEDO"), vec!["albedo"]);
    }

    #[test]
    fn basename_handles_both_separators() {
        assert_eq!(basename("a/b/c.bin"), "c.bin");
        assert_eq!(basename("a\\b\\c.bin"), "c.bin");
        assert_eq!(basename("c.bin"), "c.bin");
    }
}
