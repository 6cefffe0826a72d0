//! Texture Binder
//!
//! Loads the images of a [`ChannelSet`] and binds them to every standard
//! material a surface of the scene draws with.
//!
//! # Rules
//! - one load per assignment; a packed image feeding three channels is
//!   fetched and decoded once
//! - loads run concurrently; a failed load skips its channels only
//! - base color is sRGB, every other channel linear
//! - the flip flag applies to every image of the set
//! - each pass recomputes the maps from the ones the model was loaded with,
//!   so a channel removed from the set falls back to the model's own texture
//!
//! Textures are content-addressed, so binding an unchanged set again
//! reproduces the same handles and leaves the materials untouched.

use crate::assets::bundle::AssetBundle;
use crate::assets::classify::classify_channels;
use crate::assets::io::{ByteSource, FetchChain};
use crate::assets::server::{AssetServer, TextureHandle, TextureLease};
use crate::errors::{AssetError, Result};
use crate::resources::image::Image;
use crate::resources::material::{Channel, Channels};
use crate::scene::Scene;

// ============================================================================
// Channel set
// ============================================================================

/// One image feeding one or more channels.
#[derive(Debug, Clone)]
pub struct ChannelAssignment {
    pub name: String,
    pub source: ByteSource,
    pub channels: Channels,
}

/// Which image feeds which appearance channel, plus the global flip flag.
///
/// Every channel is fed by at most one image.
#[derive(Debug, Clone, Default)]
pub struct ChannelSet {
    assignments: Vec<ChannelAssignment>,
    pub flip_y: bool,
}

impl ChannelSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Auto-assigns files by name. Unrecognized names are skipped; for a
    /// channel named twice the later file wins.
    pub fn from_files<N: Into<String>>(files: impl IntoIterator<Item = (N, ByteSource)>) -> Self {
        let mut set = Self::new();
        for (name, source) in files {
            let name: String = name.into();
            match classify_channels(&name) {
                Some(channels) => set.assign(name, source, channels),
                None => log::debug!("No appearance channel recognized for {name}"),
            }
        }
        set
    }

    /// Auto-assigns the appearance files of a bundle.
    #[must_use]
    pub fn from_bundle(bundle: &AssetBundle) -> Self {
        Self::from_files(
            bundle
                .appearance_files()
                .map(|f| (f.name.clone(), f.source.clone())),
        )
    }

    #[must_use]
    pub fn with_flip_y(mut self, flip_y: bool) -> Self {
        self.flip_y = flip_y;
        self
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, source: ByteSource, channels: Channels) -> Self {
        self.assign(name, source, channels);
        self
    }

    /// Feeds `channels` from `source`, taking them away from any earlier image.
    pub fn assign(&mut self, name: impl Into<String>, source: ByteSource, channels: Channels) {
        if channels.is_empty() {
            return;
        }
        self.clear(channels);
        self.assignments.push(ChannelAssignment {
            name: name.into(),
            source,
            channels,
        });
    }

    /// Unsets `channels`; images left feeding nothing are dropped.
    pub fn clear(&mut self, channels: Channels) {
        for assignment in &mut self.assignments {
            assignment.channels.remove(channels);
        }
        self.assignments.retain(|a| !a.channels.is_empty());
    }

    #[must_use]
    pub fn assignments(&self) -> &[ChannelAssignment] {
        &self.assignments
    }

    #[must_use]
    pub fn source_for(&self, channel: Channel) -> Option<&ChannelAssignment> {
        self.assignments
            .iter()
            .find(|a| a.channels.contains(channel.flag()))
    }

    /// Union of every assigned channel.
    #[must_use]
    pub fn populated(&self) -> Channels {
        self.assignments
            .iter()
            .fold(Channels::empty(), |acc, a| acc | a.channels)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

// ============================================================================
// Binder
// ============================================================================

/// Per-channel textures produced by one load pass.
///
/// Holds its textures until applied; dropping it unapplied releases them.
#[derive(Debug)]
pub struct BoundTextures {
    pub textures: Vec<(Channel, TextureHandle)>,
    /// Channels whose image failed to load.
    pub failed: Channels,
    lease: TextureLease,
}

impl BoundTextures {
    /// Channels that received a texture.
    #[must_use]
    pub fn channels(&self) -> Channels {
        self.textures
            .iter()
            .fold(Channels::empty(), |acc, (c, _)| acc | c.flag())
    }

    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<TextureHandle> {
        self.textures
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, handle)| *handle)
    }
}

/// Summary of one bind pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindReport {
    pub bound: Channels,
    pub failed: Channels,
    /// Materials whose maps changed.
    pub materials_changed: usize,
}

#[derive(Clone)]
pub struct TextureBinder {
    assets: AssetServer,
    fetch: FetchChain,
}

impl TextureBinder {
    #[must_use]
    pub fn new(assets: AssetServer, fetch: FetchChain) -> Self {
        Self { assets, fetch }
    }

    /// Loads every assignment of `set` concurrently.
    pub async fn load(&self, set: &ChannelSet) -> BoundTextures {
        let loads = set
            .assignments()
            .iter()
            .map(|assignment| async move {
                let result = self.decode_assignment(assignment, set.flip_y).await;
                (assignment, result)
            });

        let mut bound = BoundTextures {
            textures: Vec::new(),
            failed: Channels::empty(),
            lease: self.assets.lease(),
        };
        for (assignment, result) in futures::future::join_all(loads).await {
            match result {
                Ok(image) => {
                    for channel in assignment.channels.channels() {
                        let handle = bound.lease.add_texture_from_image(
                            &assignment.name,
                            image.clone(),
                            channel.color_space(),
                        );
                        bound.textures.push((channel, handle));
                    }
                }
                Err(e) => {
                    let err = AssetError::TextureLoadFailure {
                        channel: channel_labels(assignment.channels),
                        reason: e.to_string(),
                    };
                    log::warn!("{err}; channel left unbound");
                    bound.failed |= assignment.channels;
                }
            }
        }
        bound
    }

    /// Fetches and decodes one image; the pixels are shared by every channel
    /// it feeds.
    async fn decode_assignment(&self, assignment: &ChannelAssignment, flip_y: bool) -> Result<Image> {
        let fetched = assignment.source.read(&self.fetch).await?;
        AssetServer::decode_image_async(fetched.bytes, assignment.name.clone(), flip_y).await
    }

    /// Rebuilds the maps of every drawn standard material: the model's own
    /// maps, overridden by `textures`, and hands the textures to the scene.
    /// Returns how many materials changed.
    pub fn apply(scene: &mut Scene, textures: BoundTextures) -> usize {
        let mut changed = 0;
        for key in scene.drawn_materials() {
            let Some(material) = scene
                .get_material_mut(key)
                .and_then(|m| m.as_standard_mut())
            else {
                continue;
            };

            let mut maps = *material.source_maps();
            for &(channel, handle) in &textures.textures {
                maps.set(channel, Some(handle));
            }
            if material.replace_maps(maps) {
                changed += 1;
            }
        }
        scene.hold_bound_textures(textures.lease);
        changed
    }

    /// Loads `set` and applies it to `scene`.
    pub async fn bind(&self, scene: &mut Scene, set: &ChannelSet) -> BindReport {
        let textures = self.load(set).await;
        let (bound, failed) = (textures.channels(), textures.failed);
        let report = BindReport {
            bound,
            failed,
            materials_changed: Self::apply(scene, textures),
        };
        log::debug!("Bind pass on {}: {report:?}", scene.name);
        report
    }
}

fn channel_labels(channels: Channels) -> String {
    channels
        .channels()
        .map(Channel::label)
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> ByteSource {
        ByteSource::local(vec![0u8])
    }

    #[test]
    fn assigning_moves_channels() {
        let mut set = ChannelSet::new().with("orm.png", src(), Channels::PACKED);
        set.assign("rough.png", src(), Channels::ROUGHNESS);

        assert_eq!(set.assignments().len(), 2);
        assert_eq!(set.source_for(Channel::Roughness).unwrap().name, "rough.png");
        assert_eq!(
            set.source_for(Channel::Occlusion).unwrap().channels,
            Channels::METALNESS | Channels::OCCLUSION
        );
    }

    #[test]
    fn clearing_drops_empty_assignments() {
        let mut set = ChannelSet::new().with("base.png", src(), Channels::BASE_COLOR);
        set.clear(Channels::BASE_COLOR);
        assert!(set.is_empty());
    }

    #[test]
    fn from_files_skips_unknown_names() {
        let set = ChannelSet::from_files([
            ("duck_basecolor.png", src()),
            ("photo.png", src()),
            ("duck_normal_map.png", src()),
        ]);
        assert_eq!(set.populated(), Channels::BASE_COLOR | Channels::NORMAL);
    }

    #[test]
    fn labels_join_channels() {
        assert_eq!(channel_labels(Channels::PACKED), "roughness+metalness+occlusion");
    }
}
