use crate::assets::classify::{Role, basename, classify};
use crate::assets::io::ByteSource;
use crate::errors::{AssetError, Result};

/// One named file of a bundle.
#[derive(Debug, Clone)]
pub struct BundleFile {
    pub name: String,
    pub source: ByteSource,
}

/// The raw input of a resolution pass: a scene file plus whatever buffers and
/// images were supplied alongside it.
#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    files: Vec<BundleFile>,
}

impl AssetBundle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A bundle made of one remote scene file; its references are fetched relative to it.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let name = basename(url.split(['?', '#']).next().unwrap_or(url));
        Self::new().with_file(name, ByteSource::remote(url))
    }

    pub fn from_files<N: Into<String>>(files: impl IntoIterator<Item = (N, ByteSource)>) -> Self {
        let mut bundle = Self::new();
        for (name, source) in files {
            bundle.push(name, source);
        }
        bundle
    }

    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, source: ByteSource) -> Self {
        self.push(name, source);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, source: ByteSource) {
        self.files.push(BundleFile {
            name: name.into(),
            source,
        });
    }

    #[must_use]
    pub fn files(&self) -> &[BundleFile] {
        &self.files
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The first entry with a scene-description extension.
    pub fn primary(&self) -> Result<&BundleFile> {
        self.files
            .iter()
            .find(|f| classify(&f.name).is_scene())
            .ok_or_else(|| AssetError::NoPrimaryFile.into())
    }

    /// Entries whose names map to appearance channels.
    pub fn appearance_files(&self) -> impl Iterator<Item = &BundleFile> {
        self.files
            .iter()
            .filter(|f| matches!(classify(&f.name), Role::Appearance(_)))
    }
}
