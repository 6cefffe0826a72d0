//! Resource Registry
//!
//! Maps the logical file names of a bundle to their byte-sources so the
//! resolver can rewrite references written inside a scene description.
//!
//! Lookup order for a reference:
//! 1. exact name
//! 2. basename of the reference against basenames of the entries
//! 3. percent-decoded basename
//!
//! A miss is not an error; the caller keeps or fetches the literal reference.

use rustc_hash::FxHashMap;

use crate::assets::bundle::AssetBundle;
use crate::assets::classify::{Role, basename, classify};
use crate::assets::io::ByteSource;

/// One registered file. Never mutated after [`ResourceRegistry::build`].
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub name: String,
    pub source: ByteSource,
    pub role: Role,
}

/// Outcome of resolving a reference.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    Found(&'a RegistryEntry),
    Unresolved(&'a str),
}

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: Vec<RegistryEntry>,
    by_name: FxHashMap<String, usize>,
    by_basename: FxHashMap<String, usize>,
}

impl ResourceRegistry {
    /// Builds the registry. On duplicate names the first entry wins.
    pub fn build<N: Into<String>>(files: impl IntoIterator<Item = (N, ByteSource)>) -> Self {
        let mut registry = Self::default();
        for (name, source) in files {
            let name: String = name.into();
            let index = registry.entries.len();
            registry.by_name.entry(name.clone()).or_insert(index);
            registry
                .by_basename
                .entry(basename(&name).to_string())
                .or_insert(index);
            registry.entries.push(RegistryEntry {
                role: classify(&name),
                name,
                source,
            });
        }
        log::debug!("Resource registry built with {} entries", registry.entries.len());
        registry
    }

    #[must_use]
    pub fn from_bundle(bundle: &AssetBundle) -> Self {
        Self::build(
            bundle
                .files()
                .iter()
                .map(|f| (f.name.clone(), f.source.clone())),
        )
    }

    #[must_use]
    pub fn resolve<'a>(&'a self, reference: &'a str) -> Resolution<'a> {
        match self.lookup(reference) {
            Some(entry) => Resolution::Found(entry),
            None => Resolution::Unresolved(reference),
        }
    }

    #[must_use]
    pub fn lookup(&self, reference: &str) -> Option<&RegistryEntry> {
        if let Some(&index) = self.by_name.get(reference) {
            return Some(&self.entries[index]);
        }

        let base = basename(reference);
        if let Some(&index) = self.by_basename.get(base) {
            return Some(&self.entries[index]);
        }

        let decoded = urlencoding::decode(base).ok()?;
        self.by_basename
            .get(decoded.as_ref())
            .or_else(|| self.by_name.get(decoded.as_ref()))
            .map(|&index| &self.entries[index])
    }

    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
