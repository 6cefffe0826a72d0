//! Runtime Settings
//!
//! Configuration for the viewing session, the fetch strategies, the
//! descriptive-text client and the persistence backends.
//!
//! Every section has a usable default, so a settings file only needs to name
//! what it changes:
//!
//! ```rust,ignore
//! use wonderbox::settings::Settings;
//!
//! let settings = Settings::from_json_str(r#"{
//!     "flip_y": true,
//!     "storage": { "remote": { "base_url": "https://store.example.com/api/" } }
//! }"#)?;
//! assert!(settings.fetch.allow_file_urls);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::describe::Description;
use crate::errors::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Initial vertical-flip flag for appearance channels.
    pub flip_y: bool,
    pub fetch: FetchSettings,
    pub describe: DescribeSettings,
    pub storage: StorageSettings,
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&text)?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Byte retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Extra headers sent with every HTTP request.
    pub request_headers: Vec<(String, String)>,
    /// Adds the local file strategy after HTTP (ignored on wasm).
    pub allow_file_urls: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_headers: Vec::new(),
            allow_file_urls: true,
        }
    }
}

/// Descriptive-text service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeSettings {
    /// Service URL. Without one the fallback record is always used.
    pub endpoint: Option<String>,
    pub fallback: Description,
}

/// Persistence backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root directory of the on-device store.
    pub local_root: PathBuf,
    /// Remote store; `None` keeps the library local-only.
    pub remote: Option<RemoteSettings>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("wonderbox-data"),
            remote: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL; endpoint paths are joined onto it.
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = Settings::from_json_str(r#"{ "flip_y": true }"#).unwrap();
        assert!(settings.flip_y);
        assert!(settings.fetch.allow_file_urls);
        assert!(settings.storage.remote.is_none());
        assert_eq!(settings.describe, DescribeSettings::default());
    }

    #[test]
    fn remote_section_parses() {
        let settings = Settings::from_json_str(
            r#"{ "storage": { "local_root": "/tmp/wb", "remote": { "base_url": "https://x/api/" } } }"#,
        )
        .unwrap();
        let remote = settings.storage.remote.unwrap();
        assert_eq!(remote.base_url, "https://x/api/");
        assert_eq!(remote.auth_token, None);
        assert_eq!(settings.storage.local_root, PathBuf::from("/tmp/wb"));
    }

    #[test]
    fn request_headers_are_pairs() {
        let settings = Settings::from_json_str(
            r#"{ "fetch": { "request_headers": [["Authorization", "Bearer t"]] } }"#,
        )
        .unwrap();
        assert_eq!(
            settings.fetch.request_headers,
            vec![("Authorization".to_string(), "Bearer t".to_string())]
        );
    }
}
