//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The top-level [`Error`] wraps two domain enums:
//! - [`AssetError`] covers bundle resolution, scene loading and texture binding
//! - [`StorageError`] covers the local and remote persistence backends
//!
//! Only some variants are fatal. The resolver, binder and library construct the
//! non-fatal ones ([`AssetError::ReferenceFetchFailure`], [`AssetError::ParseFailure`],
//! [`AssetError::TextureLoadFailure`], a one-sided [`StorageError`]), log them and
//! carry on with degraded output.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wonderbox::errors::{AssetError, Error, Result};
//!
//! fn check(bytes: &[u8]) -> Result<()> {
//!     if bytes.is_empty() {
//!         return Err(AssetError::ParseFailure("empty file".into()).into());
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Sub-kind of a fatal fetch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailureKind {
    /// 401/403-equivalent response.
    PermissionDenied,
    /// 404/410-equivalent response, or a missing local file.
    NotFound,
    /// Any other transport or status failure.
    Transport(String),
}

impl LoadFailureKind {
    /// Maps an HTTP status code to a failure kind.
    #[must_use]
    pub fn from_status(status: u16, status_text: &str) -> Self {
        match status {
            401 | 403 => Self::PermissionDenied,
            404 | 410 => Self::NotFound,
            _ => Self::Transport(format!("status {status} {status_text}")),
        }
    }
}

impl std::fmt::Display for LoadFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => f.write_str("permission denied"),
            Self::NotFound => f.write_str("not found"),
            Self::Transport(reason) => write!(f, "transport error: {reason}"),
        }
    }
}

/// Errors raised while turning an asset bundle into a textured scene.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The bundle contains no scene-description entry.
    #[error("Bundle has no recognizable scene file")]
    NoPrimaryFile,

    /// Fetching a required byte-source failed.
    #[error("Failed to load {uri}: {kind}")]
    LoadFailure {
        /// The reference that was fetched
        uri: String,
        /// What went wrong
        kind: LoadFailureKind,
    },

    /// Fetching one auxiliary buffer or image failed.
    #[error("Failed to fetch referenced file {reference}: {reason}")]
    ReferenceFetchFailure {
        /// The reference as written in the scene description
        reference: String,
        /// Underlying cause
        reason: String,
    },

    /// The scene description could not be parsed.
    #[error("Scene parse error: {0}")]
    ParseFailure(String),

    /// One appearance channel image could not be loaded or decoded.
    #[error("Failed to load texture for {channel}: {reason}")]
    TextureLoadFailure {
        /// Channel label
        channel: String,
        /// Underlying cause
        reason: String,
    },

    /// A transient handle was not found in the blob store.
    #[error("Invalid or released handle: {0}")]
    InvalidHandle(String),

    /// The resolution pass was superseded by a newer one.
    #[error("Resolution pass was abandoned")]
    Abandoned,
}

/// Errors raised by the persistence backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The on-device store failed.
    #[error("Local storage error: {0}")]
    Local(String),

    /// The remote store failed.
    #[error("Remote storage error: {0}")]
    Remote(String),

    /// Both backends failed for the same operation.
    #[error("Both storage backends failed (local: {local}; remote: {remote})")]
    Both {
        /// Local failure description
        local: String,
        /// Remote failure description
        remote: String,
    },

    /// No record exists with the given id.
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Domain Errors
    // ========================================================================
    /// Asset resolution / loading error.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Persistence error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    // ========================================================================
    // I/O & Format Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    // ========================================================================
    // Async Errors
    // ========================================================================
    /// Task join error (when blocking work fails to complete).
    #[error("Task join error: {0}")]
    TaskJoin(String),

    // ========================================================================
    // Collaborators
    // ========================================================================
    /// The descriptive-text service failed or replied with garbage.
    #[error("Description service error: {0}")]
    Describe(String),
}

impl Error {
    /// Whether the error means a newer resolution pass took over.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Asset(AssetError::Abandoned))
    }

    /// Returns the load failure kind if this is a fatal fetch failure.
    #[must_use]
    pub fn load_failure_kind(&self) -> Option<&LoadFailureKind> {
        match self {
            Self::Asset(AssetError::LoadFailure { kind, .. }) => Some(kind),
            _ => None,
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}

impl From<gltf::Error> for Error {
    fn from(err: gltf::Error) -> Self {
        Error::Asset(AssetError::ParseFailure(err.to_string()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::TaskJoin(err.to_string())
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
