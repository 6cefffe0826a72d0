use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{AssetError, Error, LoadFailureKind, Result};
use crate::settings::FetchSettings;
use crate::utils::BoxFuture;

// ============================================================================
// Byte sources
// ============================================================================

/// Where the bytes of one bundle file come from.
#[derive(Debug, Clone)]
pub enum ByteSource {
    /// Bytes already in memory (a user-picked file, a stored record).
    Local {
        bytes: Arc<[u8]>,
        content_type: Option<String>,
    },
    /// A fetch target (URL or path), read through the [`FetchChain`].
    Remote(String),
}

impl ByteSource {
    pub fn local(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Local {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn local_typed(bytes: impl Into<Arc<[u8]>>, content_type: &str) -> Self {
        Self::Local {
            bytes: bytes.into(),
            content_type: Some(content_type.to_string()),
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote(url.into())
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    /// Reads the bytes, fetching remote sources through `chain`.
    pub async fn read(&self, chain: &FetchChain) -> Result<FetchedBytes> {
        match self {
            Self::Local {
                bytes,
                content_type,
            } => Ok(FetchedBytes {
                bytes: Arc::clone(bytes),
                content_type: content_type.clone(),
            }),
            Self::Remote(uri) => chain.fetch(uri).await,
        }
    }
}

/// Bytes returned by a fetch, with the content type the source reported.
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub bytes: Arc<[u8]>,
    pub content_type: Option<String>,
}

// ============================================================================
// Fetch strategies
// ============================================================================

/// One way of retrieving bytes for a reference.
pub trait ByteFetcher: Send + Sync {
    fn name(&self) -> &str;

    /// Fetches `uri`. Failures are [`AssetError::LoadFailure`]s.
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<FetchedBytes>>;
}

fn load_failure(uri: &str, kind: LoadFailureKind) -> Error {
    Error::Asset(AssetError::LoadFailure {
        uri: uri.to_string(),
        kind,
    })
}

/// HTTP(S) reader.
pub struct HttpFetcher {
    headers: Vec<(String, String)>,
}

impl HttpFetcher {
    #[must_use]
    pub fn new(headers: Vec<(String, String)>) -> Self {
        Self { headers }
    }

    #[must_use]
    pub fn handles(uri: &str) -> bool {
        uri.starts_with("http://") || uri.starts_with("https://")
    }
}

impl ByteFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<FetchedBytes>> {
        Box::pin(async move {
            if !Self::handles(uri) {
                return Err(load_failure(
                    uri,
                    LoadFailureKind::Transport("not an http(s) URL".into()),
                ));
            }

            let mut request = ehttp::Request::get(uri);
            for (key, value) in &self.headers {
                request.headers.insert(key, value);
            }

            let response = ehttp::fetch_async(request)
                .await
                .map_err(|e| load_failure(uri, LoadFailureKind::Transport(e)))?;

            if !response.ok {
                return Err(load_failure(
                    uri,
                    LoadFailureKind::from_status(response.status, &response.status_text),
                ));
            }

            log::debug!("Fetched {} bytes from {uri}", response.bytes.len());
            Ok(FetchedBytes {
                content_type: response.content_type().map(str::to_string),
                bytes: response.bytes.into(),
            })
        })
    }
}

/// Local file reader for `file://` URLs and plain paths.
#[cfg(not(target_arch = "wasm32"))]
pub struct FileFetcher;

#[cfg(not(target_arch = "wasm32"))]
impl ByteFetcher for FileFetcher {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<FetchedBytes>> {
        Box::pin(async move {
            if uri.contains("://") && !uri.starts_with("file://") {
                return Err(load_failure(
                    uri,
                    LoadFailureKind::Transport("not a file path".into()),
                ));
            }
            let path = uri.strip_prefix("file://").unwrap_or(uri);
            let path = urlencoding::decode(path).map_or_else(|_| path.to_string(), |p| p.into_owned());

            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(FetchedBytes {
                    bytes: bytes.into(),
                    content_type: None,
                }),
                Err(e) => {
                    let kind = match e.kind() {
                        std::io::ErrorKind::NotFound => LoadFailureKind::NotFound,
                        std::io::ErrorKind::PermissionDenied => LoadFailureKind::PermissionDenied,
                        _ => LoadFailureKind::Transport(e.to_string()),
                    };
                    Err(load_failure(uri, kind))
                }
            }
        })
    }
}

/// In-memory reader keyed by exact URI.
///
/// Stands in for payloads retrieved out of band (a vendor SDK download, a
/// pre-fetched cache) and for tests.
#[derive(Default)]
pub struct StaticFetcher {
    entries: FxHashMap<String, FetchedBytes>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, uri: &str, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(uri, bytes);
        self
    }

    pub fn insert(&mut self, uri: &str, bytes: impl Into<Arc<[u8]>>) {
        self.entries.insert(
            uri.to_string(),
            FetchedBytes {
                bytes: bytes.into(),
                content_type: None,
            },
        );
    }
}

impl ByteFetcher for StaticFetcher {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<FetchedBytes>> {
        let found = self.entries.get(uri).cloned();
        Box::pin(async move { found.ok_or_else(|| load_failure(uri, LoadFailureKind::NotFound)) })
    }
}

// ============================================================================
// Strategy chain
// ============================================================================

/// Ordered list of fetch strategies; the first success wins.
///
/// When every strategy fails the first strategy's error is returned, since the
/// primary transport is the one whose status describes the failure.
#[derive(Clone, Default)]
pub struct FetchChain {
    strategies: Vec<Arc<dyn ByteFetcher>>,
}

impl FetchChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP first, then (natively, if allowed) the local file system.
    #[must_use]
    pub fn from_settings(settings: &FetchSettings) -> Self {
        let chain = Self::new().with(HttpFetcher::new(settings.request_headers.clone()));
        #[cfg(not(target_arch = "wasm32"))]
        let chain = if settings.allow_file_urls {
            chain.with(FileFetcher)
        } else {
            chain
        };
        chain
    }

    #[must_use]
    pub fn with(mut self, fetcher: impl ByteFetcher + 'static) -> Self {
        self.strategies.push(Arc::new(fetcher));
        self
    }

    #[must_use]
    pub fn with_shared(mut self, fetcher: Arc<dyn ByteFetcher>) -> Self {
        self.strategies.push(fetcher);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub async fn fetch(&self, uri: &str) -> Result<FetchedBytes> {
        let mut first_error = None;
        for strategy in &self.strategies {
            match strategy.fetch(uri).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) => {
                    log::debug!("Fetch strategy '{}' failed for {uri}: {e}", strategy.name());
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| {
            load_failure(uri, LoadFailureKind::Transport("no fetch strategy configured".into()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Deny;

    impl ByteFetcher for Deny {
        fn name(&self) -> &str {
            "deny"
        }

        fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<FetchedBytes>> {
            Box::pin(async move { Err(load_failure(uri, LoadFailureKind::PermissionDenied)) })
        }
    }

    #[test]
    fn fallback_strategy_wins_after_denial() {
        let chain = FetchChain::new()
            .with(Deny)
            .with(StaticFetcher::new().with("https://cdn/a.bin", vec![1u8, 2, 3]));
        let fetched = futures::executor::block_on(chain.fetch("https://cdn/a.bin")).unwrap();
        assert_eq!(&*fetched.bytes, &[1, 2, 3]);
    }

    #[test]
    fn first_error_is_reported() {
        let chain = FetchChain::new().with(Deny).with(StaticFetcher::new());
        let err = futures::executor::block_on(chain.fetch("https://cdn/a.bin")).unwrap_err();
        assert_eq!(err.load_failure_kind(), Some(&LoadFailureKind::PermissionDenied));
    }

    #[test]
    fn local_read_shares_bytes() {
        let bytes: Arc<[u8]> = vec![7u8; 64].into();
        let source = ByteSource::local(Arc::clone(&bytes));
        let fetched = futures::executor::block_on(source.read(&FetchChain::new())).unwrap();
        assert!(Arc::ptr_eq(&fetched.bytes, &bytes));
    }

    #[test]
    fn empty_chain_is_transport_failure() {
        let err = futures::executor::block_on(FetchChain::new().fetch("x")).unwrap_err();
        assert!(matches!(err.load_failure_kind(), Some(LoadFailureKind::Transport(_))));
    }
}
