use std::sync::Arc;

use serde::Deserialize;

use crate::errors::{Error, Result, StorageError};
use crate::settings::RemoteSettings;
use crate::storage::ModelRecord;
use crate::utils::BoxFuture;

/// Remote document + blob store. Every call is best-effort from the
/// library's point of view.
pub trait RemoteStore: Send + Sync {
    /// Uploads one blob and returns its durable URL.
    fn upload_blob<'a>(
        &'a self,
        path: &'a str,
        bytes: Arc<[u8]>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<String>>;

    fn create_record<'a>(&'a self, record: &'a ModelRecord) -> BoxFuture<'a, Result<()>>;

    /// Every record, in whatever order the backend returns them.
    fn list_records(&self) -> BoxFuture<'_, Result<Vec<ModelRecord>>>;

    fn delete_record<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>>;
}

#[derive(Deserialize)]
struct UploadReply {
    url: String,
}

fn remote_err(context: &str, e: impl std::fmt::Display) -> Error {
    StorageError::Remote(format!("{context}: {e}")).into()
}

/// JSON-over-HTTP remote store:
///
/// | Operation       | Request                        | Reply        |
/// |-----------------|--------------------------------|--------------|
/// | `upload_blob`   | `PUT {base}/blobs/{path}`      | `{"url": …}` |
/// | `create_record` | `POST {base}/records`          | any          |
/// | `list_records`  | `GET {base}/records`           | `[record…]`  |
/// | `delete_record` | `DELETE {base}/records/{id}`   | any          |
pub struct HttpRemoteStore {
    base: url::Url,
    auth_token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        let mut base = url::Url::parse(&settings.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            auth_token: settings.auth_token.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &url::Url {
        &self.base
    }

    /// Joins percent-encoded path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<String> {
        let relative = segments
            .iter()
            .flat_map(|segment| segment.split('/'))
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(self.base.join(&relative)?.to_string())
    }

    async fn send(&self, mut request: ehttp::Request) -> Result<ehttp::Response> {
        if let Some(token) = &self.auth_token {
            request.headers.insert("Authorization", format!("Bearer {token}"));
        }
        let method = request.method.clone();
        let url = request.url.clone();

        let response = ehttp::fetch_async(request)
            .await
            .map_err(|e| remote_err(&format!("{method:?} {url}"), e))?;

        if response.status == 404 {
            return Err(StorageError::NotFound(url).into());
        }
        if !response.ok {
            return Err(remote_err(
                &format!("{method:?} {url}"),
                format!("status {} {}", response.status, response.status_text),
            ));
        }
        Ok(response)
    }

    fn json_request(method: ehttp::Method, url: String, body: Vec<u8>) -> ehttp::Request {
        let mut request = ehttp::Request::post(url, body);
        request.method = method;
        request.headers.insert("Content-Type", "application/json");
        request
    }
}

impl RemoteStore for HttpRemoteStore {
    fn upload_blob<'a>(
        &'a self,
        path: &'a str,
        bytes: Arc<[u8]>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let url = self.endpoint(&["blobs", path])?;
            let mut request = ehttp::Request::post(url, bytes.to_vec());
            request.method = ehttp::Method::PUT;
            request.headers.insert("Content-Type", content_type);

            let response = self.send(request).await?;
            let reply: UploadReply = serde_json::from_slice(&response.bytes)
                .map_err(|e| remote_err("upload reply", e))?;
            log::debug!("Uploaded {path} ({} bytes)", bytes.len());
            Ok(reply.url)
        })
    }

    fn create_record<'a>(&'a self, record: &'a ModelRecord) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let url = self.endpoint(&["records"])?;
            let body = serde_json::to_vec(record)?;
            self.send(Self::json_request(ehttp::Method::POST, url, body)).await?;
            Ok(())
        })
    }

    fn list_records(&self) -> BoxFuture<'_, Result<Vec<ModelRecord>>> {
        Box::pin(async move {
            let url = self.endpoint(&["records"])?;
            let response = self.send(ehttp::Request::get(url)).await?;
            serde_json::from_slice(&response.bytes).map_err(|e| remote_err("record list", e))
        })
    }

    fn delete_record<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let url = self.endpoint(&["records", id])?;
            let mut request = ehttp::Request::get(url);
            request.method = ehttp::Method::DELETE;
            match self.send(request).await {
                Err(Error::Storage(StorageError::NotFound(_))) => {
                    Err(StorageError::NotFound(id.to_string()).into())
                }
                other => other.map(|_| ()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpRemoteStore {
        HttpRemoteStore::new(&RemoteSettings {
            base_url: base.to_string(),
            auth_token: None,
        })
        .unwrap()
    }

    #[test]
    fn base_gets_trailing_slash() {
        assert_eq!(store("https://x.test/api").base_url().as_str(), "https://x.test/api/");
    }

    #[test]
    fn endpoint_encodes_segments() {
        let store = store("https://x.test/api/");
        assert_eq!(
            store.endpoint(&["blobs", "abc/my duck.glb"]).unwrap(),
            "https://x.test/api/blobs/abc/my%20duck.glb"
        );
        assert_eq!(
            store.endpoint(&["records", "42"]).unwrap(),
            "https://x.test/api/records/42"
        );
    }
}
