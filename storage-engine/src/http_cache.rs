use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use std::time::Duration;
use tracing::debug;
use vakit::CacheKey;
use vakit::ports::CacheBackend;

#[derive(Serialize)]
struct PutValueRequest<'a> {
    value: &'a str,
    ttl_ms: u64,
}

#[derive(Deserialize)]
struct GetValueResponse {
    found: bool,
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct PutValueResponse {
    ok: bool,
}

#[derive(Deserialize)]
struct DeleteValueResponse {
    deleted: bool,
}

/// Cache backend living in a remote key-value service reached over HTTP
/// (`GET|PUT|DELETE {base}/cache/{cache_name}/{key}`).
#[derive(Clone, Debug)]
pub struct HttpCache {
    client: Client,
    base_url: Url,
    cache_name: String,
}

impl HttpCache {
    pub fn new(base_url: &str, cache_name: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::InvalidConfig(format!("cache url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "cache url '{}' cannot be a base url",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            cache_name: cache_name.into(),
        })
    }

    /// `{base}/cache/{cache_name}/{key}`, the key escaped as one path segment
    fn entry_url(&self, key: &CacheKey) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("cache")
                .push(&self.cache_name)
                .push(key.as_str());
        }
        url
    }
}

fn unavailable(op: &str, e: reqwest::Error) -> Error {
    Error::BackendUnavailable(format!("{} failed: {}", op, e))
}

fn unexpected_status(op: &str, status: StatusCode) -> Error {
    Error::BackendUnavailable(format!("{} returned status {}", op, status))
}

#[async_trait]
impl CacheBackend for HttpCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        let response = self
            .client
            .get(self.entry_url(key))
            .send()
            .await
            .map_err(|e| unavailable("get", e))?;

        if !response.status().is_success() {
            return Err(unexpected_status("get", response.status()));
        }

        let body: GetValueResponse = response.json().await.map_err(|e| unavailable("get", e))?;
        if body.found {
            Ok(Some(Bytes::from(body.value)))
        } else {
            debug!(key = %key, "Remote cache has no entry");
            Ok(None)
        }
    }

    async fn put(&self, key: &CacheKey, value: Bytes) -> Result<()> {
        let value = std::str::from_utf8(&value)
            .map_err(|e| Error::Internal(format!("cache payload is not utf-8: {}", e)))?;

        let response = self
            .client
            .put(self.entry_url(key))
            .json(&PutValueRequest { value, ttl_ms: 0 })
            .send()
            .await
            .map_err(|e| unavailable("put", e))?;

        if !response.status().is_success() {
            return Err(unexpected_status("put", response.status()));
        }

        let body: PutValueResponse = response.json().await.map_err(|e| unavailable("put", e))?;
        if body.ok {
            Ok(())
        } else {
            Err(Error::BackendUnavailable("put was not acknowledged".into()))
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let response = self
            .client
            .delete(self.entry_url(key))
            .send()
            .await
            .map_err(|e| unavailable("delete", e))?;

        if !response.status().is_success() {
            return Err(unexpected_status("delete", response.status()));
        }

        let body: DeleteValueResponse =
            response.json().await.map_err(|e| unavailable("delete", e))?;
        Ok(body.deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn countries_key() -> CacheKey {
        CacheKey::derive("/ulkeler", std::iter::empty::<(&str, &str)>())
    }

    fn backend(server: &MockServer) -> HttpCache {
        HttpCache::new(&server.uri(), "vakit", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_get_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache/vakit/ulkeler"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "found": true,
                "value": r#"[{"UlkeID":"2"}]"#,
                "ttl_ms_remaining": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let value = backend(&server).get(&countries_key()).await.unwrap();
        assert_eq!(value, Some(Bytes::from(r#"[{"UlkeID":"2"}]"#)));
    }

    #[tokio::test]
    async fn test_get_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache/vakit/ulkeler"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"found": false, "ttl_ms_remaining": 0})),
            )
            .mount(&server)
            .await;

        assert!(backend(&server).get(&countries_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_is_escaped_as_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache/vakit/vakitler%3Fsaat=2&sehir=9541"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"found": false})))
            .expect(1)
            .mount(&server)
            .await;

        let key = CacheKey::derive("/vakitler", [("sehir", "9541"), ("saat", "2")]);
        assert!(backend(&server).get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = backend(&server).get(&countries_key()).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_named_cache_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = backend(&server)
            .put(&countries_key(), Bytes::from_static(b"[]"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let cache = HttpCache::new(&uri, "vakit", Duration::from_millis(500)).unwrap();
        let err = cache.get(&countries_key()).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_put_sends_value_without_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cache/vakit/ulkeler"))
            .and(body_json(json!({"value": "[]", "ttl_ms": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server)
            .put(&countries_key(), Bytes::from_static(b"[]"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/cache/vakit/ulkeler"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
            .mount(&server)
            .await;

        assert!(backend(&server).delete(&countries_key()).await.unwrap());
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpCache::new("not a url", "vakit", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
