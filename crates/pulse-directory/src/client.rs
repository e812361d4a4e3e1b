//! Credential directory client.
//!
//! The directory is an external service holding one record per project key.
//! The relay only ever reads it, exactly once per connection attempt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::DirectoryError;

/// One credential record as stored in the directory.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialRecord {
    /// Whether the key may be used at all. Inactive keys are rejected the
    /// same way unknown keys are.
    pub active: bool,
    /// Production-mode flag. When set together with [`Self::origin`], the
    /// gate enforces an origin-equality check at admission time.
    pub production: bool,
    /// Origin the key is registered to, if any.
    pub origin: Option<String>,
}

impl CredentialRecord {
    /// An active development-mode record (no origin constraint).
    #[must_use]
    pub fn development() -> Self {
        Self {
            active: true,
            production: false,
            origin: None,
        }
    }

    /// An active production-mode record bound to `origin`.
    #[must_use]
    pub fn production(origin: &str) -> Self {
        Self {
            active: true,
            production: true,
            origin: Some(origin.to_owned()),
        }
    }
}

/// Read-only seam to the external credential directory.
#[async_trait]
pub trait CredentialDirectory: Send + Sync {
    /// Fetch the record for `key`. `Ok(None)` means the key is unknown;
    /// `Err` means the lookup itself failed (I/O, bad response).
    async fn lookup(&self, key: &str) -> Result<Option<CredentialRecord>, DirectoryError>;
}

/// HTTP-backed directory client.
///
/// Looks up `GET {base_url}/v1/keys/{key}`. A 404 maps to "unknown key";
/// any other non-success status is a lookup failure.
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpDirectory {
    /// Build a client for the directory at `base_url` with the given
    /// request timeout.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        api_token: Option<String>,
    ) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_token,
        })
    }
}

#[async_trait]
impl CredentialDirectory for HttpDirectory {
    async fn lookup(&self, key: &str) -> Result<Option<CredentialRecord>, DirectoryError> {
        let url = format!("{}/v1/keys/{key}", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(key, "key not found in directory");
                Ok(None)
            }
            status if status.is_success() => {
                let record = response.json::<CredentialRecord>().await?;
                Ok(Some(record))
            }
            status => Err(DirectoryError::Status {
                status: status.as_u16(),
            }),
        }
    }
}

/// In-memory directory for tests and local development.
#[derive(Default)]
pub struct StaticDirectory {
    records: RwLock<HashMap<String, CredentialRecord>>,
    unavailable: AtomicBool,
}

impl StaticDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&self, key: &str, record: CredentialRecord) {
        let _ = self.records.write().insert(key.to_owned(), record);
    }

    /// Make every lookup fail, simulating a directory outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }
}

#[async_trait]
impl CredentialDirectory for StaticDirectory {
    async fn lookup(&self, key: &str) -> Result<Option<CredentialRecord>, DirectoryError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(DirectoryError::Unavailable("simulated outage".to_owned()));
        }
        Ok(self.records.read().get(key).cloned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn static_lookup_known_key() {
        let dir = StaticDirectory::new();
        dir.insert("proj1", CredentialRecord::development());
        let record = dir.lookup("proj1").await.unwrap().unwrap();
        assert!(record.active);
        assert!(!record.production);
    }

    #[tokio::test]
    async fn static_lookup_unknown_key() {
        let dir = StaticDirectory::new();
        assert!(dir.lookup("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn static_lookup_outage() {
        let dir = StaticDirectory::new();
        dir.insert("proj1", CredentialRecord::development());
        dir.set_unavailable(true);
        let err = dir.lookup("proj1").await.unwrap_err();
        assert_matches!(err, DirectoryError::Unavailable(_));

        dir.set_unavailable(false);
        assert!(dir.lookup("proj1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn http_lookup_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/keys/proj1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "active": true,
                "production": true,
                "origin": "https://app.example.com",
            })))
            .mount(&server)
            .await;

        let dir = HttpDirectory::new(&server.uri(), Duration::from_secs(2), None).unwrap();
        let record = dir.lookup("proj1").await.unwrap().unwrap();
        assert!(record.active);
        assert!(record.production);
        assert_eq!(record.origin.as_deref(), Some("https://app.example.com"));
    }

    #[tokio::test]
    async fn http_lookup_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/keys/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = HttpDirectory::new(&server.uri(), Duration::from_secs(2), None).unwrap();
        assert!(dir.lookup("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn http_lookup_server_error_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/keys/proj1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = HttpDirectory::new(&server.uri(), Duration::from_secs(2), None).unwrap();
        let err = dir.lookup("proj1").await.unwrap_err();
        assert_matches!(err, DirectoryError::Status { status: 500 });
    }

    #[tokio::test]
    async fn http_lookup_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/keys/proj1"))
            .and(bearer_token("secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "active": true })),
            )
            .mount(&server)
            .await;

        let dir = HttpDirectory::new(
            &server.uri(),
            Duration::from_secs(2),
            Some("secret".to_owned()),
        )
        .unwrap();
        assert!(dir.lookup("proj1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn http_base_url_trailing_slash() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/keys/k"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "active": false })),
            )
            .mount(&server)
            .await;

        let base = format!("{}/", server.uri());
        let dir = HttpDirectory::new(&base, Duration::from_secs(2), None).unwrap();
        let record = dir.lookup("k").await.unwrap().unwrap();
        assert!(!record.active);
    }

    #[test]
    fn record_defaults_are_inert() {
        let record: CredentialRecord = serde_json::from_str("{}").unwrap();
        assert!(!record.active);
        assert!(!record.production);
        assert!(record.origin.is_none());
    }

    #[test]
    fn record_camel_case_fields() {
        let json = serde_json::to_string(&CredentialRecord::production("https://a.example")).unwrap();
        assert!(json.contains("\"production\":true"));
        assert!(json.contains("\"origin\""));
    }
}
