//! Remote employee directory.
//!
//! [`RemoteDirectory`] is the seam the repository refreshes through.
//! [`HttpDirectory`] is the production implementation, speaking the plain
//! JSON dialect of the upstream directory service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::RemoteConfig;
use crate::employee::Employee;
use crate::error::{Result, SyncError};

/// Header carrying the optional API key.
const API_KEY_HEADER: &str = "x-api-key";

/// Source of truth for employee records.
///
/// Implementations classify failures into the [`SyncError`] taxonomy:
/// unreachable service or timeout is [`SyncError::Transport`], a response
/// that cannot be understood is [`SyncError::Protocol`], and a lookup for
/// an id the directory does not know is [`SyncError::NotFound`].
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Fetch every employee the directory knows about.
    async fn fetch_all(&self) -> Result<Vec<Employee>>;

    /// Fetch a single employee by id.
    async fn fetch_by_id(&self, id: u32) -> Result<Employee>;
}

fn employees_url(base: &str) -> String {
    format!("{}/api/v1/employees", base.trim_end_matches('/'))
}

fn employee_url(base: &str, id: u32) -> String {
    format!("{}/api/v1/employee/{}", base.trim_end_matches('/'), id)
}

/// Map a non-success status to the taxonomy. A 404 is only meaningful as
/// "no such employee" when the request was a single-id lookup.
fn status_error(status: StatusCode, url: &str, lookup: Option<u32>) -> SyncError {
    match (status, lookup) {
        (StatusCode::NOT_FOUND, Some(id)) => SyncError::NotFound(id),
        _ => SyncError::Protocol(format!("unexpected status {} from {}", status, url)),
    }
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8], url: &str) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| SyncError::Protocol(format!("bad payload from {}: {}", url, e)))
}

/// HTTP implementation of [`RemoteDirectory`].
///
/// One [`Client`] is built at construction and reused for every request,
/// carrying the configured timeout and connection pool.
pub struct HttpDirectory {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDirectory {
    /// Build a directory client from remote settings.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_bytes(&self, url: &str, lookup: Option<u32>) -> Result<Vec<u8>> {
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url, lookup));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl RemoteDirectory for HttpDirectory {
    async fn fetch_all(&self) -> Result<Vec<Employee>> {
        let url = employees_url(&self.base_url);
        let bytes = self.get_bytes(&url, None).await?;
        decode(&bytes, &url)
    }

    async fn fetch_by_id(&self, id: u32) -> Result<Employee> {
        let url = employee_url(&self.base_url, id);
        let bytes = self.get_bytes(&url, Some(id)).await?;
        decode(&bytes, &url)
    }
}
