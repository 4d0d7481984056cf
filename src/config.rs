//! Repository configuration.
//!
//! Everything needed to wire a repository: which backing store to open and
//! how to reach the remote directory. All types derive `serde`, so a config
//! file can carry a partial configuration and pick up defaults for the rest.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Directory service used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://dummy.restapiexample.com";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Identity of a backing store.
///
/// Doubles as the key for the shared-repository registry: two configs with
/// the same `StoreLocation` resolve to the same repository instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLocation {
    /// Volatile store, private to the process.
    #[default]
    InMemory,
    /// Durable SQLite store at the given path.
    Sqlite(PathBuf),
}

/// Settings for the remote employee directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the directory service.
    pub base_url: String,
    /// Optional API key, sent as an `x-api-key` header.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Full repository configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Backing store to open.
    pub store: StoreLocation,
    /// Remote directory settings.
    pub remote: RemoteConfig,
}

impl RosterConfig {
    /// Configuration backed by the in-memory store.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Configuration backed by a SQLite store at `path`.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreLocation::Sqlite(path.into()),
            ..Self::default()
        }
    }

    /// Point at a different directory service.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.remote.base_url = url.into();
        self
    }

    /// Attach an API key to every request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.remote.api_key = Some(key.into());
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.remote.timeout_secs = secs;
        self
    }
}
