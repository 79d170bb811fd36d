use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Typed view of the merged config. Every section and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeConfig {
    pub upstream: UpstreamConfig,
    pub pacing: PacingConfig,
    pub archive: ArchiveConfig,
    pub db: DbConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub path: String,
    /// Quote currency passed as `?base=`.
    pub base: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://www.coinchoose.com".to_string(),
            path: "api.php".to_string(),
            base: "BTC".to_string(),
            timeout_secs: 30,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingConfig {
    pub min_interval_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 2000,
        }
    }
}

impl PacingConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    /// NAME of the env var holding the connection URL. Never the URL itself.
    pub url_env: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url_env: "CCS_DATABASE_URL".to_string(),
        }
    }
}
