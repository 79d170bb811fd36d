//! coinchoose-style HTTP provider.
//!
//! `GET {base_url}/{path}?base={base}` returns a JSON array of per-symbol
//! objects. The body is handed back verbatim; parsing is the normalizer's job.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::provider::{FetchError, RawPayload, UpstreamProvider};

pub const DEFAULT_BASE_URL: &str = "http://www.coinchoose.com";
pub const DEFAULT_PATH: &str = "api.php";
pub const DEFAULT_BASE_CURRENCY: &str = "BTC";

#[derive(Debug, Clone)]
pub struct CoinChooseProvider {
    http: reqwest::Client,
    base_url: String,
    path: String,
    base: String,
}

impl CoinChooseProvider {
    pub fn new() -> Self {
        Self::new_with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn new_with_base_url(base_url: String) -> Self {
        Self::with_options(
            base_url,
            DEFAULT_PATH.to_string(),
            DEFAULT_BASE_CURRENCY.to_string(),
            Duration::from_secs(30),
        )
    }

    pub fn with_options(base_url: String, path: String, base: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url,
            path,
            base,
        }
    }

    fn build_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

impl Default for CoinChooseProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UpstreamProvider for CoinChooseProvider {
    fn name(&self) -> &'static str {
        "coinchoose"
    }

    async fn fetch_current(&self) -> Result<RawPayload, FetchError> {
        let url = self.build_url();
        info!(url = %url, base = %self.base, "issuing upstream request");

        let resp = self
            .http
            .get(&url)
            .query(&[("base", self.base.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                url,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        debug!(bytes = body.len(), "upstream response read");

        Ok(RawPayload {
            body,
            fetched_at: Utc::now(),
        })
    }
}
