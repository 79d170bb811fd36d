//! Upstream boundary for the network-status scrape.
//!
//! This module defines the raw payload type, the provider trait and the
//! error a provider may return. The concrete HTTP provider lives in
//! `coinchoose.rs`; request spacing lives in `pacer.rs`.

use std::fmt;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Raw payload
// ---------------------------------------------------------------------------

/// One response body exactly as the upstream API returned it.
///
/// The body is kept verbatim so it can be archived byte-for-byte before any
/// parsing happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub body: String,
    /// Instant the response was received; used as the scrape timestamp.
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that an [`UpstreamProvider`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network or transport failure (DNS, connect, timeout).
    Transport(String),
    /// The upstream answered with a non-success HTTP status.
    Status { code: u16, url: String },
    /// The response body could not be read.
    Body(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "fetch transport error: {msg}"),
            FetchError::Status { code, url } => {
                write!(f, "could not process request to {url}: received status code {code}")
            }
            FetchError::Body(msg) => write!(f, "fetch body read error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Upstream market/network data provider contract.
///
/// Implementations issue exactly one request per call and never retry;
/// spacing between calls is the caller's concern (see [`crate::pacer`]).
#[async_trait::async_trait]
pub trait UpstreamProvider: Send + Sync {
    /// Short name identifying this provider in logs (e.g. `"coinchoose"`).
    fn name(&self) -> &'static str;

    /// Fetch the latest per-symbol snapshot.
    async fn fetch_current(&self) -> Result<RawPayload, FetchError>;
}
