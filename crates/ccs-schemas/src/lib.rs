//! Typed records shared by every ccs crate.
//!
//! These are the shapes that flow from the normalizer into the reconciler and
//! from the reconciler into the persistence gateway. No parsing, no IO.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Live descriptor of one coin, keyed by `symbol`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurrencyDescriptor {
    pub symbol: String,
    pub name: String,
    /// Mining algorithm as reported upstream (`algo`).
    pub algo: String,
}

impl CurrencyDescriptor {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, algo: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            algo: algo.into(),
        }
    }

    /// `true` when the mutable attributes differ from `other`.
    pub fn attributes_differ(&self, other: &CurrencyDescriptor) -> bool {
        self.name != other.name || self.algo != other.algo
    }
}

/// The value tuple of a network status sample.
///
/// Equality is value equality: decimals compare numerically (`1.0 == 1.00`) and
/// `None == None`. Two samples with equal metrics for the same symbol are the
/// same reading regardless of when they were scraped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub current_blocks: Option<i64>,
    pub difficulty: Option<Decimal>,
    pub reward: Option<Decimal>,
    pub hash_rate: Option<i64>,
    pub avg_hash_rate: Option<Decimal>,
}

/// One per-symbol reading taken during a single scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatusSample {
    pub symbol: String,
    pub scrape_time: DateTime<Utc>,
    pub metrics: NetworkMetrics,
}

impl NetworkStatusSample {
    pub fn new(symbol: impl Into<String>, scrape_time: DateTime<Utc>, metrics: NetworkMetrics) -> Self {
        Self {
            symbol: symbol.into(),
            scrape_time,
            metrics,
        }
    }
}
