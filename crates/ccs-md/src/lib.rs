//! ccs-md: upstream data ingestion for the network-status scraper.
//!
//! - `provider`: raw payload, `FetchError`, `UpstreamProvider` trait
//! - `coinchoose`: HTTP provider for `api.php?base=BTC`
//! - `pacer`: fixed minimum spacing between upstream requests
//! - `archive`: raw body archive written before parsing
//! - `normalizer`: raw JSON -> typed records, `ParseError`

pub mod archive;
pub mod coinchoose;
pub mod normalizer;
pub mod pacer;
pub mod provider;

pub use archive::RawArchive;
pub use coinchoose::CoinChooseProvider;
pub use normalizer::{normalize_currencies, normalize_network_status, ParseError};
pub use pacer::{paced_fetch, RequestPacer, DEFAULT_MIN_INTERVAL};
pub use provider::{FetchError, RawPayload, UpstreamProvider};
