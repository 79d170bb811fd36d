//! ccs-reconcile
//!
//! Snapshot reconciliation for the scraper's two entity families.
//!
//! Given a staged batch and the persisted rows relevant to it, decide:
//! - which live currency rows are inserted or updated
//! - which currency triples are archived
//! - which network samples are archived (value-based dedup against Latest)
//! - what replaces the Latest view
//!
//! Deterministic, pure planning. Storage backends implement [`SnapshotStore`].

mod engine;
mod memory;
mod store;
mod types;

pub use engine::{reconcile_currencies, reconcile_network_status};
pub use memory::{MemoryStore, MemoryTables};
pub use store::SnapshotStore;
pub use types::*;
