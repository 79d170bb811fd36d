use async_trait::async_trait;
use ccs_schemas::{CurrencyDescriptor, NetworkStatusSample};

use crate::{PersistenceError, PlanSummary};

/// A store that can stage a batch, read the state it needs, plan with the
/// engine and apply the plan atomically.
///
/// Implemented by the Postgres gateway and by [`crate::MemoryStore`].
#[async_trait]
pub trait SnapshotStore: Send {
    async fn reconcile_currencies(
        &mut self,
        batch: &[CurrencyDescriptor],
    ) -> Result<PlanSummary, PersistenceError>;

    async fn reconcile_network_status(
        &mut self,
        batch: &[NetworkStatusSample],
    ) -> Result<PlanSummary, PersistenceError>;
}
