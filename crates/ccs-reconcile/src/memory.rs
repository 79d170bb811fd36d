//! In-process store with the same plan semantics as the Postgres gateway.
//!
//! Plans are applied to a copy of the tables and swapped in only when every
//! step succeeds. Key and foreign-key checks mirror the SQL schema.

use std::collections::BTreeMap;

use async_trait::async_trait;
use ccs_schemas::{CurrencyDescriptor, NetworkStatusSample};

use crate::{
    engine, CurrencyState, LatestState, PersistenceError, PlanStep, PlanStepKind, PlanSummary,
    ReconciliationPlan, SnapshotStore,
};

/// The four relations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryTables {
    pub currency: BTreeMap<String, CurrencyDescriptor>,
    pub currency_historical: Vec<CurrencyDescriptor>,
    pub network_status: Vec<NetworkStatusSample>,
    pub network_status_latest: BTreeMap<String, NetworkStatusSample>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: MemoryTables,
    fail_on: Option<PlanStepKind>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next plan that contains a step of `kind`, at that step.
    pub fn fail_on(mut self, kind: PlanStepKind) -> Self {
        self.fail_on = Some(kind);
        self
    }

    pub fn set_fail_on(&mut self, kind: Option<PlanStepKind>) {
        self.fail_on = kind;
    }

    pub fn tables(&self) -> &MemoryTables {
        &self.tables
    }

    pub fn currency_state(&self) -> CurrencyState {
        CurrencyState {
            live: self.tables.currency.clone(),
            historical: self.tables.currency_historical.iter().cloned().collect(),
        }
    }

    pub fn latest_state(&self) -> LatestState {
        LatestState {
            rows: self.tables.network_status_latest.clone(),
        }
    }

    /// Apply every step or none.
    pub fn apply(&mut self, plan: &ReconciliationPlan) -> Result<PlanSummary, PersistenceError> {
        let mut work = self.tables.clone();
        for step in &plan.steps {
            if self.fail_on == Some(step.kind()) {
                self.fail_on = None;
                return Err(PersistenceError::Injected(step.kind()));
            }
            apply_step(&mut work, step)?;
        }
        self.tables = work;
        Ok(plan.summary())
    }
}

fn constraint(step: PlanStepKind, message: String) -> PersistenceError {
    PersistenceError::Constraint { step, message }
}

fn require_currency(
    t: &MemoryTables,
    step: PlanStepKind,
    symbol: &str,
) -> Result<(), PersistenceError> {
    if t.currency.contains_key(symbol) {
        Ok(())
    } else {
        Err(constraint(
            step,
            format!("symbol '{symbol}' not present in currency"),
        ))
    }
}

fn apply_step(t: &mut MemoryTables, step: &PlanStep) -> Result<(), PersistenceError> {
    let kind = step.kind();
    match step {
        PlanStep::UpdateCurrencies(rows) => {
            for row in rows {
                match t.currency.get_mut(&row.symbol) {
                    Some(live) => *live = row.clone(),
                    None => {
                        return Err(PersistenceError::Operation {
                            step: kind,
                            message: format!("no live row for '{}'", row.symbol),
                        })
                    }
                }
            }
        }
        PlanStep::InsertCurrencies(rows) => {
            for row in rows {
                if t.currency.contains_key(&row.symbol) {
                    return Err(constraint(
                        kind,
                        format!("duplicate key currency.symbol='{}'", row.symbol),
                    ));
                }
                t.currency.insert(row.symbol.clone(), row.clone());
            }
        }
        PlanStep::ArchiveCurrencies(rows) => {
            for row in rows {
                require_currency(t, kind, &row.symbol)?;
                t.currency_historical.push(row.clone());
            }
        }
        PlanStep::ArchiveNetworkStatus(rows) => {
            for row in rows {
                require_currency(t, kind, &row.symbol)?;
                t.network_status.push(row.clone());
            }
        }
        PlanStep::ClearLatest => t.network_status_latest.clear(),
        PlanStep::InsertLatest(rows) => {
            for row in rows {
                require_currency(t, kind, &row.symbol)?;
                if t.network_status_latest.contains_key(&row.symbol) {
                    return Err(constraint(
                        kind,
                        format!("duplicate key network_status_latest.symbol='{}'", row.symbol),
                    ));
                }
                t.network_status_latest
                    .insert(row.symbol.clone(), row.clone());
            }
        }
    }
    Ok(())
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn reconcile_currencies(
        &mut self,
        batch: &[CurrencyDescriptor],
    ) -> Result<PlanSummary, PersistenceError> {
        let plan = engine::reconcile_currencies(batch, &self.currency_state());
        self.apply(&plan)
    }

    async fn reconcile_network_status(
        &mut self,
        batch: &[NetworkStatusSample],
    ) -> Result<PlanSummary, PersistenceError> {
        let plan = engine::reconcile_network_status(batch, &self.latest_state());
        self.apply(&plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_plan_leaves_tables_untouched() {
        let mut store = MemoryStore::new();
        let plan = ReconciliationPlan {
            family: crate::EntityFamily::Currency,
            steps: vec![
                PlanStep::InsertCurrencies(vec![CurrencyDescriptor::new("ALF", "Alphacoin", "scrypt")]),
                PlanStep::ArchiveCurrencies(vec![CurrencyDescriptor::new("ZZZ", "Ghost", "x")]),
            ],
        };

        let err = store.apply(&plan).unwrap_err();
        assert!(matches!(err, PersistenceError::Constraint { step: PlanStepKind::ArchiveCurrencies, .. }));
        assert_eq!(store.tables(), &MemoryTables::default());
    }

    #[test]
    fn injected_failure_fires_once() {
        let mut store = MemoryStore::new().fail_on(PlanStepKind::ClearLatest);
        let plan = ReconciliationPlan {
            family: crate::EntityFamily::NetworkStatus,
            steps: vec![PlanStep::ClearLatest, PlanStep::InsertLatest(vec![])],
        };
        assert_eq!(
            store.apply(&plan).unwrap_err(),
            PersistenceError::Injected(PlanStepKind::ClearLatest)
        );
        assert!(store.apply(&plan).is_ok());
    }
}
