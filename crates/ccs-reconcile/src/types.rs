use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ccs_schemas::{CurrencyDescriptor, NetworkStatusSample};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Persisted state, as seen by the engine
// ---------------------------------------------------------------------------

/// Currency rows relevant to one batch.
///
/// The gateway may load only the rows that share a symbol (live) or a full
/// triple (historical) with the staged batch; the engine never needs more.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CurrencyState {
    /// symbol -> live descriptor
    pub live: BTreeMap<String, CurrencyDescriptor>,
    /// Every archived (symbol, name, algo) triple.
    pub historical: BTreeSet<CurrencyDescriptor>,
}

impl CurrencyState {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Latest-view rows relevant to one batch, keyed by symbol.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LatestState {
    pub rows: BTreeMap<String, NetworkStatusSample>,
}

impl LatestState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: impl IntoIterator<Item = NetworkStatusSample>) -> Self {
        Self {
            rows: samples
                .into_iter()
                .map(|s| (s.symbol.clone(), s))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityFamily {
    Currency,
    NetworkStatus,
}

impl EntityFamily {
    /// Live table the family stages against.
    pub fn target_table(self) -> &'static str {
        match self {
            EntityFamily::Currency => "currency",
            EntityFamily::NetworkStatus => "network_status_latest",
        }
    }
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityFamily::Currency => f.write_str("currency"),
            EntityFamily::NetworkStatus => f.write_str("network_status"),
        }
    }
}

/// One planned storage operation and the rows it carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanStep {
    /// Overwrite name/algo of existing live currency rows.
    UpdateCurrencies(Vec<CurrencyDescriptor>),
    /// Insert currency rows whose symbol is not yet live.
    InsertCurrencies(Vec<CurrencyDescriptor>),
    /// Append unseen (symbol, name, algo) triples to `currency_historical`.
    ArchiveCurrencies(Vec<CurrencyDescriptor>),
    /// Append changed samples to `network_status`.
    ArchiveNetworkStatus(Vec<NetworkStatusSample>),
    /// Delete every row of `network_status_latest`.
    ClearLatest,
    /// Insert the batch's samples into `network_status_latest`.
    InsertLatest(Vec<NetworkStatusSample>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepKind {
    UpdateCurrencies,
    InsertCurrencies,
    ArchiveCurrencies,
    ArchiveNetworkStatus,
    ClearLatest,
    InsertLatest,
}

impl fmt::Display for PlanStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanStepKind::UpdateCurrencies => "update_currencies",
            PlanStepKind::InsertCurrencies => "insert_currencies",
            PlanStepKind::ArchiveCurrencies => "archive_currencies",
            PlanStepKind::ArchiveNetworkStatus => "archive_network_status",
            PlanStepKind::ClearLatest => "clear_latest",
            PlanStepKind::InsertLatest => "insert_latest",
        };
        f.write_str(s)
    }
}

impl PlanStep {
    pub fn kind(&self) -> PlanStepKind {
        match self {
            PlanStep::UpdateCurrencies(_) => PlanStepKind::UpdateCurrencies,
            PlanStep::InsertCurrencies(_) => PlanStepKind::InsertCurrencies,
            PlanStep::ArchiveCurrencies(_) => PlanStepKind::ArchiveCurrencies,
            PlanStep::ArchiveNetworkStatus(_) => PlanStepKind::ArchiveNetworkStatus,
            PlanStep::ClearLatest => PlanStepKind::ClearLatest,
            PlanStep::InsertLatest(_) => PlanStepKind::InsertLatest,
        }
    }

    /// Rows carried by the step (0 for `ClearLatest`).
    pub fn row_count(&self) -> usize {
        match self {
            PlanStep::UpdateCurrencies(rows)
            | PlanStep::InsertCurrencies(rows)
            | PlanStep::ArchiveCurrencies(rows) => rows.len(),
            PlanStep::ArchiveNetworkStatus(rows) | PlanStep::InsertLatest(rows) => rows.len(),
            PlanStep::ClearLatest => 0,
        }
    }
}

/// Ordered operations for one entity family. Applied as one atomic unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub family: EntityFamily,
    pub steps: Vec<PlanStep>,
}

impl ReconciliationPlan {
    pub fn new(family: EntityFamily) -> Self {
        Self {
            family,
            steps: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, kind: PlanStepKind) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.kind() == kind)
    }

    pub fn summary(&self) -> PlanSummary {
        let mut out = PlanSummary::empty(self.family);
        for step in &self.steps {
            let n = step.row_count();
            match step.kind() {
                PlanStepKind::UpdateCurrencies => out.currencies_updated += n,
                PlanStepKind::InsertCurrencies => out.currencies_inserted += n,
                PlanStepKind::ArchiveCurrencies => out.currencies_archived += n,
                PlanStepKind::ArchiveNetworkStatus => out.network_archived += n,
                PlanStepKind::ClearLatest => out.latest_replaced = true,
                PlanStepKind::InsertLatest => out.latest_inserted += n,
            }
        }
        out
    }
}

/// Row counters of an applied plan, for logs and CLI output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub family: Option<EntityFamily>,
    pub currencies_updated: usize,
    pub currencies_inserted: usize,
    pub currencies_archived: usize,
    pub network_archived: usize,
    pub latest_replaced: bool,
    pub latest_inserted: usize,
}

impl PlanSummary {
    pub fn empty(family: EntityFamily) -> Self {
        Self {
            family: Some(family),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Storage failure while staging, reading state, or applying a plan.
///
/// Whenever one of these surfaces from a plan, nothing of that plan is visible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistenceError {
    /// No usable connection.
    Connect(String),
    /// Creating, filling or dropping the staging table failed.
    Staging(String),
    /// Reading current state failed.
    Read(String),
    /// A plan step failed for a reason other than a constraint.
    Operation { step: PlanStepKind, message: String },
    /// A plan step violated a key or foreign-key constraint.
    Constraint { step: PlanStepKind, message: String },
    /// BEGIN / COMMIT failed.
    Transaction(String),
    /// Failure injected by a test store.
    Injected(PlanStepKind),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Connect(msg) => write!(f, "persistence connect error: {msg}"),
            PersistenceError::Staging(msg) => write!(f, "persistence staging error: {msg}"),
            PersistenceError::Read(msg) => write!(f, "persistence read error: {msg}"),
            PersistenceError::Operation { step, message } => {
                write!(f, "persistence error in {step}: {message}")
            }
            PersistenceError::Constraint { step, message } => {
                write!(f, "constraint violation in {step}: {message}")
            }
            PersistenceError::Transaction(msg) => {
                write!(f, "persistence transaction error: {msg}")
            }
            PersistenceError::Injected(step) => write!(f, "injected failure in {step}"),
        }
    }
}

impl std::error::Error for PersistenceError {}
