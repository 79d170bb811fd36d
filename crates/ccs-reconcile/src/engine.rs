use std::collections::{BTreeMap, BTreeSet};

use ccs_schemas::{CurrencyDescriptor, NetworkMetrics, NetworkStatusSample};

use crate::{CurrencyState, EntityFamily, LatestState, PlanStep, ReconciliationPlan};

/// Plan the currency merge for one staged batch.
///
/// - symbol live, name/algo differ -> update
/// - symbol not live -> insert
/// - (symbol, name, algo) never archived -> historical insert
///
/// Duplicate symbols in the batch: last occurrence wins for the live table;
/// every distinct triple is archived once.
pub fn reconcile_currencies(
    staged: &[CurrencyDescriptor],
    state: &CurrencyState,
) -> ReconciliationPlan {
    let mut latest_by_symbol: BTreeMap<&str, &CurrencyDescriptor> = BTreeMap::new();
    for c in staged {
        latest_by_symbol.insert(c.symbol.as_str(), c);
    }

    let mut updates = Vec::new();
    let mut inserts = Vec::new();
    for (symbol, incoming) in &latest_by_symbol {
        match state.live.get(*symbol) {
            Some(live) if live.attributes_differ(incoming) => updates.push((*incoming).clone()),
            Some(_) => {}
            None => inserts.push((*incoming).clone()),
        }
    }

    let mut seen: BTreeSet<&CurrencyDescriptor> = BTreeSet::new();
    let mut archive = Vec::new();
    for c in staged {
        if !state.historical.contains(c) && seen.insert(c) {
            archive.push(c.clone());
        }
    }

    let mut plan = ReconciliationPlan::new(EntityFamily::Currency);
    if !updates.is_empty() {
        plan.steps.push(PlanStep::UpdateCurrencies(updates));
    }
    if !inserts.is_empty() {
        plan.steps.push(PlanStep::InsertCurrencies(inserts));
    }
    if !archive.is_empty() {
        plan.steps.push(PlanStep::ArchiveCurrencies(archive));
    }
    plan
}

/// Plan the network-status merge for one staged batch.
///
/// A sample is archived when its metrics differ from what the symbol held
/// just before it: the Latest row, or an earlier sample of the same batch.
/// Samples are visited in `scrape_time` order, ties in batch order.
///
/// Latest is always replaced wholesale by the batch (last sample per symbol),
/// even when nothing is archived and even when the batch is empty.
pub fn reconcile_network_status(
    staged: &[NetworkStatusSample],
    state: &LatestState,
) -> ReconciliationPlan {
    let mut ordered: Vec<&NetworkStatusSample> = staged.iter().collect();
    ordered.sort_by_key(|s| s.scrape_time);

    let mut previous: BTreeMap<&str, &NetworkMetrics> = state
        .rows
        .iter()
        .map(|(symbol, s)| (symbol.as_str(), &s.metrics))
        .collect();

    let mut archive = Vec::new();
    let mut next_latest: BTreeMap<&str, &NetworkStatusSample> = BTreeMap::new();
    for s in ordered {
        if previous.get(s.symbol.as_str()) != Some(&&s.metrics) {
            archive.push(s.clone());
        }
        previous.insert(s.symbol.as_str(), &s.metrics);
        next_latest.insert(s.symbol.as_str(), s);
    }

    let mut plan = ReconciliationPlan::new(EntityFamily::NetworkStatus);
    if !archive.is_empty() {
        plan.steps.push(PlanStep::ArchiveNetworkStatus(archive));
    }
    plan.steps.push(PlanStep::ClearLatest);
    plan.steps.push(PlanStep::InsertLatest(
        next_latest.into_values().cloned().collect(),
    ));
    plan
}
