use ccs_reconcile::*;
use ccs_schemas::{CurrencyDescriptor, NetworkMetrics, NetworkStatusSample};
use chrono::Utc;

#[tokio::test]
async fn scenario_failure_during_currency_archive_rolls_back_inserts() {
    let mut store = MemoryStore::new().fail_on(PlanStepKind::ArchiveCurrencies);

    let err = store
        .reconcile_currencies(&[CurrencyDescriptor::new("ALF", "Alphacoin", "scrypt")])
        .await
        .unwrap_err();

    assert_eq!(err, PersistenceError::Injected(PlanStepKind::ArchiveCurrencies));
    assert!(store.tables().currency.is_empty());
    assert!(store.tables().currency_historical.is_empty());
}

#[tokio::test]
async fn scenario_failure_between_latest_clear_and_insert_keeps_old_latest() {
    let mut store = MemoryStore::new();
    store
        .reconcile_currencies(&[CurrencyDescriptor::new("ALF", "Alphacoin", "scrypt")])
        .await
        .unwrap();
    let first = NetworkStatusSample::new(
        "ALF",
        Utc::now(),
        NetworkMetrics {
            current_blocks: Some(1),
            ..NetworkMetrics::default()
        },
    );
    store.reconcile_network_status(&[first.clone()]).await.unwrap();
    let before = store.tables().clone();

    store.set_fail_on(Some(PlanStepKind::InsertLatest));
    let mut second = first;
    second.metrics.current_blocks = Some(2);
    let err = store.reconcile_network_status(&[second]).await.unwrap_err();

    assert_eq!(err, PersistenceError::Injected(PlanStepKind::InsertLatest));
    assert_eq!(store.tables(), &before);
}
