use ccs_reconcile::*;
use ccs_schemas::CurrencyDescriptor;

fn counts(store: &MemoryStore) -> (usize, usize) {
    (
        store.tables().currency.len(),
        store.tables().currency_historical.len(),
    )
}

#[tokio::test]
async fn scenario_currency_algo_change_archives_once() {
    let mut store = MemoryStore::new();
    let scrypt = CurrencyDescriptor::new("ALF", "Alphacoin", "scrypt");
    let sha = CurrencyDescriptor::new("ALF", "Alphacoin", "SHA-256");

    store.reconcile_currencies(&[scrypt.clone()]).await.unwrap();
    assert_eq!(counts(&store), (1, 1));

    let s = store.reconcile_currencies(&[scrypt.clone()]).await.unwrap();
    assert_eq!(counts(&store), (1, 1));
    assert_eq!(s, PlanSummary::empty(EntityFamily::Currency));

    let s = store.reconcile_currencies(&[sha.clone()]).await.unwrap();
    assert_eq!(counts(&store), (1, 2));
    assert_eq!(s.currencies_updated, 1);
    assert_eq!(s.currencies_archived, 1);
    assert_eq!(store.tables().currency["ALF"], sha);
    assert_eq!(store.tables().currency_historical, vec![scrypt, sha]);
}

#[tokio::test]
async fn scenario_currency_reconcile_is_idempotent() {
    let batch = vec![
        CurrencyDescriptor::new("ALF", "Alphacoin", "scrypt"),
        CurrencyDescriptor::new("GLC", "GlobalCoin", "scrypt"),
        CurrencyDescriptor::new("BTC", "Bitcoin", "SHA-256"),
    ];
    let mut store = MemoryStore::new();

    store.reconcile_currencies(&batch).await.unwrap();
    let after_first = store.tables().clone();

    store.reconcile_currencies(&batch).await.unwrap();
    assert_eq!(store.tables(), &after_first);
}
