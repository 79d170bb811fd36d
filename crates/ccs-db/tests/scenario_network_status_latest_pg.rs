// Network status merge against Postgres: value dedup, null handling,
// full Latest replacement.
//
// DB-backed test, skipped if CCS_DATABASE_URL is not set.
// Latest is a global table, so every Latest assertion lives in one test.

use std::str::FromStr;

use anyhow::Result;
use ccs_db::PgGateway;
use ccs_reconcile::SnapshotStore;
use ccs_schemas::{CurrencyDescriptor, NetworkMetrics, NetworkStatusSample};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_389_513_600 + secs, 0).unwrap()
}

fn metrics(blocks: Option<i64>) -> NetworkMetrics {
    NetworkMetrics {
        current_blocks: blocks,
        difficulty: Some(Decimal::from_str("1.52109832").unwrap()),
        reward: Some(Decimal::from(50)),
        hash_rate: Some(10_308_452),
        avg_hash_rate: Some(Decimal::from_str("10308452.0000").unwrap()),
    }
}

async fn history_rows(pool: &PgPool, symbol: &str) -> Result<i64> {
    let (n,): (i64,) =
        sqlx::query_as("select count(*)::bigint from network_status where symbol = $1")
            .bind(symbol)
            .fetch_one(pool)
            .await?;
    Ok(n)
}

async fn latest_symbols(pool: &PgPool) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("select symbol from network_status_latest order by symbol")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(s,)| s).collect())
}

#[tokio::test]
async fn network_status_dedup_and_latest_replacement_pg() -> Result<()> {
    let url = match std::env::var(ccs_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: CCS_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;
    ccs_db::migrate(&pool).await?;

    let tag = Uuid::new_v4().simple().to_string();
    let a = format!("A{}", &tag[..10]);
    let b = format!("B{}", &tag[..10]);

    let mut gw = PgGateway::new(pool.clone());
    gw.reconcile_currencies(&[
        CurrencyDescriptor::new(a.clone(), "Alpha", "scrypt"),
        CurrencyDescriptor::new(b.clone(), "Beta", "scrypt"),
    ])
    .await?;

    // First sighting of both symbols; b has a null block height.
    gw.reconcile_network_status(&[
        NetworkStatusSample::new(a.clone(), t(0), metrics(Some(655_258))),
        NetworkStatusSample::new(b.clone(), t(0), metrics(None)),
    ])
    .await?;
    assert_eq!(history_rows(&pool, &a).await?, 1);
    assert_eq!(history_rows(&pool, &b).await?, 1);
    let mut expected = vec![a.clone(), b.clone()];
    expected.sort();
    assert_eq!(latest_symbols(&pool).await?, expected);

    let (blocks,): (Option<i64>,) =
        sqlx::query_as("select current_blocks from network_status_latest where symbol = $1")
            .bind(&b)
            .fetch_one(&pool)
            .await?;
    assert_eq!(blocks, None);

    // Same values later (numeric scale differs for avg hash): nothing archived,
    // null == null for b.
    let mut same_a = metrics(Some(655_258));
    same_a.avg_hash_rate = Some(Decimal::from(10_308_452));
    let s = gw
        .reconcile_network_status(&[
            NetworkStatusSample::new(a.clone(), t(60), same_a),
            NetworkStatusSample::new(b.clone(), t(60), metrics(None)),
        ])
        .await?;
    assert_eq!(s.network_archived, 0);
    assert_eq!(history_rows(&pool, &a).await?, 1);
    assert_eq!(history_rows(&pool, &b).await?, 1);

    // Smaller batch with a change: one archive row, Latest holds only a.
    gw.reconcile_network_status(&[NetworkStatusSample::new(
        a.clone(),
        t(120),
        metrics(Some(655_259)),
    )])
    .await?;
    assert_eq!(history_rows(&pool, &a).await?, 2);
    assert_eq!(latest_symbols(&pool).await?, vec![a.clone()]);

    let (at,): (DateTime<Utc>,) =
        sqlx::query_as("select scrape_time from network_status_latest where symbol = $1")
            .bind(&a)
            .fetch_one(&pool)
            .await?;
    assert_eq!(at, t(120));

    Ok(())
}
