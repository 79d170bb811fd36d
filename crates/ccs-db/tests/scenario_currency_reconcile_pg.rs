// Currency merge against Postgres: ALF scrypt -> same -> SHA-256.
//
// DB-backed test, skipped if CCS_DATABASE_URL is not set.

use anyhow::Result;
use ccs_db::PgGateway;
use ccs_reconcile::SnapshotStore;
use ccs_schemas::CurrencyDescriptor;
use sqlx::PgPool;
use uuid::Uuid;

async fn counts(pool: &PgPool, symbol: &str) -> Result<(i64, i64)> {
    let (live,): (i64,) = sqlx::query_as("select count(*)::bigint from currency where symbol = $1")
        .bind(symbol)
        .fetch_one(pool)
        .await?;
    let (hist,): (i64,) =
        sqlx::query_as("select count(*)::bigint from currency_historical where symbol = $1")
            .bind(symbol)
            .fetch_one(pool)
            .await?;
    Ok((live, hist))
}

#[tokio::test]
async fn currency_algo_change_archives_once_pg() -> Result<()> {
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

    // Unique symbol so reruns against the same DB start clean.
    let symbol = format!("T{}", &Uuid::new_v4().simple().to_string()[..10]);
    let scrypt = CurrencyDescriptor::new(symbol.clone(), "Alphacoin", "scrypt");
    let sha = CurrencyDescriptor::new(symbol.clone(), "Alphacoin", "SHA-256");

    let mut gw = PgGateway::new(pool.clone());

    gw.reconcile_currencies(&[scrypt.clone()]).await?;
    assert_eq!(counts(&pool, &symbol).await?, (1, 1));

    let s = gw.reconcile_currencies(&[scrypt.clone()]).await?;
    assert_eq!(counts(&pool, &symbol).await?, (1, 1));
    assert_eq!(s.currencies_updated + s.currencies_inserted + s.currencies_archived, 0);

    gw.reconcile_currencies(&[sha]).await?;
    assert_eq!(counts(&pool, &symbol).await?, (1, 2));

    let (algo,): (String,) = sqlx::query_as("select algo from currency where symbol = $1")
        .bind(&symbol)
        .fetch_one(&pool)
        .await?;
    assert_eq!(algo, "SHA-256");

    Ok(())
}
