//! ccs-db: Postgres persistence for the network-status scraper.
//!
//! - connection + embedded bootstrap schema
//! - `staging`: per-batch scratch tables (`with_isolated_staging`)
//! - `gateway`: `PgGateway`, the Postgres `SnapshotStore`

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod gateway;
mod staging;

pub use gateway::{execute_plan, PgGateway};
pub use staging::{with_isolated_staging, StagedBatch, StagingTable};

pub const ENV_DB_URL: &str = "CCS_DATABASE_URL";

/// Tables created by the bootstrap schema.
pub const TABLES: [&str; 4] = [
    "currency",
    "currency_historical",
    "network_status",
    "network_status_latest",
];

/// Connect to Postgres at `url`.
///
/// One connection: a run is a single sequential pipeline.
pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Connect to Postgres using CCS_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

/// Apply the embedded bootstrap schema. Safe to run repeatedly.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let mut missing_tables = Vec::new();
    for table in TABLES {
        let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
            r#"
            select exists (
                select 1
                from information_schema.tables
                where table_schema = 'public' and table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await
        .with_context(|| format!("status table-exists query failed for {table}"))?;
        if !exists {
            missing_tables.push(table);
        }
    }

    Ok(DbStatus {
        ok: one == 1,
        missing_tables,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub missing_tables: Vec<&'static str>,
}

impl DbStatus {
    pub fn has_schema(&self) -> bool {
        self.missing_tables.is_empty()
    }
}
