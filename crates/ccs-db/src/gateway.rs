//! Postgres-backed `SnapshotStore`.
//!
//! One reconciliation = one transaction:
//! BEGIN -> stage batch -> read relevant state through the staging table ->
//! plan (ccs-reconcile engine) -> apply steps -> COMMIT.
//! Any error drops the transaction, which rolls everything back.

use async_trait::async_trait;
use ccs_reconcile::{
    reconcile_currencies, reconcile_network_status, CurrencyState, LatestState, PersistenceError,
    PlanStep, PlanStepKind, PlanSummary, ReconciliationPlan, SnapshotStore,
};
use ccs_schemas::{CurrencyDescriptor, NetworkMetrics, NetworkStatusSample};
use sqlx::{PgConnection, PgPool, Row};
use tracing::{debug, info};

use crate::staging::{with_isolated_staging, StagedBatch, StagingTable};

#[derive(Debug, Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SnapshotStore for PgGateway {
    async fn reconcile_currencies(
        &mut self,
        batch: &[CurrencyDescriptor],
    ) -> Result<PlanSummary, PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;

        let state = with_isolated_staging(&mut *tx, StagedBatch::Currencies(batch), |conn, stg| {
            Box::pin(read_currency_state(conn, stg))
        })
        .await?;

        let plan = reconcile_currencies(batch, &state);
        apply_steps(&mut *tx, &plan).await?;
        tx.commit().await.map_err(tx_err)?;

        let summary = plan.summary();
        info!(
            staged = batch.len(),
            updated = summary.currencies_updated,
            inserted = summary.currencies_inserted,
            archived = summary.currencies_archived,
            "currency reconciliation committed"
        );
        Ok(summary)
    }

    async fn reconcile_network_status(
        &mut self,
        batch: &[NetworkStatusSample],
    ) -> Result<PlanSummary, PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;

        let state = with_isolated_staging(&mut *tx, StagedBatch::NetworkStatus(batch), |conn, stg| {
            Box::pin(read_latest_state(conn, stg))
        })
        .await?;

        let plan = reconcile_network_status(batch, &state);
        apply_steps(&mut *tx, &plan).await?;
        tx.commit().await.map_err(tx_err)?;

        let summary = plan.summary();
        info!(
            staged = batch.len(),
            archived = summary.network_archived,
            latest = summary.latest_inserted,
            "network status reconciliation committed"
        );
        Ok(summary)
    }
}

/// Apply `plan` in its own transaction. All steps commit or none do.
pub async fn execute_plan(
    pool: &PgPool,
    plan: &ReconciliationPlan,
) -> Result<PlanSummary, PersistenceError> {
    let mut tx = pool.begin().await.map_err(tx_err)?;
    apply_steps(&mut *tx, plan).await?;
    tx.commit().await.map_err(tx_err)?;
    Ok(plan.summary())
}

// ---------------------------------------------------------------------------
// State reads (joined against staging)
// ---------------------------------------------------------------------------

async fn read_currency_state(
    conn: &mut PgConnection,
    stg: &StagingTable,
) -> Result<CurrencyState, PersistenceError> {
    let live_sql = format!(
        r#"
        select c.symbol, c.name, c.algo
        from currency c
        where c.symbol in (select s.symbol from {} s)
        "#,
        stg.name()
    );
    let hist_sql = format!(
        r#"
        select distinct h.symbol, h.name, h.algo
        from currency_historical h
        join {} s on s.symbol = h.symbol and s.name = h.name and s.algo = h.algo
        "#,
        stg.name()
    );

    let mut state = CurrencyState::empty();

    let rows = sqlx::query(&live_sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(read_err)?;
    for r in rows {
        let c = currency_from_row(&r)?;
        state.live.insert(c.symbol.clone(), c);
    }

    let rows = sqlx::query(&hist_sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(read_err)?;
    for r in rows {
        state.historical.insert(currency_from_row(&r)?);
    }

    debug!(
        live = state.live.len(),
        historical = state.historical.len(),
        "currency state read"
    );
    Ok(state)
}

async fn read_latest_state(
    conn: &mut PgConnection,
    stg: &StagingTable,
) -> Result<LatestState, PersistenceError> {
    let sql = format!(
        r#"
        select l.symbol, l.scrape_time, l.current_blocks, l.difficulty, l.reward,
               l.hash_rate, l.avg_hash_rate
        from network_status_latest l
        where l.symbol in (select s.symbol from {} s)
        "#,
        stg.name()
    );

    let rows = sqlx::query(&sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(read_err)?;

    let mut samples = Vec::with_capacity(rows.len());
    for r in rows {
        samples.push(NetworkStatusSample {
            symbol: r.try_get("symbol").map_err(read_err)?,
            scrape_time: r.try_get("scrape_time").map_err(read_err)?,
            metrics: NetworkMetrics {
                current_blocks: r.try_get("current_blocks").map_err(read_err)?,
                difficulty: r.try_get("difficulty").map_err(read_err)?,
                reward: r.try_get("reward").map_err(read_err)?,
                hash_rate: r.try_get("hash_rate").map_err(read_err)?,
                avg_hash_rate: r.try_get("avg_hash_rate").map_err(read_err)?,
            },
        });
    }

    debug!(latest = samples.len(), "latest state read");
    Ok(LatestState::from_samples(samples))
}

fn currency_from_row(r: &sqlx::postgres::PgRow) -> Result<CurrencyDescriptor, PersistenceError> {
    Ok(CurrencyDescriptor {
        symbol: r.try_get("symbol").map_err(read_err)?,
        name: r.try_get("name").map_err(read_err)?,
        algo: r.try_get("algo").map_err(read_err)?,
    })
}

// ---------------------------------------------------------------------------
// Plan application
// ---------------------------------------------------------------------------

async fn apply_steps(
    conn: &mut PgConnection,
    plan: &ReconciliationPlan,
) -> Result<(), PersistenceError> {
    for step in &plan.steps {
        let kind = step.kind();
        apply_step(&mut *conn, step)
            .await
            .map_err(|e| step_err(kind, e))?;
        debug!(family = %plan.family, step = %kind, rows = step.row_count(), "plan step applied");
    }
    Ok(())
}

async fn apply_step(conn: &mut PgConnection, step: &PlanStep) -> Result<(), sqlx::Error> {
    match step {
        PlanStep::UpdateCurrencies(rows) => {
            for c in rows {
                sqlx::query(
                    r#"
                    update currency
                    set name = $2, algo = $3, db_update_time = now()
                    where symbol = $1
                    "#,
                )
                .bind(&c.symbol)
                .bind(&c.name)
                .bind(&c.algo)
                .execute(&mut *conn)
                .await?;
            }
        }
        PlanStep::InsertCurrencies(rows) => {
            for c in rows {
                sqlx::query("insert into currency (symbol, name, algo) values ($1, $2, $3)")
                    .bind(&c.symbol)
                    .bind(&c.name)
                    .bind(&c.algo)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        PlanStep::ArchiveCurrencies(rows) => {
            for c in rows {
                sqlx::query(
                    "insert into currency_historical (symbol, name, algo) values ($1, $2, $3)",
                )
                .bind(&c.symbol)
                .bind(&c.name)
                .bind(&c.algo)
                .execute(&mut *conn)
                .await?;
            }
        }
        PlanStep::ArchiveNetworkStatus(rows) => {
            insert_samples(&mut *conn, "network_status", rows).await?;
        }
        PlanStep::ClearLatest => {
            sqlx::query("delete from network_status_latest")
                .execute(&mut *conn)
                .await?;
        }
        PlanStep::InsertLatest(rows) => {
            insert_samples(&mut *conn, "network_status_latest", rows).await?;
        }
    }
    Ok(())
}

async fn insert_samples(
    conn: &mut PgConnection,
    table: &str,
    rows: &[NetworkStatusSample],
) -> Result<(), sqlx::Error> {
    let sql = format!(
        r#"
        insert into {table} (
          symbol, scrape_time, current_blocks, difficulty, reward, hash_rate, avg_hash_rate
        ) values ($1, $2, $3, $4, $5, $6, $7)
        "#
    );
    for s in rows {
        sqlx::query(&sql)
            .bind(&s.symbol)
            .bind(s.scrape_time)
            .bind(s.metrics.current_blocks)
            .bind(s.metrics.difficulty)
            .bind(s.metrics.reward)
            .bind(s.metrics.hash_rate)
            .bind(s.metrics.avg_hash_rate)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn tx_err(e: sqlx::Error) -> PersistenceError {
    PersistenceError::Transaction(e.to_string())
}

fn read_err(e: sqlx::Error) -> PersistenceError {
    PersistenceError::Read(e.to_string())
}

fn step_err(step: PlanStepKind, e: sqlx::Error) -> PersistenceError {
    let is_constraint = e.as_database_error().is_some_and(|db| {
        matches!(
            db.kind(),
            sqlx::error::ErrorKind::UniqueViolation
                | sqlx::error::ErrorKind::ForeignKeyViolation
                | sqlx::error::ErrorKind::NotNullViolation
                | sqlx::error::ErrorKind::CheckViolation
        )
    });
    if is_constraint {
        PersistenceError::Constraint {
            step,
            message: e.to_string(),
        }
    } else {
        PersistenceError::Operation {
            step,
            message: e.to_string(),
        }
    }
}
