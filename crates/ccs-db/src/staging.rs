//! Per-batch staging tables.
//!
//! A staging table is a temp table shaped like its target
//! (`LIKE <target> INCLUDING DEFAULTS`, no keys), named
//! `<target>_stg_<uuid>`. It must be created inside a transaction: it is
//! `ON COMMIT DROP`, and `with_isolated_staging` also drops it explicitly
//! before returning.

use ccs_reconcile::{EntityFamily, PersistenceError};
use ccs_schemas::{CurrencyDescriptor, NetworkStatusSample};
use futures_util::future::BoxFuture;
use sqlx::PgConnection;
use tracing::{debug, warn};
use uuid::Uuid;

/// One batch to stage, tagged by family.
#[derive(Debug, Clone, Copy)]
pub enum StagedBatch<'a> {
    Currencies(&'a [CurrencyDescriptor]),
    NetworkStatus(&'a [NetworkStatusSample]),
}

impl StagedBatch<'_> {
    pub fn family(&self) -> EntityFamily {
        match self {
            StagedBatch::Currencies(_) => EntityFamily::Currency,
            StagedBatch::NetworkStatus(_) => EntityFamily::NetworkStatus,
        }
    }

    /// Table the staging area copies its shape from.
    pub fn source_schema(&self) -> &'static str {
        self.family().target_table()
    }

    pub fn len(&self) -> usize {
        match self {
            StagedBatch::Currencies(rows) => rows.len(),
            StagedBatch::NetworkStatus(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingTable {
    name: String,
    family: EntityFamily,
}

impl StagingTable {
    fn for_batch(batch: &StagedBatch<'_>) -> Self {
        Self {
            name: format!("{}_stg_{}", batch.source_schema(), Uuid::new_v4().simple()),
            family: batch.family(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> EntityFamily {
        self.family
    }
}

/// Create and fill a staging table for `batch`, run `body` against it, and
/// drop it on every exit path.
///
/// If `body` fails and the drop fails too, the body's error is returned.
pub async fn with_isolated_staging<T, F>(
    conn: &mut PgConnection,
    batch: StagedBatch<'_>,
    body: F,
) -> Result<T, PersistenceError>
where
    F: for<'c> FnOnce(&'c mut PgConnection, &'c StagingTable) -> BoxFuture<'c, Result<T, PersistenceError>>,
{
    let table = StagingTable::for_batch(&batch);

    let create = format!(
        "create temp table {} (like {} including defaults) on commit drop",
        table.name,
        batch.source_schema()
    );
    sqlx::query(&create)
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistenceError::Staging(format!("create {}: {e}", table.name)))?;
    debug!(table = %table.name, rows = batch.len(), "staging table created");

    let outcome = match fill(&mut *conn, &table, batch).await {
        Ok(()) => body(&mut *conn, &table).await,
        Err(e) => Err(e),
    };

    let drop_sql = format!("drop table if exists {}", table.name);
    let dropped = sqlx::query(&drop_sql).execute(&mut *conn).await;

    match (outcome, dropped) {
        (Ok(value), Ok(_)) => Ok(value),
        (Ok(_), Err(e)) => Err(PersistenceError::Staging(format!(
            "drop {}: {e}",
            table.name
        ))),
        (Err(e), Ok(_)) => Err(e),
        (Err(e), Err(drop_err)) => {
            // Aborted transactions reject the drop; rollback removes the table.
            warn!(table = %table.name, error = %drop_err, "staging drop failed after body error");
            Err(e)
        }
    }
}

async fn fill(
    conn: &mut PgConnection,
    table: &StagingTable,
    batch: StagedBatch<'_>,
) -> Result<(), PersistenceError> {
    let staging_err = |e: sqlx::Error| PersistenceError::Staging(format!("fill {}: {e}", table.name));

    match batch {
        StagedBatch::Currencies(rows) => {
            let sql = format!("insert into {} (symbol, name, algo) values ($1, $2, $3)", table.name);
            for c in rows {
                sqlx::query(&sql)
                    .bind(&c.symbol)
                    .bind(&c.name)
                    .bind(&c.algo)
                    .execute(&mut *conn)
                    .await
                    .map_err(staging_err)?;
            }
        }
        StagedBatch::NetworkStatus(rows) => {
            let sql = format!(
                r#"
                insert into {} (
                  symbol, scrape_time, current_blocks, difficulty, reward, hash_rate, avg_hash_rate
                ) values ($1, $2, $3, $4, $5, $6, $7)
                "#,
                table.name
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
                    .await
                    .map_err(staging_err)?;
            }
        }
    }
    Ok(())
}
