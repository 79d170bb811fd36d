//! Command handler modules for the `ccs` binary.
//!
//! Shared helpers (config loading, DB connection, exit-code mapping) live here.

pub mod scrape;

use anyhow::{Context, Result};
use ccs_config::{secrets, LoadedConfig, ScrapeConfig};
use ccs_md::{FetchError, ParseError};
use ccs_reconcile::PersistenceError;
use sqlx::PgPool;

/// Load layered config; no paths means built-in defaults.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    if paths.is_empty() {
        return ccs_config::load_layered_yaml_from_strings(&[]);
    }
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    ccs_config::load_layered_yaml(&refs)
}

/// Resolve the DB URL named by config and connect.
pub async fn connect_db(cfg: &ScrapeConfig) -> Result<PgPool> {
    let db_url = secrets::resolve_db_url(&cfg.db)?;
    ccs_db::connect(db_url.url())
        .await
        .map_err(|e| PersistenceError::Connect(format!("{e:#}")))
        .with_context(|| format!("connect via {}", db_url.env_var))
}

/// 2 fetch, 3 parse, 4 persistence, 1 anything else.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<FetchError>().is_some() {
            return 2;
        }
        if cause.downcast_ref::<ParseError>().is_some() {
            return 3;
        }
        if cause.downcast_ref::<PersistenceError>().is_some() {
            return 4;
        }
    }
    1
}
