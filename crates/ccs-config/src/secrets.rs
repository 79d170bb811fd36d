//! Database credential resolution.
//!
//! Config stores only the env var NAME (`db.url_env`). The URL is read once at
//! startup; errors name the variable, never its value, and `Debug` redacts it.

use anyhow::{bail, Result};

use crate::DbConfig;

#[derive(Clone)]
pub struct ResolvedDbUrl {
    pub env_var: String,
    url: String,
}

impl ResolvedDbUrl {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for ResolvedDbUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedDbUrl")
            .field("env_var", &self.env_var)
            .field("url", &"<REDACTED>")
            .finish()
    }
}

/// Resolve the DB URL from the process environment.
pub fn resolve_db_url(cfg: &DbConfig) -> Result<ResolvedDbUrl> {
    resolve_db_url_with(cfg, |name| std::env::var(name).ok())
}

/// Resolve the DB URL through `lookup` (env var name -> value).
pub fn resolve_db_url_with<F>(cfg: &DbConfig, lookup: F) -> Result<ResolvedDbUrl>
where
    F: Fn(&str) -> Option<String>,
{
    let name = cfg.url_env.trim();
    if name.is_empty() {
        bail!("SECRETS_MISSING: db.url_env is empty");
    }
    match lookup(name) {
        Some(v) if !v.trim().is_empty() => Ok(ResolvedDbUrl {
            env_var: name.to_string(),
            url: v,
        }),
        _ => bail!("SECRETS_MISSING: required env var '{name}' (database url) is not set or empty"),
    }
}
