//! `ccs scrape`: one fetch, one batch, two reconciliations.
//!
//! Order: fetch -> archive raw body -> currencies (parse, reconcile) ->
//! network status (parse, reconcile). Currency reconciliation commits before
//! network status is parsed, so a later failure keeps the currency commit.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ccs_db::PgGateway;
use ccs_md::{
    normalize_currencies, normalize_network_status, paced_fetch, CoinChooseProvider, RawArchive,
    RequestPacer, UpstreamProvider,
};
use ccs_reconcile::{PlanSummary, SnapshotStore};
use tracing::info;

use super::{connect_db, load_config};

/// Everything one run owns: the store (and its connection), the provider,
/// the pacer holding the last-request instant, and the optional archive.
pub struct RunContext<S, P> {
    pub store: S,
    pub provider: P,
    pub pacer: RequestPacer,
    pub archive: Option<RawArchive>,
}

#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub archived: Option<PathBuf>,
    pub currencies: PlanSummary,
    pub network: PlanSummary,
}

pub async fn run_scrape<S, P>(ctx: &mut RunContext<S, P>) -> Result<ScrapeOutcome>
where
    S: SnapshotStore,
    P: UpstreamProvider,
{
    info!(provider = ctx.provider.name(), "starting scrape");

    let payload = paced_fetch(&ctx.provider, &mut ctx.pacer)
        .await
        .context("fetch upstream snapshot")?;
    info!(bytes = payload.body.len(), "upstream request successful");

    let archived = match &ctx.archive {
        Some(archive) => Some(archive.save("api", "json", &payload.body, payload.fetched_at)?),
        None => None,
    };

    let currencies = normalize_currencies(&payload.body).context("normalize currencies")?;
    info!(count = currencies.len(), "currencies parsed");
    let currency_summary = ctx
        .store
        .reconcile_currencies(&currencies)
        .await
        .context("reconcile currencies")?;

    let samples = normalize_network_status(&payload.body, payload.fetched_at)
        .context("normalize network status")?;
    info!(count = samples.len(), "network status parsed");
    let network_summary = ctx
        .store
        .reconcile_network_status(&samples)
        .await
        .context("reconcile network status")?;

    info!("scrape complete");
    Ok(ScrapeOutcome {
        archived,
        currencies: currency_summary,
        network: network_summary,
    })
}

/// Build the production context from layered config and run one scrape.
pub async fn execute(config_paths: &[String]) -> Result<ScrapeOutcome> {
    let loaded = load_config(config_paths)?;
    let cfg = loaded.scrape_config()?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    // Connect first so a missing DB fails before the upstream is touched.
    let pool = connect_db(&cfg).await?;

    let mut ctx = RunContext {
        store: PgGateway::new(pool),
        provider: CoinChooseProvider::with_options(
            cfg.upstream.base_url.clone(),
            cfg.upstream.path.clone(),
            cfg.upstream.base.clone(),
            cfg.upstream.timeout(),
        ),
        pacer: RequestPacer::new(cfg.pacing.min_interval()),
        archive: cfg
            .archive
            .enabled
            .then(|| RawArchive::new(cfg.archive.dir.clone())),
    };

    run_scrape(&mut ctx).await
}
