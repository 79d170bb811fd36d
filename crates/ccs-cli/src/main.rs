use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

mod commands;

#[derive(Parser)]
#[command(name = "ccs")]
#[command(about = "Coin network-status scraper", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one upstream snapshot and merge it into the database
    Scrape {
        /// Layered config paths in merge order (defaults apply when omitted)
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> local overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence
    Status,

    /// Apply the embedded bootstrap schema
    Migrate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Dev convenience: pick up CCS_DATABASE_URL etc. from .env.local if present.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "run failed");
            eprintln!("error: {err:#}");
            ExitCode::from(commands::exit_code_for(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Commands::Scrape { config_paths } => {
            let out = commands::scrape::execute(&config_paths).await?;
            println!("scrape_ok=true");
            if let Some(p) = &out.archived {
                println!("archive_path={}", p.display());
            }
            println!("currency_summary={}", serde_json::to_string(&out.currencies)?);
            println!("network_summary={}", serde_json::to_string(&out.network)?);
        }

        Commands::Db { cmd } => {
            let cfg = commands::load_config(&[])?.scrape_config()?;
            let pool = commands::connect_db(&cfg).await?;
            match cmd {
                DbCmd::Status => {
                    let s = ccs_db::status(&pool).await?;
                    println!("db_ok={} has_schema={}", s.ok, s.has_schema());
                    for t in &s.missing_tables {
                        println!("missing_table={t}");
                    }
                }
                DbCmd::Migrate => {
                    ccs_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let loaded = commands::load_config(&paths)?;
            // Typed decode doubles as validation of key names.
            loaded.scrape_config()?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
