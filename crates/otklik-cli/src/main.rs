use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use otklik_client::{
    EnvCredentials, HhStatusProbe, HhSubmitter, ReqwestPageFetcher, SelectorExtractor,
    normalize::{default_search_url, normalize_search_url},
};
use otklik_core::applog::AppLog;
use otklik_core::engine::{ResponseEngine, TracingReporter};
use otklik_core::run::RunHandle;
use otklik_core::traits::{Store, keys};
use otklik_store::SqliteStore;

mod config;

use config::FileConfig;

#[derive(Parser)]
#[command(name = "otklik", version, about = "Automated responder for job-listing feeds")]
struct Cli {
    /// Path to the local database
    #[arg(long, env = "OTKLIK_DB", default_value = "otklik.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the feed and submit applications
    Run {
        /// Search URL; omitted, the last saved URL (or the default search) is used
        #[arg(short, long)]
        url: Option<String>,

        /// Path to a JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Resume hash; auto-discovered from the resume list when omitted
        #[arg(long, env = "OTKLIK_RESUME_HASH")]
        resume_hash: Option<String>,

        /// Session XSRF token
        #[arg(long, env = "OTKLIK_XSRF_TOKEN")]
        xsrf_token: Option<String>,

        /// Override the run-wide submission cap
        #[arg(long)]
        max_responses: Option<u64>,
    },

    /// Show cumulative statistics
    Stats,

    /// Show recent application log entries
    Log {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Export statistics and the application log as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clear statistics and the application log
    Reset {
        /// Keep the sent-application ledger (dedup history)
        #[arg(long, default_value_t = false)]
        keep_ledger: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("otklik=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = SqliteStore::open(&cli.db)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Failed to open database: {}", cli.db.display()))?;

    match cli.command {
        Commands::Run {
            url,
            config,
            resume_hash,
            xsrf_token,
            max_responses,
        } => {
            cmd_run(store, url, config.as_deref(), resume_hash, xsrf_token, max_responses).await?;
        }
        Commands::Stats => cmd_stats(store)?,
        Commands::Log { limit } => cmd_log(store, limit)?,
        Commands::Export { output } => cmd_export(store, output.as_deref())?,
        Commands::Reset { keep_ledger } => cmd_reset(store, keep_ledger)?,
    }

    Ok(())
}

/// Resolve the search URL: an explicit argument is normalized and saved for
/// later runs; otherwise the saved one is reused, falling back to the
/// default search.
fn resolve_search_url(store: &SqliteStore, url: Option<String>) -> Result<String> {
    if let Some(raw) = url {
        let normalized = normalize_search_url(&raw).map_err(|e| anyhow::anyhow!(e))?;
        store
            .set(keys::FILTER_URL, &normalized)
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(normalized);
    }
    if let Some(saved) = store.get(keys::FILTER_URL).map_err(|e| anyhow::anyhow!(e))? {
        tracing::info!(%saved, "Using saved search URL");
        return Ok(saved);
    }
    Ok(default_search_url())
}

async fn cmd_run(
    store: SqliteStore,
    url: Option<String>,
    config_path: Option<&std::path::Path>,
    resume_hash: Option<String>,
    xsrf_token: Option<String>,
    max_responses: Option<u64>,
) -> Result<()> {
    let base_url = resolve_search_url(&store, url)?;

    let mut engine_config = FileConfig::load(config_path)?.into_engine_config();
    if let Some(cap) = max_responses {
        engine_config.max_responses = cap;
    }

    let fetcher = ReqwestPageFetcher::new().map_err(|e| anyhow::anyhow!(e))?;
    let probe = HhStatusProbe::new().map_err(|e| anyhow::anyhow!(e))?;
    let submitter = HhSubmitter::new().map_err(|e| anyhow::anyhow!(e))?;
    let credentials =
        EnvCredentials::new(resume_hash, xsrf_token).map_err(|e| anyhow::anyhow!(e))?;

    let engine = ResponseEngine::new(
        fetcher,
        SelectorExtractor::new(),
        probe,
        submitter,
        credentials,
        store,
        engine_config,
    );

    let run = RunHandle::new();
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current operation");
            cancel_on_signal.cancel();
        }
    });

    let stats = engine
        .run(&base_url, &run, cancel, &TracingReporter)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn cmd_stats(store: SqliteStore) -> Result<()> {
    let totals = AppLog::new(store).totals().map_err(|e| anyhow::anyhow!(e))?;
    println!("{}", serde_json::to_string_pretty(&totals)?);
    Ok(())
}

fn cmd_log(store: SqliteStore, limit: usize) -> Result<()> {
    let entries = AppLog::new(store)
        .entries()
        .map_err(|e| anyhow::anyhow!(e))?;
    if entries.is_empty() {
        println!("No applications logged yet");
        return Ok(());
    }

    let start = entries.len().saturating_sub(limit);
    for entry in &entries[start..] {
        let status = if entry.success { "sent" } else { "skip" };
        match &entry.message {
            Some(message) => println!(
                "  [{status}] {} — {} ({message})",
                entry.time.format("%Y-%m-%d %H:%M:%S UTC"),
                entry.title,
            ),
            None => println!(
                "  [{status}] {} — {}",
                entry.time.format("%Y-%m-%d %H:%M:%S UTC"),
                entry.title,
            ),
        }
    }
    println!("\nTotal: {} entries", entries.len());
    Ok(())
}

fn cmd_export(store: SqliteStore, output: Option<&std::path::Path>) -> Result<()> {
    let document = AppLog::new(store).export().map_err(|e| anyhow::anyhow!(e))?;
    match output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            tracing::info!(path = %path.display(), "Export written");
        }
        None => println!("{document}"),
    }
    Ok(())
}

fn cmd_reset(store: SqliteStore, keep_ledger: bool) -> Result<()> {
    AppLog::new(store.clone())
        .clear()
        .map_err(|e| anyhow::anyhow!(e))?;
    if !keep_ledger {
        store
            .remove(keys::SENT_RESPONSES)
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    store
        .remove(keys::FILTER_URL)
        .map_err(|e| anyhow::anyhow!(e))?;
    println!("Statistics and log cleared{}", if keep_ledger { " (ledger kept)" } else { "" });
    Ok(())
}
