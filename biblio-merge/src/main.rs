//! biblio-merge - cluster merge pass
//!
//! Merges every cluster in a Record Store into one union record with its
//! audit trail, writing the results to the `finalized` table.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblio_merge::auditors::AuditorSet;
use biblio_merge::config::{MergeConfig, MergeOverrides};
use biblio_merge::db::RecordStore;
use biblio_merge::merging::DocumentMerger;
use biblio_merge::workflow::MergePipeline;

const CONFIG_FILE_NAME: &str = "biblio-merge.toml";

/// Command-line arguments for biblio-merge
#[derive(Parser, Debug)]
#[command(name = "biblio-merge")]
#[command(about = "Merge record clusters into audited union records")]
#[command(version)]
struct Args {
    /// SQLite Record Store
    #[arg(short, long, env = "BIBLIO_DATABASE")]
    database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "BIBLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Clusters per batch
    #[arg(long, env = "BIBLIO_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Submitted-but-uncommitted batch limit
    #[arg(long, env = "BIBLIO_MAX_IN_FLIGHT")]
    max_in_flight: Option<usize>,

    /// Concurrent merge workers
    #[arg(short, long, env = "BIBLIO_WORKERS")]
    workers: Option<usize>,

    /// Clusters per read page
    #[arg(long, env = "BIBLIO_PAGE_SIZE")]
    page_size: Option<usize>,

    /// Auditors to run, in order (comma separated)
    #[arg(long, env = "BIBLIO_AUDITORS", value_delimiter = ',')]
    auditors: Option<Vec<String>>,

    /// Remove existing finalized rows before merging
    #[arg(long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        biblio_common::config::resolve_toml_config(args.config.as_deref(), CONFIG_FILE_NAME)
            .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting biblio-merge {}", env!("CARGO_PKG_VERSION"));

    let database_path = args
        .database
        .clone()
        .or_else(|| toml_config.database_path.clone())
        .context("No database given (use --database, BIBLIO_DATABASE or database_path in TOML)")?;
    info!("Database: {}", database_path.display());

    let store = RecordStore::open(&database_path)
        .await
        .context("Failed to open Record Store")?;

    let overrides = MergeOverrides {
        batch_size: args.batch_size,
        max_in_flight: args.max_in_flight,
        worker_count: args.workers,
        page_size: args.page_size,
        auditors: args.auditors.clone(),
    };
    let mut config =
        MergeConfig::resolve(database_path, &overrides, &toml_config.merge, store.pool())
            .await
            .context("Invalid merge configuration")?;
    config.clear = args.clear;

    let auditors = AuditorSet::from_names(&config.auditors).context("Invalid auditor list")?;
    let pipeline = MergePipeline::new(Arc::new(DocumentMerger::new()), auditors);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = pipeline.run(&store, &config, &cancel).await;
    store.close().await;

    match result {
        Ok(report) => {
            if report.stopped_early {
                warn!(
                    finalized = report.finalized,
                    failures = report.failures,
                    "Stopped early; re-run with --clear to process all clusters"
                );
            }
            info!(
                report = %serde_json::to_string(&report).unwrap_or_default(),
                "Run report"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Merge run failed");
            Err(e).context("Merge run failed")
        }
    }
}

/// Cancel cooperatively on Ctrl+C or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, finishing in-flight batches"),
        _ = terminate => info!("Received terminate signal, finishing in-flight batches"),
        _ = cancel.cancelled() => return,
    }
    cancel.cancel();
}
