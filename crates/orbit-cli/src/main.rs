use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use orbit_core::EntityKind;
use orbit_sync::{DedupConfig, DedupEngine, SyncConfig, SyncScheduler};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Collections swept by `dedupe` when none is named.
const DEFAULT_DEDUPE_TARGETS: [(&str, &str); 2] = [("events", "title"), ("missions", "name")];

#[derive(Debug, Parser)]
#[command(name = "orbit-cli")]
#[command(about = "Mirror Launch Library data into a local record store")]
struct Cli {
    /// Debug-level logs unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run every enabled sync job until Ctrl-C
    Run,
    /// One pass for a single entity kind
    Sync {
        #[arg(long)]
        kind: EntityKind,
    },
    /// Remove records whose key field collides after trim + lowercase
    Dedupe {
        #[arg(long, requires = "field")]
        collection: Option<String>,
        #[arg(long, requires = "collection")]
        field: Option<String>,
    },
    /// Print the enabled sync jobs
    Jobs,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = SyncConfig::from_env();
    let scheduler = SyncScheduler::from_config(&config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let (stop_tx, stop_rx) = watch::channel(false);
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("interrupt received; finishing in-flight passes"),
                    Err(err) => warn!(error = %err, "could not listen for interrupt"),
                }
                let _ = stop_tx.send(true);
            });
            scheduler.run_forever(stop_rx).await?;
        }
        Commands::Sync { kind } => {
            scheduler.authenticate_with_retry().await?;
            let summary = scheduler.run_once(kind).await?;
            println!(
                "sync complete: run_id={} kind={} pages={} seen={} created={} existing={} skipped={} failed={}",
                summary.run_id,
                summary.kind,
                summary.pages,
                summary.seen,
                summary.created,
                summary.existing,
                summary.skipped,
                summary.failed
            );
            if let Some(reason) = summary.stopped_early {
                bail!("{kind} pass ended early: {reason}");
            }
        }
        Commands::Dedupe { collection, field } => {
            scheduler.authenticate_with_retry().await?;
            let targets: Vec<(String, String)> = match (collection, field) {
                (Some(collection), Some(field)) => vec![(collection, field)],
                _ => DEFAULT_DEDUPE_TARGETS
                    .iter()
                    .map(|(c, f)| (c.to_string(), f.to_string()))
                    .collect(),
            };
            let engine = DedupEngine::new(scheduler.store(), DedupConfig::default());
            for (collection, field) in targets {
                let report = engine.run(&collection, &field).await?;
                println!(
                    "dedupe complete: collection={} field={} scanned={} removed={} failed={}",
                    report.collection, report.field, report.scanned, report.removed, report.failed
                );
            }
        }
        Commands::Jobs => {
            for job in scheduler.jobs() {
                println!("{:<18} page_size={:<4} {}", job.kind.as_str(), job.page_size, job.url);
            }
        }
    }

    Ok(())
}
