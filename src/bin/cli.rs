//! feedwatch CLI
//!
//! One invocation performs one run; schedule it externally (cron, CI).

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use feedwatch::{
    error::Result,
    models::Config,
    notify::{DryRunNotifier, Notifier, Renderer, TelegramNotifier},
    pipeline::{self, Orchestrator, RunMode, RunOptions},
    services::AdapterSet,
    storage::{HistoryStorage, LocalStorage},
    utils::http,
};

/// feedwatch - announce new posts, releases and papers
#[derive(Parser, Debug)]
#[command(
    name = "feedwatch",
    version,
    about = "Watches feeds, pages, releases and paper searches"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "feedwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check sources and deliver notifications for new items
    Run {
        /// Which sources to evaluate: all | frequent
        #[arg(long, default_value = "all")]
        mode: RunMode,

        /// Log messages instead of sending them; history is not written
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show stored history
    History {
        /// Only show this source
        #[arg(long)]
        source: Option<String>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)?;
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run { mode, dry_run } => {
            pipeline::preflight(&config)?;

            let tz = config.schedule.tz()?;
            let renderer = Renderer::new(tz, config.notifier.summary_words);
            let client = http::create_async_client(&config.http)?;

            let notifier: Box<dyn Notifier> = if dry_run {
                Box::new(DryRunNotifier::new(renderer))
            } else {
                Box::new(TelegramNotifier::from_env(
                    client.clone(),
                    renderer,
                    config.notifier.clone(),
                )?)
            };
            let fetcher = AdapterSet::new(client, std::env::var("GITHUB_TOKEN").ok());
            let storage = LocalStorage::new(&config.history.path);

            let report = Orchestrator::new(&config, &fetcher, notifier.as_ref(), &storage)
                .run(RunOptions { mode, dry_run }, Utc::now())
                .await?;

            for source in &report.sources {
                log::debug!("{:?}", source);
            }
            log::info!(
                "Done: {} delivered{}",
                report.delivered(),
                if report.persisted {
                    ", history updated"
                } else {
                    ""
                }
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = pipeline::preflight(&config) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            for source in &config.sources {
                log::info!(
                    "  {} ({}, every {}h, history {})",
                    source.name,
                    source.kind,
                    source.interval_hours,
                    config.max_history_for(source)
                );
            }
            log::info!("✓ {} sources OK", config.sources.len());
        }

        Command::History { source } => {
            let storage = LocalStorage::new(&config.history.path);
            let store = storage.load().await;
            log::info!("History file: {}", storage.path().display());

            let entries = store
                .entries()
                .iter()
                .filter(|(name, _)| source.as_deref().is_none_or(|s| s == name.as_str()));
            for (name, entry) in entries {
                log::info!("{} ({} seen)", name, entry.len());
                if source.is_some() {
                    for identity in entry.iter() {
                        log::info!("  {}", identity);
                    }
                }
            }
        }
    }

    Ok(())
}
