//! Holonet - Star Wars API aggregator
//!
//! Main entry point for the Holonet CLI.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use holonet::cache::{SqliteCache, SqliteCacheConfig};
use holonet::config::{validate_config, CacheBackend, HolonetConfig};
use holonet::query::Pagination;
use holonet::sync::{recv_event, SyncDaemon, SyncDaemonConfig, SyncEvent};
use holonet::Holonet;
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

/// Holonet - cached, filterable access to the Star Wars API
#[derive(Parser, Debug)]
#[command(name = "holonet")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/holonet/config.yaml)
    #[arg(short, long, env = "HOLONET_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List a collection with optional filters and pagination
    List {
        /// Collection name (films, people, planets, species, starships, vehicles)
        collection: String,

        /// Page number (1-based); requires --per-page
        #[arg(long, requires = "per_page")]
        page: Option<i64>,

        /// Items per page
        #[arg(long)]
        per_page: Option<i64>,

        /// Filter as field=value (repeatable, all must match)
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },

    /// Show a single entity by id
    Get {
        /// Collection name
        collection: String,

        /// Entity id (e.g., 1)
        id: String,
    },

    /// Analyze film opening crawls for word counts and character mentions
    Analyze {
        /// Only print the N most frequent words
        #[arg(long)]
        top: Option<usize>,
    },

    /// Refresh every collection in the cache now
    Sync {
        /// Print Prometheus metrics after the sync
        #[arg(long)]
        metrics: bool,
    },

    /// Run the scheduled sync daemon in the foreground
    Daemon {
        /// Seconds between syncs (overrides the config file)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Show cache statistics
    CacheStats,

    /// Drop every cached entry
    ClearCache,

    /// Print the effective configuration
    Config,
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected field=value, got '{}'", s)),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    if let Err(e) = holonet::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => HolonetConfig::load(path)?,
        None => HolonetConfig::load_default()?,
    };
    config
        .apply_env()
        .context("Invalid HOLONET_* environment override")?;

    tracing::info!(base_url = %config.upstream.base_url, "Configuration loaded");

    match cli.command {
        Commands::List {
            collection,
            page,
            per_page,
            filters,
        } => {
            let pagination = match (page, per_page) {
                (None, None) => None,
                (page, Some(per_page)) => Some(Pagination::new(page.unwrap_or(1), per_page)),
                (Some(_), None) => bail!("--page requires --per-page"),
            };
            let result = connect(config)?
                .list_collection(&collection, pagination, &filters)
                .await
                .with_context(|| format!("Failed to list {}", collection))?;
            print_json(&result)
        }

        Commands::Get { collection, id } => {
            let entity = connect(config)?
                .get_entity(&collection, &id)
                .await
                .with_context(|| format!("Failed to get {} {}", collection, id))?;
            print_json(&entity)
        }

        Commands::Analyze { top } => {
            let mut analysis = connect(config)?
                .analyze_corpus()
                .await
                .context("Failed to analyze opening crawls")?;
            if let Some(n) = top {
                analysis.word_counts.truncate(n);
            }
            print_json(&analysis)
        }

        Commands::Sync { metrics } => {
            let report = connect(config)?.sync_all().await;
            print_json(&report)?;
            if metrics {
                print!("{}", holonet::metrics::encode_metrics()?);
            }
            if !report.is_success() {
                bail!(
                    "{} of {} collections failed to sync",
                    report.failed(),
                    report.outcomes.len()
                );
            }
            Ok(())
        }

        Commands::Daemon { interval_secs } => {
            let mut daemon_config = SyncDaemonConfig::from_settings(&config.sync);
            if let Some(secs) = interval_secs {
                daemon_config = daemon_config.with_interval(Duration::from_secs(secs.max(1)));
            }

            let mut daemon = SyncDaemon::new(connect(config)?, daemon_config);
            let mut events = daemon.subscribe();
            tokio::spawn(async move {
                while let Some(event) = recv_event(&mut events).await {
                    log_event(&event);
                }
            });

            eprintln!(
                "Sync daemon running every {}s (Ctrl-C to stop)",
                daemon.interval().as_secs()
            );
            daemon.run().await?;
            Ok(())
        }

        Commands::CacheStats => cache_stats(&config),

        Commands::ClearCache => {
            connect(config)?
                .clear_cache()
                .await
                .context("Failed to clear cache")?;
            eprintln!("Cache cleared");
            Ok(())
        }

        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            if let Err(errors) = validate_config(&config) {
                for error in &errors {
                    eprintln!("warning: {}", error);
                }
            }
            Ok(())
        }
    }
}

fn connect(config: HolonetConfig) -> anyhow::Result<Holonet> {
    Holonet::from_config(config).context("Failed to initialize Holonet")
}

fn cache_stats(config: &HolonetConfig) -> anyhow::Result<()> {
    if config.cache.backend != CacheBackend::Sqlite {
        bail!("cache-stats needs the sqlite backend; the memory cache lives only inside one process");
    }

    let cache = SqliteCache::new(SqliteCacheConfig {
        path: config.cache.path.clone(),
        ..Default::default()
    })?;
    let stats = cache.stats()?;

    #[derive(Serialize)]
    struct StatsView {
        path: PathBuf,
        entries: usize,
        live: usize,
        expired: usize,
        last_update_age_secs: Option<u64>,
    }

    print_json(&StatsView {
        path: cache.path().to_path_buf(),
        entries: stats.entry_count,
        live: stats.live_count,
        expired: stats.entry_count.saturating_sub(stats.live_count),
        last_update_age_secs: stats.age.map(|age| age.as_secs()),
    })
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::CycleStarted => eprintln!("Sync started"),
        SyncEvent::CollectionSynced { collection, items } => {
            eprintln!("  {:<10} {} items", collection.to_string(), items)
        }
        SyncEvent::CollectionFailed { collection, error } => {
            eprintln!("  {:<10} FAILED: {}", collection.to_string(), error)
        }
        SyncEvent::CycleCompleted(report) => eprintln!(
            "Sync finished in {:.1}s: {} ok, {} failed",
            report.duration().as_secs_f64(),
            report.succeeded(),
            report.failed()
        ),
        SyncEvent::Started | SyncEvent::Stopped => {}
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
