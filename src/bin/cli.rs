//! jobcrawl CLI
//!
//! Local composition root: file-backed store, configured connectors, crawler,
//! scheduler and query engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use jobcrawl::{
    error::Result,
    models::{Config, ExperienceFilter, JobType, QueryFilters},
    pipeline::{CrawlResponse, CrawlScheduler, Crawler, PassMode},
    query::QueryEngine,
    services,
    storage::{JobQuery, JobStore, LocalStorage},
};

/// jobcrawl - Job Posting Crawler
#[derive(Parser, Debug)]
#[command(
    name = "jobcrawl",
    version,
    about = "Job posting ingestion and query pipeline"
)]
struct Cli {
    /// Path to storage directory containing config.toml and data files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a single keyword now
    Crawl {
        #[arg(short, long, default_value = "software engineer")]
        keyword: String,
    },

    /// Run one pass over every configured keyword
    Init {
        /// Clear all jobs and applications first
        #[arg(long)]
        reseed: bool,
    },

    /// Run passes on the configured interval until Ctrl-C
    Run {
        /// Clear all jobs and applications before each pass
        #[arg(long)]
        reseed: bool,
    },

    /// List stored jobs, newest first
    List {
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Case-insensitive text matched against title or description
        #[arg(long)]
        search: Option<String>,

        /// full_time, part_time, contract, remote, onsite, hybrid, unknown or none
        #[arg(long)]
        job_type: Option<JobType>,

        #[arg(long)]
        source: Option<String>,

        /// "0" for fresh, "N" for exactly N years, "N+" for at least N years
        #[arg(long)]
        experience: Option<ExperienceFilter>,
    },

    /// Show recent crawl runs
    History {
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the latest crawl status and job count
    Status,

    /// Validate configuration file
    Validate,
}

/// Initialize logging. `RUST_LOG` overrides the given level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn pass_mode(reseed: bool) -> PassMode {
    if reseed {
        PassMode::Reseed
    } else {
        PassMode::TopUp
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.storage_dir.join("config.toml");
    let loaded = Config::load(&config_path);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    init_logging(&level);

    let config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", config_path.display());
            config
        }
        Err(e) => {
            log::warn!(
                "Could not load {} ({e}). Using defaults.",
                config_path.display()
            );
            Config::default()
        }
    };

    if let Command::Validate = cli.command {
        log::info!("Validating configuration...");
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
        log::info!(
            "✓ Config OK ({} sources, {} keywords)",
            config.sources.len(),
            config.crawler.keywords.len()
        );
        return Ok(());
    }
    config.validate()?;

    let store: Arc<dyn JobStore> = Arc::new(LocalStorage::new(&cli.storage_dir));

    match cli.command {
        Command::Crawl { keyword } => {
            let crawler = build_crawler(&config, Arc::clone(&store))?;
            let started = Instant::now();
            let result = crawler.trigger(&keyword).await;
            print_json(&CrawlResponse::from_result(&result, started.elapsed()))?;
            result?;
        }

        Command::Init { reseed } => {
            let crawler = build_crawler(&config, Arc::clone(&store))?;
            let summary = crawler.run_pass(pass_mode(reseed)).await?;
            print_json(&summary)?;
        }

        Command::Run { reseed } => {
            let crawler = Arc::new(build_crawler(&config, Arc::clone(&store))?);
            let scheduler = CrawlScheduler::from_crawler(crawler, pass_mode(reseed));
            scheduler.start()?;

            tokio::signal::ctrl_c().await?;
            log::info!("Shutdown requested. Waiting for the current pass to finish...");
            scheduler.stop().await?;
        }

        Command::List {
            page,
            search,
            job_type,
            source,
            experience,
        } => {
            let engine = QueryEngine::from_config(Arc::clone(&store), &config);
            let filters = QueryFilters {
                search,
                job_type,
                source,
                experience,
            };
            let result = engine.fetch(&filters, page).await?;
            log::info!(
                "Page {}/{} ({} matching jobs)",
                result.page,
                result.total_pages,
                result.total_count
            );
            print_json(&result)?;
        }

        Command::History { limit } => {
            let limit = limit.unwrap_or(config.query.history_limit);
            let runs = store.recent_runs(limit).await?;
            if runs.is_empty() {
                log::info!("No crawl runs recorded yet.");
            }
            print_json(&runs)?;
        }

        Command::Status => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            let total = store.count_jobs(&JobQuery::all()).await?;
            log::info!(
                "Jobs stored: {}/{}",
                total,
                config.crawler.capacity_limit
            );
            match store.latest_status().await? {
                Some(status) => print_json(&status)?,
                None => log::info!("No crawl recorded yet."),
            }
        }

        Command::Validate => {}
    }

    log::info!("Done!");

    Ok(())
}

fn build_crawler(config: &Config, store: Arc<dyn JobStore>) -> Result<Crawler> {
    let sources = services::build_connectors(config)?;
    log::info!(
        "Using {} sources: {}",
        sources.len(),
        sources
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(Crawler::new(store, sources, config.crawler.clone()))
}
