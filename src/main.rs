//! Listing-Spy main entry point
//!
//! This is the command-line interface for the listing watcher.

use anyhow::Context;
use clap::{Parser, Subcommand};
use listing_spy::actions::{
    preview_source, register_notification, register_source, CycleOptions, ScrapeCycle,
};
use listing_spy::adapters::AdapterRegistry;
use listing_spy::config::{load_config_with_hash, Config};
use listing_spy::crawler::{build_http_client, Crawler, HttpFetcher, RetryPolicy};
use listing_spy::notify::{ChannelFactory, ChannelKind};
use listing_spy::storage::{open_storage, ListingGateway, SqliteStorage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Listing-Spy: watches classified listing sites for new offers
///
/// Listing-Spy crawls every configured source, remembers the listings it has
/// already seen and pushes a notification for each new one.
#[derive(Parser, Debug)]
#[command(name = "listing-spy")]
#[command(version = "1.0.0")]
#[command(about = "Watches listing sites for new offers", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "listing-spy.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scrape cycle over every stored source
    Scrape {
        /// Log the notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Crawl a URL once and print its listings without storing anything
    Preview {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Show the last scrape run and how many listings are known
    Status,

    /// Manage sources
    #[command(subcommand)]
    Source(SourceCommand),

    /// Manage notification handlers
    #[command(subcommand)]
    Notification(NotificationCommand),
}

#[derive(Subcommand, Debug)]
enum SourceCommand {
    /// Add a source; its current listings are recorded as already seen
    Add {
        #[arg(value_name = "URL")]
        url: String,

        /// Display name (defaults to the URL host)
        #[arg(long)]
        name: Option<String>,
    },

    /// List stored sources
    List,

    /// Remove a source
    Remove {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Clear the broken flag of a source after checking it by hand
    Revalidate {
        #[arg(value_name = "KEY")]
        key: String,
    },
}

#[derive(Subcommand, Debug)]
enum NotificationCommand {
    /// Add a handler; a test notification is sent first
    Add {
        /// Handler type (e.g. pushbullet)
        #[arg(long = "type", value_name = "TYPE")]
        kind: String,

        /// API key or access token
        #[arg(long)]
        key: String,

        #[arg(long)]
        name: String,
    },

    /// List stored handlers
    List,

    /// Remove a handler
    Remove {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    match cli.command {
        Command::Scrape { dry_run } => handle_scrape(&config, config_hash, dry_run).await,
        Command::Preview { url } => handle_preview(&config, &url).await,
        Command::Status => handle_status(&config),
        Command::Source(command) => handle_source(&config, command).await,
        Command::Notification(command) => handle_notification(&config, command).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_spy=info,warn"),
            1 => EnvFilter::new("listing_spy=debug,info"),
            2 => EnvFilter::new("listing_spy=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.storage.database_path);
    open_storage(path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn build_crawler(config: &Config) -> anyhow::Result<Crawler> {
    let client = build_http_client(&config.user_agent, &config.scraper)
        .context("Failed to build HTTP client")?;
    let registry = AdapterRegistry::standard().context("Invalid adapter base URL")?;

    Ok(Crawler::new(
        registry,
        Arc::new(HttpFetcher::new(client)),
        config.scraper.max_pages,
    ))
}

fn build_notifiers(config: &Config) -> anyhow::Result<ChannelFactory> {
    let client = build_http_client(&config.user_agent, &config.scraper)
        .context("Failed to build HTTP client")?;
    Ok(ChannelFactory::new(client, config.notifications.clone()))
}

/// Handles `scrape`: one full cycle
async fn handle_scrape(config: &Config, config_hash: String, dry_run: bool) -> anyhow::Result<()> {
    let mut storage = open_database(config)?;
    let crawler = build_crawler(config)?;
    let notifiers = build_notifiers(config)?;
    let policy = RetryPolicy::from_config(&config.scraper);

    let options = CycleOptions {
        dry_run,
        config_hash,
    };
    let report = ScrapeCycle::new(&crawler, policy, &notifiers)
        .run(&mut storage, &options)
        .await?;

    println!("New listings: {}", report.new_listings.len());
    for listing in &report.new_listings {
        println!("  {} - {}", listing.title, listing.url);
    }
    if report.failed_sources() > 0 {
        println!("Failed sources: {}", report.failed_sources());
    }
    if !report.dispatch.is_clean() {
        println!("Failed notifications: {}", report.dispatch.failures.len());
    }
    println!("Run {} finished: {}", report.run_id, report.status.to_db_string());

    Ok(())
}

/// Handles `preview`: one crawl, nothing stored
async fn handle_preview(config: &Config, url: &str) -> anyhow::Result<()> {
    let crawler = build_crawler(config)?;
    let offers = preview_source(&crawler, url)
        .await
        .with_context(|| format!("Failed to crawl {}", url))?;

    println!("Listings found: {}", offers.len());
    for offer in &offers {
        println!("  {} - {}", offer.title, offer.url);
    }

    Ok(())
}

fn handle_status(config: &Config) -> anyhow::Result<()> {
    let storage = open_database(config)?;

    match storage.get_latest_run()? {
        Some(run) => {
            println!(
                "Last run {}: {} (started {}, finished {})",
                run.id,
                run.status.to_db_string(),
                run.started_at,
                run.finished_at.as_deref().unwrap_or("-")
            );
            println!(
                "  {} offers seen, {} new listings",
                run.offers_seen, run.new_listings
            );
            println!(
                "  {} failed sources, {} failed notifications",
                run.failed_sources, run.failed_notifications
            );
        }
        None => println!("No scrape run recorded yet"),
    }
    println!("Known listings: {}", storage.count_listings()?);

    Ok(())
}

async fn handle_source(config: &Config, command: SourceCommand) -> anyhow::Result<()> {
    let mut storage = open_database(config)?;

    match command {
        SourceCommand::Add { url, name } => {
            let crawler = build_crawler(config)?;
            let policy = RetryPolicy::from_config(&config.scraper);
            let source =
                register_source(&crawler, &policy, &mut storage, &url, name.as_deref()).await?;
            println!(
                "Added source {} ({}), {} current listings recorded",
                source.key, source.name, source.primed
            );
        }
        SourceCommand::List => {
            let sources = storage.get_sources()?;
            println!("Sources ({}):", sources.len());
            for source in &sources {
                let key = source.key.as_deref().unwrap_or("-");
                match source.broken_reason {
                    Some(reason) if source.broken => println!(
                        "  [{}] {} - {} (broken: {})",
                        key,
                        source.name,
                        source.url,
                        reason.to_db_string()
                    ),
                    _ if source.broken => {
                        println!("  [{}] {} - {} (broken)", key, source.name, source.url)
                    }
                    _ => println!("  [{}] {} - {}", key, source.name, source.url),
                }
            }
        }
        SourceCommand::Remove { key } => {
            storage.delete_source(&key)?;
            println!("Removed source {}", key);
        }
        SourceCommand::Revalidate { key } => {
            storage.clear_broken_source(&key)?;
            println!("Source {} is no longer marked broken", key);
        }
    }

    Ok(())
}

async fn handle_notification(config: &Config, command: NotificationCommand) -> anyhow::Result<()> {
    let mut storage = open_database(config)?;

    match command {
        NotificationCommand::Add { kind, key, name } => {
            let notifiers = build_notifiers(config)?;
            let id = register_notification(&mut storage, &notifiers, &kind, &key, &name)
                .await
                .context("Sending test notification didn't work, check your settings")?;
            println!("Added notification handler {} ({})", id, name);
        }
        NotificationCommand::List => {
            let handlers = storage.get_notification_handlers()?;
            println!("Notification handlers ({}):", handlers.len());
            for handler in &handlers {
                println!("  [{}] {} ({})", handler.id, handler.name, handler.kind);
            }
            let kinds: Vec<&str> = ChannelKind::all().iter().map(ChannelKind::as_str).collect();
            println!("Supported types: {}", kinds.join(", "));
        }
        NotificationCommand::Remove { id } => {
            storage.delete_notification_handler(id)?;
            println!("Removed notification handler {}", id);
        }
    }

    Ok(())
}
