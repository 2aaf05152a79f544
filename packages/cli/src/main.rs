#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for truck alert.
//!
//! Runs scrape cycles over fragments read from a file or stdin, dispatches
//! alerts through a logging transport, sends the daily summary, and
//! administers subscriber lists and the stall setting.

use std::io::Read as _;
use std::path::PathBuf;
use std::str::FromStr as _;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use truck_alert_classify::{explain, normalize, split_into_incident_chunks};
use truck_alert_database::{Store, dashboard_stats, sqlite::SqliteStore};
use truck_alert_dispatch::{Dispatcher, LogTransport};
use truck_alert_dispatch_models::AlertConfig;
use truck_alert_incident_models::AlertChannel;
use truck_alert_ingest::{build_incident, run_scrape_cycle};

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Heavy-truck and hazmat traffic alerts.
#[derive(Parser)]
#[command(name = "truck_alert")]
#[command(about = "Heavy-truck and hazmat traffic alerts")]
struct Cli {
    /// Optional TOML config file. Environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the `SQLite` database (overrides config and `TRUCK_ALERT_DB`).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run one scrape cycle and dispatch alerts for new incidents.
    Scrape {
        /// File with one fragment per line (default: stdin).
        #[arg(long)]
        input: Option<PathBuf>,

        /// Treat the input as one page of text and split it into chunks.
        #[arg(long)]
        split: bool,
    },

    /// Send the daily CSV summary.
    Summary,

    /// List recently stored incidents.
    Recent {
        /// Look-back window in hours.
        #[arg(long, default_value_t = 24)]
        hours: u32,

        /// Print the incidents as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show dashboard counters.
    Stats,

    /// Show or change whether stalls are reported.
    Stalls {
        /// `on`, `off`, or `show`.
        action: StallAction,
    },

    /// Manage subscriber lists.
    Subscribers {
        #[command(subcommand)]
        action: SubscriberAction,
    },

    /// Explain how a fragment would be classified.
    Classify {
        /// Raw fragment text.
        text: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StallAction {
    On,
    Off,
    Show,
}

/// Actions for the `subscribers` subcommand.
#[derive(Subcommand)]
enum SubscriberAction {
    /// Add an active subscriber.
    Add {
        /// List name (email, hazmat-email, sms, hazmat-sms).
        #[arg(long, value_parser = parse_list)]
        list: AlertChannel,

        /// Email address or phone number.
        address: String,
    },

    /// Remove a subscriber.
    Remove {
        /// List name (email, hazmat-email, sms, hazmat-sms).
        #[arg(long, value_parser = parse_list)]
        list: AlertChannel,

        /// Email address or phone number.
        address: String,
    },

    /// Flip a subscriber between active and inactive.
    Toggle {
        /// List name (email, hazmat-email, sms, hazmat-sms).
        #[arg(long, value_parser = parse_list)]
        list: AlertChannel,

        /// Email address or phone number.
        address: String,
    },

    /// Show every entry on a list.
    List {
        /// List name (email, hazmat-email, sms, hazmat-sms).
        #[arg(long, value_parser = parse_list)]
        list: AlertChannel,
    },
}

fn parse_list(value: &str) -> Result<AlertChannel, String> {
    AlertChannel::from_str(value)
        .map_err(|_| format!("unknown list {value:?} (email, hazmat-email, sms, hazmat-sms)"))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = AlertConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.db_path {
        config.database_path = path;
    }

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&config.database_path).await?);
    store.seed_include_stalls(config.include_stalls).await?;

    match cli.command {
        Commands::Scrape { input, split } => cmd_scrape(store, config, input, split).await,
        Commands::Summary => cmd_summary(store, config).await,
        Commands::Recent { hours, json } => cmd_recent(store.as_ref(), hours, json).await,
        Commands::Stats => cmd_stats(store.as_ref()).await,
        Commands::Stalls { action } => cmd_stalls(store.as_ref(), action).await,
        Commands::Subscribers { action } => cmd_subscribers(store.as_ref(), action).await,
        Commands::Classify { text } => cmd_classify(store.as_ref(), &text).await,
    }
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

fn read_input(input: Option<PathBuf>) -> std::io::Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// Runs one scrape cycle, then dispatches alerts for whatever was new.
async fn cmd_scrape(
    store: Arc<dyn Store>,
    config: AlertConfig,
    input: Option<PathBuf>,
    split: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_input(input)?;
    let fragments: Vec<String> = if split {
        split_into_incident_chunks(&text)
    } else {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect()
    };

    let report = match run_scrape_cycle(store.as_ref(), &fragments).await {
        Ok(report) => report,
        Err(e) => {
            log::error!("Scrape cycle aborted: {e}");
            return Err(e.into());
        }
    };

    println!(
        "{} fragments: {} new, {} duplicate, {} collapsed, {} unresolved, {} not relevant",
        report.fragments,
        report.inserted_count(),
        report.duplicates,
        report.collapsed,
        report.unresolved,
        report.not_relevant,
    );

    if report.inserted.is_empty() {
        return Ok(());
    }

    let dispatcher = Dispatcher::new(store, Arc::new(LogTransport), config);
    let dispatch = match dispatcher.dispatch(&report.inserted).await {
        Ok(dispatch) => dispatch,
        Err(e) => {
            log::error!("Dispatch aborted: {e}");
            return Err(e.into());
        }
    };

    for (channel, outcome) in &dispatch.channels {
        println!("  {:<13} {outcome:?}", channel.as_ref());
    }

    Ok(())
}

/// Sends the daily CSV summary.
async fn cmd_summary(
    store: Arc<dyn Store>,
    config: AlertConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = Dispatcher::new(store, Arc::new(LogTransport), config);
    let outcome = dispatcher.send_daily_summary().await?;
    println!("Daily summary: {}", outcome.as_ref());
    Ok(())
}

/// Lists incidents stored in the last `hours`, newest first.
async fn cmd_recent(
    store: &dyn Store,
    hours: u32,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let incidents = store.recent(hours).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&incidents)?);
        return Ok(());
    }

    if incidents.is_empty() {
        println!("No incidents in the last {hours} hour(s).");
        return Ok(());
    }

    for incident in &incidents {
        println!(
            "#{:<5} [{}] {:>8}  {} - {}",
            incident.id,
            incident.severity.priority_label(),
            incident.incident_time,
            incident.location,
            incident.description,
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Admin commands
// ---------------------------------------------------------------------------

/// Prints the dashboard counters.
async fn cmd_stats(store: &dyn Store) -> Result<(), Box<dyn std::error::Error>> {
    let stats = dashboard_stats(store).await?;

    println!("=== Truck Alert Status (last 24 hours) ===");
    println!();
    println!("Incidents: {}", stats.incidents_last_day);
    println!("Alerts:    {}", stats.alerts_last_day);
    println!();
    println!("Subscribers:");
    for list in &stats.lists {
        println!(
            "  {:<13} {} active / {} total",
            list.list.as_ref(),
            list.active,
            list.total
        );
    }
    println!();
    println!(
        "Stalls:    {}",
        if store.include_stalls().await? {
            "included"
        } else {
            "excluded"
        }
    );

    Ok(())
}

async fn cmd_stalls(
    store: &dyn Store,
    action: StallAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        StallAction::On => store.set_include_stalls(true).await?,
        StallAction::Off => store.set_include_stalls(false).await?,
        StallAction::Show => {}
    }

    let state = if store.include_stalls().await? {
        "on"
    } else {
        "off"
    };
    println!("Stalls: {state}");

    Ok(())
}

/// Dispatches `subscribers` subcommand actions.
async fn cmd_subscribers(
    store: &dyn Store,
    action: SubscriberAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SubscriberAction::Add { list, address } => {
            if store.add_subscriber(list, &address).await? {
                println!("Added {address} to {}", list.as_ref());
            } else {
                println!("{address} is already on {}", list.as_ref());
            }
        }
        SubscriberAction::Remove { list, address } => {
            if store.remove_subscriber(list, &address).await? {
                println!("Removed {address} from {}", list.as_ref());
            } else {
                println!("{address} is not on {}", list.as_ref());
            }
        }
        SubscriberAction::Toggle { list, address } => {
            match store.toggle_subscriber(list, &address).await? {
                Some(true) => println!("{address} is now active on {}", list.as_ref()),
                Some(false) => println!("{address} is now inactive on {}", list.as_ref()),
                None => println!("{address} is not on {}", list.as_ref()),
            }
        }
        SubscriberAction::List { list } => {
            let entries = store.list_subscribers(list).await?;
            if entries.is_empty() {
                println!("No subscribers on {}.", list.as_ref());
            }
            for entry in &entries {
                println!(
                    "{:<8} {}  (since {})",
                    if entry.active { "active" } else { "inactive" },
                    entry.address,
                    entry.created_at.format("%Y-%m-%d"),
                );
            }
        }
    }

    Ok(())
}

/// Prints what the classifier and builder make of one fragment.
async fn cmd_classify(store: &dyn Store, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let include_stalls = store.include_stalls().await?;

    println!("Verdict:     {:?}", explain(text, include_stalls));

    match build_incident(text) {
        Some(incident) => {
            println!("Location:    {}", incident.location);
            println!("Description: {}", incident.description);
            println!("Time:        {}", incident.incident_time);
            println!(
                "Severity:    {} ({})",
                incident.severity.value(),
                incident.severity
            );
            println!("Fingerprint: {}", incident.fingerprint);
        }
        None => println!("Location:    {} (unresolved)", normalize(text)),
    }

    Ok(())
}
