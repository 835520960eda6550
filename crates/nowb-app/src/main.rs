//! NOWB - settings, history and session core for the NOWB browser
//!
//! ## Usage
//!
//! ```bash
//! # Bring the settings file up to the current schema
//! nowb migrate
//!
//! # Show recent history
//! nowb history list --limit 20
//!
//! # Show which tabs would be restored at startup
//! nowb session plan
//!
//! # Run the JSON IPC bridge for a GUI host on stdin/stdout
//! nowb ipc
//! ```

mod ipc;
mod state;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ipc::commands::{handle_request, Windows};
use ipc::{IpcRequest, IpcResponse};
use nowb_core::AppConfig;
use nowb_history::{HistoryOrder, HistoryStore};
use nowb_settings::{ConfigStore, MigrationEngine, MigrationStatus};
use nowb_shell::{SessionReconciler, TabPlan};
use nowb_shield::{load_rules, AdBlocker, RuleSource};
use state::AppState;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nowb")]
#[command(version)]
#[command(about = "Settings, history and session core for the NOWB browser")]
struct Cli {
    /// Data directory (defaults to the platform's local data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Run as a private window: nothing is read from or written to disk
    #[arg(long, global = true)]
    private: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the settings file to the current schema
    Migrate {
        /// Report what would happen without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect or clear browsing history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Inspect session restore
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Test URLs against the ad-block rules
    Adblock {
        #[command(subcommand)]
        action: AdblockAction,
    },

    /// Serve JSON IPC messages, one per line, on stdin/stdout
    Ipc,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List entries, newest first
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Oldest entries first
        #[arg(long)]
        chronological: bool,
    },
    /// Fuzzy search titles and URLs
    Search {
        query: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Delete all history
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show the tabs that would be opened at startup
    Plan,
}

#[derive(Subcommand)]
enum AdblockAction {
    /// Check whether a URL would be blocked
    Check { url: String },
}

fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let mut config = match cli.data_dir {
        Some(dir) => AppConfig::with_data_dir(dir),
        None => AppConfig::default(),
    };
    if cli.private {
        config = config.private();
    }

    match cli.command {
        Commands::Migrate { dry_run } => run_migrate(&config, dry_run),
        Commands::History { action } => run_history(&config, action),
        Commands::Session {
            action: SessionAction::Plan,
        } => run_session_plan(&config),
        Commands::Adblock {
            action: AdblockAction::Check { url },
        } => run_adblock_check(&config, &url),
        Commands::Ipc => run_ipc(config),
    }
}

/// Route `log` records from the library crates into a tracing subscriber.
/// Output goes to stderr so stdout stays clean for IPC.
fn init_logging() -> Result<()> {
    tracing_log::LogTracer::init().context("Failed to set log tracer")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;
    Ok(())
}

fn run_migrate(config: &AppConfig, dry_run: bool) -> Result<()> {
    if config.mode.is_private() {
        println!("Private mode never writes settings; nothing to migrate");
        return Ok(());
    }

    let store = ConfigStore::from_config(config);
    let outcome = store.load_outcome();
    for warning in &outcome.warnings {
        warn!("{}", warning);
    }

    let engine = MigrationEngine::new();
    match engine.status(&outcome.document) {
        MigrationStatus::UpToDate => {
            println!("Settings are up to date (version {})", engine.current());
            return Ok(());
        }
        MigrationStatus::Newer(version) => {
            println!(
                "Settings version {} is newer than this build ({}); nothing to do",
                version,
                engine.current()
            );
            return Ok(());
        }
        MigrationStatus::NeedsMigration { from } if dry_run => {
            println!("Settings would be migrated from {} to {}", from, engine.current());
            return Ok(());
        }
        MigrationStatus::NeedsMigration { .. } => {}
    }

    let loaded = store.load_migrated(&engine);
    store
        .save(&loaded.document)
        .with_context(|| format!("Failed to write {}", store.path().display()))?;

    if let Some(report) = loaded.migration {
        println!("{}", report.summary());
    }
    Ok(())
}

fn run_history(config: &AppConfig, action: HistoryAction) -> Result<()> {
    let store = HistoryStore::from_config(config);
    let (mut log, warning) = store.load_log(config.history_capacity);
    if let Some(warning) = warning {
        warn!("{}", warning);
    }

    match action {
        HistoryAction::List {
            limit,
            chronological,
        } => {
            let order = if chronological {
                HistoryOrder::Chronological
            } else {
                HistoryOrder::NewestFirst
            };
            for entry in log.list(order).into_iter().take(limit) {
                println!(
                    "{}  {}  {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.title,
                    entry.url
                );
            }
        }
        HistoryAction::Search { query, limit } => {
            for entry in log.search(&query, limit) {
                println!("{}  {}", entry.title, entry.url);
            }
        }
        HistoryAction::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear history without --yes");
            }
            let count = log.len();
            log.clear();
            store.save(&log).context("Failed to write history")?;
            println!("Cleared {} history entries", count);
        }
    }
    Ok(())
}

fn run_session_plan(config: &AppConfig) -> Result<()> {
    let loaded = ConfigStore::from_config(config).load_migrated(&MigrationEngine::new());

    for (index, plan) in SessionReconciler::plan(&loaded.document).iter().enumerate() {
        match plan {
            TabPlan::Materialized { url, .. } => println!("{:>3}  live         {}", index, url),
            TabPlan::Placeholder { url, title } => {
                println!("{:>3}  placeholder  {} ({})", index, url, title)
            }
        }
    }
    Ok(())
}

fn run_adblock_check(config: &AppConfig, url: &str) -> Result<()> {
    let list = load_rules(&config.adblock_rules_path());
    if list.source == RuleSource::Defaults {
        info!("Using built-in ad-block rules");
    }
    let blocker = AdBlocker::from_rule_list(list);

    match blocker.matching_rule(url) {
        Some(rule) => println!("blocked  {} (rule: {})", url, rule),
        None => println!("allowed  {}", url),
    }
    Ok(())
}

fn run_ipc(config: AppConfig) -> Result<()> {
    info!("Starting NOWB IPC bridge...");

    let state = AppState::new(config);
    if let Ok(mut registry) = state.theme_registry().lock() {
        registry.subscribe(|theme| info!("Theme changed to {}", theme));
    }
    let mut windows = Windows::new(state);

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<IpcRequest>(&line) {
            Ok(request) => handle_request(&mut windows, request),
            Err(e) => IpcResponse::error(format!("Invalid message: {}", e)),
        };
        if !response.is_success() {
            debug!("Request failed: {}", line);
        }

        serde_json::to_writer(&mut stdout, &response)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }

    // Host went away; keep what we have
    let mut state = match windows.main().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let saved = if state.tabs.is_empty() {
        state.save()
    } else {
        let live = state.live_state();
        state.shutdown(&live)
    };
    if let Err(e) = saved {
        warn!("Failed to save on exit: {}", e);
    }
    info!("IPC bridge stopped");
    Ok(())
}
