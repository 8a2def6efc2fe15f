//! `wurmlog` — record and replay the event log.
//!
//! Reads `wurmlog.toml` (or the path given with `--config`), layers
//! `WURMLOG_*` environment variables on top, opens the SQLite store and runs
//! one subcommand.
//!
//! # Usage
//!
//! ```
//! wurmlog append --actor john_doe --template 'You start {action}.' --action 'to dig'
//! wurmlog show --chronological
//! ```

mod commands;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use wurmlog_core::{
  EventLog,
  dimension::CalendarDate,
  entry::{ACTION_KIND, TimeOfDay},
  log::DEFAULT_RESOLVE_ATTEMPTS,
};
use wurmlog_store_sqlite::SqliteStore;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Append-only event log")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "wurmlog.toml")]
  config: PathBuf,

  /// SQLite database file; overrides `store_path` from the config.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Record one action entry.
  Append {
    #[arg(long)]
    actor:    String,
    /// Message template, e.g. `You start {action}.`
    #[arg(long)]
    template: String,
    #[arg(long)]
    action:   String,
    /// `YYYY-MM-DD`; defaults to today.
    #[arg(long)]
    date:     Option<CalendarDate>,
    /// `HH:MM:SS`; defaults to now.
    #[arg(long)]
    time:     Option<TimeOfDay>,
  },
  /// Print every entry of a kind, one line each.
  Show {
    #[arg(long, default_value = ACTION_KIND)]
    kind:          String,
    /// Sort by date and time instead of insertion order.
    #[arg(long)]
    chronological: bool,
    /// Emit one JSON object per line.
    #[arg(long)]
    json:          bool,
  },
  /// Seed the sample actors and entry, then show the log.
  Demo,
  /// Print row counts per table.
  Stats,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Settings from `wurmlog.toml` and `WURMLOG_*` variables.
#[derive(Deserialize)]
struct Settings {
  store_path:       PathBuf,
  resolve_attempts: u32,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
  let settings = config::Config::builder()
    .set_default("store_path", "wurmlog.sqlite3")?
    .set_default("resolve_attempts", i64::from(DEFAULT_RESOLVE_ATTEMPTS))?
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("WURMLOG"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise settings")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout carries only reconstructed lines.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = load_settings(&cli)?;

  let store_path = expand_tilde(cli.store.as_deref().unwrap_or(&settings.store_path));
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let log = EventLog::new(store).with_resolve_attempts(settings.resolve_attempts);

  let outcome = match cli.command {
    Command::Append { actor, template, action, date, time } => {
      commands::append(&log, &actor, &template, &action, date, time).await
    }
    Command::Show { kind, chronological, json } => {
      commands::show(&log, &kind, chronological, json).await
    }
    Command::Demo => commands::demo(&log).await,
    Command::Stats => commands::stats(&log).await,
  };

  // Release the connection on every path before reporting the outcome.
  log
    .into_inner()
    .close()
    .await
    .context("failed to close store")?;
  outcome
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
