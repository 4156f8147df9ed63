//! `jobdigest`: aggregate job listings, filter them against a stored
//! profile and deliver each new match once.
//!
//! # Usage
//!
//! ```
//! jobdigest run
//! jobdigest run --dry-run
//! jobdigest profile set --keyword "data engineer" --location remote --type full_time
//! jobdigest reset "https://x.com/job1?ref=fb"
//! jobdigest --config ~/.config/jobdigest/jobdigest.toml ledger list
//! ```

mod feed;
mod notifier;
mod settings;

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use chrono::SecondsFormat;
use clap::{Args, Parser, Subcommand};
use jobdigest_core::{
  connector::Connector,
  ledger::{Ledger, MemoryLedger},
  listing::{EmploymentType, ExperienceLevel},
  normalize::identity_key,
  notify::render_digest,
  pipeline::{Coordinator, RunOutcome},
  profile::{FilterProfile, ProfileStore},
};
use jobdigest_store_sqlite::SqliteStore;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::{feed::FileConnector, notifier::ConsoleNotifier, settings::Settings};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Job listing digest")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "jobdigest.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Fetch every source and deliver new matching listings.
  Run {
    /// Print the digest without recording anything.
    #[arg(long)]
    dry_run: bool,
  },

  /// Forget a listing so it can be delivered again.
  Reset {
    /// Posting URL or identity key.
    target: String,
  },

  /// Show or replace the stored filter profile.
  #[command(subcommand)]
  Profile(ProfileCommand),

  /// Inspect the delivery ledger.
  #[command(subcommand)]
  Ledger(LedgerCommand),
}

#[derive(Subcommand)]
enum ProfileCommand {
  Show,
  /// Replace the profile. Omitted dimensions become unconstrained.
  Set(ProfileArgs),
}

#[derive(Args)]
struct ProfileArgs {
  /// Title keyword; repeat for alternatives.
  #[arg(long = "keyword")]
  keywords:         Vec<String>,
  /// `remote`, `onsite`, `hybrid` or a place name.
  #[arg(long = "location")]
  locations:        Vec<String>,
  /// `junior`, `mid` or `senior`.
  #[arg(long = "level")]
  levels:           Vec<ExperienceLevel>,
  /// `full_time`, `contract` or `part_time`.
  #[arg(long = "type")]
  employment_types: Vec<EmploymentType>,
  #[arg(long)]
  salary_floor:     Option<i64>,
}

impl From<ProfileArgs> for FilterProfile {
  fn from(args: ProfileArgs) -> Self {
    Self {
      keywords:         args.keywords.into_iter().collect(),
      locations:        args.locations.into_iter().collect(),
      levels:           args.levels.into_iter().collect(),
      employment_types: args.employment_types.into_iter().collect(),
      salary_floor:     args.salary_floor,
    }
  }
}

#[derive(Subcommand)]
enum LedgerCommand {
  List,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout carries the digest.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;

  match cli.command {
    Command::Run { dry_run } => run(&settings, store, dry_run).await,
    Command::Reset { target } => reset(&store, &target).await,
    Command::Profile(ProfileCommand::Show) => show_profile(&settings, &store).await,
    Command::Profile(ProfileCommand::Set(args)) => {
      set_profile(&settings, &store, args.into()).await
    }
    Command::Ledger(LedgerCommand::List) => list_ledger(&store).await,
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn run(settings: &Settings, store: SqliteStore, dry_run: bool) -> anyhow::Result<()> {
  let profile = match store.get_profile(&settings.profile_id).await? {
    Some(profile) => profile,
    None => {
      warn!(profile_id = %settings.profile_id, "no stored profile, accepting every listing");
      FilterProfile::default()
    }
  };

  let connectors: Vec<Box<dyn Connector>> = settings
    .sources
    .iter()
    .map(|cfg| Box::new(FileConnector::from_config(cfg)) as Box<dyn Connector>)
    .collect();
  if connectors.is_empty() {
    warn!("no sources configured");
  }
  let timeout = Duration::from_secs(settings.connector_timeout_secs);

  if dry_run {
    let coordinator = Coordinator::new(snapshot(&store).await?).with_timeout(timeout);
    let RunOutcome { digest, report } = coordinator.run(&connectors, &profile).await?;
    for page in render_digest(&digest.listings, settings.digest_limit) {
      println!("{page}\n");
    }
    info!(run_id = %report.run_id, would_deliver = digest.len(), "dry run, nothing recorded");
    return Ok(());
  }

  let coordinator = Coordinator::new(store).with_timeout(timeout);
  let RunOutcome { digest, report } = coordinator.run(&connectors, &profile).await?;
  if digest.is_empty() {
    for page in render_digest(&[], settings.digest_limit) {
      println!("{page}");
    }
    return Ok(());
  }

  let notifier = ConsoleNotifier::stdout(settings.digest_limit);
  let delivery = coordinator.dispatch(&notifier, &digest).await?;
  info!(
    run_id = %report.run_id,
    delivered = delivery.delivered.len(),
    failed = delivery.failed.len(),
    "digest dispatched"
  );
  Ok(())
}

/// Copy the durable ledger into memory so a dry run cannot change it.
async fn snapshot(store: &SqliteStore) -> anyhow::Result<MemoryLedger> {
  let ledger = MemoryLedger::new();
  for entry in store.entries().await? {
    ledger.record_seen(&entry.identity_key, entry.first_seen_at).await?;
    if let Some(sent_at) = entry.sent_at {
      ledger.record_sent(&entry.identity_key, sent_at).await?;
    }
  }
  Ok(ledger)
}

async fn reset(store: &SqliteStore, target: &str) -> anyhow::Result<()> {
  let key = identity_key(target);
  if store.reset(&key).await? {
    println!("reset {key}");
  } else {
    println!("{key} is not in the ledger");
  }
  Ok(())
}

async fn show_profile(settings: &Settings, store: &SqliteStore) -> anyhow::Result<()> {
  let profile = store
    .get_profile(&settings.profile_id)
    .await?
    .unwrap_or_default();
  println!("{}", serde_json::to_string_pretty(&profile)?);
  Ok(())
}

async fn set_profile(
  settings: &Settings,
  store: &SqliteStore,
  profile: FilterProfile,
) -> anyhow::Result<()> {
  store.put_profile(&settings.profile_id, &profile).await?;
  info!(profile_id = %settings.profile_id, "profile saved");
  println!("{}", serde_json::to_string_pretty(&profile)?);
  Ok(())
}

async fn list_ledger(store: &SqliteStore) -> anyhow::Result<()> {
  for entry in store.entries().await? {
    let sent = entry
      .sent_at
      .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
      .unwrap_or_else(|| "-".to_owned());
    println!(
      "{}\t{}\t{}",
      entry.first_seen_at.to_rfc3339_opts(SecondsFormat::Secs, true),
      sent,
      entry.identity_key,
    );
  }
  Ok(())
}
