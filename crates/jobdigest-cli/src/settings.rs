//! Runtime configuration, read from `jobdigest.toml` and `JOBDIGEST_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use jobdigest_core::{listing::Source, pipeline::DEFAULT_CONNECTOR_TIMEOUT};
use serde::Deserialize;

/// Deserialised configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  #[serde(default = "default_profile_id")]
  pub profile_id:             String,
  #[serde(default = "default_connector_timeout_secs")]
  pub connector_timeout_secs: u64,
  /// Listings per rendered message.
  #[serde(default = "default_digest_limit")]
  pub digest_limit:           usize,
  /// Feed files in priority order.
  #[serde(default)]
  pub sources:                Vec<SourceConfig>,
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
  pub source: Source,
  pub path:   PathBuf,
  /// Label for run reports; defaults to the source tag.
  #[serde(default)]
  pub name:   Option<String>,
}

fn default_store_path() -> PathBuf { PathBuf::from("jobdigest.db") }

fn default_profile_id() -> String { "default".to_owned() }

fn default_connector_timeout_secs() -> u64 { DEFAULT_CONNECTOR_TIMEOUT.as_secs() }

fn default_digest_limit() -> usize { 10 }

impl Settings {
  /// Layer the optional file at `path` under `JOBDIGEST_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(
        config::File::from(path)
          .format(config::FileFormat::Toml)
          .required(false),
      )
      .add_source(config::Environment::with_prefix("JOBDIGEST"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Self = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    for source in &mut settings.sources {
      source.path = expand_tilde(&source.path);
    }
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
