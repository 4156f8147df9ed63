//! Error types for `jobdigest-core`.
//!
//! Only [`Error::LedgerUnavailable`] is fatal to a pipeline run. The other
//! types are scoped to a single record, source or delivery and are reported,
//! never propagated past that scope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::listing::Source;

#[derive(Debug, Error)]
pub enum Error {
  /// The durable ledger could not be read or written. Aborts the run before
  /// any delivery is attempted.
  #[error("ledger unavailable: {0}")]
  LedgerUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("unknown source tag: {0:?}")]
  UnknownSource(String),

  #[error("unknown {dimension} value: {value:?}")]
  UnknownValue {
    dimension: &'static str,
    value:     String,
  },
}

impl Error {
  pub fn ledger(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::LedgerUnavailable(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A raw record that could not be turned into a listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {origin} record: missing {field}")]
pub struct MalformedRecord {
  pub origin: Source,
  pub field:  &'static str,
}

/// Why a connector produced nothing this run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConnectorError {
  #[error("timed out after {0:?}")]
  Timeout(std::time::Duration),

  #[error("rate limited")]
  RateLimited,

  #[error("malformed response: {0}")]
  MalformedResponse(String),

  #[error("transport error: {0}")]
  Transport(String),
}

/// A notifier could not deliver a digest at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);
