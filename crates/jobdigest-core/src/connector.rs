//! The boundary to external job sources.

use async_trait::async_trait;

use crate::{
  error::ConnectorError,
  listing::{RawRecord, Source},
};

/// One external job source.
///
/// A connector returns its whole batch or fails; it never retries
/// internally. The coordinator bounds every call with a deadline, so
/// implementations must tolerate being dropped mid-fetch.
#[async_trait]
pub trait Connector: Send + Sync {
  /// The tag stamped on every record this connector yields.
  fn source(&self) -> Source;

  /// Human-readable name for run reports. Defaults to the source tag.
  fn name(&self) -> String { self.source().to_string() }

  async fn fetch(&self) -> Result<Vec<RawRecord>, ConnectorError>;
}
