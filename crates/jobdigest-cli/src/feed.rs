//! File-backed connectors: read a provider-shaped JSON payload from disk.
//!
//! The payload is either a bare array of job objects or an envelope holding
//! one under `data`, `results` or `jobs`. Each object becomes one
//! [`RawRecord`] whose field values are flattened to strings.

use std::path::PathBuf;

use async_trait::async_trait;
use jobdigest_core::{
  connector::Connector,
  error::ConnectorError,
  listing::{RawRecord, Source},
};
use serde_json::Value;
use tracing::debug;

use crate::settings::SourceConfig;

const ENVELOPE_KEYS: &[&str] = &["data", "results", "jobs"];

pub struct FileConnector {
  source: Source,
  name:   String,
  path:   PathBuf,
}

impl FileConnector {
  pub fn new(source: Source, path: impl Into<PathBuf>) -> Self {
    Self { source, name: source.to_string(), path: path.into() }
  }

  pub fn from_config(cfg: &SourceConfig) -> Self {
    let mut connector = Self::new(cfg.source, &cfg.path);
    if let Some(name) = &cfg.name {
      connector.name = name.clone();
    }
    connector
  }
}

#[async_trait]
impl Connector for FileConnector {
  fn source(&self) -> Source { self.source }

  fn name(&self) -> String { self.name.clone() }

  async fn fetch(&self) -> Result<Vec<RawRecord>, ConnectorError> {
    let body = tokio::fs::read_to_string(&self.path)
      .await
      .map_err(|e| ConnectorError::Transport(format!("{}: {e}", self.path.display())))?;
    let records = parse_feed(self.source, &body)?;
    debug!(source = %self.name, records = records.len(), path = %self.path.display(), "read feed");
    Ok(records)
  }
}

/// Parse a feed body into raw records tagged with `source`.
pub fn parse_feed(source: Source, body: &str) -> Result<Vec<RawRecord>, ConnectorError> {
  let value: Value = serde_json::from_str(body)
    .map_err(|e| ConnectorError::MalformedResponse(e.to_string()))?;

  let items = match value {
    Value::Array(items) => items,
    Value::Object(mut envelope) => ENVELOPE_KEYS
      .iter()
      .find_map(|k| match envelope.remove(*k) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
      })
      .ok_or_else(|| {
        ConnectorError::MalformedResponse("no job array in response".to_owned())
      })?,
    _ => {
      return Err(ConnectorError::MalformedResponse(
        "expected a JSON array or object".to_owned(),
      ));
    }
  };

  Ok(
    items
      .into_iter()
      .filter_map(|item| match item {
        Value::Object(fields) => Some(RawRecord {
          source,
          fields: fields
            .into_iter()
            .filter_map(|(k, v)| flatten(v).map(|v| (k, v)))
            .collect(),
        }),
        _ => None,
      })
      .collect(),
  )
}

/// Render one JSON value as a field string. `null` is dropped; arrays of
/// scalars are comma-joined.
fn flatten(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s),
    Value::Bool(b) => Some(b.to_string()),
    Value::Number(n) => Some(n.to_string()),
    Value::Array(items) => {
      let parts: Vec<String> = items.into_iter().filter_map(flatten).collect();
      Some(parts.join(", "))
    }
    obj @ Value::Object(_) => Some(obj.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn bare_array_of_objects() {
    let body = r#"[
      {"legal": "notice"},
      {"position": "Data Engineer", "url": "https://remoteok.com/1",
       "salary_min": 90000, "tags": ["python", "contract"], "logo": null}
    ]"#;
    let records = parse_feed(Source::RemoteOk, body).unwrap();
    assert_eq!(records.len(), 2);
    let job = &records[1];
    assert_eq!(job.source, Source::RemoteOk);
    assert_eq!(job.get("position"), Some("Data Engineer"));
    assert_eq!(job.get("salary_min"), Some("90000"));
    assert_eq!(job.get("tags"), Some("python, contract"));
    assert!(!job.fields.contains_key("logo"));
  }

  #[test]
  fn envelope_keys_are_unwrapped() {
    let body = r#"{"status": "OK", "data": [{"job_title": "Analyst", "job_is_remote": true}]}"#;
    let records = parse_feed(Source::JSearch, body).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("job_is_remote"), Some("true"));

    let body = r#"{"count": 1, "results": [{"role": "Engineer"}]}"#;
    assert_eq!(parse_feed(Source::FindWork, body).unwrap().len(), 1);
  }

  #[test]
  fn non_array_payloads_are_malformed() {
    assert!(matches!(
      parse_feed(Source::Feed, r#"{"message": "quota exceeded"}"#),
      Err(ConnectorError::MalformedResponse(_))
    ));
    assert!(matches!(
      parse_feed(Source::Feed, "<html>"),
      Err(ConnectorError::MalformedResponse(_))
    ));
    assert!(matches!(
      parse_feed(Source::Feed, "42"),
      Err(ConnectorError::MalformedResponse(_))
    ));
  }

  #[tokio::test]
  async fn fetch_reads_the_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"[{{"url": "https://x.com/job1", "title": "Data Engineer"}}]"#).unwrap();

    let connector = FileConnector::new(Source::Feed, file.path());
    assert_eq!(connector.name(), "feed");
    let records = connector.fetch().await.unwrap();
    assert_eq!(records[0].get("url"), Some("https://x.com/job1"));
  }

  #[tokio::test]
  async fn missing_file_is_a_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let connector = FileConnector::from_config(&SourceConfig {
      source: Source::Indeed,
      path:   dir.path().join("gone.json"),
      name:   Some("indeed rss".to_owned()),
    });
    assert_eq!(connector.name(), "indeed rss");
    assert!(matches!(connector.fetch().await, Err(ConnectorError::Transport(_))));
  }
}
