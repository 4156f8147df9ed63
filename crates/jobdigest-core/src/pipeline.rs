//! The pipeline coordinator: fetch → normalise → dedup → ledger → filter →
//! digest, then sent-state commit after delivery.
//!
//! Only ledger failures abort a run. Connector, record and delivery failures
//! are confined to their source, record or listing and show up in the
//! reports instead.

use std::{
  cmp::Ordering,
  collections::{HashMap, HashSet},
  time::Duration,
};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  connector::Connector,
  error::ConnectorError,
  filter,
  ledger::Ledger,
  listing::{Listing, Source},
  normalize,
  notify::{DeliveryOutcome, Notifier},
  profile::FilterProfile,
};

/// Per-connector deadline when none is configured.
pub const DEFAULT_CONNECTOR_TIMEOUT: Duration = Duration::from_secs(15);

// ─── Digest ──────────────────────────────────────────────────────────────────

/// The new, matching, unsent listings of one run, most recently posted first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Digest {
  pub listings: Vec<Listing>,
}

impl Digest {
  pub fn len(&self) -> usize { self.listings.len() }

  pub fn is_empty(&self) -> bool { self.listings.is_empty() }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.listings.iter().map(|l| l.identity_key.as_str())
  }
}

/// Most recent `posted_at` first, undated listings last, ties broken by
/// identity key.
fn digest_order(a: &Listing, b: &Listing) -> Ordering {
  let by_date = match (a.posted_at, b.posted_at) {
    (Some(x), Some(y)) => y.cmp(&x),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  };
  by_date.then_with(|| a.identity_key.cmp(&b.identity_key))
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// What one connector contributed to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
  pub source:  Source,
  pub name:    String,
  /// Raw records returned; zero when the source failed.
  pub fetched: usize,
  pub error:   Option<ConnectorError>,
}

impl SourceReport {
  pub fn is_failed(&self) -> bool { self.error.is_some() }
}

/// Counters and per-source outcomes for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
  pub run_id:       Uuid,
  pub started_at:   DateTime<Utc>,
  pub finished_at:  DateTime<Utc>,
  /// Raw records across all successful sources.
  pub fetched:      usize,
  /// Records that normalised into a listing.
  pub normalized:   usize,
  /// Records dropped as malformed.
  pub malformed:    usize,
  /// Listings dropped because an earlier source or record had the same key.
  pub duplicates:   usize,
  /// Listings left after in-batch deduplication.
  pub deduplicated: usize,
  /// Keys entered into the ledger for the first time this run.
  pub newly_seen:   usize,
  /// Listings dropped because they were delivered in an earlier run.
  pub already_sent: usize,
  /// Listings rejected by the profile.
  pub filtered_out: usize,
  /// Listings in the digest.
  pub final_count:  usize,
  pub sources:      Vec<SourceReport>,
}

impl RunReport {
  fn start() -> Self {
    let now = Utc::now();
    Self {
      run_id:       Uuid::new_v4(),
      started_at:   now,
      finished_at:  now,
      fetched:      0,
      normalized:   0,
      malformed:    0,
      duplicates:   0,
      deduplicated: 0,
      newly_seen:   0,
      already_sent: 0,
      filtered_out: 0,
      final_count:  0,
      sources:      Vec::new(),
    }
  }

  pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
    self.sources.iter().filter(|s| s.is_failed())
  }
}

/// The product of [`Coordinator::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
  pub digest: Digest,
  pub report: RunReport,
}

/// What happened to each listing of a dispatched digest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReport {
  /// Keys confirmed delivered and now marked sent.
  pub delivered: Vec<String>,
  /// Keys left unsent, with the reason. They will be offered again next run.
  pub failed:    Vec<(String, String)>,
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// Drives one pipeline run against an injected ledger.
pub struct Coordinator<L> {
  ledger:  L,
  timeout: Duration,
}

impl<L: Ledger> Coordinator<L> {
  pub fn new(ledger: L) -> Self {
    Self { ledger, timeout: DEFAULT_CONNECTOR_TIMEOUT }
  }

  /// Override the per-connector deadline.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn ledger(&self) -> &L { &self.ledger }

  /// Run the pipeline once.
  ///
  /// `connectors` are in priority order: when two of them yield the same
  /// identity key, the earlier one's listing is kept. Returns
  /// [`Error::LedgerUnavailable`] if the ledger fails; no sent-state is
  /// written by this method in any case.
  pub async fn run(
    &self,
    connectors: &[Box<dyn Connector>],
    profile: &FilterProfile,
  ) -> Result<RunOutcome> {
    let mut report = RunReport::start();
    info!(run_id = %report.run_id, sources = connectors.len(), "starting run");

    // 1. Fetch every source concurrently, each under its own deadline.
    let timeout = self.timeout;
    let results = join_all(connectors.iter().map(|c| async move {
      match tokio::time::timeout(timeout, c.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(ConnectorError::Timeout(timeout)),
      }
    }))
    .await;

    // 2. Normalise, and 3. dedup within the batch, in priority order.
    let fetched_at = Utc::now();
    let mut batch: Vec<Listing> = Vec::new();
    let mut batch_keys: HashSet<String> = HashSet::new();

    for (connector, result) in connectors.iter().zip(results) {
      let name = connector.name();
      let records = match result {
        Ok(records) => records,
        Err(e) => {
          warn!(run_id = %report.run_id, source = %name, error = %e, "source failed, skipping");
          report.sources.push(SourceReport {
            source:  connector.source(),
            name,
            fetched: 0,
            error:   Some(e),
          });
          continue;
        }
      };

      report.fetched += records.len();
      report.sources.push(SourceReport {
        source:  connector.source(),
        name:    name.clone(),
        fetched: records.len(),
        error:   None,
      });

      for raw in &records {
        let listing = match normalize::normalize(raw, fetched_at) {
          Ok(listing) => listing,
          Err(e) => {
            warn!(run_id = %report.run_id, source = %name, error = %e, "dropping record");
            report.malformed += 1;
            continue;
          }
        };
        report.normalized += 1;

        if batch_keys.insert(listing.identity_key.clone()) {
          batch.push(listing);
        } else {
          debug!(key = %listing.identity_key, source = %name, "duplicate in batch");
          report.duplicates += 1;
        }
      }
    }
    report.deduplicated = batch.len();

    // 4. Ledger: mark seen, drop anything already delivered.
    let mut candidates = Vec::with_capacity(batch.len());
    for listing in batch {
      let key = listing.identity_key.as_str();
      if !self.ledger.has_seen(key).await.map_err(Error::ledger)? {
        let created =
          self.ledger.record_seen(key, fetched_at).await.map_err(Error::ledger)?;
        if created {
          report.newly_seen += 1;
        }
      }
      if self.ledger.has_sent(key).await.map_err(Error::ledger)? {
        debug!(key, "already sent");
        report.already_sent += 1;
        continue;
      }
      candidates.push(listing);
    }

    // 5. Filter.
    let candidate_count = candidates.len();
    let mut listings: Vec<Listing> = candidates
      .into_iter()
      .filter(|l| {
        let keep = filter::matches(l, profile);
        if !keep {
          debug!(key = %l.identity_key, "filtered out");
        }
        keep
      })
      .collect();
    report.filtered_out = candidate_count - listings.len();

    // 6. Order.
    listings.sort_by(digest_order);

    // 7. Report.
    report.final_count = listings.len();
    report.finished_at = Utc::now();
    info!(
      run_id = %report.run_id,
      fetched = report.fetched,
      normalized = report.normalized,
      malformed = report.malformed,
      duplicates = report.duplicates,
      newly_seen = report.newly_seen,
      already_sent = report.already_sent,
      filtered_out = report.filtered_out,
      final_count = report.final_count,
      failed_sources = report.failed_sources().count(),
      "run complete"
    );

    Ok(RunOutcome { digest: Digest { listings }, report })
  }

  /// Record a confirmed delivery. Idempotent; returns the stored `sent_at`.
  pub async fn confirm_sent(&self, key: &str, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
    self.ledger.record_sent(key, at).await.map_err(Error::ledger)
  }

  /// Hand `digest` to `notifier` and commit sent-state for the listings it
  /// reports delivered.
  ///
  /// Listings the notifier does not mention, or every listing if it fails
  /// outright, are reported failed and stay unsent. Only a ledger failure
  /// while committing returns `Err`.
  pub async fn dispatch(
    &self,
    notifier: &dyn Notifier,
    digest: &Digest,
  ) -> Result<DeliveryReport> {
    let mut report = DeliveryReport::default();
    if digest.is_empty() {
      return Ok(report);
    }

    let mut outcomes: HashMap<String, DeliveryOutcome> = match notifier.deliver(digest).await {
      Ok(outcomes) => outcomes.into_iter().collect(),
      Err(e) => {
        warn!(error = %e, listings = digest.len(), "digest delivery failed");
        report.failed = digest.keys().map(|k| (k.to_owned(), e.to_string())).collect();
        return Ok(report);
      }
    };

    let at = Utc::now();
    for key in digest.keys() {
      match outcomes.remove(key) {
        Some(DeliveryOutcome::Delivered) => {
          self.confirm_sent(key, at).await?;
          report.delivered.push(key.to_owned());
        }
        Some(DeliveryOutcome::Failed { reason }) => {
          warn!(key, %reason, "delivery failed");
          report.failed.push((key.to_owned(), reason));
        }
        None => {
          warn!(key, "notifier reported no outcome");
          report.failed.push((key.to_owned(), "no outcome reported".to_owned()));
        }
      }
    }
    for key in outcomes.keys() {
      warn!(key = %key, "notifier reported an outcome for a key not in the digest");
    }

    info!(delivered = report.delivered.len(), failed = report.failed.len(), "dispatch complete");
    Ok(report)
  }
}
