//! The deduplication ledger: which identity keys have been seen, and which
//! have been delivered.
//!
//! The trait is implemented by storage backends (e.g.
//! `jobdigest-store-sqlite`). [`MemoryLedger`] is a process-local
//! implementation for tests and dry runs.

use std::{
  collections::BTreeMap,
  convert::Infallible,
  future::Future,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Entry ───────────────────────────────────────────────────────────────────

/// The persisted fact about one identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
  pub identity_key:  String,
  pub first_seen_at: DateTime<Utc>,
  /// `None` until a delivery is confirmed. Set at most once.
  pub sent_at:       Option<DateTime<Utc>>,
}

impl LedgerEntry {
  pub fn is_sent(&self) -> bool { self.sent_at.is_some() }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable seen/sent state keyed by identity key.
///
/// Every method must behave as if it ran under a per-key critical section:
/// concurrent calls for one key observe each other's effects in some serial
/// order, and the idempotence rules below hold under any interleaving.
///
/// Invariant: `has_sent(k)` implies `has_seen(k)`.
pub trait Ledger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// True iff an entry exists for `key`.
  fn has_seen<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Insert an entry for `key` if absent. Never overwrites `first_seen_at`.
  /// Returns `true` if this call created the entry.
  fn record_seen<'a>(
    &'a self,
    key: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// True iff an entry exists for `key` and its `sent_at` is set.
  fn has_sent<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Set `sent_at` if unset and return the stored value. A repeated call is a
  /// no-op that returns the original timestamp.
  ///
  /// A key that was never seen is inserted with `first_seen_at = at`, keeping
  /// the seen/sent invariant.
  fn record_sent<'a>(
    &'a self,
    key: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<DateTime<Utc>, Self::Error>> + Send + 'a;

  /// Forget `key` entirely so it can appear in a future digest. Returns
  /// `true` if an entry existed.
  fn reset<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Fetch the entry for `key`, if any.
  fn entry<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<LedgerEntry>, Self::Error>> + Send + 'a;

  /// All entries, ordered by identity key.
  fn entries(
    &self,
  ) -> impl Future<Output = Result<Vec<LedgerEntry>, Self::Error>> + Send + '_;
}

// ─── MemoryLedger ────────────────────────────────────────────────────────────

/// An in-process ledger. One mutex guards the whole map, which is a coarser
/// (and therefore still valid) form of per-key serialisation.
#[derive(Debug, Default)]
pub struct MemoryLedger {
  entries: Mutex<BTreeMap<String, LedgerEntry>>,
}

impl MemoryLedger {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, BTreeMap<String, LedgerEntry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Ledger for MemoryLedger {
  type Error = Infallible;

  async fn has_seen(&self, key: &str) -> Result<bool, Infallible> {
    Ok(self.lock().contains_key(key))
  }

  async fn record_seen(&self, key: &str, at: DateTime<Utc>) -> Result<bool, Infallible> {
    let mut entries = self.lock();
    if entries.contains_key(key) {
      return Ok(false);
    }
    entries.insert(key.to_owned(), LedgerEntry {
      identity_key:  key.to_owned(),
      first_seen_at: at,
      sent_at:       None,
    });
    Ok(true)
  }

  async fn has_sent(&self, key: &str) -> Result<bool, Infallible> {
    Ok(self.lock().get(key).is_some_and(LedgerEntry::is_sent))
  }

  async fn record_sent(
    &self,
    key: &str,
    at: DateTime<Utc>,
  ) -> Result<DateTime<Utc>, Infallible> {
    let mut entries = self.lock();
    let entry = entries.entry(key.to_owned()).or_insert_with(|| LedgerEntry {
      identity_key:  key.to_owned(),
      first_seen_at: at,
      sent_at:       None,
    });
    Ok(*entry.sent_at.get_or_insert(at))
  }

  async fn reset(&self, key: &str) -> Result<bool, Infallible> {
    Ok(self.lock().remove(key).is_some())
  }

  async fn entry(&self, key: &str) -> Result<Option<LedgerEntry>, Infallible> {
    Ok(self.lock().get(key).cloned())
  }

  async fn entries(&self) -> Result<Vec<LedgerEntry>, Infallible> {
    Ok(self.lock().values().cloned().collect())
  }
}
