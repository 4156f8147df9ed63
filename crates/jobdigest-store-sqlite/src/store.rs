//! [`SqliteStore`]: the SQLite implementation of [`Ledger`] and
//! [`ProfileStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use jobdigest_core::{
  ledger::{Ledger, LedgerEntry},
  profile::{FilterProfile, ProfileStore},
};

use crate::{
  Result,
  encode::{RawEntry, RawProfile, decode_dt, encode_dt, encode_set},
  error::Error,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ledger and profile store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted. Every call
/// runs on the connection's single worker thread, so statements for one key
/// never interleave within a process.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests and dry runs.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Ledger impl ─────────────────────────────────────────────────────────────

impl Ledger for SqliteStore {
  type Error = Error;

  async fn has_seen(&self, key: &str) -> Result<bool> {
    let key = key.to_owned();
    let seen = self
      .conn
      .call(move |conn| {
        let seen = conn
          .query_row(
            "SELECT 1 FROM ledger WHERE identity_key = ?1",
            rusqlite::params![key],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(seen)
      })
      .await?;
    Ok(seen)
  }

  async fn record_seen(&self, key: &str, at: DateTime<Utc>) -> Result<bool> {
    let key = key.to_owned();
    let at_str = encode_dt(at);
    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO ledger (identity_key, first_seen_at) VALUES (?1, ?2)",
          rusqlite::params![key, at_str],
        )?;
        Ok(n == 1)
      })
      .await?;
    Ok(inserted)
  }

  async fn has_sent(&self, key: &str) -> Result<bool> {
    let key = key.to_owned();
    let sent = self
      .conn
      .call(move |conn| {
        let sent = conn
          .query_row(
            "SELECT 1 FROM ledger WHERE identity_key = ?1 AND sent_at IS NOT NULL",
            rusqlite::params![key],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(sent)
      })
      .await?;
    Ok(sent)
  }

  async fn record_sent(&self, key: &str, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let key = key.to_owned();
    let at_str = encode_dt(at);
    let stored: String = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT OR IGNORE INTO ledger (identity_key, first_seen_at) VALUES (?1, ?2)",
          rusqlite::params![key, at_str],
        )?;
        // Only the first confirmation wins.
        tx.execute(
          "UPDATE ledger SET sent_at = ?2 WHERE identity_key = ?1 AND sent_at IS NULL",
          rusqlite::params![key, at_str],
        )?;
        let stored: String = tx.query_row(
          "SELECT sent_at FROM ledger WHERE identity_key = ?1",
          rusqlite::params![key],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(stored)
      })
      .await?;
    decode_dt(&stored)
  }

  async fn reset(&self, key: &str) -> Result<bool> {
    let key = key.to_owned();
    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM ledger WHERE identity_key = ?1",
          rusqlite::params![key],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(removed)
  }

  async fn entry(&self, key: &str) -> Result<Option<LedgerEntry>> {
    let key = key.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            "SELECT identity_key, first_seen_at, sent_at FROM ledger
             WHERE identity_key = ?1",
            rusqlite::params![key],
            RawEntry::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawEntry::into_entry).transpose()
  }

  async fn entries(&self) -> Result<Vec<LedgerEntry>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT identity_key, first_seen_at, sent_at FROM ledger
           ORDER BY identity_key",
        )?;
        let rows = stmt
          .query_map([], RawEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawEntry::into_entry).collect()
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = Error;

  async fn get_profile(&self, id: &str) -> Result<Option<FilterProfile>> {
    let id = id.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            "SELECT keywords, locations, levels, employment_types, salary_floor
             FROM profiles WHERE profile_id = ?1",
            rusqlite::params![id],
            RawProfile::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawProfile::into_profile).transpose()
  }

  async fn put_profile(&self, id: &str, profile: &FilterProfile) -> Result<()> {
    let id               = id.to_owned();
    let keywords         = encode_set(&profile.keywords)?;
    let locations        = encode_set(&profile.locations)?;
    let levels           = encode_set(&profile.levels)?;
    let employment_types = encode_set(&profile.employment_types)?;
    let salary_floor     = profile.salary_floor;
    let updated_at       = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (
             profile_id, keywords, locations, levels, employment_types,
             salary_floor, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (profile_id) DO UPDATE SET
             keywords         = excluded.keywords,
             locations        = excluded.locations,
             levels           = excluded.levels,
             employment_types = excluded.employment_types,
             salary_floor     = excluded.salary_floor,
             updated_at       = excluded.updated_at",
          rusqlite::params![
            id,
            keywords,
            locations,
            levels,
            employment_types,
            salary_floor,
            updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
