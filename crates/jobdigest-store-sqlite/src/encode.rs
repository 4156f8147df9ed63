//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Profile sets are stored as
//! compact JSON arrays.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use jobdigest_core::{ledger::LedgerEntry, profile::FilterProfile};
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Sets ────────────────────────────────────────────────────────────────────

pub fn encode_set<T: Serialize>(set: &BTreeSet<T>) -> Result<String> {
  Ok(serde_json::to_string(set)?)
}

pub fn decode_set<T: DeserializeOwned + Ord>(s: &str) -> Result<BTreeSet<T>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `ledger` row.
pub struct RawEntry {
  pub identity_key:  String,
  pub first_seen_at: String,
  pub sent_at:       Option<String>,
}

impl RawEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_key:  row.get(0)?,
      first_seen_at: row.get(1)?,
      sent_at:       row.get(2)?,
    })
  }

  pub fn into_entry(self) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
      identity_key:  self.identity_key,
      first_seen_at: decode_dt(&self.first_seen_at)?,
      sent_at:       self.sent_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub keywords:         String,
  pub locations:        String,
  pub levels:           String,
  pub employment_types: String,
  pub salary_floor:     Option<i64>,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      keywords:         row.get(0)?,
      locations:        row.get(1)?,
      levels:           row.get(2)?,
      employment_types: row.get(3)?,
      salary_floor:     row.get(4)?,
    })
  }

  pub fn into_profile(self) -> Result<FilterProfile> {
    Ok(FilterProfile {
      keywords:         decode_set(&self.keywords)?,
      locations:        decode_set(&self.locations)?,
      levels:           decode_set(&self.levels)?,
      employment_types: decode_set(&self.employment_types)?,
      salary_floor:     self.salary_floor,
    })
  }
}
