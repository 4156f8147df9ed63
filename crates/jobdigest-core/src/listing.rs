//! Listing types: the canonical shape every source is normalised into.
//!
//! A [`Listing`] is rebuilt from scratch on every pipeline run and is never
//! persisted. Only its `identity_key` outlives the run, inside the ledger.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Source ──────────────────────────────────────────────────────────────────

/// Which connector produced a record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  RemoteOk,
  JSearch,
  Arbeitnow,
  LinkedIn,
  Indeed,
  FindWork,
  /// A generic feed that already uses canonical field names.
  Feed,
}

impl Source {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::RemoteOk => "remoteok",
      Self::JSearch => "jsearch",
      Self::Arbeitnow => "arbeitnow",
      Self::LinkedIn => "linkedin",
      Self::Indeed => "indeed",
      Self::FindWork => "findwork",
      Self::Feed => "feed",
    }
  }
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Source {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "remoteok" => Ok(Self::RemoteOk),
      "jsearch" => Ok(Self::JSearch),
      "arbeitnow" => Ok(Self::Arbeitnow),
      "linkedin" => Ok(Self::LinkedIn),
      "indeed" => Ok(Self::Indeed),
      "findwork" => Ok(Self::FindWork),
      "feed" => Ok(Self::Feed),
      other => Err(Error::UnknownSource(other.to_owned())),
    }
  }
}

// ─── Classifications ─────────────────────────────────────────────────────────

/// Where the work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationClass {
  Remote,
  Onsite,
  Hybrid,
  #[default]
  Unknown,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
  FullTime,
  Contract,
  PartTime,
  #[default]
  Unknown,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
  Junior,
  Mid,
  Senior,
  #[default]
  Unknown,
}

impl LocationClass {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Remote => "remote",
      Self::Onsite => "onsite",
      Self::Hybrid => "hybrid",
      Self::Unknown => "unknown",
    }
  }

  /// Parse a filter token naming a class. City names return `None`.
  pub fn from_token(token: &str) -> Option<Self> {
    match token.trim().to_ascii_lowercase().as_str() {
      "remote" => Some(Self::Remote),
      "onsite" | "on-site" | "on site" => Some(Self::Onsite),
      "hybrid" => Some(Self::Hybrid),
      _ => None,
    }
  }
}

impl EmploymentType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::FullTime => "full_time",
      Self::Contract => "contract",
      Self::PartTime => "part_time",
      Self::Unknown => "unknown",
    }
  }
}

impl FromStr for EmploymentType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
      "full_time" | "fulltime" => Ok(Self::FullTime),
      "contract" => Ok(Self::Contract),
      "part_time" | "parttime" => Ok(Self::PartTime),
      "unknown" => Ok(Self::Unknown),
      other => Err(Error::UnknownValue {
        dimension: "employment type",
        value:     other.to_owned(),
      }),
    }
  }
}

impl ExperienceLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Junior => "junior",
      Self::Mid => "mid",
      Self::Senior => "senior",
      Self::Unknown => "unknown",
    }
  }
}

impl FromStr for ExperienceLevel {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "junior" => Ok(Self::Junior),
      "mid" => Ok(Self::Mid),
      "senior" => Ok(Self::Senior),
      "unknown" => Ok(Self::Unknown),
      other => Err(Error::UnknownValue {
        dimension: "experience level",
        value:     other.to_owned(),
      }),
    }
  }
}

// ─── RawRecord ───────────────────────────────────────────────────────────────

/// One record exactly as a connector produced it, in provider-native field
/// names. The per-source adapters in [`crate::normalize`] know how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
  pub source: Source,
  pub fields: BTreeMap<String, String>,
}

impl RawRecord {
  pub fn new(source: Source) -> Self {
    Self { source, fields: BTreeMap::new() }
  }

  /// Builder-style field setter, mostly for tests and fixtures.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.fields.insert(key.into(), value.into());
    self
  }

  /// The trimmed value of `key`, or `None` when absent or blank.
  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .fields
      .get(key)
      .map(|v| v.trim())
      .filter(|v| !v.is_empty())
  }

  /// The first present field among `keys`.
  pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
    keys.iter().find_map(|k| self.get(k))
  }
}

// ─── Listing ─────────────────────────────────────────────────────────────────

/// A canonical job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
  /// Lower-cased URL without query string or fragment. The only field used
  /// to decide whether two listings are the same posting.
  pub identity_key:     String,
  pub source:           Source,
  /// The posting URL as supplied, suitable for linking.
  pub url:              String,
  pub title:            String,
  pub company:          String,
  pub location_text:    String,
  pub location_class:   LocationClass,
  pub employment_type:  EmploymentType,
  pub experience_level: ExperienceLevel,
  pub salary_min:       Option<i64>,
  pub salary_max:       Option<i64>,
  pub description:      Option<String>,
  pub posted_at:        Option<DateTime<Utc>>,
  pub fetched_at:       DateTime<Utc>,
  /// Audit copy of the original record. Never compared.
  pub raw_payload:      RawRecord,
}

impl Listing {
  /// The salary figure the floor is checked against: the top of the range
  /// when known, else the bottom.
  pub fn salary_ceiling(&self) -> Option<i64> { self.salary_max.or(self.salary_min) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn source_parses_case_insensitively() {
    assert_eq!("RemoteOK".parse::<Source>().unwrap(), Source::RemoteOk);
    assert_eq!(" linkedin ".parse::<Source>().unwrap(), Source::LinkedIn);
    assert!(matches!(
      "monster".parse::<Source>(),
      Err(Error::UnknownSource(s)) if s == "monster"
    ));
  }

  #[test]
  fn source_display_matches_serde() {
    let json = serde_json::to_string(&Source::JSearch).unwrap();
    assert_eq!(json, format!("\"{}\"", Source::JSearch));
  }

  #[test]
  fn employment_type_accepts_hyphenated_forms() {
    assert_eq!("full-time".parse::<EmploymentType>().unwrap(), EmploymentType::FullTime);
    assert_eq!("Part_Time".parse::<EmploymentType>().unwrap(), EmploymentType::PartTime);
    assert!("gig".parse::<EmploymentType>().is_err());
  }

  #[test]
  fn raw_record_get_skips_blank_values() {
    let raw = RawRecord::new(Source::Feed)
      .with("url", "   ")
      .with("link", " https://a.example/1 ");
    assert_eq!(raw.get("url"), None);
    assert_eq!(raw.first_of(&["url", "link"]), Some("https://a.example/1"));
  }
}
