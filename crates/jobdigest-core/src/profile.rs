//! The stored filter profile and the trait for persisting it.

use std::{collections::BTreeSet, future::Future};

use serde::{Deserialize, Serialize};

use crate::listing::{EmploymentType, ExperienceLevel};

/// A user's standing search preferences.
///
/// Every set is a disjunction; an empty set leaves that dimension
/// unconstrained. See [`crate::filter::matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterProfile {
  /// Case-insensitive substrings of the title.
  #[serde(default)]
  pub keywords:         BTreeSet<String>,
  /// Location-class names (`remote`, `onsite`, `hybrid`) or place names.
  #[serde(default)]
  pub locations:        BTreeSet<String>,
  #[serde(default)]
  pub levels:           BTreeSet<ExperienceLevel>,
  #[serde(default)]
  pub employment_types: BTreeSet<EmploymentType>,
  #[serde(default)]
  pub salary_floor:     Option<i64>,
}

impl FilterProfile {
  /// True when the profile accepts every listing.
  pub fn is_unconstrained(&self) -> bool {
    self.keywords.is_empty()
      && self.locations.is_empty()
      && self.levels.is_empty()
      && self.employment_types.is_empty()
      && self.salary_floor.is_none()
  }
}

/// Read/write access to filter profiles keyed by profile id.
///
/// The pipeline only ever reads a profile; writes come from an explicit
/// administrative update.
pub trait ProfileStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch a profile. Returns `None` if none has been stored under `id`.
  fn get_profile<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<FilterProfile>, Self::Error>> + Send + 'a;

  /// Create or replace the profile stored under `id`.
  fn put_profile<'a>(
    &'a self,
    id: &'a str,
    profile: &'a FilterProfile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
