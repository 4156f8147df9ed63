//! Filter engine: does a listing satisfy a profile?

use crate::{
  listing::{Listing, LocationClass},
  profile::FilterProfile,
};

/// Evaluate `listing` against `profile`.
///
/// Conjunction across dimensions, disjunction within one. An empty dimension
/// imposes nothing. `unknown` classifications never satisfy a non-empty
/// dimension. Salary is the exception: a listing with no salary figures passes
/// any floor.
pub fn matches(listing: &Listing, profile: &FilterProfile) -> bool {
  keywords_match(listing, profile)
    && locations_match(listing, profile)
    && (profile.levels.is_empty() || profile.levels.contains(&listing.experience_level))
    && (profile.employment_types.is_empty()
      || profile.employment_types.contains(&listing.employment_type))
    && salary_matches(listing, profile)
}

fn keywords_match(listing: &Listing, profile: &FilterProfile) -> bool {
  if profile.keywords.is_empty() {
    return true;
  }
  let title = listing.title.to_lowercase();
  profile
    .keywords
    .iter()
    .any(|k| title.contains(&k.trim().to_lowercase()))
}

fn locations_match(listing: &Listing, profile: &FilterProfile) -> bool {
  if profile.locations.is_empty() {
    return true;
  }
  let text = listing.location_text.to_lowercase();
  profile.locations.iter().any(|token| match LocationClass::from_token(token) {
    Some(class) => {
      listing.location_class != LocationClass::Unknown && listing.location_class == class
    }
    None => {
      let token = token.trim().to_lowercase();
      !token.is_empty() && text.contains(&token)
    }
  })
}

fn salary_matches(listing: &Listing, profile: &FilterProfile) -> bool {
  match (profile.salary_floor, listing.salary_ceiling()) {
    (Some(floor), Some(top)) => top >= floor,
    _ => true,
  }
}
