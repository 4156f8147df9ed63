//! The boundary to the delivery channel, plus plain-text digest rendering.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
  error::DeliveryError,
  listing::{EmploymentType, Listing},
  pipeline::Digest,
};

/// Per-listing result reported by a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
  Delivered,
  Failed { reason: String },
}

impl DeliveryOutcome {
  pub fn is_delivered(&self) -> bool { matches!(self, Self::Delivered) }
}

/// A delivery channel.
///
/// Implementations report one outcome per identity key. Keys missing from the
/// returned list are treated as failed; an `Err` fails the whole digest.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn deliver(
    &self,
    digest: &Digest,
  ) -> Result<Vec<(String, DeliveryOutcome)>, DeliveryError>;
}

// ─── Rendering ───────────────────────────────────────────────────────────────

/// Render a digest as plain-text messages of at most `page_size` listings
/// each. An empty digest renders as a single "nothing new" message.
pub fn render_digest(listings: &[Listing], page_size: usize) -> Vec<String> {
  if listings.is_empty() {
    return vec!["No new jobs found.".to_owned()];
  }
  let page_size = page_size.max(1);
  let pages = listings.len().div_ceil(page_size);

  listings
    .chunks(page_size)
    .enumerate()
    .map(|(page, chunk)| {
      let mut msg = format!("Found {} new job(s)", listings.len());
      if pages > 1 {
        let _ = write!(msg, " (page {}/{})", page + 1, pages);
      }
      msg.push_str("\n\n");
      for (i, listing) in chunk.iter().enumerate() {
        render_listing(&mut msg, page * page_size + i + 1, listing);
      }
      msg.trim_end().to_owned()
    })
    .collect()
}

fn render_listing(out: &mut String, n: usize, l: &Listing) {
  let company = if l.company.is_empty() { "Unknown company" } else { l.company.as_str() };
  let location = if l.location_text.is_empty() {
    "Location not listed"
  } else {
    l.location_text.as_str()
  };
  let _ = writeln!(out, "{n}. {} @ {company}", l.title);
  let _ = writeln!(out, "   {location} | {}", employment_label(l.employment_type));
  let _ = writeln!(out, "   {}", salary_label(l.salary_min, l.salary_max));
  let _ = writeln!(out, "   {} ({})", l.url, l.source);
  out.push('\n');
}

fn employment_label(t: EmploymentType) -> &'static str {
  match t {
    EmploymentType::FullTime => "Full-time",
    EmploymentType::Contract => "Contract",
    EmploymentType::PartTime => "Part-time",
    EmploymentType::Unknown => "Type not listed",
  }
}

fn salary_label(min: Option<i64>, max: Option<i64>) -> String {
  match (min, max) {
    (Some(lo), Some(hi)) => format!("${} - ${}", thousands(lo), thousands(hi)),
    (Some(lo), None) => format!("${}+", thousands(lo)),
    (None, Some(hi)) => format!("up to ${}", thousands(hi)),
    (None, None) => "Salary not listed".to_owned(),
  }
}

fn thousands(n: i64) -> String {
  let digits = n.unsigned_abs().to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
  if n < 0 {
    out.push('-');
  }
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}
