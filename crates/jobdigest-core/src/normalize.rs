//! Normaliser: provider-native [`RawRecord`]s → canonical [`Listing`]s.
//!
//! Each source has an explicit adapter that reads its own field names into a
//! shared intermediate shape. Classification and identity derivation happen
//! once, on that shape, so every source is treated identically from there on.
//!
//! Everything here is pure: no I/O, no clock reads (`fetched_at` is passed in).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::{
  error::MalformedRecord,
  listing::{EmploymentType, ExperienceLevel, Listing, LocationClass, RawRecord, Source},
};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Derive the deduplication key for a posting URL: trimmed, query string and
/// fragment removed, lower-cased.
///
/// ```
/// use jobdigest_core::normalize::identity_key;
/// assert_eq!(identity_key("X.com/Job1?ref=fb#apply"), "x.com/job1");
/// ```
pub fn identity_key(url: &str) -> String {
  let url = url.trim();
  let end = url.find(['?', '#']).unwrap_or(url.len());
  url[..end].to_lowercase()
}

// ─── Token tables ────────────────────────────────────────────────────────────

// Entries are written in the form produced by `word_text`: lower-case words
// separated by single spaces.

const REMOTE_TOKENS: &[&str] = &[
  "remote",
  "anywhere",
  "worldwide",
  "work from home",
  "wfh",
  "distributed",
  "telecommute",
];

const HYBRID_TOKENS: &[&str] = &["hybrid"];

const ONSITE_TOKENS: &[&str] =
  &["onsite", "on site", "in office", "office based", "in person"];

const CONTRACT_TOKENS: &[&str] = &[
  "contract",
  "contractor",
  "freelance",
  "freelancer",
  "temporary",
  "temp",
  "c2c",
  "1099",
  "fixed term",
];

const PART_TIME_TOKENS: &[&str] = &["part time", "parttime"];

const FULL_TIME_TOKENS: &[&str] = &["full time", "fulltime", "permanent"];

const SENIOR_TOKENS: &[&str] =
  &["senior", "sr", "lead", "principal", "staff", "head of", "architect"];

const MID_TOKENS: &[&str] = &["mid", "mid level", "midlevel", "intermediate"];

const JUNIOR_TOKENS: &[&str] = &[
  "junior",
  "jr",
  "entry level",
  "graduate",
  "grad",
  "intern",
  "internship",
  "trainee",
];

/// Lower-case `text` and collapse every run of non-alphanumerics into one
/// space, with a space at each end so tokens match on word boundaries.
fn word_text(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push(' ');
  for word in text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|w| !w.is_empty())
  {
    out.push_str(&word.to_lowercase());
    out.push(' ');
  }
  out
}

fn has_token(words: &str, tokens: &[&str]) -> bool {
  tokens.iter().any(|t| words.contains(&format!(" {t} ")))
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Classify a free-text location. A provider-side remote flag wins over the
/// text.
pub fn classify_location(text: &str, remote_flag: bool) -> LocationClass {
  if remote_flag {
    return LocationClass::Remote;
  }
  let words = word_text(text);
  if has_token(&words, REMOTE_TOKENS) {
    LocationClass::Remote
  } else if has_token(&words, HYBRID_TOKENS) {
    LocationClass::Hybrid
  } else if has_token(&words, ONSITE_TOKENS) {
    LocationClass::Onsite
  } else {
    // A bare place name ("Austin, TX", "Europe") says nothing about the
    // working arrangement.
    LocationClass::Unknown
  }
}

/// Classify employment type from the texts in priority order: the first text
/// with any matching token decides.
pub fn classify_employment(texts: &[Option<&str>]) -> EmploymentType {
  for text in texts.iter().flatten() {
    let words = word_text(text);
    if has_token(&words, CONTRACT_TOKENS) {
      return EmploymentType::Contract;
    }
    if has_token(&words, PART_TIME_TOKENS) {
      return EmploymentType::PartTime;
    }
    if has_token(&words, FULL_TIME_TOKENS) {
      return EmploymentType::FullTime;
    }
  }
  EmploymentType::Unknown
}

/// Classify seniority from the texts in priority order.
pub fn classify_level(texts: &[Option<&str>]) -> ExperienceLevel {
  for text in texts.iter().flatten() {
    let words = word_text(text);
    if has_token(&words, SENIOR_TOKENS) {
      return ExperienceLevel::Senior;
    }
    if has_token(&words, MID_TOKENS) {
      return ExperienceLevel::Mid;
    }
    if has_token(&words, JUNIOR_TOKENS) {
      return ExperienceLevel::Junior;
    }
  }
  ExperienceLevel::Unknown
}

// ─── Value parsing ───────────────────────────────────────────────────────────

/// Parse a provider timestamp. Accepts RFC 3339, RFC 2822, `YYYY-MM-DD`,
/// `YYYY-MM-DD HH:MM:SS` and Unix epoch seconds (or milliseconds).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
    return Some(ndt.and_utc());
  }
  if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    return date.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
  }
  if s.bytes().all(|b| b.is_ascii_digit()) {
    let n: i64 = s.parse().ok()?;
    // Anything past the year 33658 in seconds is really milliseconds.
    return if n > 1_000_000_000_000 {
      DateTime::from_timestamp_millis(n)
    } else {
      DateTime::from_timestamp(n, 0)
    };
  }
  None
}

/// Parse the first amount in `s`: `120000`, `$120,000`, `120k`, `85.5K`.
pub fn parse_amount(s: &str) -> Option<i64> {
  let start = s.find(|c: char| c.is_ascii_digit())?;
  let rest = &s[start..];
  let end = rest
    .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
    .unwrap_or(rest.len());
  let number: String = rest[..end].chars().filter(|c| *c != ',').collect();
  let mut value: f64 = number.trim_end_matches('.').parse().ok()?;
  if rest[end..].trim_start().starts_with(['k', 'K']) {
    value *= 1000.0;
  }
  (value.is_finite() && value > 0.0).then(|| value.round() as i64)
}

/// Parse a salary range such as `"$100k - $150k"` or `"90000 to 120000"`.
/// A single figure becomes the minimum; an inverted range is swapped.
pub fn parse_salary_range(s: &str) -> (Option<i64>, Option<i64>) {
  let lower = s.to_lowercase();
  let mut parts = lower
    .split(['-', '–', '—'])
    .flat_map(|p| p.split(" to "))
    .filter_map(parse_amount);
  let min = parts.next();
  let max = parts.next();
  order_range(min, max)
}

fn order_range(min: Option<i64>, max: Option<i64>) -> (Option<i64>, Option<i64>) {
  match (min, max) {
    (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
    other => other,
  }
}

/// The raw value of query parameter `name` in `url`, if present and non-empty.
fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
  let (_, query) = url.split_once('?')?;
  let query = query.split('#').next().unwrap_or_default();
  query
    .split('&')
    .filter_map(|pair| pair.split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v.trim())
    .filter(|v| !v.is_empty())
}

fn parse_flag(s: Option<&str>) -> bool {
  matches!(
    s.map(|v| v.to_ascii_lowercase()).as_deref(),
    Some("true" | "1" | "yes")
  )
}

// ─── Adapters ────────────────────────────────────────────────────────────────

/// The source-independent intermediate shape produced by each adapter.
#[derive(Debug, Default)]
struct Fields<'a> {
  url:         Option<String>,
  /// Canonical posting URL for the identity key when `url` keeps the posting
  /// id in its query string.
  identity:    Option<String>,
  title:       Option<String>,
  company:     Option<&'a str>,
  location:    String,
  remote:      bool,
  salary_min:  Option<i64>,
  salary_max:  Option<i64>,
  type_hint:   Option<&'a str>,
  posted_at:   Option<DateTime<Utc>>,
  description: Option<&'a str>,
}

fn adapt(raw: &RawRecord) -> Fields<'_> {
  match raw.source {
    Source::RemoteOk => adapt_remoteok(raw),
    Source::JSearch => adapt_jsearch(raw),
    Source::Arbeitnow => adapt_arbeitnow(raw),
    Source::LinkedIn => adapt_linkedin(raw),
    Source::Indeed => adapt_indeed(raw),
    Source::FindWork => adapt_findwork(raw),
    Source::Feed => adapt_feed(raw),
  }
}

/// RemoteOK lists remote positions only; a record without `url` is linked via
/// its slug.
fn adapt_remoteok(raw: &RawRecord) -> Fields<'_> {
  let url = raw.get("url").map(str::to_owned).or_else(|| {
    raw
      .get("slug")
      .map(|slug| format!("https://remoteok.com/remote-jobs/{slug}"))
  });
  let (salary_min, salary_max) = order_range(
    raw.get("salary_min").and_then(parse_amount),
    raw.get("salary_max").and_then(parse_amount),
  );
  Fields {
    url,
    identity: None,
    title: raw.get("position").map(str::to_owned),
    company: raw.get("company"),
    location: raw.get("location").unwrap_or("Remote").to_owned(),
    remote: true,
    salary_min,
    salary_max,
    type_hint: raw.get("tags"),
    posted_at: raw.first_of(&["date", "epoch"]).and_then(parse_timestamp),
    description: raw.get("description"),
  }
}

fn adapt_jsearch(raw: &RawRecord) -> Fields<'_> {
  let location = [raw.get("job_city"), raw.get("job_state")]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ");
  let (salary_min, salary_max) = order_range(
    raw.get("job_min_salary").and_then(parse_amount),
    raw.get("job_max_salary").and_then(parse_amount),
  );
  // Google job links differ only in their query string, so without an apply
  // link the posting is keyed by its JSearch id.
  let apply = raw.get("job_apply_link");
  let google = raw.get("job_google_link");
  let identity = match apply {
    Some(_) => None,
    None => raw
      .get("job_id")
      .or_else(|| google.and_then(|link| query_param(link, "htidocid")))
      .map(|id| format!("https://www.google.com/search/jobs/{id}")),
  };
  Fields {
    url: apply.or(google).map(str::to_owned),
    identity,
    title: raw.get("job_title").map(str::to_owned),
    company: raw.get("employer_name"),
    location,
    remote: parse_flag(raw.get("job_is_remote")),
    salary_min,
    salary_max,
    type_hint: raw.get("job_employment_type"),
    posted_at: raw
      .first_of(&["job_posted_at_datetime_utc", "job_posted_at_timestamp"])
      .and_then(parse_timestamp),
    description: raw.get("job_description"),
  }
}

fn adapt_arbeitnow(raw: &RawRecord) -> Fields<'_> {
  Fields {
    url: raw.get("url").map(str::to_owned),
    title: raw.get("title").map(str::to_owned),
    company: raw.get("company_name"),
    location: raw.get("location").unwrap_or_default().to_owned(),
    remote: parse_flag(raw.get("remote")),
    type_hint: raw.first_of(&["job_types", "tags"]),
    posted_at: raw.get("created_at").and_then(parse_timestamp),
    description: raw.get("description"),
    ..Fields::default()
  }
}

fn adapt_linkedin(raw: &RawRecord) -> Fields<'_> {
  Fields {
    url: raw.get("url").map(str::to_owned),
    title: raw.get("title").map(str::to_owned),
    company: raw.get("company"),
    location: raw.get("location").unwrap_or_default().to_owned(),
    posted_at: raw.first_of(&["posted_at", "listed_at"]).and_then(parse_timestamp),
    ..Fields::default()
  }
}

/// Indeed RSS items carry the employer inside the title as `"Title - Company"`.
fn adapt_indeed(raw: &RawRecord) -> Fields<'_> {
  let mut title = raw.get("title").map(str::to_owned);
  let mut company = raw.get("company");
  if company.is_none()
    && let Some(full) = raw.get("title")
    && let Some((head, tail)) = full.rsplit_once(" - ")
  {
    title = Some(head.trim().to_owned());
    company = Some(tail.trim());
  }
  let (salary_min, salary_max) = raw
    .get("salary")
    .map(parse_salary_range)
    .unwrap_or_default();
  let url = raw.first_of(&["link", "url"]);
  // `viewjob?jk=<id>`: the posting id lives in the query string.
  let identity = url
    .and_then(|link| query_param(link, "jk"))
    .map(|jk| format!("https://www.indeed.com/viewjob/{jk}"));
  Fields {
    url: url.map(str::to_owned),
    identity,
    title,
    company,
    location: raw.get("location").unwrap_or_default().to_owned(),
    salary_min,
    salary_max,
    posted_at: raw.get("pubDate").and_then(parse_timestamp),
    description: raw.get("description"),
    ..Fields::default()
  }
}

fn adapt_findwork(raw: &RawRecord) -> Fields<'_> {
  Fields {
    url: raw.get("url").map(str::to_owned),
    title: raw.get("role").map(str::to_owned),
    company: raw.get("company_name"),
    location: raw.get("location").unwrap_or_default().to_owned(),
    remote: parse_flag(raw.get("remote")),
    type_hint: raw.get("employment_type"),
    posted_at: raw.get("date_posted").and_then(parse_timestamp),
    description: raw.get("text"),
    ..Fields::default()
  }
}

fn adapt_feed(raw: &RawRecord) -> Fields<'_> {
  let (salary_min, salary_max) =
    match (raw.get("salary_min"), raw.get("salary_max")) {
      (None, None) => raw.get("salary").map(parse_salary_range).unwrap_or_default(),
      (min, max) => order_range(
        min.and_then(parse_amount),
        max.and_then(parse_amount),
      ),
    };
  Fields {
    url: raw.get("url").map(str::to_owned),
    identity: None,
    title: raw.get("title").map(str::to_owned),
    company: raw.get("company"),
    location: raw.get("location").unwrap_or_default().to_owned(),
    remote: parse_flag(raw.get("remote")),
    salary_min,
    salary_max,
    type_hint: raw.first_of(&["employment_type", "job_type", "type"]),
    posted_at: raw.get("posted_at").and_then(parse_timestamp),
    description: raw.get("description"),
  }
}

// ─── Normalise ───────────────────────────────────────────────────────────────

/// Turn one raw record into a [`Listing`].
///
/// Fails only when the record has no usable URL or no title; every other gap
/// degrades to `unknown` / `None`.
pub fn normalize(
  raw: &RawRecord,
  fetched_at: DateTime<Utc>,
) -> Result<Listing, MalformedRecord> {
  let malformed = |field| MalformedRecord { origin: raw.source, field };
  let fields = adapt(raw);

  let url = fields.url.ok_or_else(|| malformed("url"))?;
  let key = identity_key(fields.identity.as_deref().unwrap_or(&url));
  if key.is_empty() {
    return Err(malformed("url"));
  }
  let title = fields
    .title
    .filter(|t| !t.trim().is_empty())
    .ok_or_else(|| malformed("title"))?;

  let employment_type = classify_employment(&[
    fields.type_hint,
    Some(title.as_str()),
    fields.description,
  ]);
  let experience_level = classify_level(&[Some(title.as_str()), fields.description]);

  Ok(Listing {
    identity_key: key,
    source: raw.source,
    url: url.trim().to_owned(),
    location_class: classify_location(&fields.location, fields.remote),
    title: title.trim().to_owned(),
    company: fields.company.unwrap_or_default().to_owned(),
    location_text: fields.location,
    employment_type,
    experience_level,
    salary_min: fields.salary_min,
    salary_max: fields.salary_max,
    description: fields.description.map(str::to_owned),
    posted_at: fields.posted_at,
    fetched_at,
    raw_payload: raw.clone(),
  })
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() }

  // ── Identity ─────────────────────────────────────────────────────────────

  #[test]
  fn identity_key_strips_query_and_fragment() {
    assert_eq!(identity_key("x.com/job1?ref=fb"), "x.com/job1");
    assert_eq!(identity_key("x.com/job1"), "x.com/job1");
    assert_eq!(
      identity_key("  HTTPS://Jobs.Example.com/Role/42#apply "),
      "https://jobs.example.com/role/42"
    );
    assert_eq!(identity_key("https://a.example/p#frag?notquery"), "https://a.example/p");
  }

  #[test]
  fn identity_key_ignores_source_and_other_fields() {
    let a = RawRecord::new(Source::Feed)
      .with("url", "x.com/job1?ref=fb")
      .with("title", "Data Engineer")
      .with("type", "contract");
    let b = RawRecord::new(Source::LinkedIn)
      .with("url", "x.com/job1")
      .with("title", "Data Engineer");

    let la = normalize(&a, now()).unwrap();
    let lb = normalize(&b, now()).unwrap();
    assert_eq!(la.identity_key, "x.com/job1");
    assert_eq!(la.identity_key, lb.identity_key);
    assert_eq!(la.employment_type, EmploymentType::Contract);
    assert_eq!(lb.employment_type, EmploymentType::Unknown);
  }

  // ── Malformed ────────────────────────────────────────────────────────────

  #[test]
  fn missing_url_is_malformed() {
    let raw = RawRecord::new(Source::Arbeitnow).with("title", "Data Engineer");
    let err = normalize(&raw, now()).unwrap_err();
    assert_eq!(err, MalformedRecord { origin: Source::Arbeitnow, field: "url" });
  }

  #[test]
  fn query_only_url_is_malformed() {
    let raw = RawRecord::new(Source::Feed)
      .with("url", "?ref=fb")
      .with("title", "Data Engineer");
    assert_eq!(normalize(&raw, now()).unwrap_err().field, "url");
  }

  #[test]
  fn missing_title_is_malformed() {
    let raw = RawRecord::new(Source::FindWork).with("url", "https://findwork.dev/j/1");
    assert_eq!(normalize(&raw, now()).unwrap_err().field, "title");
  }

  // ── Classification ───────────────────────────────────────────────────────

  #[test]
  fn location_classes() {
    assert_eq!(classify_location("Remote (USA)", false), LocationClass::Remote);
    assert_eq!(classify_location("Anywhere in the world", false), LocationClass::Remote);
    assert_eq!(classify_location("Berlin - Hybrid", false), LocationClass::Hybrid);
    assert_eq!(classify_location("On-site, Austin TX", false), LocationClass::Onsite);
    assert_eq!(classify_location("San Francisco, CA", false), LocationClass::Unknown);
    assert_eq!(classify_location("", false), LocationClass::Unknown);
    assert_eq!(classify_location("N/A", false), LocationClass::Unknown);
    assert_eq!(classify_location("Berlin", true), LocationClass::Remote);
  }

  #[test]
  fn place_names_without_a_marker_are_unknown() {
    for text in ["USA", "Europe", "Multiple locations", "Austin, TX"] {
      assert_eq!(classify_location(text, false), LocationClass::Unknown, "{text}");
    }
    assert_eq!(classify_location("Austin, TX (in office)", false), LocationClass::Onsite);
  }

  #[test]
  fn remote_wins_over_hybrid() {
    assert_eq!(classify_location("Remote or hybrid", false), LocationClass::Remote);
  }

  #[test]
  fn tokens_match_whole_words_only() {
    // "contractual" and "internal" must not trip the contract / intern tokens.
    assert_eq!(
      classify_employment(&[Some("Internal tools, contractual obligations")]),
      EmploymentType::Unknown
    );
    assert_eq!(
      classify_level(&[Some("Internal Tools Engineer")]),
      ExperienceLevel::Unknown
    );
  }

  #[test]
  fn employment_type_from_provider_codes() {
    assert_eq!(classify_employment(&[Some("CONTRACTOR")]), EmploymentType::Contract);
    assert_eq!(classify_employment(&[Some("FULLTIME")]), EmploymentType::FullTime);
    assert_eq!(classify_employment(&[Some("PARTTIME")]), EmploymentType::PartTime);
    assert_eq!(classify_employment(&[Some("Full-time")]), EmploymentType::FullTime);
  }

  #[test]
  fn employment_hint_takes_priority_over_title() {
    assert_eq!(
      classify_employment(&[Some("Full-time"), Some("Data Engineer - Contract")]),
      EmploymentType::FullTime
    );
    assert_eq!(
      classify_employment(&[None, Some("Data Engineer - Contract")]),
      EmploymentType::Contract
    );
  }

  #[test]
  fn experience_levels() {
    assert_eq!(classify_level(&[Some("Senior Data Engineer")]), ExperienceLevel::Senior);
    assert_eq!(classify_level(&[Some("Sr. Backend Dev")]), ExperienceLevel::Senior);
    assert_eq!(classify_level(&[Some("Data Engineer (Mid-Level)")]), ExperienceLevel::Mid);
    assert_eq!(classify_level(&[Some("Junior Analyst")]), ExperienceLevel::Junior);
    assert_eq!(classify_level(&[Some("Entry-level SWE")]), ExperienceLevel::Junior);
    assert_eq!(
      classify_level(&[Some("Data Engineer"), Some("We want a lead engineer")]),
      ExperienceLevel::Senior
    );
    assert_eq!(classify_level(&[Some("Data Engineer"), None]), ExperienceLevel::Unknown);
  }

  // ── Values ───────────────────────────────────────────────────────────────

  #[test]
  fn timestamps_in_provider_formats() {
    let expected = Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap();
    assert_eq!(parse_timestamp("2026-02-02T00:00:00Z"), Some(expected));
    assert_eq!(parse_timestamp("2026-02-02T01:00:00+01:00"), Some(expected));
    assert_eq!(parse_timestamp("Mon, 02 Feb 2026 00:00:00 +0000"), Some(expected));
    assert_eq!(parse_timestamp("2026-02-02"), Some(expected));
    assert_eq!(parse_timestamp("2026-02-02 00:00:00"), Some(expected));
    assert_eq!(parse_timestamp(&expected.timestamp().to_string()), Some(expected));
    assert_eq!(
      parse_timestamp(&expected.timestamp_millis().to_string()),
      Some(expected)
    );
    assert_eq!(parse_timestamp("last week"), None);
    assert_eq!(parse_timestamp(""), None);
  }

  #[test]
  fn salary_amounts() {
    assert_eq!(parse_amount("120000"), Some(120_000));
    assert_eq!(parse_amount("$120,000"), Some(120_000));
    assert_eq!(parse_amount("120k"), Some(120_000));
    assert_eq!(parse_amount("85.5K"), Some(85_500));
    assert_eq!(parse_amount("Not listed"), None);
    assert_eq!(parse_amount("0"), None);
  }

  #[test]
  fn salary_ranges() {
    assert_eq!(parse_salary_range("$180,000 - $250,000"), (Some(180_000), Some(250_000)));
    assert_eq!(parse_salary_range("$100k – $150k"), (Some(100_000), Some(150_000)));
    assert_eq!(parse_salary_range("90000 to 120000"), (Some(90_000), Some(120_000)));
    assert_eq!(parse_salary_range("$150k - $100k"), (Some(100_000), Some(150_000)));
    assert_eq!(parse_salary_range("$90,000+"), (Some(90_000), None));
    assert_eq!(parse_salary_range("Negotiable"), (None, None));
  }

  // ── Adapters ─────────────────────────────────────────────────────────────

  #[test]
  fn remoteok_record() {
    let raw = RawRecord::new(Source::RemoteOk)
      .with("slug", "senior-data-engineer-stripe-1")
      .with("position", "Senior Data Engineer")
      .with("company", "Stripe")
      .with("salary_min", "180000")
      .with("salary_max", "250000")
      .with("tags", "data, python, full-time")
      .with("date", "2026-02-20T10:00:00+00:00");
    let l = normalize(&raw, now()).unwrap();
    assert_eq!(l.url, "https://remoteok.com/remote-jobs/senior-data-engineer-stripe-1");
    assert_eq!(l.location_text, "Remote");
    assert_eq!(l.location_class, LocationClass::Remote);
    assert_eq!(l.employment_type, EmploymentType::FullTime);
    assert_eq!(l.experience_level, ExperienceLevel::Senior);
    assert_eq!((l.salary_min, l.salary_max), (Some(180_000), Some(250_000)));
    assert!(l.posted_at.is_some());
    assert_eq!(l.fetched_at, now());
  }

  #[test]
  fn jsearch_record() {
    let raw = RawRecord::new(Source::JSearch)
      .with("job_google_link", "https://www.google.com/search?q=job&ibp=htl;jobs#x")
      .with("job_id", "AbC123==")
      .with("job_title", "Data Engineer")
      .with("employer_name", "Acme")
      .with("job_city", "Denver")
      .with("job_state", "CO")
      .with("job_is_remote", "false")
      .with("job_employment_type", "CONTRACTOR")
      .with("job_min_salary", "60.5")
      .with("job_max_salary", "55");
    let l = normalize(&raw, now()).unwrap();
    assert_eq!(l.identity_key, "https://www.google.com/search/jobs/abc123==");
    assert_eq!(l.url, "https://www.google.com/search?q=job&ibp=htl;jobs#x");
    assert_eq!(l.location_text, "Denver, CO");
    assert_eq!(l.location_class, LocationClass::Unknown);
    assert_eq!(l.employment_type, EmploymentType::Contract);
    assert_eq!((l.salary_min, l.salary_max), (Some(55), Some(61)));
  }

  #[test]
  fn arbeitnow_remote_flag() {
    let raw = RawRecord::new(Source::Arbeitnow)
      .with("url", "https://www.arbeitnow.com/jobs/acme/data-engineer-1")
      .with("title", "Data Engineer")
      .with("company_name", "Acme GmbH")
      .with("location", "Berlin")
      .with("remote", "true")
      .with("created_at", "1770000000");
    let l = normalize(&raw, now()).unwrap();
    assert_eq!(l.company, "Acme GmbH");
    assert_eq!(l.location_class, LocationClass::Remote);
    assert_eq!(l.posted_at, DateTime::from_timestamp(1_770_000_000, 0));
  }

  #[test]
  fn indeed_splits_company_out_of_title() {
    let raw = RawRecord::new(Source::Indeed)
      .with("title", "Data Engineer - Big Co - Initech")
      .with("link", "https://www.indeed.com/viewjob?jk=abc")
      .with("pubDate", "Mon, 02 Feb 2026 00:00:00 +0000")
      .with("salary", "$100k - $120k");
    let l = normalize(&raw, now()).unwrap();
    assert_eq!(l.title, "Data Engineer - Big Co");
    assert_eq!(l.company, "Initech");
    assert_eq!(l.identity_key, "https://www.indeed.com/viewjob/abc");
    assert_eq!(l.url, "https://www.indeed.com/viewjob?jk=abc");
    assert_eq!(l.salary_max, Some(120_000));
    assert_eq!(l.location_class, LocationClass::Unknown);
  }

  #[test]
  fn indeed_postings_are_keyed_by_jk() {
    let indeed = |link: &str| {
      let raw = RawRecord::new(Source::Indeed)
        .with("title", "Data Engineer - Initech")
        .with("link", link);
      normalize(&raw, now()).unwrap().identity_key
    };
    assert_ne!(
      indeed("https://www.indeed.com/viewjob?jk=aaa"),
      indeed("https://www.indeed.com/viewjob?jk=bbb")
    );
    assert_eq!(
      indeed("https://www.indeed.com/viewjob?from=rss&jk=aaa"),
      indeed("https://www.indeed.com/viewjob?jk=aaa&utm_source=x")
    );
    // No jk: fall back to the plain link.
    assert_eq!(
      indeed("https://www.indeed.com/cmp/initech/jobs/7"),
      "https://www.indeed.com/cmp/initech/jobs/7"
    );
  }

  #[test]
  fn jsearch_keys_by_apply_link_then_id_then_docid() {
    let base = || {
      RawRecord::new(Source::JSearch)
        .with("job_title", "Data Engineer")
        .with(
          "job_google_link",
          "https://www.google.com/search?q=data&htidocid=Doc9&ibp=htl;jobs",
        )
    };

    let with_apply = base()
      .with("job_apply_link", "https://careers.acme.com/jobs/17?src=jsearch")
      .with("job_id", "id-1");
    let l = normalize(&with_apply, now()).unwrap();
    assert_eq!(l.identity_key, "https://careers.acme.com/jobs/17");
    assert_eq!(l.url, "https://careers.acme.com/jobs/17?src=jsearch");

    let by_id = normalize(&base().with("job_id", "id-1"), now()).unwrap();
    assert_eq!(by_id.identity_key, "https://www.google.com/search/jobs/id-1");

    let by_doc = normalize(&base(), now()).unwrap();
    assert_eq!(by_doc.identity_key, "https://www.google.com/search/jobs/doc9");
  }

  #[test]
  fn query_params() {
    assert_eq!(query_param("https://a.example/v?jk=1&x=2", "jk"), Some("1"));
    assert_eq!(query_param("https://a.example/v?x=2&jk=1#top", "jk"), Some("1"));
    assert_eq!(query_param("https://a.example/v?jk=", "jk"), None);
    assert_eq!(query_param("https://a.example/v#jk=1", "jk"), None);
  }

  #[test]
  fn findwork_uses_role_and_text() {
    let raw = RawRecord::new(Source::FindWork)
      .with("url", "https://findwork.dev/j/42")
      .with("role", "Backend Engineer")
      .with("company_name", "Hooli")
      .with("employment_type", "part time")
      .with("text", "Junior friendly team");
    let l = normalize(&raw, now()).unwrap();
    assert_eq!(l.title, "Backend Engineer");
    assert_eq!(l.employment_type, EmploymentType::PartTime);
    assert_eq!(l.experience_level, ExperienceLevel::Junior);
    assert_eq!(l.description.as_deref(), Some("Junior friendly team"));
  }

  #[test]
  fn raw_payload_is_retained() {
    let raw = RawRecord::new(Source::LinkedIn)
      .with("url", "https://www.linkedin.com/jobs/view/1")
      .with("title", "Data Engineer")
      .with("tracking", "opaque");
    let l = normalize(&raw, now()).unwrap();
    assert_eq!(l.raw_payload, raw);
  }
}
