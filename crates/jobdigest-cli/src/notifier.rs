//! A notifier that writes the rendered digest to a terminal or any writer.

use std::{
  io::{self, Write},
  sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use jobdigest_core::{
  error::DeliveryError,
  notify::{DeliveryOutcome, Notifier, render_digest},
  pipeline::Digest,
};

/// Writes one message per page. A page that fails to write fails every
/// listing on it; earlier pages stay delivered.
pub struct ConsoleNotifier<W> {
  out:       Mutex<W>,
  page_size: usize,
}

impl ConsoleNotifier<io::Stdout> {
  pub fn stdout(page_size: usize) -> Self { Self::new(io::stdout(), page_size) }
}

impl<W: Write + Send> ConsoleNotifier<W> {
  pub fn new(out: W, page_size: usize) -> Self {
    Self { out: Mutex::new(out), page_size: page_size.max(1) }
  }

  #[cfg(test)]
  fn into_inner(self) -> W { self.out.into_inner().unwrap_or_else(PoisonError::into_inner) }
}

#[async_trait]
impl<W: Write + Send> Notifier for ConsoleNotifier<W> {
  async fn deliver(
    &self,
    digest: &Digest,
  ) -> Result<Vec<(String, DeliveryOutcome)>, DeliveryError> {
    let pages = render_digest(&digest.listings, self.page_size);
    let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
    let mut outcomes = Vec::with_capacity(digest.len());

    for (chunk, page) in digest.listings.chunks(self.page_size).zip(&pages) {
      let message = format!("{page}\n\n");
      let outcome = match out.write_all(message.as_bytes()).and_then(|()| out.flush()) {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(e) => DeliveryOutcome::Failed { reason: e.to_string() },
      };
      outcomes.extend(chunk.iter().map(|l| (l.identity_key.clone(), outcome.clone())));
    }
    Ok(outcomes)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use jobdigest_core::{
    listing::{RawRecord, Source},
    normalize::normalize,
  };

  use super::*;

  fn digest(n: usize) -> Digest {
    let listings = (1..=n)
      .map(|i| {
        let raw = RawRecord::new(Source::Feed)
          .with("url", format!("https://x.com/job{i}"))
          .with("title", "Data Engineer");
        normalize(&raw, Utc::now()).unwrap()
      })
      .collect();
    Digest { listings }
  }

  /// Accepts `budget` writes, then fails.
  struct FlakyWriter {
    budget:  usize,
    written: Vec<u8>,
  }

  impl Write for FlakyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      if self.budget == 0 {
        return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
      }
      self.budget -= 1;
      self.written.extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
  }

  #[tokio::test]
  async fn every_listing_is_delivered() {
    let notifier = ConsoleNotifier::new(Vec::new(), 2);
    let outcomes = notifier.deliver(&digest(3)).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|(_, o)| o.is_delivered()));

    let text = String::from_utf8(notifier.into_inner()).unwrap();
    assert!(text.contains("Found 3 new job(s) (page 1/2)"));
    assert!(text.contains("Found 3 new job(s) (page 2/2)"));
    assert!(text.contains("3. Data Engineer @ Unknown company"));
  }

  #[tokio::test]
  async fn a_failed_page_fails_only_its_listings() {
    let writer = FlakyWriter { budget: 1, written: Vec::new() };
    let notifier = ConsoleNotifier::new(writer, 2);
    let outcomes = notifier.deliver(&digest(3)).await.unwrap();

    let delivered: Vec<_> = outcomes
      .iter()
      .filter(|(_, o)| o.is_delivered())
      .map(|(k, _)| k.as_str())
      .collect();
    assert_eq!(delivered, ["https://x.com/job1", "https://x.com/job2"]);
    assert_eq!(outcomes[2].1, DeliveryOutcome::Failed { reason: "pipe closed".into() });
    assert!(!notifier.into_inner().written.is_empty());
  }
}
