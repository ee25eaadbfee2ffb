//! Title fetcher
//!
//! Enriches untitled candidates by fetching each page and extracting a
//! title. Fetches run in fixed-size concurrent batches so I/O fan-out stays
//! bounded no matter how many URLs a sitemap yields; a per-URL failure is
//! counted and dropped, never fatal.

use std::time::Duration;

use futures::future;
use tracing::debug;
use url::Url;

use crate::types::LinkCandidate;

use super::extract::extract_title;
use super::fetcher::HtmlFetcher;

/// Concurrent page fetches per batch
pub const TITLE_BATCH_SIZE: usize = 20;

/// Result of one title-fetch batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Candidates that came back with a title
    pub titled: Vec<LinkCandidate>,
    /// URLs that failed to fetch or yielded no title
    pub failed: u64,
}

/// Title fetcher bound to a fetcher and per-page timeout
pub struct TitleFetcher<'a, F> {
    fetcher: &'a F,
    timeout: Duration,
}

impl<'a, F: HtmlFetcher> TitleFetcher<'a, F> {
    pub fn new(fetcher: &'a F, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Fetch titles for one batch of candidates concurrently.
    ///
    /// Callers drive batching (`chunks(TITLE_BATCH_SIZE)`) so they can
    /// persist progress counters between batches.
    pub async fn fetch_batch(&self, batch: &[LinkCandidate]) -> BatchOutcome {
        let results = future::join_all(batch.iter().map(|c| self.fetch_one(c))).await;

        let mut outcome = BatchOutcome::default();
        for result in results {
            match result {
                Some(candidate) => outcome.titled.push(candidate),
                None => outcome.failed += 1,
            }
        }
        outcome
    }

    async fn fetch_one(&self, candidate: &LinkCandidate) -> Option<LinkCandidate> {
        let url = match Url::parse(&candidate.url) {
            Ok(u) => u,
            Err(e) => {
                debug!("unparseable candidate URL '{}': {}", candidate.url, e);
                return None;
            }
        };

        let html = match self.fetcher.fetch_text(&url, self.timeout).await {
            Ok(body) => body,
            Err(e) => {
                debug!("title fetch failed for {}: {}", candidate.url, e);
                return None;
            }
        };

        match extract_title(&html) {
            Some(title) => Some(LinkCandidate {
                title: Some(title),
                ..candidate.clone()
            }),
            None => {
                debug!("no title found at {}", candidate.url);
                None
            }
        }
    }
}
