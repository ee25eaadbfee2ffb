//! Job records: the persisted state machine tracking one discovery run
//!
//! A record is created `Pending` by the triggering caller, mutated only by
//! the pipeline run it belongs to, and observed by polling clients through
//! the presenter. Transitions are forward-only along the pipeline path;
//! `Failed` is reachable from any non-terminal state and `Cancelled` from
//! any running state.

pub mod presenter;

pub use presenter::JobView;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Parsing,
    CrawlingNav,
    FetchingTitles,
    GeneratingEmbeddings,
    Complete,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn is_running(self) -> bool {
        !self.is_terminal()
    }

    /// Position along the forward pipeline path; terminal states sort last.
    fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Parsing => 1,
            JobStatus::CrawlingNav => 2,
            JobStatus::FetchingTitles => 3,
            JobStatus::GeneratingEmbeddings => 4,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Cancelled => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Parsing => "parsing",
            JobStatus::CrawlingNav => "crawling_nav",
            JobStatus::FetchingTitles => "fetching_titles",
            JobStatus::GeneratingEmbeddings => "generating_embeddings",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("invalid job transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Persisted state of one discovery run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub brand_id: String,
    pub status: JobStatus,
    pub urls_found: u64,
    pub urls_processed: u64,
    pub urls_failed: u64,
    pub product_urls_count: u64,
    pub collection_urls_count: u64,
    pub page_urls_count: u64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Create a fresh `Pending` record, as the triggering caller does before
    /// invoking the pipeline.
    pub fn new(id: Uuid, brand_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            brand_id: brand_id.into(),
            status: JobStatus::Pending,
            urls_found: 0,
            urls_processed: 0,
            urls_failed: 0,
            product_urls_count: 0,
            collection_urls_count: 0,
            page_urls_count: 0,
            error_message: None,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Move forward along the pipeline path.
    ///
    /// Rejects backward moves, repeats, and any move out of a terminal
    /// state. Entering `Complete` stamps `completed_at`.
    pub fn advance(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        let valid = !self.status.is_terminal()
            && !matches!(next, JobStatus::Failed | JobStatus::Cancelled)
            && next.rank() > self.status.rank();
        if !valid {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if next == JobStatus::Complete {
            self.completed_at = Some(Utc::now());
        }
        self.touch();
        Ok(())
    }

    /// Mark the run failed with a captured message. Reachable from any
    /// non-terminal state; a no-op on terminal records.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    /// Operator-initiated cancellation. Only running records can be
    /// cancelled; returns whether the state changed.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Cancelled;
        self.touch();
        true
    }

    /// Record the merged candidate count once the merge stage finishes.
    pub fn set_found(&mut self, found: u64) {
        self.urls_found = found;
        self.touch();
    }

    /// Accumulate batch progress. `urls_processed` never exceeds
    /// `urls_found` once found has been set.
    pub fn record_progress(&mut self, processed: u64, failed: u64) {
        let next = self.urls_processed.saturating_add(processed);
        self.urls_processed = if self.urls_found > 0 {
            next.min(self.urls_found)
        } else {
            next
        };
        self.urls_failed = self.urls_failed.saturating_add(failed);
        self.touch();
    }

    /// Store per-type counts computed from the final written set.
    pub fn set_counts(&mut self, products: u64, collections: u64, pages: u64) {
        self.product_urls_count = products;
        self.collection_urls_count = collections;
        self.page_urls_count = pages;
        self.touch();
    }

    /// Bump `updated_at`; every mutation and every batch boundary calls
    /// this so pollers can distinguish "working" from "stuck".
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
