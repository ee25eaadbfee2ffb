//! Client-side job status presenter
//!
//! A pure function of a job record and the current wall-clock time. Clients
//! poll the persisted record and derive everything they display from it;
//! staleness comes from the last-update timestamp, never from a push
//! guarantee.

use chrono::{DateTime, Utc};

use super::{JobRecord, JobStatus};

/// A running job with no update for this long is presumed stuck.
pub const STALE_AFTER_SECS: i64 = 10 * 60;

/// Everything a polling client derives from one job record
#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    pub status: JobStatus,
    pub is_running: bool,
    pub is_stale: bool,
    pub is_complete: bool,
    pub is_failed: bool,
    pub is_cancelled: bool,
    /// 0..=100
    pub progress_pct: u8,
    pub message: String,
}

impl JobView {
    /// Derive the observable state for `record` as of `now`.
    pub fn derive(record: &JobRecord, now: DateTime<Utc>) -> Self {
        let is_running = record.status.is_running();
        let is_stale = is_running
            && now.signed_duration_since(record.updated_at).num_seconds() > STALE_AFTER_SECS;

        Self {
            status: record.status,
            is_running,
            is_stale,
            is_complete: record.status == JobStatus::Complete,
            is_failed: record.status == JobStatus::Failed,
            is_cancelled: record.status == JobStatus::Cancelled,
            progress_pct: progress(record),
            message: message(record, is_stale),
        }
    }
}

/// Piecewise progress weighting: discovery up to 60, titles up to 80,
/// embeddings the final 20. Embedding generation is presumed the shortest
/// phase, so it gets the thinnest slice.
fn progress(record: &JobRecord) -> u8 {
    let found = record.urls_found.max(1) as f64;
    let fraction = (record.urls_processed as f64 / found).min(1.0);

    let pct = match record.status {
        JobStatus::Pending => 0.0,
        JobStatus::Parsing | JobStatus::CrawlingNav => fraction * 60.0,
        JobStatus::FetchingTitles => fraction * 80.0,
        JobStatus::GeneratingEmbeddings => 80.0 + fraction * 20.0,
        JobStatus::Complete => 100.0,
        // Terminated runs report how far the enrichment got.
        JobStatus::Failed | JobStatus::Cancelled => fraction * 80.0,
    };
    pct.round() as u8
}

fn message(record: &JobRecord, is_stale: bool) -> String {
    if is_stale {
        return "No activity in 10+ minutes — the import may be stuck. Cancel and retry."
            .to_string();
    }

    match record.status {
        JobStatus::Pending => "Waiting to start…".to_string(),
        JobStatus::Parsing => "Parsing sitemap…".to_string(),
        JobStatus::CrawlingNav => "Discovering navigation links…".to_string(),
        JobStatus::FetchingTitles => format!(
            "Fetching page titles ({}/{})…",
            record.urls_processed, record.urls_found
        ),
        JobStatus::GeneratingEmbeddings => "Generating embeddings…".to_string(),
        JobStatus::Complete => format!("Import complete: {} links found", record.urls_found),
        JobStatus::Failed => format!(
            "Import failed: {}",
            record.error_message.as_deref().unwrap_or("unknown error")
        ),
        JobStatus::Cancelled => "Import cancelled".to_string(),
    }
}
