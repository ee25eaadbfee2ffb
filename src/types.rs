//! Core types shared across the link discovery pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Semantic embedding vector attached to a link title
pub type Embedding = Vec<f32>;

/// Category assigned to a discovered URL based on its path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Product,
    Collection,
    Page,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Product => "product",
            LinkType::Collection => "collection",
            LinkType::Page => "page",
        }
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which dataset first discovered a URL.
///
/// Preserved across later enrichment: a sitemap-discovered URL keeps
/// `Sitemap` even if its title was backfilled from the navigation crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSource {
    Sitemap,
    Navigation,
}

impl LinkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkSource::Sitemap => "sitemap",
            LinkSource::Navigation => "navigation",
        }
    }
}

/// A URL partway through the pipeline: discovered and classified,
/// possibly already carrying a title from the navigation crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    pub url: String,
    pub link_type: LinkType,
    pub title: Option<String>,
    pub source: LinkSource,
}

/// One row of the per-brand link index, unique on (brand_id, url)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEntry {
    pub brand_id: String,
    pub url: String,
    pub link_type: LinkType,
    pub title: Option<String>,
    pub embedding: Option<Embedding>,
    pub source: LinkSource,
    pub is_healthy: bool,
    pub last_verified_at: DateTime<Utc>,
}

/// Per-brand sitemap import metadata, written once on a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandMeta {
    pub brand_id: String,
    pub sitemap_url: String,
    pub last_sitemap_import_at: DateTime<Utc>,
}

/// Arguments a caller passes to trigger a discovery run.
///
/// `job_id` must refer to a job record the caller already created in
/// `Pending` state; the pipeline owns all further mutation of it.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub brand_id: String,
    pub domain: String,
    pub sitemap_url: String,
    pub job_id: Uuid,
}
