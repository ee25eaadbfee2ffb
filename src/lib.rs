//! linkscout: brand site-link discovery
//!
//! Discovers every product/collection/page URL for a brand from two
//! independent sources, enriches the results, and tracks each run through a
//! persisted, pollable job record:
//! - Sitemap parsing with bounded sitemap-index expansion
//! - Homepage navigation crawling with path-based classification
//! - Priority-rule merging and (brand, URL) deduplication
//! - Bounded-concurrency title fetching and batched embedding generation
//! - A sled-backed link index with upsert-on-conflict idempotence
//! - Client-side status derivation with staleness detection

pub mod config;
pub mod discovery;
pub mod embedding;
pub mod job;
pub mod pipeline;
pub mod store;
pub mod types;

pub use config::Config;
pub use types::*;
