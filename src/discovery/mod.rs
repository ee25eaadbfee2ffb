//! Site-link discovery subsystem
//!
//! Turns a brand's sitemap and homepage into an enriched candidate set:
//!
//! - `sitemap`: sitemap / sitemap-index fetching and parsing
//! - `navigation`: homepage anchor crawl with classification
//! - `merger`: deduplication under the sitemap-wins priority rule
//! - `titles`: bounded-concurrency page title enrichment
//! - `extract`: the narrow markup-inspection seam
//! - `fetcher`: shared HTTP engine behind the [`HtmlFetcher`] trait

pub mod extract;
pub mod fetcher;
pub mod merger;
pub mod navigation;
pub mod sitemap;
pub mod titles;

pub use fetcher::{FetchError, HtmlFetcher, PageFetcher};
pub use merger::merge_candidates;
pub use navigation::NavCrawler;
pub use sitemap::{SitemapParser, MAX_CHILD_SITEMAPS};
pub use titles::{TitleFetcher, TITLE_BATCH_SIZE};
