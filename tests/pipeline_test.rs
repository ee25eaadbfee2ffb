//! End-to-end pipeline tests
//!
//! Runs the discovery pipeline against canned documents and a stub
//! embedding service, verifying the persisted job record and link index.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use url::Url;
use uuid::Uuid;

use linkscout::config::Config;
use linkscout::discovery::fetcher::{FetchError, HtmlFetcher};
use linkscout::embedding::{EmbedError, Embedder};
use linkscout::job::{JobRecord, JobStatus, JobView};
use linkscout::pipeline::{Pipeline, RunOutcome};
use linkscout::store::Store;
use linkscout::types::{Embedding, LinkSource, LinkType, Trigger};

/// Serves canned documents by exact URL
#[derive(Default, Clone)]
struct StubFetcher {
    pages: HashMap<String, String>,
}

impl StubFetcher {
    fn insert(&mut self, url: &str, body: &str) {
        self.pages.insert(url.to_string(), body.to_string());
    }
}

impl HtmlFetcher for StubFetcher {
    async fn fetch_text(&self, url: &Url, _timeout: Duration) -> Result<String, FetchError> {
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

/// Fails every batch, exercising degraded mode
struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Embedding>, EmbedError> {
        Err(EmbedError::Request("service unreachable".to_string()))
    }
}

/// Returns a fixed small vector per text
struct FixedEmbedder;

impl Embedder for FixedEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbedError> {
        Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
    }
}

const BRAND: &str = "acme";
const DOMAIN: &str = "shop.example.com";
const SITEMAP_URL: &str = "https://shop.example.com/sitemap.xml";

/// Sitemap with three fetchable pages, one unreachable product, one
/// skip-listed URL and one uncategorized URL; homepage with one overlapping
/// product link and one navigation-only page link.
fn brand_site() -> StubFetcher {
    let mut stub = StubFetcher::default();
    stub.insert(
        SITEMAP_URL,
        r#"<?xml version="1.0"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url><loc>https://shop.example.com/products/cap</loc></url>
          <url><loc>https://shop.example.com/products/tee</loc></url>
          <url><loc>https://shop.example.com/products/missing</loc></url>
          <url><loc>https://shop.example.com/collections/hats</loc></url>
          <url><loc>https://shop.example.com/cart</loc></url>
          <url><loc>https://shop.example.com/blog/news</loc></url>
        </urlset>"#,
    );
    stub.insert(
        "https://shop.example.com/",
        r#"<nav>
          <a href="/products/cap">Baseball Cap</a>
          <a href="/pages/about">About Us</a>
          <a href="/cart">Cart</a>
        </nav>"#,
    );
    stub.insert(
        "https://shop.example.com/products/tee",
        "<title>Graphic Tee | Acme</title>",
    );
    stub.insert(
        "https://shop.example.com/collections/hats",
        r#"<meta property="og:title" content="All Hats" /><title>ignored</title>"#,
    );
    stub
}

fn trigger(job_id: Uuid) -> Trigger {
    Trigger {
        brand_id: BRAND.to_string(),
        domain: DOMAIN.to_string(),
        sitemap_url: SITEMAP_URL.to_string(),
        job_id,
    }
}

fn start_job(store: &Store) -> JobRecord {
    let job = JobRecord::new(Uuid::new_v4(), BRAND);
    store.jobs().put(&job).unwrap();
    job
}

#[tokio::test]
async fn full_run_completes_and_indexes_links() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let job = start_job(&store);

    let pipeline = Pipeline::new(
        brand_site(),
        Some(FixedEmbedder),
        Arc::clone(&store),
        Config::default(),
    );
    let outcome = pipeline.run(&trigger(job.id)).await;

    let stats = match outcome {
        RunOutcome::Completed(stats) => stats,
        other => panic!("expected completion, got {:?}", other),
    };
    // cap, tee, missing, hats, about survive filtering; /cart and /blog don't.
    assert_eq!(stats.urls_found, 5);
    assert_eq!(stats.urls_written, 4);
    assert_eq!(stats.urls_failed, 1);

    let record = store.jobs().get(job.id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Complete);
    assert_eq!(record.urls_processed, 5);
    assert_eq!(record.product_urls_count, 2);
    assert_eq!(record.collection_urls_count, 1);
    assert_eq!(record.page_urls_count, 1);
    assert!(record.completed_at.is_some());
    assert_eq!(JobView::derive(&record, Utc::now()).progress_pct, 100);

    let links = store.links();
    // Merge priority: present in both datasets keeps sitemap attribution
    // with the navigation-supplied title.
    let cap = links
        .get(BRAND, "https://shop.example.com/products/cap")
        .unwrap()
        .unwrap();
    assert_eq!(cap.source, LinkSource::Sitemap);
    assert_eq!(cap.title.as_deref(), Some("Baseball Cap"));
    assert!(cap.embedding.is_some());
    assert!(cap.is_healthy);

    // Titles came from og:title and suffix-stripped <title> respectively.
    let hats = links
        .get(BRAND, "https://shop.example.com/collections/hats")
        .unwrap()
        .unwrap();
    assert_eq!(hats.title.as_deref(), Some("All Hats"));
    let tee = links
        .get(BRAND, "https://shop.example.com/products/tee")
        .unwrap()
        .unwrap();
    assert_eq!(tee.title.as_deref(), Some("Graphic Tee"));

    // Navigation-only URL keeps its source.
    let about = links
        .get(BRAND, "https://shop.example.com/pages/about")
        .unwrap()
        .unwrap();
    assert_eq!(about.source, LinkSource::Navigation);
    assert_eq!(about.link_type, LinkType::Page);

    // The unreachable product was excluded.
    assert!(!links
        .contains(BRAND, "https://shop.example.com/products/missing")
        .unwrap());

    // Brand metadata records the successful import.
    let meta = store.brand_meta(BRAND).unwrap().unwrap();
    assert_eq!(meta.sitemap_url, SITEMAP_URL);
}

#[tokio::test]
async fn embedding_failure_degrades_without_failing_the_run() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let job = start_job(&store);

    let pipeline = Pipeline::new(
        brand_site(),
        Some(FailingEmbedder),
        Arc::clone(&store),
        Config::default(),
    );
    let outcome = pipeline.run(&trigger(job.id)).await;
    assert!(matches!(outcome, RunOutcome::Completed(_)));

    let record = store.jobs().get(job.id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Complete);
    assert_eq!(record.product_urls_count, 2);
    assert_eq!(record.collection_urls_count, 1);

    // Every row persisted, none carrying a vector.
    let entries = store.links().for_brand(BRAND).unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|e| e.embedding.is_none()));
}

#[tokio::test]
async fn rerunning_an_unchanged_site_creates_no_duplicates() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());

    let first = start_job(&store);
    let pipeline = Pipeline::new(
        brand_site(),
        None::<FixedEmbedder>,
        Arc::clone(&store),
        Config::default(),
    );
    assert!(matches!(
        pipeline.run(&trigger(first.id)).await,
        RunOutcome::Completed(_)
    ));
    assert_eq!(store.links().for_brand(BRAND).unwrap().len(), 4);

    // Second run only re-discovers the URL that failed enrichment last time.
    let second = start_job(&store);
    let outcome = pipeline.run(&trigger(second.id)).await;
    let stats = match outcome {
        RunOutcome::Completed(stats) => stats,
        other => panic!("expected completion, got {:?}", other),
    };
    assert_eq!(stats.urls_found, 1);
    assert_eq!(stats.urls_written, 0);
    assert_eq!(store.links().for_brand(BRAND).unwrap().len(), 4);
}

#[tokio::test]
async fn unreachable_sitemap_fails_the_job_with_a_message() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let job = start_job(&store);

    let pipeline = Pipeline::new(
        StubFetcher::default(),
        None::<FixedEmbedder>,
        Arc::clone(&store),
        Config::default(),
    );
    let outcome = pipeline.run(&trigger(job.id)).await;
    assert!(matches!(outcome, RunOutcome::Failed(_)));

    let record = store.jobs().get(job.id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.completed_at.is_some());
    let message = record.error_message.as_deref().unwrap();
    assert!(message.contains("sitemap fetch failed"), "message: {message}");

    let view = JobView::derive(&record, Utc::now());
    assert!(view.is_failed);
    assert!(!view.is_running);
}

#[tokio::test]
async fn cancellation_before_the_title_stage_stops_the_run() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let job = start_job(&store);

    /// Cancels its own job the first time the homepage is requested,
    /// simulating an operator acting mid-run.
    struct CancellingFetcher {
        inner: StubFetcher,
        store: Arc<Store>,
        job_id: Uuid,
    }

    impl HtmlFetcher for CancellingFetcher {
        async fn fetch_text(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
            if url.path() == "/" {
                self.store.jobs().cancel(self.job_id).unwrap();
            }
            self.inner.fetch_text(url, timeout).await
        }
    }

    let fetcher = CancellingFetcher {
        inner: brand_site(),
        store: Arc::clone(&store),
        job_id: job.id,
    };
    let pipeline = Pipeline::new(
        fetcher,
        None::<FixedEmbedder>,
        Arc::clone(&store),
        Config::default(),
    );
    let outcome = pipeline.run(&trigger(job.id)).await;
    assert!(matches!(outcome, RunOutcome::Cancelled));

    // The stored record keeps the operator's terminal state and no links
    // were written.
    let record = store.jobs().get(job.id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Cancelled);
    assert!(store.links().for_brand(BRAND).unwrap().is_empty());
}
