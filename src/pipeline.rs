//! Discovery pipeline orchestration
//!
//! One sequential run per job: sitemap parse, navigation crawl, merge,
//! title enrichment, embedding generation, index write. The job record is
//! checkpointed after every stage and every internal batch so polling
//! clients see live progress, and re-read at those points for best-effort
//! cancellation.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::config::Config;
use crate::discovery::{
    merge_candidates, HtmlFetcher, NavCrawler, SitemapParser, TitleFetcher, TITLE_BATCH_SIZE,
};
use crate::embedding::{Embedder, EMBED_BATCH_SIZE};
use crate::job::{JobRecord, JobStatus};
use crate::store::Store;
use crate::types::{BrandMeta, Embedding, LinkCandidate, LinkEntry, LinkType, Trigger};

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunStats {
    pub urls_found: u64,
    pub urls_written: u64,
    pub urls_failed: u64,
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunStats),
    Cancelled,
    Failed(String),
}

/// The discovery pipeline, generic over its two network collaborators so
/// runs can be exercised end to end without leaving the process.
pub struct Pipeline<F, E> {
    fetcher: F,
    embedder: Option<E>,
    store: Arc<Store>,
    config: Config,
}

impl<F: HtmlFetcher, E: Embedder> Pipeline<F, E> {
    pub fn new(fetcher: F, embedder: Option<E>, store: Arc<Store>, config: Config) -> Self {
        Self {
            fetcher,
            embedder,
            store,
            config,
        }
    }

    /// Run the pipeline for a trigger, capturing any failure on the job
    /// record rather than returning it.
    pub async fn run(&self, trigger: &Trigger) -> RunOutcome {
        match self.execute(trigger).await {
            Ok(RunOutcome::Completed(stats)) => {
                info!(
                    "discovery job {} complete: {} found, {} written, {} failed",
                    trigger.job_id, stats.urls_found, stats.urls_written, stats.urls_failed
                );
                RunOutcome::Completed(stats)
            }
            Ok(RunOutcome::Cancelled) => {
                info!("discovery job {} cancelled mid-run", trigger.job_id);
                RunOutcome::Cancelled
            }
            Ok(outcome @ RunOutcome::Failed(_)) => outcome,
            Err(e) => {
                warn!("discovery job {} failed: {:#}", trigger.job_id, e);
                self.mark_failed(trigger, &e);
                RunOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    /// Record a failure on the stored job. A no-op if an operator already
    /// moved the job to a terminal state.
    fn mark_failed(&self, trigger: &Trigger, error: &anyhow::Error) {
        match self.store.jobs().get(trigger.job_id) {
            Ok(Some(mut job)) => {
                job.fail(format!("{:#}", error));
                if let Err(e) = self.store.jobs().put(&job) {
                    warn!("could not persist failure for job {}: {}", trigger.job_id, e);
                }
            }
            Ok(None) => warn!("job {} vanished before failure write", trigger.job_id),
            Err(e) => warn!("could not load job {} to record failure: {}", trigger.job_id, e),
        }
    }

    async fn execute(&self, trigger: &Trigger) -> Result<RunOutcome> {
        let jobs = self.store.jobs();
        let mut job = jobs
            .get(trigger.job_id)?
            .ok_or_else(|| anyhow::anyhow!("job {} does not exist", trigger.job_id))?;
        anyhow::ensure!(
            job.brand_id == trigger.brand_id,
            "job {} belongs to brand {}, not {}",
            job.id,
            job.brand_id,
            trigger.brand_id
        );

        info!(
            "starting discovery job {} for brand {} ({})",
            job.id, job.brand_id, trigger.domain
        );

        // Stage: sitemap. A root fetch failure is fatal for the run.
        job.advance(JobStatus::Parsing)?;
        jobs.checkpoint(&job)?;
        let parser = SitemapParser::new(&self.fetcher, &self.config.sitemap);
        let sitemap_urls = parser
            .collect(&trigger.sitemap_url)
            .await
            .context("sitemap fetch failed")?;
        info!("sitemap yielded {} raw URLs", sitemap_urls.len());

        if jobs.is_cancelled(job.id)? {
            return Ok(RunOutcome::Cancelled);
        }

        // Stage: navigation crawl. Failure here yields an empty list.
        job.advance(JobStatus::CrawlingNav)?;
        if !jobs.checkpoint(&job)? {
            return Ok(RunOutcome::Cancelled);
        }
        let crawler = NavCrawler::new(&self.fetcher, &self.config.navigation, &self.config.rules);
        let nav_candidates = crawler.crawl(&trigger.domain).await;

        // Merge the two datasets and subtract already-indexed URLs.
        let merged = merge_candidates(sitemap_urls, nav_candidates, &self.config.rules);
        let known = self.store.links().urls_for_brand(&trigger.brand_id)?;
        let candidates: Vec<LinkCandidate> = merged
            .into_iter()
            .filter(|c| !known.contains(&c.url))
            .collect();
        job.set_found(candidates.len() as u64);
        if !jobs.checkpoint(&job)? {
            return Ok(RunOutcome::Cancelled);
        }
        info!(
            "{} new candidates after subtracting {} known URLs",
            job.urls_found,
            known.len()
        );

        // Stage: title enrichment in bounded concurrent batches.
        job.advance(JobStatus::FetchingTitles)?;
        if !jobs.checkpoint(&job)? {
            return Ok(RunOutcome::Cancelled);
        }

        let (mut enriched, untitled): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|c| c.title.is_some());
        if !enriched.is_empty() {
            // Navigation-sourced candidates arrive titled and bypass fetching.
            job.record_progress(enriched.len() as u64, 0);
            if !jobs.checkpoint(&job)? {
                return Ok(RunOutcome::Cancelled);
            }
        }

        let title_fetcher = TitleFetcher::new(&self.fetcher, self.config.titles.timeout());
        for batch in untitled.chunks(TITLE_BATCH_SIZE) {
            if jobs.is_cancelled(job.id)? {
                return Ok(RunOutcome::Cancelled);
            }
            let outcome = title_fetcher.fetch_batch(batch).await;
            job.record_progress(batch.len() as u64, outcome.failed);
            enriched.extend(outcome.titled);
            if !jobs.checkpoint(&job)? {
                return Ok(RunOutcome::Cancelled);
            }
        }

        // Stage: embeddings, degraded mode on any service failure.
        job.advance(JobStatus::GeneratingEmbeddings)?;
        if !jobs.checkpoint(&job)? {
            return Ok(RunOutcome::Cancelled);
        }
        let rows = self.attach_embeddings(&mut job, enriched).await?;

        // Write the link index and derive final per-type counts.
        let now = Utc::now();
        let entries: Vec<LinkEntry> = rows
            .into_iter()
            .map(|(c, embedding)| LinkEntry {
                brand_id: trigger.brand_id.clone(),
                url: c.url,
                link_type: c.link_type,
                title: c.title,
                embedding,
                source: c.source,
                is_healthy: true,
                last_verified_at: now,
            })
            .collect();
        let written = self.store.links().write_all(&entries);

        let final_set = self.store.links().for_brand(&trigger.brand_id)?;
        let count = |t: LinkType| final_set.iter().filter(|e| e.link_type == t).count() as u64;
        job.set_counts(
            count(LinkType::Product),
            count(LinkType::Collection),
            count(LinkType::Page),
        );

        job.advance(JobStatus::Complete)?;
        jobs.checkpoint(&job)?;

        self.store.record_import(&BrandMeta {
            brand_id: trigger.brand_id.clone(),
            sitemap_url: trigger.sitemap_url.clone(),
            last_sitemap_import_at: Utc::now(),
        })?;
        self.store.flush()?;

        Ok(RunOutcome::Completed(RunStats {
            urls_found: job.urls_found,
            urls_written: written as u64,
            urls_failed: job.urls_failed,
        }))
    }

    /// Batch titles to the embedding service. A failed batch emits its rows
    /// without vectors; the run keeps going.
    async fn attach_embeddings(
        &self,
        job: &mut JobRecord,
        candidates: Vec<LinkCandidate>,
    ) -> Result<Vec<(LinkCandidate, Option<Embedding>)>> {
        let Some(embedder) = &self.embedder else {
            return Ok(candidates.into_iter().map(|c| (c, None)).collect());
        };

        let mut rows = Vec::with_capacity(candidates.len());
        for chunk in candidates.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = chunk
                .iter()
                .map(|c| c.title.clone().unwrap_or_default())
                .collect();

            let vectors: Vec<Option<Embedding>> = match embedder.embed_batch(&texts).await {
                Ok(v) => v.into_iter().map(Some).collect(),
                Err(e) => {
                    warn!(
                        "embedding batch of {} titles failed, storing without vectors: {}",
                        texts.len(),
                        e
                    );
                    vec![None; chunk.len()]
                }
            };

            for (candidate, embedding) in chunk.iter().cloned().zip(vectors) {
                rows.push((candidate, embedding));
            }

            // Keep the record fresh so pollers don't see a stale run.
            job.touch();
            self.store.jobs().checkpoint(job)?;
        }
        Ok(rows)
    }
}
