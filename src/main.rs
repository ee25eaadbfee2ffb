//! linkscout: brand site-link discovery CLI

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use linkscout::config::Config;
use linkscout::discovery::PageFetcher;
use linkscout::embedding::HttpEmbedder;
use linkscout::job::{JobRecord, JobView};
use linkscout::pipeline::{Pipeline, RunOutcome};
use linkscout::store::Store;
use linkscout::types::Trigger;

#[derive(Parser)]
#[command(name = "linkscout")]
#[command(about = "Brand site-link discovery with title and embedding enrichment")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults are used if the file is absent)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Data directory override
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a discovery import for a brand
    Discover {
        /// Brand identifier
        #[arg(long)]
        brand: String,

        /// Brand domain, e.g. "shop.example.com"
        #[arg(long)]
        domain: String,

        /// Sitemap URL, e.g. "https://shop.example.com/sitemap.xml"
        #[arg(long)]
        sitemap: String,

        /// Skip the embedding service even if configured
        #[arg(long)]
        no_embeddings: bool,
    },

    /// Show the status of a discovery job
    Status {
        /// Job identifier
        job_id: Uuid,
    },

    /// Cancel a running discovery job
    Cancel {
        /// Job identifier
        job_id: Uuid,
    },

    /// List indexed links for a brand
    Links {
        /// Brand identifier
        #[arg(long)]
        brand: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }

    let store = Arc::new(Store::open(&config.store.data_dir)?);

    match cli.command {
        Commands::Discover {
            brand,
            domain,
            sitemap,
            no_embeddings,
        } => discover(store, config, brand, domain, sitemap, no_embeddings).await,
        Commands::Status { job_id } => status(&store, job_id),
        Commands::Cancel { job_id } => cancel(&store, job_id),
        Commands::Links { brand } => links(&store, &brand),
    }
}

async fn discover(
    store: Arc<Store>,
    config: Config,
    brand: String,
    domain: String,
    sitemap: String,
    no_embeddings: bool,
) -> Result<()> {
    // One import per brand at a time; a stale run must be cancelled first.
    if let Some(existing) = store.jobs().running_for_brand(&brand)? {
        let view = JobView::derive(&existing, Utc::now());
        if view.is_stale {
            anyhow::bail!(
                "brand {} has a stale job {} ({}); cancel it with `linkscout cancel {}` and retry",
                brand,
                existing.id,
                view.message,
                existing.id
            );
        }
        anyhow::bail!(
            "brand {} already has a running import: job {} ({})",
            brand,
            existing.id,
            view.message
        );
    }

    let embedder = if config.embedding.enabled && !no_embeddings {
        Some(HttpEmbedder::new(&config.embedding)?)
    } else {
        None
    };
    let fetcher = PageFetcher::new(&config.fetch)?;

    // The caller creates the pending record; the pipeline owns it from here.
    let job = JobRecord::new(Uuid::new_v4(), &brand);
    store.jobs().put(&job)?;
    info!("created job {} for brand {}", job.id, brand);

    let trigger = Trigger {
        brand_id: brand,
        domain,
        sitemap_url: sitemap,
        job_id: job.id,
    };

    let pipeline = Pipeline::new(fetcher, embedder, Arc::clone(&store), config);
    match pipeline.run(&trigger).await {
        RunOutcome::Completed(stats) => {
            println!(
                "Job {} complete: {} URLs found, {} written, {} failed",
                job.id, stats.urls_found, stats.urls_written, stats.urls_failed
            );
            Ok(())
        }
        RunOutcome::Cancelled => {
            println!("Job {} was cancelled", job.id);
            Ok(())
        }
        RunOutcome::Failed(message) => anyhow::bail!("job {} failed: {}", job.id, message),
    }
}

fn status(store: &Store, job_id: Uuid) -> Result<()> {
    let record = store
        .jobs()
        .get(job_id)?
        .ok_or_else(|| anyhow::anyhow!("job {} not found", job_id))?;
    let view = JobView::derive(&record, Utc::now());

    println!("Job:       {}", record.id);
    println!("Brand:     {}", record.brand_id);
    println!("Status:    {} ({}%)", view.status, view.progress_pct);
    println!("Message:   {}", view.message);
    println!(
        "URLs:      {} found, {} processed, {} failed",
        record.urls_found, record.urls_processed, record.urls_failed
    );
    println!(
        "Breakdown: {} products, {} collections, {} pages",
        record.product_urls_count, record.collection_urls_count, record.page_urls_count
    );
    println!("Updated:   {}", record.updated_at);
    if let Some(completed_at) = record.completed_at {
        println!("Completed: {}", completed_at);
    }
    Ok(())
}

fn cancel(store: &Store, job_id: Uuid) -> Result<()> {
    match store.jobs().cancel(job_id)? {
        Some(record) => {
            store.flush()?;
            println!("Job {} cancelled", record.id);
        }
        None => println!("Job {} is already finished", job_id),
    }
    Ok(())
}

fn links(store: &Store, brand: &str) -> Result<()> {
    let entries = store.links().for_brand(brand)?;
    if entries.is_empty() {
        println!("No links indexed for brand {}", brand);
        return Ok(());
    }

    if let Some(meta) = store.brand_meta(brand)? {
        println!(
            "Last import: {} from {}",
            meta.last_sitemap_import_at, meta.sitemap_url
        );
    }
    for entry in &entries {
        println!(
            "[{}] {} {} ({}{})",
            entry.link_type,
            entry.url,
            entry.title.as_deref().unwrap_or("-"),
            entry.source.as_str(),
            if entry.embedding.is_some() {
                ", embedded"
            } else {
                ""
            }
        );
    }
    println!("{} links total", entries.len());
    Ok(())
}
