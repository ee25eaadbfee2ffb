//! Persistence layer
//!
//! One sled database with named trees: `links` (the per-brand link index),
//! `jobs` (discovery job records), and `brands` (per-brand import metadata).
//! Rows are bincode-serialized.

pub mod jobs;
pub mod links;

pub use jobs::JobStore;
pub use links::{LinkIndex, WRITE_BATCH_SIZE};

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;
use uuid::Uuid;

use crate::types::BrandMeta;

/// Errors surfaced by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("job {0} not found")]
    JobNotFound(Uuid),
}

/// Handle to the embedded database
pub struct Store {
    db: sled::Db,
    links: sled::Tree,
    jobs: sled::Tree,
    brands: sled::Tree,
}

impl Store {
    /// Open or create the database under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let db_path = data_dir.as_ref().join("linkscout.sled");
        let db = sled::open(&db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;

        let links = db.open_tree("links").context("Failed to open links tree")?;
        let jobs = db.open_tree("jobs").context("Failed to open jobs tree")?;
        let brands = db
            .open_tree("brands")
            .context("Failed to open brands tree")?;

        Ok(Self {
            db,
            links,
            jobs,
            brands,
        })
    }

    pub fn links(&self) -> LinkIndex<'_> {
        LinkIndex::new(&self.links)
    }

    pub fn jobs(&self) -> JobStore<'_> {
        JobStore::new(&self.jobs)
    }

    /// Record a successful sitemap import for a brand.
    pub fn record_import(&self, meta: &BrandMeta) -> Result<(), StoreError> {
        let data = bincode::serialize(meta)?;
        self.brands.insert(meta.brand_id.as_bytes(), data)?;
        Ok(())
    }

    pub fn brand_meta(&self, brand_id: &str) -> Result<Option<BrandMeta>, StoreError> {
        let Some(data) = self.brands.get(brand_id.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(bincode::deserialize(&data)?))
    }

    /// Flush sled buffers to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}
