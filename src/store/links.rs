//! Link index: the per-brand table of discovered URLs
//!
//! Keyed `{brand_id}\x1f{url}`, so writes are upserts by construction and
//! re-running the pipeline can never create duplicates.

use std::collections::HashSet;

use tracing::warn;

use crate::types::LinkEntry;

use super::StoreError;

/// Rows written per sled batch
pub const WRITE_BATCH_SIZE: usize = 50;

/// Separator between brand id and URL in the key. URLs cannot contain 0x1f.
const KEY_SEP: u8 = 0x1f;

/// View over the `links` tree
pub struct LinkIndex<'a> {
    tree: &'a sled::Tree,
}

impl<'a> LinkIndex<'a> {
    pub(super) fn new(tree: &'a sled::Tree) -> Self {
        Self { tree }
    }

    fn key(brand_id: &str, url: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(brand_id.len() + 1 + url.len());
        key.extend_from_slice(brand_id.as_bytes());
        key.push(KEY_SEP);
        key.extend_from_slice(url.as_bytes());
        key
    }

    /// Insert or replace one entry.
    pub fn upsert(&self, entry: &LinkEntry) -> Result<(), StoreError> {
        let data = bincode::serialize(entry)?;
        self.tree.insert(Self::key(&entry.brand_id, &entry.url), data)?;
        Ok(())
    }

    /// Upsert entries in batches of [`WRITE_BATCH_SIZE`].
    ///
    /// A failed batch is logged and skipped; later batches still apply.
    /// Returns the number of rows written.
    pub fn write_all(&self, entries: &[LinkEntry]) -> usize {
        let mut written = 0;
        for chunk in entries.chunks(WRITE_BATCH_SIZE) {
            match self.write_batch(chunk) {
                Ok(()) => written += chunk.len(),
                Err(e) => warn!("link index batch of {} rows failed: {}", chunk.len(), e),
            }
        }
        written
    }

    fn write_batch(&self, entries: &[LinkEntry]) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for entry in entries {
            let data = bincode::serialize(entry)?;
            batch.insert(Self::key(&entry.brand_id, &entry.url), data);
        }
        self.tree.apply_batch(batch)?;
        Ok(())
    }

    /// Whether a (brand, URL) pair is already indexed.
    pub fn contains(&self, brand_id: &str, url: &str) -> Result<bool, StoreError> {
        Ok(self.tree.contains_key(Self::key(brand_id, url))?)
    }

    pub fn get(&self, brand_id: &str, url: &str) -> Result<Option<LinkEntry>, StoreError> {
        let Some(data) = self.tree.get(Self::key(brand_id, url))? else {
            return Ok(None);
        };
        Ok(Some(bincode::deserialize(&data)?))
    }

    /// All indexed URLs for a brand, for merge-stage subtraction.
    pub fn urls_for_brand(&self, brand_id: &str) -> Result<HashSet<String>, StoreError> {
        let mut prefix = brand_id.as_bytes().to_vec();
        prefix.push(KEY_SEP);

        let mut urls = HashSet::new();
        for item in self.tree.scan_prefix(&prefix) {
            let (key, _) = item?;
            if let Ok(url) = std::str::from_utf8(&key[prefix.len()..]) {
                urls.insert(url.to_string());
            }
        }
        Ok(urls)
    }

    /// All entries for a brand.
    pub fn for_brand(&self, brand_id: &str) -> Result<Vec<LinkEntry>, StoreError> {
        let mut prefix = brand_id.as_bytes().to_vec();
        prefix.push(KEY_SEP);

        let mut entries = Vec::new();
        for item in self.tree.scan_prefix(&prefix) {
            let (_, data) = item?;
            entries.push(bincode::deserialize(&data)?);
        }
        Ok(entries)
    }
}
