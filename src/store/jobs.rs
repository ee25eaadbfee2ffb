//! Persisted job records
//!
//! The jobs tree holds one row per discovery run, keyed by job UUID.
//! `checkpoint` is the pipeline's only write path and refuses to overwrite a
//! terminal record with a running one, so an operator's cancellation can
//! never be clobbered by an in-flight progress write.

use tracing::warn;
use uuid::Uuid;

use crate::job::{JobRecord, JobStatus};

use super::StoreError;

/// View over the `jobs` tree
pub struct JobStore<'a> {
    tree: &'a sled::Tree,
}

impl<'a> JobStore<'a> {
    pub(super) fn new(tree: &'a sled::Tree) -> Self {
        Self { tree }
    }

    /// Write a record unconditionally. Used by the triggering caller to
    /// create the `Pending` row.
    pub fn put(&self, record: &JobRecord) -> Result<(), StoreError> {
        let data = bincode::serialize(record)?;
        self.tree.insert(record.id.as_bytes(), data)?;
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let Some(data) = self.tree.get(id.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(bincode::deserialize(&data)?))
    }

    /// Persist pipeline progress, unless the stored record has meanwhile
    /// reached a terminal state (an external cancellation). Returns whether
    /// the write was applied.
    pub fn checkpoint(&self, record: &JobRecord) -> Result<bool, StoreError> {
        if let Some(stored) = self.get(record.id)? {
            if stored.status.is_terminal() && record.status.is_running() {
                warn!(
                    "job {} is already {}, dropping progress write",
                    record.id, stored.status
                );
                return Ok(false);
            }
        }
        self.put(record)?;
        Ok(true)
    }

    /// Request cancellation of a running job. Returns the updated record,
    /// or `None` if the job was already terminal.
    pub fn cancel(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let mut record = self.get(id)?.ok_or(StoreError::JobNotFound(id))?;
        if !record.cancel() {
            return Ok(None);
        }
        self.put(&record)?;
        Ok(Some(record))
    }

    /// The most recently started running job for a brand, if any.
    pub fn running_for_brand(&self, brand_id: &str) -> Result<Option<JobRecord>, StoreError> {
        let mut newest: Option<JobRecord> = None;
        for item in self.tree.iter() {
            let (_, data) = item?;
            let record: JobRecord = bincode::deserialize(&data)?;
            if record.brand_id == brand_id && record.status.is_running() {
                let is_newer = newest
                    .as_ref()
                    .map(|n| record.started_at > n.started_at)
                    .unwrap_or(true);
                if is_newer {
                    newest = Some(record);
                }
            }
        }
        Ok(newest)
    }

    /// Whether the stored status for a job is `Cancelled`. The pipeline
    /// polls this between stages and batches for best-effort cancellation.
    pub fn is_cancelled(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .get(id)?
            .map(|r| r.status == JobStatus::Cancelled)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use tempfile::TempDir;

    #[test]
    fn put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let jobs = store.jobs();

        let record = JobRecord::new(Uuid::new_v4(), "brand-1");
        jobs.put(&record).unwrap();

        let loaded = jobs.get(record.id).unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Pending);
        assert_eq!(loaded.brand_id, "brand-1");
    }

    #[test]
    fn checkpoint_respects_external_cancellation() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let jobs = store.jobs();

        let mut record = JobRecord::new(Uuid::new_v4(), "brand-1");
        jobs.put(&record).unwrap();

        // Operator cancels while the pipeline holds its own copy.
        jobs.cancel(record.id).unwrap().unwrap();
        assert!(jobs.is_cancelled(record.id).unwrap());

        // The pipeline's next progress write is dropped.
        record.advance(JobStatus::Parsing).unwrap();
        assert!(!jobs.checkpoint(&record).unwrap());
        assert_eq!(
            jobs.get(record.id).unwrap().unwrap().status,
            JobStatus::Cancelled
        );
    }

    #[test]
    fn cancel_is_a_no_op_on_terminal_jobs() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let jobs = store.jobs();

        let mut record = JobRecord::new(Uuid::new_v4(), "brand-1");
        record.fail("boom");
        jobs.put(&record).unwrap();

        assert!(jobs.cancel(record.id).unwrap().is_none());
        assert_eq!(
            jobs.get(record.id).unwrap().unwrap().status,
            JobStatus::Failed
        );
    }

    #[test]
    fn running_for_brand_finds_newest_running_job() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let jobs = store.jobs();

        let mut done = JobRecord::new(Uuid::new_v4(), "brand-1");
        done.advance(JobStatus::Parsing).unwrap();
        done.advance(JobStatus::Complete).unwrap();
        jobs.put(&done).unwrap();

        assert!(jobs.running_for_brand("brand-1").unwrap().is_none());

        let running = JobRecord::new(Uuid::new_v4(), "brand-1");
        jobs.put(&running).unwrap();

        let found = jobs.running_for_brand("brand-1").unwrap().unwrap();
        assert_eq!(found.id, running.id);
        assert!(jobs.running_for_brand("brand-2").unwrap().is_none());
    }
}
