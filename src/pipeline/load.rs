// src/pipeline/load.rs

//! Deduplicating batch writer.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::JobPosting;
use crate::storage::{JobQuery, JobStore};

/// Default number of postings per store write.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Outcome of a bulk clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearSummary {
    pub jobs_removed: usize,
    pub applications_removed: usize,
}

/// Sole writer of job postings.
///
/// Saves are upserts keyed by id, written in fixed-size batches. Each batch is
/// atomic in the store; the call as a whole is not.
pub struct BatchWriter {
    store: Arc<dyn JobStore>,
    batch_size: usize,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self::with_batch_size(store, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(store: Arc<dyn JobStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Persist postings in order, one batch at a time.
    ///
    /// The first failing batch stops the call; batches before it stay
    /// persisted and the error reports how many postings were saved.
    pub async fn save(&self, jobs: &[JobPosting]) -> Result<usize> {
        if jobs.is_empty() {
            return Ok(0);
        }
        let total_batches = jobs.len().div_ceil(self.batch_size);
        log::info!("Saving {} jobs in {} batches", jobs.len(), total_batches);

        let mut saved = 0;
        for (index, batch) in jobs.chunks(self.batch_size).enumerate() {
            let batch_number = index + 1;
            if let Err(e) = self.store.upsert_jobs(batch).await {
                log::error!("Batch {batch_number}/{total_batches} failed: {e}");
                return Err(AppError::BatchWrite {
                    batch: batch_number,
                    total_batches,
                    saved,
                    message: e.to_string(),
                });
            }
            saved += batch.len();
            log::debug!("Batch {batch_number}/{total_batches} saved");
        }
        Ok(saved)
    }

    /// Remove every posting and every application that depends on one.
    pub async fn clear_all(&self) -> Result<ClearSummary> {
        let before = self.store.count_jobs(&JobQuery::all()).await?;
        log::info!("Clearing {before} existing jobs");

        let summary = ClearSummary {
            jobs_removed: self.store.delete_all_jobs().await?,
            applications_removed: self.store.delete_all_applications().await?,
        };

        log::info!(
            "Cleared {} jobs and {} applications",
            summary.jobs_removed,
            summary.applications_removed
        );
        Ok(summary)
    }
}
