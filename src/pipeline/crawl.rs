// src/pipeline/crawl.rs

//! Crawl orchestration.
//!
//! The [`Crawler`] decides how many postings each source may contribute,
//! drives connectors, the mapper and the batch writer, and records crawl
//! history and system status. It never lets the store grow past the capacity
//! limit: quotas shrink instead of postings being deleted afterwards.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::error::{AppError, Result};
use crate::models::{CrawlRun, CrawlerConfig, JobPosting, SystemStatus};
use crate::pipeline::load::BatchWriter;
use crate::pipeline::map;
use crate::services::SourceConnector;
use crate::storage::{JobQuery, JobStore};

/// Note attached to a top-up pass skipped because of a recent crawl.
pub const RECENT_CRAWL_NOTE: &str = "Skipped - recent crawl detected";

/// How a pass treats existing postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassMode {
    /// Clear postings and applications, then crawl every keyword
    Reseed,
    /// Crawl every keyword into the remaining capacity
    TopUp,
}

/// Outcome of one pass over the configured keywords.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub mode: PassMode,
    pub run_id: String,
    pub skipped: bool,
    pub jobs_added: usize,
    pub jobs_by_source: BTreeMap<String, usize>,
    /// `keyword: error` for each keyword whose crawl failed
    pub failures: Vec<String>,
}

/// Result of a manual crawl trigger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlResponse {
    pub success: bool,
    pub jobs_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

impl CrawlResponse {
    /// Response for a finished trigger that took `elapsed`.
    pub fn from_result(result: &Result<usize>, elapsed: std::time::Duration) -> Self {
        let execution_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok(jobs_count) => Self {
                success: true,
                jobs_count: *jobs_count,
                error: None,
                execution_time_ms,
            },
            Err(e) => Self {
                success: false,
                jobs_count: 0,
                error: Some(e.to_string()),
                execution_time_ms,
            },
        }
    }
}

/// Per-source quota for one keyword crawl.
///
/// `ceil(remaining / sources)`, bounded by the configured per-source ceiling.
pub fn per_source_quota(remaining: usize, source_count: usize, ceiling: usize) -> usize {
    if source_count == 0 {
        return 0;
    }
    remaining.div_ceil(source_count).min(ceiling)
}

/// Crawl orchestrator.
pub struct Crawler {
    store: Arc<dyn JobStore>,
    writer: BatchWriter,
    sources: Vec<Arc<dyn SourceConnector>>,
    settings: CrawlerConfig,
    /// Single slot held by any pass or manual trigger
    run_slot: Semaphore,
}

impl Crawler {
    pub fn new(
        store: Arc<dyn JobStore>,
        sources: Vec<Arc<dyn SourceConnector>>,
        settings: CrawlerConfig,
    ) -> Self {
        Self {
            writer: BatchWriter::with_batch_size(Arc::clone(&store), settings.batch_size),
            store,
            sources,
            settings,
            run_slot: Semaphore::new(1),
        }
    }

    pub fn settings(&self) -> &CrawlerConfig {
        &self.settings
    }

    /// Number of postings in the store, always read fresh.
    pub async fn current_count(&self) -> Result<usize> {
        self.store.count_jobs(&JobQuery::all()).await
    }

    /// Crawl one keyword across all sources into the remaining capacity.
    ///
    /// Sources are visited strictly in declared order. A failing connector is
    /// skipped; a failing write aborts the keyword and is returned.
    pub async fn crawl_keyword(&self, keyword: &str) -> Result<Vec<JobPosting>> {
        let started = Instant::now();
        let capacity = self.settings.capacity_limit;
        let current = self.current_count().await?;

        if current >= capacity {
            log::info!("Job limit reached ({current}/{capacity}). Skipping crawl for '{keyword}'.");
            return Ok(Vec::new());
        }
        let remaining = capacity - current;
        let quota = per_source_quota(remaining, self.sources.len(), self.settings.jobs_per_source);
        log::info!(
            "Crawling '{keyword}' ({remaining} slots, up to {quota} per source across {} sources)",
            self.sources.len()
        );

        let mut collected: Vec<JobPosting> = Vec::with_capacity(remaining);
        for source in &self.sources {
            if collected.len() >= remaining {
                log::info!("Remaining slots filled. Stopping crawl.");
                break;
            }
            let limit = quota.min(remaining - collected.len());

            let mut records = match source.fetch(keyword, limit).await {
                Ok(records) => records,
                Err(e) => {
                    log::warn!("Source {} failed for '{keyword}': {e}", source.name());
                    continue;
                }
            };
            records.truncate(limit);

            let (postings, rejected) = map::map_records(source.name(), records);
            log::debug!(
                "{}: {} mapped, {} rejected",
                source.name(),
                postings.len(),
                rejected
            );
            collected.extend(postings);
        }

        if collected.is_empty() {
            log::warn!("No jobs collected for '{keyword}'");
            return Ok(collected);
        }

        match self.writer.save(&collected).await {
            Ok(saved) => {
                self.record_status(saved).await;
                log::info!(
                    "Crawl for '{keyword}' completed in {:.2}s: {saved} jobs added, {}/{capacity} total",
                    started.elapsed().as_secs_f64(),
                    current + saved
                );
                Ok(collected)
            }
            Err(e) => {
                log::error!("Crawl for '{keyword}' failed: {e}");
                self.record_status(e.saved_before_failure()).await;
                Err(e)
            }
        }
    }

    /// Run one crawl now for a single keyword, returning the number of jobs added.
    pub async fn trigger(&self, keyword: &str) -> Result<usize> {
        let _permit = self
            .run_slot
            .try_acquire()
            .map_err(|_| AppError::CrawlInProgress)?;

        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::validation("keyword must not be empty"));
        }

        let mut run = CrawlRun::start(&[keyword.to_string()]);
        let recorded = self.record_run_start(&run).await;

        let result = self.crawl_keyword(keyword).await;
        let finished = match &result {
            Ok(jobs) => run.complete(jobs.len(), count_by_source(jobs), None),
            Err(e) => run.fail(e.saved_before_failure(), BTreeMap::new(), e.to_string()),
        };
        if let Err(e) = finished {
            log::warn!("Crawl run bookkeeping failed: {e}");
        }
        if recorded {
            self.record_run_end(&run).await;
        }

        result.map(|jobs| jobs.len())
    }

    /// Manual trigger as a caller-facing response.
    pub async fn trigger_response(&self, keyword: &str) -> CrawlResponse {
        let started = Instant::now();
        let result = self.trigger(keyword).await;
        CrawlResponse::from_result(&result, started.elapsed())
    }

    /// Run one pass over every configured keyword.
    ///
    /// Failures of individual keywords are recorded and the pass moves on.
    pub async fn run_pass(&self, mode: PassMode) -> Result<PassSummary> {
        let _permit = self
            .run_slot
            .try_acquire()
            .map_err(|_| AppError::CrawlInProgress)?;

        let keywords: Vec<String> = self
            .settings
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let mut run = CrawlRun::start(&keywords);
        let recorded = self.record_run_start(&run).await;
        let mut summary = PassSummary {
            mode,
            run_id: run.id.clone(),
            skipped: false,
            jobs_added: 0,
            jobs_by_source: BTreeMap::new(),
            failures: Vec::new(),
        };

        if mode == PassMode::TopUp && self.crawled_recently().await {
            log::info!("Last crawl is within {} minutes. Skipping.", self.settings.recent_crawl_window_mins);
            summary.skipped = true;
            if let Err(e) = run.complete(0, BTreeMap::new(), Some(RECENT_CRAWL_NOTE.to_string())) {
                log::warn!("Crawl run bookkeeping failed: {e}");
            }
            if recorded {
                self.record_run_end(&run).await;
            }
            return Ok(summary);
        }

        if mode == PassMode::Reseed {
            if let Err(e) = self.writer.clear_all().await {
                log::error!("Reseed aborted, could not clear store: {e}");
                if let Err(bk) = run.fail(0, BTreeMap::new(), e.to_string()) {
                    log::warn!("Crawl run bookkeeping failed: {bk}");
                }
                if recorded {
                    self.record_run_end(&run).await;
                }
                return Err(e);
            }
        }

        for keyword in &keywords {
            match self.crawl_keyword(keyword).await {
                Ok(jobs) => {
                    summary.jobs_added += jobs.len();
                    for (source, count) in count_by_source(&jobs) {
                        *summary.jobs_by_source.entry(source).or_default() += count;
                    }
                }
                Err(e) => {
                    log::error!("Error crawling for keyword '{keyword}': {e}");
                    summary.jobs_added += e.saved_before_failure();
                    summary.failures.push(format!("{keyword}: {e}"));
                }
            }
        }

        if mode == PassMode::Reseed {
            match self.current_count().await {
                Ok(total) => self.record_status(total).await,
                Err(e) => log::warn!("Could not count jobs after reseed: {e}"),
            }
        }

        let finished = if summary.failures.is_empty() {
            run.complete(summary.jobs_added, summary.jobs_by_source.clone(), None)
        } else {
            run.fail(
                summary.jobs_added,
                summary.jobs_by_source.clone(),
                summary.failures.join("; "),
            )
        };
        if let Err(e) = finished {
            log::warn!("Crawl run bookkeeping failed: {e}");
        }
        if recorded {
            self.record_run_end(&run).await;
        }

        log::info!(
            "{:?} pass finished: {} jobs added, {} keyword failures",
            mode,
            summary.jobs_added,
            summary.failures.len()
        );
        Ok(summary)
    }

    /// The most recent crawl runs, newest first.
    pub async fn history(&self, limit: usize) -> Result<Vec<CrawlRun>> {
        self.store.recent_runs(limit).await
    }

    /// The newest system status, if any crawl has been recorded.
    pub async fn latest_status(&self) -> Result<Option<SystemStatus>> {
        self.store.latest_status().await
    }

    #[cfg(test)]
    pub(crate) fn hold_run_slot(&self) -> tokio::sync::SemaphorePermit<'_> {
        self.run_slot.try_acquire().expect("run slot is free")
    }

    async fn crawled_recently(&self) -> bool {
        match self.store.latest_status().await {
            Ok(Some(status)) => {
                Utc::now() - status.last_crawl_time < self.settings.recent_crawl_window()
            }
            Ok(None) => false,
            Err(e) => {
                log::warn!("Could not read system status: {e}");
                false
            }
        }
    }

    async fn record_status(&self, total_jobs: usize) {
        let status = SystemStatus::now(total_jobs);
        bookkeep("update system status", self.store.insert_status(&status)).await;
    }

    async fn record_run_start(&self, run: &CrawlRun) -> bool {
        bookkeep("create crawl history record", self.store.insert_run(run)).await
    }

    async fn record_run_end(&self, run: &CrawlRun) {
        bookkeep("update crawl history record", self.store.update_run(run)).await;
    }
}

/// Await a bookkeeping write, logging instead of propagating failure.
async fn bookkeep(what: &str, op: impl Future<Output = Result<()>>) -> bool {
    match op.await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to {what}: {e}. Continuing.");
            false
        }
    }
}

fn count_by_source(jobs: &[JobPosting]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for job in jobs {
        *counts.entry(job.source.clone()).or_default() += 1;
    }
    counts
}
