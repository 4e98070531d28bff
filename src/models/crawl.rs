//! Crawl history and system status records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Lifecycle state of a crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    Running,
    Completed,
    Failed,
}

impl CrawlStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CrawlStatus::Running)
    }
}

/// One crawl pass as recorded in history.
///
/// Created `Running`; moves to `Completed` or `Failed` exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlRun {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: CrawlStatus,
    pub total_jobs_found: usize,
    pub jobs_by_source: BTreeMap<String, usize>,
    pub keywords_crawled: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CrawlRun {
    /// Start a new run for the given keywords.
    pub fn start(keywords: &[String]) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            end_time: None,
            status: CrawlStatus::Running,
            total_jobs_found: 0,
            jobs_by_source: BTreeMap::new(),
            keywords_crawled: keywords.to_vec(),
            error_message: None,
        }
    }

    /// Mark the run completed with its totals.
    pub fn complete(
        &mut self,
        total_jobs_found: usize,
        jobs_by_source: BTreeMap<String, usize>,
        note: Option<String>,
    ) -> Result<()> {
        self.ensure_running()?;
        self.status = CrawlStatus::Completed;
        self.end_time = Some(Utc::now());
        self.total_jobs_found = total_jobs_found;
        self.jobs_by_source = jobs_by_source;
        self.error_message = note;
        Ok(())
    }

    /// Mark the run failed, keeping whatever totals were gathered.
    pub fn fail(
        &mut self,
        total_jobs_found: usize,
        jobs_by_source: BTreeMap<String, usize>,
        message: impl Into<String>,
    ) -> Result<()> {
        self.ensure_running()?;
        self.status = CrawlStatus::Failed;
        self.end_time = Some(Utc::now());
        self.total_jobs_found = total_jobs_found;
        self.jobs_by_source = jobs_by_source;
        self.error_message = Some(message.into());
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(AppError::validation(format!(
                "crawl run {} already finished as {:?}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

/// Snapshot written after each crawl. Append-only; readers take the newest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemStatus {
    pub id: String,
    pub last_crawl_time: DateTime<Utc>,
    pub total_jobs_last_crawl: usize,
}

impl SystemStatus {
    pub fn now(total_jobs_last_crawl: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            last_crawl_time: Utc::now(),
            total_jobs_last_crawl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_completes_once() {
        let mut run = CrawlRun::start(&["rust".to_string()]);
        assert_eq!(run.status, CrawlStatus::Running);
        assert!(run.end_time.is_none());

        let mut by_source = BTreeMap::new();
        by_source.insert("indeed".to_string(), 3);
        run.complete(3, by_source, None).unwrap();

        assert_eq!(run.status, CrawlStatus::Completed);
        assert_eq!(run.total_jobs_found, 3);
        assert!(run.end_time.is_some());

        assert!(run.fail(0, BTreeMap::new(), "late failure").is_err());
        assert!(run.complete(9, BTreeMap::new(), None).is_err());
        assert_eq!(run.total_jobs_found, 3);
    }

    #[test]
    fn test_failed_run_keeps_message() {
        let mut run = CrawlRun::start(&[]);
        run.fail(2, BTreeMap::new(), "store unreachable").unwrap();
        assert_eq!(run.status, CrawlStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("store unreachable"));
        assert!(run.complete(2, BTreeMap::new(), None).is_err());
    }
}
