//! Local filesystem storage implementation.
//!
//! Each collection is one JSON document, rewritten atomically on every
//! mutation, so a batch either lands completely or not at all.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml           # Crawler Configuration
//! ├── jobs.json             # JobPosting rows
//! ├── applications.json     # Application rows
//! ├── crawl_history.json    # CrawlRun rows
//! └── system_status.json    # SystemStatus snapshots (append-only)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Application, CrawlRun, JobPosting, SystemStatus};
use crate::notify::{ChangeEvent, ChangeFeed, ChangeKind, ChangeNotifier, Collection, Subscription};
use crate::storage::{JobQuery, JobStore, apply_upsert, recent_first, select_page};

const JOBS: &str = "jobs.json";
const APPLICATIONS: &str = "applications.json";
const CRAWL_HISTORY: &str = "crawl_history.json";
const SYSTEM_STATUS: &str = "system_status.json";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
    feed: ChangeFeed,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
            feed: ChangeFeed::new(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read a JSON collection, empty if the file doesn't exist yet.
    async fn read_rows<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| AppError::store(format!("corrupt {key}: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn read_jobs(&self) -> Result<Vec<JobPosting>> {
        self.read_rows(JOBS).await
    }
}

impl ChangeNotifier for LocalStorage {
    fn subscribe(&self, collection: Collection) -> Subscription {
        self.feed.subscribe(collection)
    }
}

#[async_trait]
impl JobStore for LocalStorage {
    async fn upsert_jobs(&self, jobs: &[JobPosting]) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;

        let mut table: HashMap<String, JobPosting> = self
            .read_jobs()
            .await?
            .into_iter()
            .map(|job| (job.id.clone(), job))
            .collect();
        let (inserted, updated) = apply_upsert(&mut table, jobs);

        let rows: Vec<JobPosting> = select_page(table.values(), &JobQuery::all(), 0, table.len());
        self.write_json(JOBS, &rows).await?;
        log::debug!("{JOBS}: {inserted} inserted, {updated} updated");

        self.feed
            .publish(ChangeEvent::new(Collection::Jobs, ChangeKind::Upsert, jobs.len()));
        Ok(())
    }

    async fn delete_all_jobs(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let removed = self.read_jobs().await?.len();
        self.write_json::<[JobPosting]>(JOBS, &[]).await?;
        self.feed
            .publish(ChangeEvent::new(Collection::Jobs, ChangeKind::Delete, removed));
        Ok(removed)
    }

    async fn count_jobs(&self, query: &JobQuery) -> Result<usize> {
        let jobs = self.read_jobs().await?;
        Ok(jobs.iter().filter(|job| query.matches(job)).count())
    }

    async fn select_jobs(
        &self,
        query: &JobQuery,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<JobPosting>> {
        let jobs = self.read_jobs().await?;
        Ok(select_page(jobs.iter(), query, offset, limit))
    }

    async fn insert_application(&self, application: &Application) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<Application> = self.read_rows(APPLICATIONS).await?;
        rows.push(application.clone());
        self.write_json(APPLICATIONS, &rows).await?;
        self.feed
            .publish(ChangeEvent::new(Collection::Applications, ChangeKind::Upsert, 1));
        Ok(())
    }

    async fn count_applications(&self) -> Result<usize> {
        Ok(self.read_rows::<Application>(APPLICATIONS).await?.len())
    }

    async fn delete_all_applications(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let removed = self.read_rows::<Application>(APPLICATIONS).await?.len();
        self.write_json::<[Application]>(APPLICATIONS, &[]).await?;
        self.feed.publish(ChangeEvent::new(
            Collection::Applications,
            ChangeKind::Delete,
            removed,
        ));
        Ok(removed)
    }

    async fn insert_run(&self, run: &CrawlRun) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut runs: Vec<CrawlRun> = self.read_rows(CRAWL_HISTORY).await?;
        runs.push(run.clone());
        self.write_json(CRAWL_HISTORY, &runs).await?;
        self.feed
            .publish(ChangeEvent::new(Collection::CrawlHistory, ChangeKind::Upsert, 1));
        Ok(())
    }

    async fn update_run(&self, run: &CrawlRun) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut runs: Vec<CrawlRun> = self.read_rows(CRAWL_HISTORY).await?;
        let slot = runs
            .iter_mut()
            .find(|r| r.id == run.id)
            .ok_or_else(|| AppError::store(format!("crawl run {} not found", run.id)))?;
        *slot = run.clone();
        self.write_json(CRAWL_HISTORY, &runs).await?;
        self.feed
            .publish(ChangeEvent::new(Collection::CrawlHistory, ChangeKind::Upsert, 1));
        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<CrawlRun>> {
        let runs: Vec<CrawlRun> = self.read_rows(CRAWL_HISTORY).await?;
        Ok(recent_first(&runs, limit))
    }

    async fn insert_status(&self, status: &SystemStatus) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<SystemStatus> = self.read_rows(SYSTEM_STATUS).await?;
        rows.push(status.clone());
        self.write_json(SYSTEM_STATUS, &rows).await?;
        self.feed
            .publish(ChangeEvent::new(Collection::SystemStatus, ChangeKind::Upsert, 1));
        Ok(())
    }

    async fn latest_status(&self) -> Result<Option<SystemStatus>> {
        let rows: Vec<SystemStatus> = self.read_rows(SYSTEM_STATUS).await?;
        Ok(rows.into_iter().max_by_key(|s| s.last_crawl_time))
    }
}
