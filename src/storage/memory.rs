//! In-process storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{Application, CrawlRun, JobPosting, SystemStatus};
use crate::notify::{ChangeEvent, ChangeFeed, ChangeKind, ChangeNotifier, Collection, Subscription};
use crate::storage::{JobQuery, JobStore, apply_upsert, recent_first, select_page};

#[derive(Debug, Default)]
struct Tables {
    jobs: HashMap<String, JobPosting>,
    applications: Vec<Application>,
    crawl_history: Vec<CrawlRun>,
    system_status: Vec<SystemStatus>,
}

/// Store that keeps every collection in memory behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeNotifier for MemoryStore {
    fn subscribe(&self, collection: Collection) -> Subscription {
        self.feed.subscribe(collection)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn upsert_jobs(&self, jobs: &[JobPosting]) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.write().await;
        apply_upsert(&mut tables.jobs, jobs);
        drop(tables);

        self.feed
            .publish(ChangeEvent::new(Collection::Jobs, ChangeKind::Upsert, jobs.len()));
        Ok(())
    }

    async fn delete_all_jobs(&self) -> Result<usize> {
        let removed = {
            let mut tables = self.tables.write().await;
            let removed = tables.jobs.len();
            tables.jobs.clear();
            removed
        };
        self.feed
            .publish(ChangeEvent::new(Collection::Jobs, ChangeKind::Delete, removed));
        Ok(removed)
    }

    async fn count_jobs(&self, query: &JobQuery) -> Result<usize> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.values().filter(|job| query.matches(job)).count())
    }

    async fn select_jobs(
        &self,
        query: &JobQuery,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<JobPosting>> {
        let tables = self.tables.read().await;
        Ok(select_page(tables.jobs.values(), query, offset, limit))
    }

    async fn insert_application(&self, application: &Application) -> Result<()> {
        self.tables
            .write()
            .await
            .applications
            .push(application.clone());
        self.feed
            .publish(ChangeEvent::new(Collection::Applications, ChangeKind::Upsert, 1));
        Ok(())
    }

    async fn count_applications(&self) -> Result<usize> {
        Ok(self.tables.read().await.applications.len())
    }

    async fn delete_all_applications(&self) -> Result<usize> {
        let removed = {
            let mut tables = self.tables.write().await;
            let removed = tables.applications.len();
            tables.applications.clear();
            removed
        };
        self.feed.publish(ChangeEvent::new(
            Collection::Applications,
            ChangeKind::Delete,
            removed,
        ));
        Ok(removed)
    }

    async fn insert_run(&self, run: &CrawlRun) -> Result<()> {
        self.tables.write().await.crawl_history.push(run.clone());
        self.feed
            .publish(ChangeEvent::new(Collection::CrawlHistory, ChangeKind::Upsert, 1));
        Ok(())
    }

    async fn update_run(&self, run: &CrawlRun) -> Result<()> {
        {
            let mut tables = self.tables.write().await;
            let slot = tables
                .crawl_history
                .iter_mut()
                .find(|r| r.id == run.id)
                .ok_or_else(|| AppError::store(format!("crawl run {} not found", run.id)))?;
            *slot = run.clone();
        }
        self.feed
            .publish(ChangeEvent::new(Collection::CrawlHistory, ChangeKind::Upsert, 1));
        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<CrawlRun>> {
        let tables = self.tables.read().await;
        Ok(recent_first(&tables.crawl_history, limit))
    }

    async fn insert_status(&self, status: &SystemStatus) -> Result<()> {
        self.tables.write().await.system_status.push(status.clone());
        self.feed
            .publish(ChangeEvent::new(Collection::SystemStatus, ChangeKind::Upsert, 1));
        Ok(())
    }

    async fn latest_status(&self) -> Result<Option<SystemStatus>> {
        let tables = self.tables.read().await;
        Ok(tables
            .system_status
            .iter()
            .max_by_key(|s| s.last_crawl_time)
            .cloned())
    }
}
