// src/pipeline/schedule.rs

//! Periodic crawl scheduling.
//!
//! A [`CrawlScheduler`] owns one background task that runs a pass
//! immediately and then once per interval. Stopping signals the task and
//! waits for it, so an in-flight pass always finishes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{AppError, Result};
use crate::pipeline::crawl::{Crawler, PassMode};

enum SchedulerState {
    Stopped,
    Running {
        handle: JoinHandle<()>,
        shutdown: watch::Sender<bool>,
    },
}

/// Recurring driver for [`Crawler::run_pass`].
pub struct CrawlScheduler {
    crawler: Arc<Crawler>,
    mode: PassMode,
    interval: Duration,
    state: Mutex<SchedulerState>,
}

impl CrawlScheduler {
    /// Scheduler running `mode` passes every `interval`.
    pub fn new(crawler: Arc<Crawler>, mode: PassMode, interval: Duration) -> Self {
        Self {
            crawler,
            mode,
            interval,
            state: Mutex::new(SchedulerState::Stopped),
        }
    }

    /// Scheduler using the crawler's configured interval.
    pub fn from_crawler(crawler: Arc<Crawler>, mode: PassMode) -> Self {
        let interval = crawler.settings().interval();
        Self::new(crawler, mode, interval)
    }

    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(*state, SchedulerState::Running { .. }))
            .unwrap_or(false)
    }

    /// Spawn the background task. Must be called inside a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| AppError::config(format!("scheduler state poisoned: {e}")))?;

        if matches!(*state, SchedulerState::Running { .. }) {
            return Err(AppError::config("scheduler is already running"));
        }

        let (shutdown, signal) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.crawler),
            self.mode,
            self.interval,
            signal,
        ));
        *state = SchedulerState::Running { handle, shutdown };
        log::info!(
            "Crawl scheduler started ({:?} every {}s)",
            self.mode,
            self.interval.as_secs()
        );
        Ok(())
    }

    /// Cancel the schedule and wait for the task to exit. Safe to call when stopped.
    pub async fn stop(&self) -> Result<()> {
        let previous = {
            let mut state = self
                .state
                .lock()
                .map_err(|e| AppError::config(format!("scheduler state poisoned: {e}")))?;
            std::mem::replace(&mut *state, SchedulerState::Stopped)
        };

        if let SchedulerState::Running { handle, shutdown } = previous {
            let _ = shutdown.send(true);
            handle
                .await
                .map_err(|e| AppError::config(format!("failed to join scheduler task: {e}")))?;
            log::info!("Crawl scheduler stopped");
        }
        Ok(())
    }
}

async fn run_loop(
    crawler: Arc<Crawler>,
    mode: PassMode,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        match crawler.run_pass(mode).await {
            Ok(summary) if summary.skipped => log::info!("Scheduled pass skipped"),
            Ok(summary) => log::info!(
                "Scheduled pass added {} jobs ({} keyword failures)",
                summary.jobs_added,
                summary.failures.len()
            ),
            Err(AppError::CrawlInProgress) => {
                log::warn!("Previous crawl still running. Skipping scheduled pass.")
            }
            Err(e) => log::error!("Scheduled pass failed: {e}"),
        }
    }
    log::debug!("Crawl scheduler task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlerConfig;
    use crate::services::{SimulatedConnector, SourceConnector};
    use crate::storage::{JobStore, MemoryStore};

    fn crawler(store: Arc<MemoryStore>) -> Arc<Crawler> {
        let sources: Vec<Arc<dyn SourceConnector>> = vec![
            Arc::new(SimulatedConnector::new("linkedin")),
            Arc::new(SimulatedConnector::new("indeed")),
        ];
        let settings = CrawlerConfig {
            keywords: vec!["Rust Developer".to_string()],
            ..CrawlerConfig::default()
        };
        Arc::new(Crawler::new(store, sources, settings))
    }

    #[tokio::test]
    async fn test_first_pass_runs_immediately() {
        let store = Arc::new(MemoryStore::new());
        let scheduler =
            CrawlScheduler::new(crawler(store.clone()), PassMode::Reseed, Duration::from_secs(3600));

        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        let mut waited = 0;
        while store.recent_runs(1).await.unwrap().first().is_none_or(|r| r.end_time.is_none()) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
            assert!(waited < 500, "first pass never finished");
        }
        scheduler.stop().await.unwrap();

        assert!(!scheduler.is_running());
        assert_eq!(store.recent_runs(10).await.unwrap().len(), 1);
        assert_eq!(store.count_jobs(&Default::default()).await.unwrap(), 50);
    }

    async fn wait_for_completed_runs(store: &MemoryStore, expected: usize) {
        let mut waited = 0;
        loop {
            let runs = store.recent_runs(10).await.unwrap();
            if runs.iter().filter(|r| r.end_time.is_some()).count() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
            assert!(waited < 500, "pass {expected} never finished");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_follow_interval_until_stopped() {
        let period = Duration::from_secs(3600);
        let store = Arc::new(MemoryStore::new());
        let scheduler = CrawlScheduler::new(crawler(store.clone()), PassMode::Reseed, period);

        scheduler.start().unwrap();
        wait_for_completed_runs(&store, 1).await;
        assert_eq!(store.recent_runs(10).await.unwrap().len(), 1);

        tokio::time::advance(period).await;
        wait_for_completed_runs(&store, 2).await;
        assert_eq!(store.recent_runs(10).await.unwrap().len(), 2);

        scheduler.stop().await.unwrap();
        tokio::time::advance(period * 3).await;
        tokio::task::yield_now().await;
        assert_eq!(store.recent_runs(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let scheduler =
            CrawlScheduler::new(crawler(store), PassMode::TopUp, Duration::from_secs(3600));

        scheduler.stop().await.unwrap();
        scheduler.start().unwrap();
        scheduler.stop().await.unwrap();
        scheduler.stop().await.unwrap();
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let scheduler =
            CrawlScheduler::new(crawler(store), PassMode::TopUp, Duration::from_secs(3600));

        scheduler.start().unwrap();
        assert!(scheduler.start().is_err());
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_busy_crawler_skips_scheduled_pass() {
        let store = Arc::new(MemoryStore::new());
        let crawler = crawler(store.clone());
        let held = crawler.hold_run_slot();
        let scheduler =
            CrawlScheduler::new(Arc::clone(&crawler), PassMode::TopUp, Duration::from_secs(3600));

        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop().await.unwrap();
        drop(held);

        assert!(store.recent_runs(10).await.unwrap().is_empty());
    }
}
