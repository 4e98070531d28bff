// src/query/view.rs

//! Live listing view.
//!
//! A [`JobView`] holds the current filters and page, and re-runs the same
//! query whenever the job collection changes.

use std::sync::Arc;

use crate::models::{Page, QueryFilters};
use crate::notify::Subscription;
use crate::query::QueryEngine;
use crate::storage::watch_jobs;

/// What a listing currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Ready(Page),
    /// The query succeeded and matched nothing on this page
    Empty(Page),
    /// The query failed; distinct from an empty result
    Failed(String),
}

impl ViewState {
    pub fn page(&self) -> Option<&Page> {
        match self {
            ViewState::Ready(page) | ViewState::Empty(page) => Some(page),
            _ => None,
        }
    }
}

pub struct JobView {
    engine: Arc<QueryEngine>,
    filters: QueryFilters,
    page: usize,
    state: ViewState,
    changes: Option<Subscription>,
}

impl JobView {
    /// Open a view on page 1 with no filters, subscribed to job changes.
    ///
    /// Nothing is fetched until [`refresh`](Self::refresh) is called.
    pub fn open(engine: Arc<QueryEngine>) -> Self {
        let changes = Some(watch_jobs(engine.store().as_ref()));
        Self {
            engine,
            filters: QueryFilters::default(),
            page: 1,
            state: ViewState::Loading,
            changes,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn filters(&self) -> &QueryFilters {
        &self.filters
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Re-run the current query.
    pub async fn refresh(&mut self) -> &ViewState {
        self.state = ViewState::Loading;
        self.state = match self.engine.fetch(&self.filters, self.page).await {
            Ok(page) if page.is_empty() => ViewState::Empty(page),
            Ok(page) => ViewState::Ready(page),
            Err(e) => {
                log::warn!("Job listing query failed: {e}");
                ViewState::Failed(e.to_string())
            }
        };
        &self.state
    }

    /// Apply new filters. A changed filter set always starts again at page 1.
    pub async fn set_filters(&mut self, filters: QueryFilters) -> &ViewState {
        if filters != self.filters {
            self.filters = filters;
            self.page = 1;
        }
        self.refresh().await
    }

    pub async fn set_page(&mut self, page: usize) -> &ViewState {
        self.page = page;
        self.refresh().await
    }

    /// Wait for the next job change and re-fetch the same page and filters.
    ///
    /// Returns `false` once the view is closed or the feed has shut down.
    pub async fn next_change(&mut self) -> bool {
        let Some(changes) = self.changes.as_mut() else {
            return false;
        };
        match changes.recv().await {
            Some(event) => {
                log::debug!("Job change ({:?}, {} rows); refreshing", event.kind, event.rows);
                self.refresh().await;
                true
            }
            None => {
                self.changes = None;
                false
            }
        }
    }

    /// Stop listening for changes.
    pub fn close(&mut self) {
        if let Some(changes) = self.changes.take() {
            changes.unsubscribe();
        }
    }
}
