//! Storage abstractions for job persistence.
//!
//! The store holds four collections:
//!
//! ```text
//! jobs            # JobPosting rows, upserted by id
//! applications    # Dependents of jobs, only ever bulk-cleared here
//! crawl_history   # CrawlRun rows, newest start_time first on read
//! system_status   # Append-only SystemStatus snapshots
//! ```
//!
//! Every committed mutation is published on the store's change feed.

pub mod local;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::models::{Application, CrawlRun, JobPosting, JobType, QueryFilters, SystemStatus};
use crate::notify::{ChangeNotifier, Collection, Subscription};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStore;

/// Store-level predicate over job postings.
///
/// Only equality and substring constraints live here; anything derived is
/// refined by the query engine after retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    /// Lowercased substring matched against title or description
    pub search: Option<String>,
    pub job_type: Option<JobType>,
    pub source: Option<String>,
}

impl JobQuery {
    /// Match everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build the store predicate from listing filters, dropping blank text fields.
    pub fn from_filters(filters: &QueryFilters) -> Self {
        Self {
            search: filters
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
            job_type: filters.job_type,
            source: filters
                .source
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn matches(&self, job: &JobPosting) -> bool {
        if let Some(needle) = &self.search {
            let hit = job.title.to_lowercase().contains(needle)
                || job.description.to_lowercase().contains(needle);
            if !hit {
                return false;
            }
        }
        if self.job_type.is_some_and(|t| t != job.job_type) {
            return false;
        }
        if self.source.as_ref().is_some_and(|s| *s != job.source) {
            return false;
        }
        true
    }
}

/// Trait for job storage backends.
#[async_trait]
pub trait JobStore: ChangeNotifier {
    /// Insert-or-overwrite a batch keyed by id. The whole batch commits or none of it.
    ///
    /// `created_at` is stamped on first insert and preserved on overwrite.
    async fn upsert_jobs(&self, jobs: &[JobPosting]) -> Result<()>;

    /// Delete every job posting, returning how many were removed.
    async fn delete_all_jobs(&self) -> Result<usize>;

    /// Count postings matching the predicate.
    async fn count_jobs(&self, query: &JobQuery) -> Result<usize>;

    /// Select matching postings, newest `posted_at` first.
    async fn select_jobs(
        &self,
        query: &JobQuery,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<JobPosting>>;

    async fn insert_application(&self, application: &Application) -> Result<()>;

    async fn count_applications(&self) -> Result<usize>;

    /// Delete every application, returning how many were removed.
    async fn delete_all_applications(&self) -> Result<usize>;

    async fn insert_run(&self, run: &CrawlRun) -> Result<()>;

    /// Replace a stored run by id.
    async fn update_run(&self, run: &CrawlRun) -> Result<()>;

    /// Most recent runs by start time, newest first.
    async fn recent_runs(&self, limit: usize) -> Result<Vec<CrawlRun>>;

    async fn insert_status(&self, status: &SystemStatus) -> Result<()>;

    /// The newest status by `last_crawl_time`.
    async fn latest_status(&self) -> Result<Option<SystemStatus>>;
}

/// Apply an upsert batch to an id-keyed table. Returns (inserted, updated).
pub(crate) fn apply_upsert(
    table: &mut HashMap<String, JobPosting>,
    batch: &[JobPosting],
) -> (usize, usize) {
    let now = Utc::now();
    let (mut inserted, mut updated) = (0, 0);

    for job in batch {
        let mut row = job.clone();
        match table.get(&job.id) {
            Some(existing) => {
                row.created_at = existing.created_at.or(row.created_at).or(Some(now));
                updated += 1;
            }
            None => {
                row.created_at = row.created_at.or(Some(now));
                inserted += 1;
            }
        }
        table.insert(row.id.clone(), row);
    }
    (inserted, updated)
}

/// Filter, order and slice job rows for a page query.
pub(crate) fn select_page<'a>(
    rows: impl Iterator<Item = &'a JobPosting>,
    query: &JobQuery,
    offset: usize,
    limit: usize,
) -> Vec<JobPosting> {
    let mut matched: Vec<&JobPosting> = rows.filter(|job| query.matches(job)).collect();
    matched.sort_by(|a, b| b.posted_at.cmp(&a.posted_at).then_with(|| a.id.cmp(&b.id)));
    matched
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect()
}

/// Newest-first slice of crawl history.
pub(crate) fn recent_first(runs: &[CrawlRun], limit: usize) -> Vec<CrawlRun> {
    let mut sorted = runs.to_vec();
    sorted.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    sorted.truncate(limit);
    sorted
}

/// Subscribe helper so callers holding `&dyn JobStore` read naturally.
pub fn watch_jobs(store: &dyn JobStore) -> Subscription {
    store.subscribe(Collection::Jobs)
}


#[cfg(test)]
mod tests {
    use super::test_support::posting;
    use super::*;

    #[test]
    fn test_query_from_filters_drops_blank_search() {
        let filters = QueryFilters::default().with_search("   ");
        assert_eq!(JobQuery::from_filters(&filters).search, None);

        let filters = QueryFilters::default().with_search(" Rust ");
        assert_eq!(
            JobQuery::from_filters(&filters).search.as_deref(),
            Some("rust")
        );
    }

    #[test]
    fn test_query_matches_title_or_description() {
        let job = posting("a", 0);
        let by_title = JobQuery {
            search: Some("engineer".into()),
            ..JobQuery::default()
        };
        let by_description = JobQuery {
            search: Some("reliable".into()),
            ..JobQuery::default()
        };
        let miss = JobQuery {
            search: Some("designer".into()),
            ..JobQuery::default()
        };
        assert!(by_title.matches(&job));
        assert!(by_description.matches(&job));
        assert!(!miss.matches(&job));
    }

    #[test]
    fn test_query_matches_equality_fields() {
        let job = posting("a", 0);
        let remote = JobQuery {
            job_type: Some(JobType::Remote),
            ..JobQuery::default()
        };
        let indeed = JobQuery {
            source: Some("indeed".into()),
            ..JobQuery::default()
        };
        assert!(!remote.matches(&job));
        assert!(indeed.matches(&job));
    }

    #[test]
    fn test_apply_upsert_preserves_created_at() {
        let mut table = HashMap::new();
        let (inserted, updated) = apply_upsert(&mut table, &[posting("a", 0)]);
        assert_eq!((inserted, updated), (1, 0));
        let first_write = table["a"].created_at;
        assert!(first_write.is_some());

        let mut changed = posting("a", 5);
        changed.title = "Staff Engineer".into();
        let (inserted, updated) = apply_upsert(&mut table, &[changed]);
        assert_eq!((inserted, updated), (0, 1));
        assert_eq!(table.len(), 1);
        assert_eq!(table["a"].title, "Staff Engineer");
        assert_eq!(table["a"].created_at, first_write);
    }

    #[test]
    fn test_select_page_orders_newest_first() {
        let rows = vec![posting("old", 0), posting("new", 10), posting("mid", 5)];
        let page = select_page(rows.iter(), &JobQuery::all(), 0, 2);
        let ids: Vec<_> = page.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid"]);

        let rest = select_page(rows.iter(), &JobQuery::all(), 2, 2);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "old");
    }
}
