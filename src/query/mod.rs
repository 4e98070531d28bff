// src/query/mod.rs

//! Paginated, filtered reads over stored postings.
//!
//! Search text, job type and source are pushed down to the store as a
//! [`JobQuery`]. The experience constraint is range-like and derived from free
//! text, so it is applied to the fetched page in memory. That refinement is
//! page-local: a page may hold fewer than `page_size` rows even when later
//! pages still have matches.

pub mod view;

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Config, ExperienceFilter, Page, QueryFilters};
use crate::pipeline::map::FRESH_LABEL;
use crate::storage::{JobQuery, JobStore};
use crate::utils::first_integer;

pub use view::{JobView, ViewState};

/// Read-only query engine over the job collection.
pub struct QueryEngine {
    store: Arc<dyn JobStore>,
    capacity_limit: usize,
    page_size: usize,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn JobStore>, capacity_limit: usize, page_size: usize) -> Self {
        Self {
            store,
            capacity_limit,
            page_size: page_size.max(1),
        }
    }

    pub fn from_config(store: Arc<dyn JobStore>, config: &Config) -> Self {
        Self::new(store, config.crawler.capacity_limit, config.query.page_size)
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Fetch one 1-based page of postings matching `filters`.
    pub async fn fetch(&self, filters: &QueryFilters, page: usize) -> Result<Page> {
        if page == 0 {
            return Err(AppError::query("page numbers start at 1"));
        }
        let query = JobQuery::from_filters(filters);

        let total_count = self.store.count_jobs(&query).await?.min(self.capacity_limit);
        let total_pages = total_count.div_ceil(self.page_size);
        let offset = (page - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| AppError::query(format!("page {page} is out of range")))?;

        let mut items = self.store.select_jobs(&query, offset, self.page_size).await?;
        if let Some(experience) = &filters.experience {
            items.retain(|job| experience_matches(experience, &job.experience));
        }

        log::debug!(
            "Query page {page}/{total_pages}: {} rows ({total_count} matching)",
            items.len()
        );
        Ok(Page {
            items,
            page,
            total_pages,
            total_count,
        })
    }
}

/// Whether a posting's experience label satisfies the filter.
///
/// Labels without a number count as zero years.
pub fn experience_matches(filter: &ExperienceFilter, experience: &str) -> bool {
    let text = experience.trim().to_lowercase();
    match filter {
        ExperienceFilter::Fresh => {
            text.contains("fresher")
                || text.starts_with('0')
                || text.contains("entry")
                || text == FRESH_LABEL.to_lowercase()
        }
        ExperienceFilter::AtLeast(min) => first_integer(&text).unwrap_or(0) >= *min,
        ExperienceFilter::Exactly(years) => first_integer(&text).unwrap_or(0) == *years,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobPosting, JobType};
    use crate::storage::MemoryStore;
    use crate::storage::test_support::posting;

    async fn store_with(count: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let jobs: Vec<JobPosting> = (0..count)
            .map(|i| posting(&format!("job-{i:03}"), i as i64))
            .collect();
        store.upsert_jobs(&jobs).await.unwrap();
        store
    }

    #[test]
    fn test_experience_at_least() {
        assert!(experience_matches(&ExperienceFilter::AtLeast(3), "5+"));
        assert!(!experience_matches(&ExperienceFilter::AtLeast(8), "5+"));
        assert!(experience_matches(&ExperienceFilter::AtLeast(0), "Fresh"));
        assert!(!experience_matches(&ExperienceFilter::AtLeast(1), "Fresh"));
    }

    #[test]
    fn test_experience_exactly() {
        assert!(experience_matches(&ExperienceFilter::Exactly(5), "5+"));
        assert!(!experience_matches(&ExperienceFilter::Exactly(3), "5+"));
        assert!(experience_matches(&ExperienceFilter::Exactly(0), "Fresh"));
    }

    #[test]
    fn test_experience_fresh() {
        assert!(experience_matches(&ExperienceFilter::Fresh, "Fresh"));
        assert!(experience_matches(&ExperienceFilter::Fresh, "Fresher welcome"));
        assert!(experience_matches(&ExperienceFilter::Fresh, "0-1 years"));
        assert!(experience_matches(&ExperienceFilter::Fresh, "Entry level"));
        assert!(!experience_matches(&ExperienceFilter::Fresh, "2+"));
    }

    #[tokio::test]
    async fn test_pagination_counts() {
        let store = store_with(45).await;
        let engine = QueryEngine::new(store, 100, 20);

        let first = engine.fetch(&QueryFilters::default(), 1).await.unwrap();
        assert_eq!(first.items.len(), 20);
        assert_eq!(first.total_count, 45);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.items[0].id, "job-044");

        let last = engine.fetch(&QueryFilters::default(), 3).await.unwrap();
        assert_eq!(last.items.len(), 5);
        assert_eq!(last.items[4].id, "job-000");
    }

    #[tokio::test]
    async fn test_total_is_capped_at_capacity() {
        let store = store_with(130).await;
        let engine = QueryEngine::new(store, 100, 20);

        let page = engine.fetch(&QueryFilters::default(), 1).await.unwrap();
        assert_eq!(page.total_count, 100);
        assert_eq!(page.total_pages, 5);
    }

    #[tokio::test]
    async fn test_page_zero_is_an_error() {
        let engine = QueryEngine::new(store_with(1).await, 100, 20);
        let err = engine.fetch(&QueryFilters::default(), 0).await.unwrap_err();
        assert!(matches!(err, AppError::Query(_)));
    }

    #[tokio::test]
    async fn test_huge_page_is_an_error() {
        let engine = QueryEngine::new(Arc::new(MemoryStore::new()), 100, 20);
        let err = engine
            .fetch(&QueryFilters::default(), usize::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Query(_)));
    }

    #[tokio::test]
    async fn test_store_filters_are_applied() {
        let store = store_with(5).await;
        let mut remote = posting("remote-1", 100);
        remote.job_type = JobType::Remote;
        remote.source = "naukri".into();
        remote.description = "Kubernetes operators in Rust".into();
        store.upsert_jobs(&[remote]).await.unwrap();
        let engine = QueryEngine::new(store, 100, 20);

        let by_type = QueryFilters::default().with_job_type(JobType::Remote);
        assert_eq!(engine.fetch(&by_type, 1).await.unwrap().total_count, 1);

        let by_source = QueryFilters::default().with_source("Naukri");
        assert_eq!(engine.fetch(&by_source, 1).await.unwrap().total_count, 1);

        let by_search = QueryFilters::default().with_search("KUBERNETES");
        let page = engine.fetch(&by_search, 1).await.unwrap();
        assert_eq!(page.items[0].id, "remote-1");

        let blank = QueryFilters::default().with_search("   ");
        assert_eq!(engine.fetch(&blank, 1).await.unwrap().total_count, 6);
    }

    #[tokio::test]
    async fn test_experience_refines_page_only() {
        let store = store_with(20).await;
        let mut senior = posting("senior", 500);
        senior.experience = "8+".into();
        store.upsert_jobs(&[senior]).await.unwrap();
        let engine = QueryEngine::new(store, 100, 20);

        let filters = QueryFilters::default().with_experience(ExperienceFilter::AtLeast(5));
        let page = engine.fetch(&filters, 1).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "senior");
        // The count comes from the store predicate, before refinement.
        assert_eq!(page.total_count, 21);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_no_match_is_an_empty_page() {
        let engine = QueryEngine::new(store_with(3).await, 100, 20);
        let filters = QueryFilters::default().with_search("cobol");
        let page = engine.fetch(&filters, 1).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_pages, 0);
    }
}
