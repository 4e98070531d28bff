//! Domain models for the job pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod crawl;
mod job;
mod query;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, HttpConfig, LoggingConfig, QueryConfig, SourceConfig, SourceKind,
};
pub use crawl::{CrawlRun, CrawlStatus, SystemStatus};
pub use job::{Application, JobPosting, JobType, RawRecord};
pub use query::{ExperienceFilter, Page, QueryFilters};
