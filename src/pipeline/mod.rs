// src/pipeline/mod.rs

//! Ingestion pipeline.
//!
//! - `map`: Normalize raw source records into canonical postings
//! - `load`: Deduplicating batch writes and bulk clears
//! - `crawl`: Per-keyword crawls, reseed and top-up passes, run history
//! - `schedule`: Recurring background passes

pub mod crawl;
pub mod load;
pub mod map;
pub mod schedule;

pub use crawl::{CrawlResponse, Crawler, PassMode, PassSummary};
pub use load::{BatchWriter, ClearSummary};
pub use schedule::CrawlScheduler;
