//! Source connectors.
//!
//! A connector produces raw records for a keyword. How it gets them is its own
//! business; the pipeline only relies on the [`SourceConnector`] contract:
//!
//! - at most `limit` records per call
//! - failures are scoped to that source
//! - no timeouts are imposed from outside; a connector that needs bounded
//!   latency enforces it itself

mod feed;
mod simulated;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, RawRecord, SourceKind};
use crate::utils::http;

pub use feed::JsonFeedConnector;
pub use simulated::SimulatedConnector;

/// Trait that all source connectors must implement.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Source name, as recorded on the postings it produces.
    fn name(&self) -> &str;

    /// Fetch up to `limit` raw records for `keyword`.
    async fn fetch(&self, keyword: &str, limit: usize) -> Result<Vec<RawRecord>>;
}

/// Build the configured connectors, preserving their declared order.
///
/// One HTTP client is shared by every feed source.
pub fn build_connectors(config: &Config) -> Result<Vec<Arc<dyn SourceConnector>>> {
    let mut client: Option<reqwest::Client> = None;
    let mut connectors: Vec<Arc<dyn SourceConnector>> = Vec::with_capacity(config.sources.len());

    for source in &config.sources {
        match source.kind {
            SourceKind::Simulated => {
                connectors.push(Arc::new(SimulatedConnector::new(&source.name)));
            }
            SourceKind::JsonFeed => {
                let shared = match &client {
                    Some(existing) => existing.clone(),
                    None => {
                        let created = http::create_async_client(&config.http)?;
                        client = Some(created.clone());
                        created
                    }
                };
                let url = source.url.as_deref().unwrap_or_default();
                connectors.push(Arc::new(JsonFeedConnector::new(&source.name, url, shared)?));
            }
        }
    }
    Ok(connectors)
}
