//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Longest accepted crawl interval (one year).
pub const MAX_INTERVAL_HOURS: u64 = 365 * 24;

/// Longest accepted recent-crawl window (one year).
pub const MAX_RECENT_CRAWL_WINDOW_MINS: i64 = 365 * 24 * 60;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Capacity, batching and scheduling settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Listing query settings
    #[serde(default)]
    pub query: QueryConfig,

    /// HTTP client settings for feed connectors
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Source connectors, visited in this order
    #[serde(default = "defaults::sources")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.capacity_limit == 0 {
            return Err(AppError::validation("crawler.capacity_limit must be > 0"));
        }
        if self.crawler.jobs_per_source == 0 {
            return Err(AppError::validation("crawler.jobs_per_source must be > 0"));
        }
        if self.crawler.batch_size == 0 {
            return Err(AppError::validation("crawler.batch_size must be > 0"));
        }
        if !(1..=MAX_INTERVAL_HOURS).contains(&self.crawler.interval_hours) {
            return Err(AppError::validation(format!(
                "crawler.interval_hours must be between 1 and {MAX_INTERVAL_HOURS}"
            )));
        }
        let window = self.crawler.recent_crawl_window_mins;
        if !(0..=MAX_RECENT_CRAWL_WINDOW_MINS).contains(&window) {
            return Err(AppError::validation(format!(
                "crawler.recent_crawl_window_mins must be between 0 and {MAX_RECENT_CRAWL_WINDOW_MINS}"
            )));
        }
        if self.crawler.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(AppError::validation("No keywords defined"));
        }
        if self.query.page_size == 0 {
            return Err(AppError::validation("query.page_size must be > 0"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            let name = source.name.trim().to_lowercase();
            if name.is_empty() {
                return Err(AppError::validation("source with empty name"));
            }
            if !seen.insert(name) {
                return Err(AppError::validation(format!(
                    "duplicate source '{}'",
                    source.name
                )));
            }
            if source.kind == SourceKind::JsonFeed {
                let url = source.url.as_deref().ok_or_else(|| {
                    AppError::validation(format!("source '{}' needs a url", source.name))
                })?;
                url::Url::parse(url)?;
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            query: QueryConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
            sources: defaults::sources(),
        }
    }
}

/// Capacity and scheduling settings for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of postings kept in the store
    #[serde(default = "defaults::capacity_limit")]
    pub capacity_limit: usize,

    /// Upper bound on any single source's quota in one keyword crawl
    #[serde(default = "defaults::jobs_per_source")]
    pub jobs_per_source: usize,

    /// Postings per store write
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Hours between scheduled passes
    #[serde(default = "defaults::interval_hours")]
    pub interval_hours: u64,

    /// A top-up pass is skipped if the last crawl is younger than this
    #[serde(default = "defaults::recent_crawl_window_mins")]
    pub recent_crawl_window_mins: i64,

    /// Keywords crawled by each pass
    #[serde(default = "defaults::keywords")]
    pub keywords: Vec<String>,
}

impl CrawlerConfig {
    /// Time between scheduled passes, clamped to the accepted range.
    pub fn interval(&self) -> Duration {
        let hours = self.interval_hours.clamp(1, MAX_INTERVAL_HOURS);
        Duration::from_secs(hours.checked_mul(60 * 60).unwrap_or(u64::MAX))
    }

    /// How recent a crawl must be for a top-up pass to skip, clamped to the accepted range.
    pub fn recent_crawl_window(&self) -> TimeDelta {
        let minutes = self
            .recent_crawl_window_mins
            .clamp(0, MAX_RECENT_CRAWL_WINDOW_MINS);
        TimeDelta::try_minutes(minutes).unwrap_or_else(TimeDelta::zero)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            capacity_limit: defaults::capacity_limit(),
            jobs_per_source: defaults::jobs_per_source(),
            batch_size: defaults::batch_size(),
            interval_hours: defaults::interval_hours(),
            recent_crawl_window_mins: defaults::recent_crawl_window_mins(),
            keywords: defaults::keywords(),
        }
    }
}

/// Listing query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Default number of crawl runs shown by history
    #[serde(default = "defaults::history_limit")]
    pub history_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::page_size(),
            history_limit: defaults::history_limit(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// How a source's records are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Synthesized postings, for demos and local runs
    Simulated,
    /// A JSON array of raw records fetched over HTTP
    JsonFeed,
}

/// A configured source connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,

    /// Feed URL template; `{keyword}` and `{limit}` are substituted
    #[serde(default)]
    pub url: Option<String>,
}

mod defaults {
    use super::{SourceConfig, SourceKind};

    // Crawler defaults
    pub fn capacity_limit() -> usize {
        100
    }
    pub fn jobs_per_source() -> usize {
        25
    }
    pub fn batch_size() -> usize {
        50
    }
    pub fn interval_hours() -> u64 {
        24
    }
    pub fn recent_crawl_window_mins() -> i64 {
        60
    }
    pub fn keywords() -> Vec<String> {
        [
            "Software Engineer",
            "Frontend Developer",
            "Backend Developer",
            "Full Stack Developer",
            "DevOps Engineer",
            "Data Scientist",
            "Product Manager",
            "UI/UX Designer",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    // Query defaults
    pub fn page_size() -> usize {
        20
    }
    pub fn history_limit() -> usize {
        10
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; jobcrawl/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    pub fn log_level() -> String {
        "info".into()
    }

    // Source defaults
    pub fn sources() -> Vec<SourceConfig> {
        ["linkedin", "naukri", "indeed", "glassdoor"]
            .into_iter()
            .map(|name| SourceConfig {
                name: name.to_string(),
                kind: SourceKind::Simulated,
                url: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn default_sources_keep_declared_order() {
        let names: Vec<_> = Config::default()
            .sources
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["linkedin", "naukri", "indeed", "glassdoor"]);
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.crawler.capacity_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_sources() {
        let mut config = Config::default();
        config.sources.push(SourceConfig {
            name: "LinkedIn".to_string(),
            kind: SourceKind::Simulated,
            url: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_feed_without_url() {
        let mut config = Config::default();
        config.sources = vec![SourceConfig {
            name: "board".to_string(),
            kind: SourceKind::JsonFeed,
            url: None,
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            capacity_limit = 40

            [[sources]]
            name = "remoteok"
            kind = "json_feed"
            url = "https://feeds.example.com/jobs?q={keyword}&n={limit}"
            "#,
        )
        .unwrap();

        assert_eq!(config.crawler.capacity_limit, 40);
        assert_eq!(config.crawler.batch_size, 50);
        assert_eq!(config.query.page_size, 20);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].kind, SourceKind::JsonFeed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn interval_is_in_hours() {
        let config = CrawlerConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn validate_rejects_out_of_range_interval() {
        let mut config = Config::default();
        config.crawler.interval_hours = 0;
        assert!(config.validate().is_err());
        config.crawler.interval_hours = u64::MAX;
        assert!(config.validate().is_err());
        config.crawler.interval_hours = MAX_INTERVAL_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_window() {
        let mut config = Config::default();
        config.crawler.recent_crawl_window_mins = -1;
        assert!(config.validate().is_err());
        config.crawler.recent_crawl_window_mins = i64::MAX;
        assert!(config.validate().is_err());
        config.crawler.recent_crawl_window_mins = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn extreme_durations_are_clamped() {
        let config = CrawlerConfig {
            interval_hours: u64::MAX,
            recent_crawl_window_mins: i64::MAX,
            ..CrawlerConfig::default()
        };
        assert_eq!(config.interval(), Duration::from_secs(MAX_INTERVAL_HOURS * 3600));
        assert_eq!(
            config.recent_crawl_window(),
            TimeDelta::minutes(MAX_RECENT_CRAWL_WINDOW_MINS)
        );

        let negative = CrawlerConfig {
            recent_crawl_window_mins: -30,
            ..CrawlerConfig::default()
        };
        assert_eq!(negative.recent_crawl_window(), TimeDelta::zero());
    }
}
