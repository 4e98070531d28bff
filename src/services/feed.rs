// src/services/feed.rs

//! JSON feed connector.
//!
//! Fetches a JSON array of raw records from a URL template such as
//! `https://feeds.example.com/jobs?q={keyword}&n={limit}`.

use async_trait::async_trait;
use reqwest::Client;
use url::form_urlencoded;

use crate::error::{AppError, Result};
use crate::models::RawRecord;
use crate::services::SourceConnector;
use crate::utils::http::fetch_json;

/// Connector for sources that publish raw records as JSON over HTTP.
pub struct JsonFeedConnector {
    name: String,
    url_template: String,
    client: Client,
}

impl JsonFeedConnector {
    pub fn new(name: &str, url_template: &str, client: Client) -> Result<Self> {
        // Validate against a filled-in sample so placeholders don't hide a bad base URL.
        url::Url::parse(&Self::expand(url_template, "sample", 1))?;
        Ok(Self {
            name: name.trim().to_lowercase(),
            url_template: url_template.to_string(),
            client,
        })
    }

    fn expand(template: &str, keyword: &str, limit: usize) -> String {
        let keyword: String = form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
        template
            .replace("{keyword}", &keyword)
            .replace("{limit}", &limit.to_string())
    }

    /// The URL requested for a keyword and limit.
    pub fn request_url(&self, keyword: &str, limit: usize) -> String {
        Self::expand(&self.url_template, keyword, limit)
    }
}

#[async_trait]
impl SourceConnector for JsonFeedConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, keyword: &str, limit: usize) -> Result<Vec<RawRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = self.request_url(keyword, limit);
        log::debug!("Fetching {} feed: {}", self.name, url);

        let mut records: Vec<RawRecord> = fetch_json(&self.client, &url)
            .await
            .map_err(|e| AppError::connector(&self.name, e))?;

        // Feeds are not trusted to honor the limit.
        records.truncate(limit);
        for record in &mut records {
            if record.source.trim().is_empty() {
                record.source = self.name.clone();
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_encodes_keyword() {
        let connector = JsonFeedConnector::new(
            "Board",
            "https://feeds.example.com/jobs?q={keyword}&n={limit}",
            Client::new(),
        )
        .unwrap();

        assert_eq!(connector.name(), "board");
        assert_eq!(
            connector.request_url("UI/UX Designer", 7),
            "https://feeds.example.com/jobs?q=UI%2FUX+Designer&n=7"
        );
    }

    #[test]
    fn test_rejects_invalid_template() {
        assert!(JsonFeedConnector::new("x", "feeds/{keyword}", Client::new()).is_err());
    }

    #[tokio::test]
    async fn test_zero_limit_skips_request() {
        let connector =
            JsonFeedConnector::new("x", "http://127.0.0.1:9/{keyword}", Client::new()).unwrap();
        assert!(connector.fetch("rust", 0).await.unwrap().is_empty());
    }
}
