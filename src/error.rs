// src/error.rs

//! Unified error handling for the ingestion and query pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A source connector failed to produce records
    #[error("Connector error for {source_name}: {message}")]
    Connector {
        source_name: String,
        message: String,
    },

    /// A raw record could not be normalized
    #[error("Mapping error on '{field}': {message}")]
    Mapping { field: String, message: String },

    /// The backing store rejected an operation
    #[error("Store error: {0}")]
    Store(String),

    /// A batch write failed; earlier batches stay persisted
    #[error("Batch {batch}/{total_batches} failed after {saved} saved: {message}")]
    BatchWrite {
        batch: usize,
        total_batches: usize,
        saved: usize,
        message: String,
    },

    /// A page query could not be served
    #[error("Query error: {0}")]
    Query(String),

    /// Another crawl pass holds the run slot
    #[error("A crawl is already in progress")]
    CrawlInProgress,
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a connector error for a named source.
    pub fn connector(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Connector {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Create a mapping error for a raw field.
    pub fn mapping(field: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Mapping {
            field: field.into(),
            message: message.to_string(),
        }
    }

    /// Create a store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Create a query error.
    pub fn query(message: impl fmt::Display) -> Self {
        Self::Query(message.to_string())
    }

    /// Number of entities persisted before a batch write failed.
    pub fn saved_before_failure(&self) -> usize {
        match self {
            Self::BatchWrite { saved, .. } => *saved,
            _ => 0,
        }
    }
}
