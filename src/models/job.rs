//! Job posting data structures.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Canonical job type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Remote,
    Onsite,
    Hybrid,
    /// A job type was given but not recognized
    Unknown,
    /// No job type was given at all
    #[serde(rename = "none")]
    Unspecified,
}

impl JobType {
    /// Every canonical value, in declaration order.
    pub const ALL: [JobType; 8] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Remote,
        JobType::Onsite,
        JobType::Hybrid,
        JobType::Unknown,
        JobType::Unspecified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
            JobType::Contract => "contract",
            JobType::Remote => "remote",
            JobType::Onsite => "onsite",
            JobType::Hybrid => "hybrid",
            JobType::Unknown => "unknown",
            JobType::Unspecified => "none",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = AppError;

    /// Parse an exact canonical value. Free-text normalization lives in the mapper.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("unknown job type '{s}'")))
    }
}

/// An unnormalized record as produced by a source connector.
///
/// Never persisted directly; it goes through the mapper first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub company: String,
    /// Free-form job type, e.g. "Remote Contract"
    #[serde(default)]
    pub job_type: Option<String>,
    /// Free-form experience, e.g. "5-7 years"
    #[serde(default)]
    pub experience: String,
    pub description: String,
    pub application_link: String,
    pub source: String,
    /// Timestamp string as given by the source
    pub posted_date: String,
}

/// A normalized, store-resident job posting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobPosting {
    /// Stable identity; upserts are keyed on it
    pub id: String,
    pub title: String,
    pub company: String,
    pub job_type: JobType,
    /// Normalized label, "Fresh" or "N+" (or the raw text when no number was found)
    pub experience: String,
    pub description: String,
    pub application_link: String,
    /// Lowercase connector name
    pub source: String,
    pub posted_at: DateTime<Utc>,
    /// Set by the store on first write
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// An application submitted against a posting.
///
/// Only tracked so that a full reseed can remove dependents with their postings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    pub id: String,
    pub job_id: String,
    pub created_at: DateTime<Utc>,
}

impl Application {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_round_trips_through_str() {
        for job_type in JobType::ALL {
            assert_eq!(job_type.as_str().parse::<JobType>().unwrap(), job_type);
        }
    }

    #[test]
    fn test_job_type_rejects_free_text() {
        assert!("Full Time".parse::<JobType>().is_err());
    }

    #[test]
    fn test_unspecified_serializes_as_none() {
        let json = serde_json::to_string(&JobType::Unspecified).unwrap();
        assert_eq!(json, "\"none\"");
        let json = serde_json::to_string(&JobType::FullTime).unwrap();
        assert_eq!(json, "\"full_time\"");
    }

    #[test]
    fn test_raw_record_defaults_missing_fields() {
        let raw: RawRecord = serde_json::from_str(
            r#"{
                "title": "Engineer",
                "company": "Acme",
                "description": "Build things",
                "application_link": "https://acme.test/jobs/1",
                "source": "Indeed",
                "posted_date": "2024-05-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert!(raw.id.is_none());
        assert!(raw.job_type.is_none());
        assert!(raw.experience.is_empty());
    }
}
