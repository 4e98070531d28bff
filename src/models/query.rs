//! Query filter and page result types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{JobPosting, JobType};

/// Experience constraint for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "years")]
pub enum ExperienceFilter {
    /// Entry-level postings (`"0"`)
    Fresh,
    /// Exactly this many years (`"3"`)
    Exactly(u32),
    /// At least this many years (`"3+"`)
    AtLeast(u32),
}

impl FromStr for ExperienceFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AppError::query(format!("invalid experience filter '{s}'"));

        if s == "0" {
            return Ok(ExperienceFilter::Fresh);
        }
        match s.strip_suffix('+') {
            Some(years) => years
                .trim()
                .parse()
                .map(ExperienceFilter::AtLeast)
                .map_err(|_| invalid()),
            None => s.parse().map(ExperienceFilter::Exactly).map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for ExperienceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperienceFilter::Fresh => write!(f, "0"),
            ExperienceFilter::Exactly(years) => write!(f, "{years}"),
            ExperienceFilter::AtLeast(years) => write!(f, "{years}+"),
        }
    }
}

/// Filters for a job listing query. `None` means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilters {
    /// Case-insensitive substring over title or description
    pub search: Option<String>,
    pub job_type: Option<JobType>,
    pub source: Option<String>,
    pub experience: Option<ExperienceFilter>,
}

impl QueryFilters {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_experience(mut self, experience: ExperienceFilter) -> Self {
        self.experience = Some(experience);
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Newest `posted_at` first
    pub items: Vec<JobPosting>,
    /// 1-based
    pub page: usize,
    pub total_pages: usize,
    /// Matching rows, capped at the capacity limit
    pub total_count: usize,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_experience_filter() {
        assert_eq!("0".parse::<ExperienceFilter>().unwrap(), ExperienceFilter::Fresh);
        assert_eq!(
            "3+".parse::<ExperienceFilter>().unwrap(),
            ExperienceFilter::AtLeast(3)
        );
        assert_eq!(
            " 10 ".parse::<ExperienceFilter>().unwrap(),
            ExperienceFilter::Exactly(10)
        );
    }

    #[test]
    fn test_parse_experience_filter_rejects_garbage() {
        assert!("senior".parse::<ExperienceFilter>().is_err());
        assert!("+".parse::<ExperienceFilter>().is_err());
        assert!("-2".parse::<ExperienceFilter>().is_err());
    }

    #[test]
    fn test_experience_filter_display() {
        assert_eq!(ExperienceFilter::AtLeast(5).to_string(), "5+");
        assert_eq!(ExperienceFilter::Fresh.to_string(), "0");
    }
}
