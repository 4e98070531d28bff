// src/pipeline/map.rs

//! Normalization of raw source records into canonical postings.
//!
//! Everything here is pure: no I/O, and the same input always produces the
//! same posting. Free-text parsing of job types and experience happens only
//! at this boundary.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{JobPosting, JobType, RawRecord};
use crate::utils::first_integer;

/// Canonical experience label for entry-level postings.
pub const FRESH_LABEL: &str = "Fresh";

/// Convert a raw record into a canonical posting.
pub fn to_posting(raw: RawRecord) -> Result<JobPosting> {
    let title = required("title", &raw.title)?;
    let company = required("company", &raw.company)?;
    let description = required("description", &raw.description)?;
    let source = required("source", &raw.source)?.to_lowercase();

    let application_link = raw.application_link.trim().to_string();
    url::Url::parse(&application_link)
        .map_err(|e| AppError::mapping("application_link", e))?;

    let posted_at = parse_timestamp(&raw.posted_date)?;

    let id = match raw.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => derive_id(&source, &company, &title, &application_link, &posted_at),
    };

    Ok(JobPosting {
        id,
        title,
        company,
        job_type: normalize_job_type(raw.job_type.as_deref()),
        experience: normalize_experience(&raw.experience),
        description,
        application_link,
        source,
        posted_at,
        created_at: None,
    })
}

/// Project a canonical posting back into the raw record shape.
///
/// Normalized labels are carried as-is; the original free text is not recoverable.
pub fn to_raw(job: &JobPosting) -> RawRecord {
    RawRecord {
        id: Some(job.id.clone()),
        title: job.title.clone(),
        company: job.company.clone(),
        job_type: match job.job_type {
            JobType::Unspecified => None,
            other => Some(other.as_str().to_string()),
        },
        experience: job.experience.clone(),
        description: job.description.clone(),
        application_link: job.application_link.clone(),
        source: job.source.clone(),
        posted_date: job.posted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Map a job type string onto the canonical enum.
///
/// Location terms are checked before employment terms, so "Remote Contract"
/// is `Remote`.
pub fn normalize_job_type(raw: Option<&str>) -> JobType {
    let Some(raw) = raw else {
        return JobType::Unspecified;
    };
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return JobType::Unspecified;
    }
    if let Ok(exact) = text.parse::<JobType>() {
        return exact;
    }

    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    if has(&["remote", "wfh", "work from home"]) {
        JobType::Remote
    } else if has(&["hybrid", "flexible"]) {
        JobType::Hybrid
    } else if has(&["onsite", "in office", "on-site"]) {
        JobType::Onsite
    } else if has(&["contract", "temporary", "freelance"]) {
        JobType::Contract
    } else if has(&["part", "part-time"]) {
        JobType::PartTime
    } else if has(&["full", "permanent"]) {
        JobType::FullTime
    } else {
        JobType::Unknown
    }
}

/// Normalize an experience string to "Fresh" or "N+".
///
/// Strings without any number pass through unchanged.
pub fn normalize_experience(raw: &str) -> String {
    let text = raw.trim().to_lowercase();

    if text.starts_with('0') || text.contains("fresher") {
        return FRESH_LABEL.to_string();
    }
    match first_integer(&text) {
        Some(years) => format!("{years}+"),
        None => raw.to_string(),
    }
}

/// Parse a source timestamp.
///
/// Accepts RFC 3339, naive date-times (taken as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let text = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(AppError::mapping(
        "posted_date",
        format!("unparsable timestamp '{raw}'"),
    ))
}

/// Map a source's records one by one, dropping any that fail.
///
/// Returns the postings in input order plus the number rejected.
pub fn map_records(source_name: &str, records: Vec<RawRecord>) -> (Vec<JobPosting>, usize) {
    let mut rejected = 0;
    let mut postings = Vec::with_capacity(records.len());

    for raw in records {
        match to_posting(raw) {
            Ok(posting) => postings.push(posting),
            Err(e) => {
                rejected += 1;
                log::warn!("Dropping record from {source_name}: {e}");
            }
        }
    }
    (postings, rejected)
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::mapping(field, "empty after trim"));
    }
    Ok(trimmed.to_string())
}

/// Identity for records that arrive without one, stable for the same logical posting.
fn derive_id(
    source: &str,
    company: &str,
    title: &str,
    link: &str,
    posted_at: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    for part in [source, company, title, link] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hasher.update(posted_at.timestamp_millis().to_be_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{source}-{}", &digest[..20])
}
