// src/services/simulated.rs

//! Simulated source connector.
//!
//! Synthesizes plausible postings for a keyword. Used for local runs and
//! demos where no real feed is configured.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::Result;
use crate::models::RawRecord;
use crate::services::SourceConnector;
use crate::utils::slugify;

const COMPANIES: &[&str] = &[
    "Google", "Microsoft", "Amazon", "Meta", "Apple", "Netflix", "Uber", "Airbnb", "TCS",
    "Infosys", "Wipro", "HCL", "Tech Mahindra", "Cognizant", "Accenture", "Stripe", "Notion",
    "Figma", "Canva", "Databricks", "Snowflake",
];

/// Free-text job types as boards tend to write them.
const JOB_TYPES: &[&str] = &[
    "Full Time",
    "Part-time",
    "Contract",
    "Remote",
    "On-site",
    "Hybrid",
];

const EXPERIENCE: &[&str] = &[
    "0-1 years",
    "1-3 years",
    "2-4 years",
    "3-5 years",
    "5-7 years",
    "7-10 years",
    "10+ years",
    "15+ years",
];

/// Postings are dated within this many minutes before now.
const POSTED_WITHIN_MINUTES: i64 = 7 * 24 * 60;

/// Connector that fabricates records instead of fetching them.
pub struct SimulatedConnector {
    name: String,
}

impl SimulatedConnector {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
        }
    }

    fn generate(&self, keyword: &str, rng: &mut impl Rng) -> RawRecord {
        let company = pick(rng, COMPANIES);
        let title = match rng.gen_range(0..5) {
            0 => keyword.to_string(),
            1 => format!("Senior {keyword}"),
            2 => format!("Lead {keyword}"),
            3 => format!("{keyword} Manager"),
            _ => format!("Principal {keyword}"),
        };
        let description = match rng.gen_range(0..4) {
            0 => format!(
                "Exciting opportunity for a {keyword} at {company}. Join our team and work on \
                 cutting-edge projects that impact millions of users."
            ),
            1 => format!(
                "{company} is seeking a talented {keyword} to join our rapidly growing team. \
                 Work with latest technologies."
            ),
            2 => format!(
                "Join {company} as a {keyword} and help build the future of technology. \
                 Competitive salary and benefits."
            ),
            _ => format!(
                "{company} is hiring a {keyword} to lead critical projects and drive technical \
                 excellence."
            ),
        };
        let minutes_ago = rng.gen_range(0..POSTED_WITHIN_MINUTES);
        let posted = Utc::now() - Duration::minutes(minutes_ago);

        RawRecord {
            id: None,
            application_link: format!(
                "https://{}.com/jobs/{}-{}",
                self.name,
                slugify(company),
                rng.gen_range(0..1_000_000)
            ),
            title,
            company: company.to_string(),
            job_type: Some(pick(rng, JOB_TYPES).to_string()),
            experience: pick(rng, EXPERIENCE).to_string(),
            description,
            source: self.name.clone(),
            posted_date: posted.to_rfc3339(),
        }
    }
}

#[async_trait]
impl SourceConnector for SimulatedConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, keyword: &str, limit: usize) -> Result<Vec<RawRecord>> {
        log::debug!("Simulating {limit} {keyword} jobs from {}", self.name);
        let mut rng = rand::thread_rng();
        Ok((0..limit).map(|_| self.generate(keyword, &mut rng)).collect())
    }
}

fn pick<'a>(rng: &mut impl Rng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}
