use crate::llm::{parse_llm_json, ChatClient};
use crate::prompt::{PromptBuilder, JOB_URL_SYSTEM};
use crate::types::JobListing;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Path fragments of pages describing a single job.
const POSTING_PATTERNS: [&str; 9] = [
    "/jobs/view/",
    "/job/",
    "/careers/",
    "/positions/",
    "/job-details/",
    "/job-description/",
    "/job-posting/",
    "/job-opportunity/",
    "/job-opening/",
];

/// Job board result pages listing many jobs.
const BOARD_SEARCH_PATTERNS: [&str; 4] = [
    "linkedin.com/jobs/search",
    "indeed.com/jobs",
    "glassdoor.com/jobs",
    "monster.com/jobs",
];

const POSTING_CONFIDENCE: f32 = 0.9;
const BOARD_SEARCH_CONFIDENCE: f32 = 0.3;

/// A listing annotated with whether it points at a single job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedListing {
    #[serde(flatten)]
    pub listing: JobListing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_job_posting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<JobListing> for RankedListing {
    fn from(listing: JobListing) -> Self {
        Self {
            listing,
            is_job_posting: None,
            confidence: None,
            reason: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UrlVerdict {
    url: String,
    #[serde(default)]
    is_job_posting: bool,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    reason: Option<String>,
}

/// Keeps the listings that point at job postings, most direct first.
///
/// URLs are classified by pattern. When a model is available, it judges the listings the
/// patterns cannot place; a failed model call only loses those listings.
pub struct JobUrlRanker {
    llm: Option<Arc<dyn ChatClient>>,
}

impl JobUrlRanker {
    pub fn new(llm: Option<Arc<dyn ChatClient>>) -> Self {
        Self { llm }
    }

    pub async fn rank(&self, listings: Vec<JobListing>) -> Vec<RankedListing> {
        let mut ranked = Vec::new();
        let mut unknown = Vec::new();

        for listing in listings {
            match classify_url(&listing.result.link) {
                Some((is_job_posting, confidence)) => ranked.push(RankedListing {
                    is_job_posting: Some(is_job_posting),
                    confidence: Some(confidence),
                    ..RankedListing::from(listing)
                }),
                None => unknown.push(listing),
            }
        }

        if !unknown.is_empty() {
            if let Some(llm) = &self.llm {
                ranked.extend(self.judge(llm.as_ref(), unknown).await);
            } else {
                debug!("Dropping {} listings that are not job postings", unknown.len());
            }
        }

        ranked.sort_by(|a, b| {
            b.is_job_posting
                .unwrap_or(false)
                .cmp(&a.is_job_posting.unwrap_or(false))
                .then_with(|| {
                    b.confidence
                        .unwrap_or(0.0)
                        .total_cmp(&a.confidence.unwrap_or(0.0))
                })
        });
        ranked
    }

    async fn judge(&self, llm: &dyn ChatClient, listings: Vec<JobListing>) -> Vec<RankedListing> {
        let results = listings
            .iter()
            .map(|listing| {
                format!(
                    "URL: {}\nTitle: {}\nDescription: {}",
                    listing.result.link, listing.result.title, listing.result.snippet
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = PromptBuilder::new(JOB_URL_SYSTEM)
            .section("Search Results", results)
            .instruction("Identify job posting URLs.")
            .build();

        let verdicts = match llm.complete(&prompt.system, &prompt.user).await.and_then(|answer| {
            let value = parse_llm_json(&answer)?;
            Ok(serde_json::from_value::<Vec<UrlVerdict>>(value)?)
        }) {
            Ok(verdicts) => verdicts,
            Err(e) => {
                warn!("Could not classify {} listings: {}", listings.len(), e);
                return Vec::new();
            }
        };

        let mut verdicts: HashMap<String, UrlVerdict> =
            verdicts.into_iter().map(|verdict| (verdict.url.clone(), verdict)).collect();

        listings
            .into_iter()
            .filter_map(|listing| {
                let verdict = verdicts.remove(&listing.result.link)?;
                verdict.is_job_posting.then(|| RankedListing {
                    is_job_posting: Some(true),
                    confidence: Some(verdict.confidence.clamp(0.0, 1.0)),
                    reason: verdict.reason,
                    ..RankedListing::from(listing)
                })
            })
            .collect()
    }
}

/// Classifies a URL as a posting or a job board search page; `None` when neither.
pub fn classify_url(url: &str) -> Option<(bool, f32)> {
    let url = url.to_lowercase();
    if POSTING_PATTERNS.iter().any(|pattern| url.contains(pattern)) {
        Some((true, POSTING_CONFIDENCE))
    } else if BOARD_SEARCH_PATTERNS.iter().any(|pattern| url.contains(pattern)) {
        Some((false, BOARD_SEARCH_CONFIDENCE))
    } else {
        None
    }
}
