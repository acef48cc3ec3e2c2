use super::serp::{OrganicResult, SerpApiClient};
use super::{plain_query, JobSearchProvider};
use crate::llm::ChatClient;
use crate::prompt::{PromptBuilder, QUERY_OPTIMIZATION_SYSTEM};
use crate::types::{JobListing, JobSearchCriteria, SearchResult};
use crate::{JobScoutError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const JOB_TYPES: [&str; 5] = ["Full-time", "Part-time", "Contract", "Temporary", "Internship"];

/// The `SerpJobSearch` struct searches job postings through SerpAPI with LLM-written queries.
pub struct SerpJobSearch {
    api: SerpApiClient,
    llm: Arc<dyn ChatClient>,
}

impl SerpJobSearch {
    pub fn new(api: SerpApiClient, llm: Arc<dyn ChatClient>) -> Self {
        Self { api, llm }
    }

    fn to_listing(&self, result: OrganicResult) -> JobListing {
        let company_name = extract_company_name(&result);
        let job_title = extract_job_title(result.title.as_deref().unwrap_or_default());
        let snippet = result.snippet.clone().unwrap_or_default();
        let salary_range = extract_salary(&snippet);
        let job_type = extract_job_type(&snippet);
        let location = result.location.clone().unwrap_or_default();
        let posted_date = result.date.clone();

        let result = SearchResult::from(result);
        let application_url = self.extract_application_url(&result);

        JobListing {
            result,
            company_name,
            job_title,
            location,
            salary_range,
            job_type,
            posted_date,
            application_url,
            job_description: Some(snippet),
        }
    }
}

#[async_trait]
impl JobSearchProvider for SerpJobSearch {
    fn provider_name(&self) -> &str {
        "serpapi_jobs"
    }

    /// Asks the model for a query; falls back to the plain parameters when it fails or answers nothing.
    async fn optimize_search_query(&self, criteria: &JobSearchCriteria) -> Result<String> {
        let prompt = PromptBuilder::new(QUERY_OPTIMIZATION_SYSTEM)
            .field("Query", Some(criteria.search.query.as_str()))
            .field("Job Title", criteria.job_title.as_deref())
            .field("Location", criteria.location.as_deref())
            .field("Company", criteria.company.as_deref())
            .field("Job Type", criteria.job_type.as_deref())
            .field("Experience", criteria.experience_level.as_deref())
            .field("Salary", criteria.salary_range.as_deref())
            .field("Remote", criteria.remote.filter(|remote| *remote).map(|_| "remote"))
            .field("Posted Within", criteria.posted_within.as_deref())
            .build();

        let query = match self.llm.complete(&prompt.system, &prompt.user).await {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                warn!("Query optimization failed, using the plain query: {}", e);
                String::new()
            }
        };

        if query.is_empty() {
            Ok(plain_query(criteria))
        } else {
            debug!("Optimized query: {}", query);
            Ok(query)
        }
    }

    fn extract_application_url(&self, result: &SearchResult) -> String {
        let patterns = [
            regex!(r#"(https?://[^\s<>"]+?/apply[^\s<>"]*)"#),
            regex!(r#"(https?://[^\s<>"]+?/jobs/apply[^\s<>"]*)"#),
            regex!(r#"(https?://[^\s<>"]+?/careers/apply[^\s<>"]*)"#),
            regex!(r#"(https?://[^\s<>"]+?/job-application[^\s<>"]*)"#),
        ];

        patterns
            .iter()
            .find_map(|pattern| pattern.captures(&result.snippet))
            .map(|captures| captures[1].trim_end_matches(['.', ',', ')']).to_string())
            .unwrap_or_else(|| result.link.clone())
    }

    #[instrument(skip(self, criteria), fields(query = %criteria.search.query))]
    async fn search(&self, criteria: &JobSearchCriteria) -> Result<Vec<JobListing>> {
        let query = self.optimize_search_query(criteria).await?;
        let results = self
            .api
            .results(&query, criteria.search.num_results)
            .await
            .map_err(|e| JobScoutError::SearchError(format!("SerpAPI job search error: {}", e)))?;

        Ok(results.into_iter().map(|result| self.to_listing(result)).collect())
    }
}

/// Finds the hiring company in a result title, falling back to the result source.
pub fn extract_company_name(result: &OrganicResult) -> String {
    let title = result.title.as_deref().unwrap_or_default();
    let patterns = [
        regex!(r"(?i)\b(?:at|with)\s+([^\-|]+)"),
        regex!(r"[-|]\s*([^\-|]+)"),
    ];

    patterns
        .iter()
        .find_map(|pattern| pattern.captures(title))
        .map(|captures| captures[1].trim().to_string())
        .filter(|company| !company.is_empty())
        .or_else(|| result.source.clone())
        .unwrap_or_default()
}

/// Strips the company and board suffixes from a result title.
pub fn extract_job_title(title: &str) -> String {
    let title = regex!(r"\s*[-|]\s*.*$").replace(title, "");
    let title = regex!(r"(?i)\s+at\s+.*$").replace(&title, "");
    title.trim().to_string()
}

pub fn extract_salary(snippet: &str) -> Option<String> {
    regex!(r"\$[\d,]+(?:-\$[\d,]+)?(?:\s*(?:per year|per hour|per month|annually|hourly))?")
        .find(snippet)
        .map(|salary| salary.as_str().to_string())
}

pub fn extract_job_type(snippet: &str) -> Option<String> {
    let snippet = snippet.to_lowercase();
    JOB_TYPES
        .iter()
        .find(|job_type| snippet.contains(&job_type.to_lowercase()))
        .map(|job_type| job_type.to_string())
}
