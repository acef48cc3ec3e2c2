use crate::types::{JobListing, JobSearchCriteria, SearchRequest, SearchResult};
use crate::Result;
use async_trait::async_trait;

/// Compiles a regex literal once and hands out a `&'static Regex`.
macro_rules! regex {
    ($re:literal) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).expect("valid regex literal"))
    }};
}

pub mod google;
pub mod optimize;
pub mod ranking;
pub mod serp;
pub mod serp_jobs;

pub use google::GoogleJobSearch;
pub use optimize::{OptimizedQuery, QueryOptimizer};
pub use ranking::{JobUrlRanker, RankedListing};
pub use serp::{OrganicResult, SerpApiClient, SerpSearch};
pub use serp_jobs::SerpJobSearch;

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// The name of the search provider.
    fn provider_name(&self) -> &str;

    /// Runs the query exactly as given.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>>;
}

/// A search backend specialised in job postings.
#[async_trait]
pub trait JobSearchProvider: Send + Sync {
    /// The name of the search provider.
    fn provider_name(&self) -> &str;

    /// Turns the job search parameters into the query sent to the search engine.
    async fn optimize_search_query(&self, criteria: &JobSearchCriteria) -> Result<String>;

    /// Finds the most direct URL to apply through for a search hit.
    fn extract_application_url(&self, result: &SearchResult) -> String;

    /// Searches for postings matching the criteria.
    async fn search(&self, criteria: &JobSearchCriteria) -> Result<Vec<JobListing>>;
}

/// Joins the non-empty search parameters into a plain query.
pub(crate) fn plain_query(criteria: &JobSearchCriteria) -> String {
    [
        Some(criteria.search.query.as_str()),
        criteria.job_title.as_deref(),
        criteria.company.as_deref(),
        criteria.location.as_deref(),
        criteria.job_type.as_deref(),
        criteria.experience_level.as_deref(),
        criteria.remote.filter(|remote| *remote).map(|_| "remote"),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}
