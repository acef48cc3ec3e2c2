use super::errors::ApiError;
use super::{with_context, Context, JSON_BODY_LIMIT};
use crate::jobs::JobSearchService;
use crate::search::RankedListing;
use crate::types::{JobSearchCriteria, JobSearchRequest, JobSearchResponse};
use crate::MAX_NUM_RESULTS;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use warp::filters::BoxedFilter;
use warp::{Filter, Rejection, Reply};

/// The body of `POST /jobs/search/advanced`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdvancedSearchRequest {
    #[serde(flatten)]
    pub criteria: JobSearchCriteria,
    /// Keep only the results that point at a single job posting.
    #[serde(default)]
    pub direct_postings_only: bool,
}

#[derive(Debug, Serialize)]
pub struct AdvancedSearchResponse {
    pub provider: String,
    pub results: Vec<RankedListing>,
    pub total_results: usize,
}

/// The body of `POST /jobs/analyze`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub job_url: String,
}

/// The `/jobs` routes.
pub fn routes(ctx: Context) -> BoxedFilter<(impl Reply,)> {
    let search = warp::path("search")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(search_jobs);
    let batch = warp::path("search")
        .and(warp::path("batch"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(search_batch);
    let advanced = warp::path("search")
        .and(warp::path("advanced"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(search_advanced);
    let analyze = warp::path("analyze")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with_context(ctx))
        .and_then(analyze_job);

    warp::path("jobs")
        .and(search.or(batch).unify().or(advanced).unify().or(analyze).unify())
        .boxed()
}

async fn search_jobs(request: JobSearchRequest, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    JobSearchService::validate_search_request(&request)
        .map_err(|e| ApiError::from_service("Invalid search request", e))?;

    let results = ctx
        .job_search
        .search_jobs(&request)
        .await
        .map_err(|e| ApiError::from_service("Error searching jobs", e))?;

    Ok(warp::reply::json(&JobSearchResponse {
        total_results: results.len(),
        results,
        search_query: request.query,
    }))
}

async fn search_batch(requests: Vec<JobSearchRequest>, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    debug!("Running {} searches", requests.len());
    let results = ctx.job_search.search_multiple_queries(requests).await;
    Ok(warp::reply::json(&results))
}

async fn search_advanced(request: AdvancedSearchRequest, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    let criteria = request.criteria;
    if criteria.search.query.trim().is_empty() {
        return Err(ApiError::bad_request("Search query cannot be empty").into());
    }
    if !(1..=MAX_NUM_RESULTS).contains(&criteria.search.num_results) {
        return Err(
            ApiError::bad_request(format!("num_results must be between 1 and {}", MAX_NUM_RESULTS)).into(),
        );
    }

    let provider = ctx.job_provider.provider_name().to_string();
    let listings = ctx
        .job_provider
        .search(&criteria)
        .await
        .map_err(|e| ApiError::from_service("Error searching jobs", e))?;
    info!("{} returned {} listings", provider, listings.len());

    let results = if request.direct_postings_only {
        ctx.ranker.rank(listings).await
    } else {
        listings.into_iter().map(RankedListing::from).collect()
    };

    Ok(warp::reply::json(&AdvancedSearchResponse {
        provider,
        total_results: results.len(),
        results,
    }))
}

async fn analyze_job(request: AnalyzeRequest, ctx: Context) -> Result<warp::reply::Json, Rejection> {
    if request.job_url.trim().is_empty() {
        return Err(ApiError::bad_request("Job URL cannot be empty").into());
    }

    let response = ctx
        .analysis
        .analyze_job_posting(request.job_url.trim())
        .await
        .map_err(|e| ApiError::from_service("Error analyzing job posting", e))?;
    Ok(warp::reply::json(&response))
}
