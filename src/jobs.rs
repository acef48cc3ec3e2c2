use crate::search::SearchProvider;
use crate::types::{JobResult, JobSearchRequest, SearchRequest, SearchResult};
use crate::{JobScoutError, Result, MAX_NUM_RESULTS};
use futures::{stream, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// The `JobSearchService` struct runs plain job searches through a web search provider.
#[derive(Clone)]
pub struct JobSearchService {
    search: Arc<dyn SearchProvider>,
    concurrent_requests: usize,
}

impl JobSearchService {
    /// Creates a new `JobSearchService`.
    ///
    /// # Arguments
    ///
    /// * `search` - The provider the constructed queries are sent to, verbatim.
    /// * `concurrent_requests` - How many searches of a batch may run at once.
    pub fn new(search: Arc<dyn SearchProvider>, concurrent_requests: usize) -> Self {
        Self {
            search,
            concurrent_requests: concurrent_requests.max(1),
        }
    }

    /// Rejects requests that cannot produce a meaningful search.
    pub fn validate_search_request(request: &JobSearchRequest) -> Result<()> {
        if request.query.trim().is_empty() {
            return Err(JobScoutError::InvalidRequest("Search query cannot be empty".to_string()));
        }
        if !(1..=MAX_NUM_RESULTS).contains(&request.num_results) {
            return Err(JobScoutError::InvalidRequest(format!(
                "num_results must be between 1 and {}",
                MAX_NUM_RESULTS
            )));
        }
        Ok(())
    }

    /// Builds `"{query} jobs [in {location}] [{job_type}] [{experience_level}]"`, skipping empty parts.
    pub fn construct_search_query(request: &JobSearchRequest) -> String {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let mut parts = vec![format!("{} jobs", request.query.trim())];
        if let Some(location) = non_empty(&request.location) {
            parts.push(format!("in {}", location));
        }
        parts.extend(non_empty(&request.job_type));
        parts.extend(non_empty(&request.experience_level));
        parts.join(" ")
    }

    /// Converts search results into job results; missing fields become empty strings.
    ///
    /// The company is the result source. Location and posted date come from the `location` and
    /// `date` metadata.
    pub fn process_search_results(results: Vec<SearchResult>) -> Vec<JobResult> {
        results
            .into_iter()
            .map(|result| {
                let metadata = |key: &str| {
                    result
                        .metadata
                        .as_ref()
                        .and_then(|metadata| metadata.get(key))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                let location = metadata("location");
                let posted_date = metadata("date");

                JobResult {
                    title: result.title,
                    link: result.link,
                    snippet: result.snippet,
                    company: Some(result.source.unwrap_or_default()),
                    location: Some(location),
                    posted_date: Some(posted_date),
                }
            })
            .collect()
    }

    #[instrument(skip(self), fields(query = %request.query))]
    pub async fn search_jobs(&self, request: &JobSearchRequest) -> Result<Vec<JobResult>> {
        Self::validate_search_request(request)?;

        let query = Self::construct_search_query(request);
        let results = self
            .search
            .search(&SearchRequest::new(query.as_str(), request.num_results))
            .await?;
        info!("Found {} results for '{}' on {}", results.len(), query, self.search.provider_name());

        Ok(Self::process_search_results(results))
    }

    /// Runs several searches concurrently and maps each query to its results.
    ///
    /// A failed search maps to an empty list. When the same query appears twice, the later
    /// request's results are kept.
    pub async fn search_multiple_queries(
        &self,
        requests: Vec<JobSearchRequest>,
    ) -> BTreeMap<String, Vec<JobResult>> {
        stream::iter(requests)
            .map(|request| async move {
                let results = match self.search_jobs(&request).await {
                    Ok(results) => results,
                    Err(e) => {
                        error!("Search for '{}' failed: {}", request.query, e);
                        Vec::new()
                    }
                };
                (request.query, results)
            })
            .buffered(self.concurrent_requests)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::serp::tests::{client_for, ORGANIC_RESULTS};
    use crate::search::{OrganicResult, SerpSearch};
    use mockito::Matcher;

    fn serp_service(server: &mockito::Server) -> JobSearchService {
        JobSearchService::new(Arc::new(SerpSearch::new(client_for(server))), 2)
    }

    fn request(query: &str) -> JobSearchRequest {
        JobSearchRequest::new(query)
    }

    #[test]
    fn test_construct_search_query() {
        let mut full = request("rust developer");
        full.location = Some("Berlin".to_string());
        full.job_type = Some("Full-time".to_string());
        full.experience_level = Some("Senior".to_string());
        assert_eq!(
            JobSearchService::construct_search_query(&full),
            "rust developer jobs in Berlin Full-time Senior"
        );

        let mut sparse = request("rust developer");
        sparse.location = Some("".to_string());
        sparse.experience_level = Some("Junior".to_string());
        assert_eq!(JobSearchService::construct_search_query(&sparse), "rust developer jobs Junior");
    }

    #[test]
    fn test_validate_search_request() {
        assert!(JobSearchService::validate_search_request(&request("rust")).is_ok());

        let err = JobSearchService::validate_search_request(&request("   ")).unwrap_err();
        assert_eq!(err.to_string(), "Search query cannot be empty");

        let mut too_many = request("rust");
        too_many.num_results = 101;
        assert!(JobSearchService::validate_search_request(&too_many).is_err());

        let mut none = request("rust");
        none.num_results = 0;
        assert!(JobSearchService::validate_search_request(&none).is_err());
    }

    #[test]
    fn test_process_search_results() {
        let results = JobSearchService::process_search_results(vec![SearchResult::from(OrganicResult {
            title: Some("Rust Engineer".to_string()),
            link: Some("https://acme.example/jobs/1".to_string()),
            source: Some("Acme".to_string()),
            date: Some("1 day ago".to_string()),
            ..OrganicResult::default()
        })]);

        assert_eq!(
            results,
            vec![JobResult {
                title: "Rust Engineer".to_string(),
                link: "https://acme.example/jobs/1".to_string(),
                snippet: String::new(),
                company: Some("Acme".to_string()),
                location: Some(String::new()),
                posted_date: Some("1 day ago".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_search_jobs() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "rust jobs in Berlin".into()),
                Matcher::UrlEncoded("num".into(), "10".into()),
            ]))
            .with_body(ORGANIC_RESULTS)
            .create_async()
            .await;

        let service = serp_service(&server);
        let mut search = request("rust");
        search.location = Some("Berlin".to_string());

        let results = service.search_jobs(&search).await.unwrap();
        mock.assert_async().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].company.as_deref(), Some("LinkedIn"));
        assert_eq!(results[0].posted_date.as_deref(), Some("3 days ago"));
        assert_eq!(results[1].location.as_deref(), Some("Berlin"));
    }

    #[tokio::test]
    async fn test_search_multiple_queries() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("q".into(), "rust jobs".into()))
            .with_body(ORGANIC_RESULTS)
            .create_async()
            .await;
        let _failing = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("q".into(), "cobol jobs".into()))
            .with_status(500)
            .create_async()
            .await;

        let service = serp_service(&server);
        let results = service
            .search_multiple_queries(vec![request("rust"), request("cobol"), request(" ")])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results["rust"].len(), 2);
        assert!(results["cobol"].is_empty());
        assert!(results[" "].is_empty());
    }
}
