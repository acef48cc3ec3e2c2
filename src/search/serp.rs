use super::SearchProvider;
use crate::types::{SearchRequest, SearchResult};
use crate::{JobScoutError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

/// One entry of the `organic_results` array returned by SerpAPI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganicResult {
    pub title: Option<String>,
    pub link: Option<String>,
    pub snippet: Option<String>,
    pub source: Option<String>,
    pub position: Option<u32>,
    pub date: Option<String>,
    pub location: Option<String>,
}

impl OrganicResult {
    /// The metadata kept alongside converted results.
    pub fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("position".to_string(), json!(self.position));
        metadata.insert("date".to_string(), json!(self.date));
        metadata.insert("location".to_string(), json!(self.location));
        metadata
    }
}

impl From<OrganicResult> for SearchResult {
    fn from(result: OrganicResult) -> Self {
        let metadata = result.metadata();
        SearchResult {
            title: result.title.unwrap_or_default(),
            link: result.link.unwrap_or_default(),
            snippet: result.snippet.unwrap_or_default(),
            source: Some(result.source.unwrap_or_default()),
            metadata: Some(metadata),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

/// The `SerpApiClient` struct runs Google searches through SerpAPI.
#[derive(Clone)]
pub struct SerpApiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl SerpApiClient {
    /// Creates a new `SerpApiClient`.
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client used for making requests.
    /// * `endpoint` - The `search.json` endpoint.
    /// * `api_key` - The SerpAPI key.
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Runs a search and returns its organic results.
    ///
    /// A successful answer carrying an `error` message (SerpAPI's way of saying "no results") yields no results.
    #[instrument(skip(self))]
    pub async fn results(&self, query: &str, num_results: u32) -> Result<Vec<OrganicResult>> {
        if self.api_key.is_empty() {
            return Err(JobScoutError::SearchError("SERPAPI_API_KEY is not configured".to_string()));
        }

        let num = num_results.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("google_domain", "google.com"),
                ("gl", "us"),
                ("hl", "en"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        debug!("SerpAPI response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SerpResponse>(&body)
                .ok()
                .and_then(|response| response.error)
                .unwrap_or(body);
            return Err(JobScoutError::SearchError(format!("{}: {}", status, message)));
        }

        let response: SerpResponse = response.json().await?;
        if let Some(error) = response.error {
            warn!("SerpAPI returned no results for '{}': {}", query, error);
        }

        Ok(response.organic_results)
    }
}

/// The `SerpSearch` struct runs queries verbatim through SerpAPI.
pub struct SerpSearch {
    api: SerpApiClient,
}

impl SerpSearch {
    pub fn new(api: SerpApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SearchProvider for SerpSearch {
    fn provider_name(&self) -> &str {
        "serpapi"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let results = self
            .api
            .results(&request.query, request.num_results)
            .await
            .map_err(|e| JobScoutError::SearchError(format!("SerpAPI search error: {}", e)))?;

        Ok(results.into_iter().map(SearchResult::from).collect())
    }
}
