use super::optimize::{QueryOptimizer, DEFAULT_TIME_RANGE};
use super::JobSearchProvider;
use crate::types::{JobListing, JobSearchCriteria, SearchResult};
use crate::{JobScoutError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map};
use tracing::{debug, instrument};

/// The Custom Search API never returns more than ten results per request.
const MAX_RESULTS_PER_REQUEST: u32 = 10;
const UNKNOWN_COMPANY: &str = "Unknown Company";
const UNKNOWN_LOCATION: &str = "Unknown Location";

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<CustomSearchItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CustomSearchItem {
    title: String,
    link: String,
    snippet: String,
    display_link: Option<String>,
    html_snippet: Option<String>,
    mime: Option<String>,
    file_format: Option<String>,
}

/// The `GoogleJobSearch` struct searches job postings through the Google Custom Search JSON API.
pub struct GoogleJobSearch {
    client: Client,
    endpoint: String,
    api_key: String,
    cse_id: String,
    optimizer: QueryOptimizer,
}

impl GoogleJobSearch {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        cse_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            cse_id: cse_id.into(),
            optimizer: QueryOptimizer,
        }
    }

    async fn raw_results(&self, query: &str, num_results: u32, date_restrict: &str) -> Result<Vec<SearchResult>> {
        if self.api_key.is_empty() || self.cse_id.is_empty() {
            return Err(JobScoutError::SearchError(
                "GOOGLE_API_KEY and GOOGLE_CSE_ID must be configured".to_string(),
            ));
        }

        let num = num_results.clamp(1, MAX_RESULTS_PER_REQUEST).to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
                ("dateRestrict", date_restrict),
            ])
            .send()
            .await?;

        let status = response.status();
        debug!("Custom Search response status: {}", status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobScoutError::SearchError(format!("Google Search API {}: {}", status, body)));
        }

        let response: CustomSearchResponse = response.json().await?;
        Ok(response
            .items
            .into_iter()
            .enumerate()
            .map(|(position, item)| {
                let mut metadata = Map::new();
                metadata.insert("position".to_string(), json!(position));
                metadata.insert("html_snippet".to_string(), json!(item.html_snippet.unwrap_or_default()));
                metadata.insert("mime_type".to_string(), json!(item.mime.unwrap_or_default()));
                metadata.insert("file_format".to_string(), json!(item.file_format.unwrap_or_default()));

                SearchResult {
                    title: item.title,
                    link: item.link,
                    snippet: item.snippet,
                    source: item.display_link,
                    metadata: Some(metadata),
                }
            })
            .collect())
    }

    fn to_listing(&self, result: SearchResult) -> JobListing {
        let application_url = self.extract_application_url(&result);
        let (job_title, company_name) = extract_job_and_company(&result.title);
        let location = extract_location(&result.snippet);
        let job_description = Some(result.snippet.clone());

        JobListing {
            result,
            company_name,
            job_title,
            location,
            salary_range: None,
            job_type: None,
            posted_date: None,
            application_url,
            job_description,
        }
    }
}

#[async_trait]
impl JobSearchProvider for GoogleJobSearch {
    fn provider_name(&self) -> &str {
        "Google Search API"
    }

    async fn optimize_search_query(&self, criteria: &JobSearchCriteria) -> Result<String> {
        let query = super::plain_query(criteria);
        Ok(self.optimizer.optimize(&query).optimized_query)
    }

    /// The result link is already the most direct URL Google knows about.
    fn extract_application_url(&self, result: &SearchResult) -> String {
        let is_application_url = regex!(
            r"(?i)apply|application|job|career|position|greenhouse\.io|lever\.co|workday\.com|taleo\.net|linkedin\.com/jobs|indeed\.com/viewjob|glassdoor\.com/job"
        )
        .is_match(&result.link);
        if !is_application_url {
            debug!("{} does not look like an application page", result.link);
        }

        result.link.clone()
    }

    #[instrument(skip(self, criteria), fields(query = %criteria.search.query))]
    async fn search(&self, criteria: &JobSearchCriteria) -> Result<Vec<JobListing>> {
        let query = self.optimize_search_query(criteria).await?;
        let date_restrict = criteria
            .posted_within
            .as_deref()
            .and_then(date_restrict)
            .unwrap_or_else(|| time_range_restrict(DEFAULT_TIME_RANGE).to_string());

        let results = self
            .raw_results(&query, criteria.search.num_results, &date_restrict)
            .await?;

        Ok(results.into_iter().map(|result| self.to_listing(result)).collect())
    }
}

fn time_range_restrict(time_range: &str) -> &'static str {
    match time_range {
        "past_day" => "d1",
        "past_week" => "w1",
        "past_year" => "y1",
        _ => "m1",
    }
}

/// Converts a `posted_within` value such as `24h`, `7d`, `2w` or `1m` into a `dateRestrict` value.
fn date_restrict(posted_within: &str) -> Option<String> {
    let captures = regex!(r"^\s*(\d+)\s*([hdwmy])\s*$").captures(posted_within)?;
    let amount: u32 = captures[1].parse().ok()?;
    if amount == 0 {
        return None;
    }

    Some(match &captures[2] {
        "h" => format!("d{}", amount.div_ceil(24)),
        unit => format!("{}{}", unit, amount),
    })
}

/// Splits a result title into job title and company.
///
/// Recognizes "Title at Company", "Title - Company Careers", "Title (Company)" and "Title - Company".
pub fn extract_job_and_company(title: &str) -> (String, String) {
    let patterns = [
        regex!(r"(?i)(.+?)\s+at\s+(.+?)(?:\s|$)"),
        regex!(r"(?i)(.+?)\s*[-|]\s*(.+?)\s+(?:careers|jobs|hiring)"),
        regex!(r"(?i)(.+?)\s+\((.+?)\)"),
    ];

    for pattern in patterns {
        if let Some(captures) = pattern.captures(title) {
            return (captures[1].trim().to_string(), captures[2].trim().to_string());
        }
    }

    match title.split_once(" - ") {
        Some((job, company)) => (job.trim().to_string(), company.trim().to_string()),
        None => (title.to_string(), UNKNOWN_COMPANY.to_string()),
    }
}

/// Finds the job location mentioned in a snippet.
pub fn extract_location(snippet: &str) -> String {
    let patterns = [
        regex!(r"(?i)location\s*:?\s*([^\.]+)"),
        regex!(r"(?i)in\s+([A-Za-z\s,]+(?:, [A-Z]{2}))"),
        regex!(r"(?i)(?:remote|onsite|hybrid)\s+in\s+([^\.]+)"),
        regex!(r"(?i)([A-Za-z\s]+(?:, [A-Z]{2}))"),
    ];

    patterns
        .iter()
        .find_map(|pattern| pattern.captures(snippet))
        .map(|captures| captures[1].trim().to_string())
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_extract_job_and_company() {
        assert_eq!(
            extract_job_and_company("Data Scientist at Microsoft"),
            ("Data Scientist".to_string(), "Microsoft".to_string())
        );
        assert_eq!(
            extract_job_and_company("Software Engineer - Google Careers"),
            ("Software Engineer".to_string(), "Google".to_string())
        );
        assert_eq!(
            extract_job_and_company("Platform Engineer (Stripe)"),
            ("Platform Engineer".to_string(), "Stripe".to_string())
        );
        assert_eq!(
            extract_job_and_company("Rust Developer - Ferrous"),
            ("Rust Developer".to_string(), "Ferrous".to_string())
        );
        assert_eq!(
            extract_job_and_company("Rust Developer"),
            ("Rust Developer".to_string(), "Unknown Company".to_string())
        );
    }

    #[test]
    fn test_extract_location() {
        assert_eq!(extract_location("Location: Austin, TX. Apply now"), "Austin, TX");
        assert_eq!(extract_location("Great team based in Denver, CO and remote"), "Denver, CO");
        assert_eq!(extract_location("Competitive salary"), "Unknown Location");
    }

    #[test]
    fn test_date_restrict() {
        assert_eq!(date_restrict("24h").as_deref(), Some("d1"));
        assert_eq!(date_restrict("36h").as_deref(), Some("d2"));
        assert_eq!(date_restrict("7d").as_deref(), Some("d7"));
        assert_eq!(date_restrict("2w").as_deref(), Some("w2"));
        assert_eq!(date_restrict("0d"), None);
        assert_eq!(date_restrict("soon"), None);
        assert_eq!(time_range_restrict(DEFAULT_TIME_RANGE), "m1");
    }

    #[tokio::test]
    async fn test_search() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/customsearch/v1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "g-key".into()),
                Matcher::UrlEncoded("cx".into(), "cse".into()),
                Matcher::UrlEncoded("num".into(), "10".into()),
                Matcher::UrlEncoded("dateRestrict".into(), "d7".into()),
                Matcher::Regex("q=rust".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items": [{
                    "title": "Rust Engineer at Acme",
                    "link": "https://boards.greenhouse.io/acme/jobs/1",
                    "snippet": "Location: Berlin. Build services in Rust.",
                    "displayLink": "boards.greenhouse.io",
                    "htmlSnippet": "<b>Rust</b>"
                }]}"#,
            )
            .create_async()
            .await;

        let provider = GoogleJobSearch::new(
            Client::new(),
            format!("{}/customsearch/v1", server.url()),
            "g-key",
            "cse",
        );
        let mut criteria = JobSearchCriteria::new("rust");
        criteria.search.num_results = 25;
        criteria.posted_within = Some("7d".to_string());

        let listings = provider.search(&criteria).await.unwrap();

        assert_eq!(listings.len(), 1);
        let listing = &listings[0];
        assert_eq!(listing.job_title, "Rust Engineer");
        assert_eq!(listing.company_name, "Acme");
        assert_eq!(listing.location, "Berlin");
        assert_eq!(listing.application_url, "https://boards.greenhouse.io/acme/jobs/1");
        assert_eq!(listing.result.source.as_deref(), Some("boards.greenhouse.io"));
        assert_eq!(listing.result.metadata.as_ref().unwrap()["html_snippet"], "<b>Rust</b>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_requires_credentials() {
        let provider = GoogleJobSearch::new(Client::new(), "http://127.0.0.1:9/customsearch/v1", "", "");
        let result = provider.search(&JobSearchCriteria::new("rust")).await;
        assert!(matches!(result, Err(JobScoutError::SearchError(_))));
    }
}
