use crate::config::ScraperConfig;
use crate::{JobScoutError, Result, ScrapedContent};
use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

pub mod form;
pub mod job;

pub use form::{FormScrape, FormScraper};
pub use job::JobScraper;

/// A scraper extracts one kind of structured data from the page at a URL.
#[async_trait]
pub trait Scrape: Send + Sync {
    type Output;

    /// Scrapes the page at `url`.
    async fn scrape(&self, url: &str) -> Result<Self::Output>;
}

/// Builds the HTTP client shared by every outbound component.
pub fn build_client(config: &ScraperConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .gzip(true)
        .build()?;
    Ok(client)
}

/// The `PageFetcher` struct downloads pages with retries and a simple rate limit.
#[derive(Clone)]
pub struct PageFetcher {
    /// The HTTP client used for making requests.
    client: Client,
    /// The configuration settings for the scraper.
    config: ScraperConfig,
    /// Bounds the number of requests in flight to the configured burst size.
    rate_limiter: Arc<Semaphore>,
}

impl PageFetcher {
    /// Creates a new `PageFetcher` with the given client and configuration.
    pub fn new(client: Client, config: ScraperConfig) -> Self {
        let rate_limiter = Arc::new(Semaphore::new(config.rate_limit.burst_size.max(1)));

        Self {
            client,
            config,
            rate_limiter,
        }
    }

    /// Fetches a single page, retrying failures with exponential backoff.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch.
    ///
    /// # Returns
    ///
    /// A `Result` containing the page, or the last error once every attempt failed.
    pub async fn fetch(&self, url: &str) -> Result<ScrapedContent> {
        debug!("Fetching content from: {}", url);

        let attempts = self.config.max_retries.max(1);
        let mut retries = 0;
        let mut last_error = None;

        while retries < attempts {
            match self.try_fetch(url).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    retries += 1;
                    warn!("Fetching {} failed (attempt {}/{}): {}", url, retries, attempts, e);
                    last_error = Some(e);
                    if retries < attempts {
                        sleep(Duration::from_secs(2u64.pow(retries))).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            JobScoutError::ExtractionError("Max retries exceeded".to_string())
        }))
    }

    /// Attempts to fetch a single page once, honouring the rate limit.
    async fn try_fetch(&self, url: &str) -> Result<ScrapedContent> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|_| JobScoutError::RateLimitError)?;
        if self.config.rate_limit.requests_per_second > 0.0 {
            sleep(Duration::from_secs_f32(1.0 / self.config.rate_limit.requests_per_second)).await;
        }

        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await?
            .error_for_status()?;

        let final_url = response.url().to_string();
        let mut metadata = HashMap::new();
        metadata.insert("status".to_string(), response.status().as_u16().to_string());
        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            metadata.insert("content_type".to_string(), content_type.to_string());
        }

        let content = response.text().await?;

        Ok(ScrapedContent {
            url: final_url,
            content,
            metadata,
            timestamp: chrono::Utc::now(),
        })
    }
}

/// Extracts the visible text of a document: every text node trimmed, one per line.
pub fn page_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collects the text of an element as single-spaced words.
pub(crate) fn element_text(element: scraper::ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}
