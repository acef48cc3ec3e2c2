use std::time::Duration;
use thiserror::Error;

pub mod api;
pub mod application;
pub mod config;
pub mod documents;
pub mod jobs;
pub mod llm;
pub mod prompt;
pub mod scraping;
pub mod search;
pub mod types;

// Re-export commonly used types
pub use config::Settings;
pub use types::{JobResult, JobSearchRequest, JobSearchResponse, ScrapedContent, SearchResult};

/// The `JobScoutError` enum represents the errors that can occur while searching, scraping or storing documents.
#[derive(Error, Debug)]
pub enum JobScoutError {
    /// Represents an error that occurs during an HTTP request.
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Represents an error that occurs when the rate limit is exceeded.
    #[error("Rate limit exceeded")]
    RateLimitError,
    /// Represents an error that occurs during content extraction.
    #[error("Content extraction failed: {0}")]
    ExtractionError(String),
    /// Represents an error that occurs during LLM processing.
    #[error("LLM processing failed: {0}")]
    LLMError(String),
    /// Represents an error that occurs during a search operation.
    #[error("Search failed: {0}")]
    SearchError(String),
    /// Represents a settings file or environment that could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents a failed file system operation.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// Represents a JSON payload that could not be (de)serialized.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// Represents an uploaded document that was rejected.
    #[error("{0}")]
    InvalidDocument(String),
    /// Represents a request with invalid parameters.
    #[error("{0}")]
    InvalidRequest(String),
    /// Represents a lookup for something that does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Represents a page that does not look like a job posting.
    #[error("URL does not appear to be a job posting: {0}")]
    NotAJobPosting(String),
}

/// A type alias for `Result` with the `JobScoutError` error type.
pub type Result<T> = std::result::Result<T, JobScoutError>;

// Constants

/// The default timeout duration for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// The default number of concurrent requests.
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 5;
/// The default maximum number of retries for failed requests.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// The default number of search results requested per query.
pub const DEFAULT_NUM_RESULTS: u32 = 10;
/// The largest number of results a single search may ask for.
pub const MAX_NUM_RESULTS: u32 = 100;
