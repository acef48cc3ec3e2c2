use crate::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Name of the optional settings file looked up in the working directory.
const DEFAULT_SETTINGS_FILE: &str = "jobscout";
/// Prefix of the environment variables that override settings.
const ENV_PREFIX: &str = "JOBSCOUT";

/// The `Settings` struct holds the configuration of the whole service.
/// It includes the HTTP bind settings, the credentials of the external APIs and per-component sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The human readable name of the service.
    pub app_name: String,
    /// Enables debug logging.
    pub debug: bool,
    /// The path prefix every API route is mounted under.
    pub api_prefix: String,
    /// The address the HTTP server binds to.
    pub host: String,
    /// The port the HTTP server binds to.
    pub port: u16,
    /// The SerpAPI key.
    pub serpapi_api_key: String,
    /// The OpenAI key.
    pub openai_api_key: String,
    /// The Google Custom Search API key.
    pub google_api_key: String,
    /// The Google Programmable Search Engine identifier.
    pub google_cse_id: String,
    /// The settings of the search providers.
    pub search: SearchConfig,
    /// The configuration settings for the Language Model (LLM).
    pub llm: LLMConfig,
    /// The settings used when fetching and scraping pages.
    pub scraper: ScraperConfig,
    /// The settings of the document store.
    pub documents: DocumentConfig,
}

/// Which provider answers advanced job searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobProviderKind {
    Serpapi,
    Google,
}

/// The `SearchConfig` struct holds the endpoints of the search providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// The SerpAPI search endpoint.
    pub serpapi_endpoint: String,
    /// The Google Custom Search endpoint.
    pub google_endpoint: String,
    /// The provider used by advanced job searches.
    pub job_provider: JobProviderKind,
}

/// The `LLMConfig` struct holds the configuration settings for the Language Model (LLM).
/// It includes the endpoint URL, model, temperature, and maximum number of tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// The chat completions endpoint URL.
    pub endpoint: String,
    /// The model name sent with every request.
    pub model: String,
    /// The temperature setting for the LLM, controlling the randomness of the output.
    pub temperature: f32,
    /// The maximum number of tokens allowed in the LLM response.
    pub max_tokens: u32,
}

/// The `ScraperConfig` struct holds the settings for outbound page fetches.
/// It includes settings for concurrent requests, timeout, retries, user agent and rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// The number of concurrent requests allowed.
    pub concurrent_requests: usize,
    /// The timeout for HTTP requests, in seconds.
    pub timeout_secs: u64,
    /// The maximum number of attempts for failed requests.
    pub max_retries: u32,
    /// The user agent string to be used in HTTP requests.
    pub user_agent: String,
    /// The rate limit settings for the scraper.
    pub rate_limit: RateLimit,
}

/// The `RateLimit` struct holds the rate limiting settings for the scraper.
/// It includes the number of requests per second and the burst size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimit {
    /// The number of requests allowed per second.
    pub requests_per_second: f32,
    /// The burst size for rate limiting.
    pub burst_size: usize,
}

/// The `DocumentConfig` struct holds the settings of the uploaded documents store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// The directory uploaded documents are written to.
    pub upload_dir: PathBuf,
    /// The size of the chunks uploads are written in.
    pub chunk_size: usize,
    /// The largest accepted document, in bytes.
    pub max_file_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: String::from("Job Search API"),
            debug: true,
            api_prefix: String::from("/api/v1"),
            host: String::from("0.0.0.0"),
            port: 8000,
            serpapi_api_key: String::new(),
            openai_api_key: String::new(),
            google_api_key: String::new(),
            google_cse_id: String::new(),
            search: SearchConfig::default(),
            llm: LLMConfig::default(),
            scraper: ScraperConfig::default(),
            documents: DocumentConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            serpapi_endpoint: String::from("https://serpapi.com/search.json"),
            google_endpoint: String::from("https://www.googleapis.com/customsearch/v1"),
            job_provider: JobProviderKind::Serpapi,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("https://api.openai.com/v1/chat/completions"),
            model: String::from("gpt-4-turbo-preview"),
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

impl Default for ScraperConfig {
    /// Provides default values for the `ScraperConfig` struct.
    fn default() -> Self {
        Self {
            concurrent_requests: crate::DEFAULT_CONCURRENT_REQUESTS,
            timeout_secs: crate::DEFAULT_TIMEOUT.as_secs(),
            max_retries: crate::DEFAULT_MAX_RETRIES,
            user_agent: String::from("Mozilla/5.0 (compatible; JobScout/0.1)"),
            rate_limit: RateLimit::default(),
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            burst_size: 5,
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            chunk_size: 1024 * 1024,
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

impl ScraperConfig {
    /// The request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Loads the settings from the defaults, an optional settings file and the environment.
    ///
    /// When `path` is `None`, a `jobscout.{toml,yaml,json}` file in the working directory is used if present.
    /// Variables prefixed with `JOBSCOUT_` override any file value (`__` separates nested keys),
    /// and the bare `SERPAPI_API_KEY`, `OPENAI_API_KEY`, `GOOGLE_API_KEY` and `GOOGLE_CSE_ID` variables win over both.
    ///
    /// # Arguments
    ///
    /// * `path` - An explicit settings file, which must exist.
    ///
    /// # Returns
    ///
    /// A `Result` containing the loaded `Settings`, or an error if a source could not be read.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                builder.add_source(File::from(path))
            }
            None => builder.add_source(File::with_name(DEFAULT_SETTINGS_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (key, var) in [
            ("serpapi_api_key", "SERPAPI_API_KEY"),
            ("openai_api_key", "OPENAI_API_KEY"),
            ("google_api_key", "GOOGLE_API_KEY"),
            ("google_cse_id", "GOOGLE_CSE_ID"),
        ] {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// The socket address the HTTP server binds to.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            crate::JobScoutError::InvalidRequest(format!("Invalid bind host '{}'", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
