use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

fn default_num_results() -> u32 {
    crate::DEFAULT_NUM_RESULTS
}

/// A job search as accepted by `POST /jobs/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSearchRequest {
    pub query: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_num_results")]
    pub num_results: u32,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
}

impl JobSearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: None,
            num_results: crate::DEFAULT_NUM_RESULTS,
            job_type: None,
            experience_level: None,
        }
    }
}

/// One job search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub posted_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSearchResponse {
    pub results: Vec<JobResult>,
    pub total_results: usize,
    pub search_query: String,
}

/// A plain web search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_num_results")]
    pub num_results: u32,
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, num_results: u32) -> Self {
        Self {
            query: query.into(),
            num_results,
            filters: None,
        }
    }
}

/// A provider-independent search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// A search request with job-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSearchCriteria {
    #[serde(flatten)]
    pub search: SearchRequest,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub remote: Option<bool>,
    /// How recent postings must be, e.g. "24h", "7d" or "30d".
    #[serde(default)]
    pub posted_within: Option<String>,
}

impl JobSearchCriteria {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            search: SearchRequest::new(query, crate::DEFAULT_NUM_RESULTS),
            job_title: None,
            location: None,
            company: None,
            job_type: None,
            experience_level: None,
            salary_range: None,
            remote: None,
            posted_within: None,
        }
    }
}

/// A search hit enriched with the details of the job it advertises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(flatten)]
    pub result: SearchResult,
    pub company_name: String,
    pub job_title: String,
    pub location: String,
    pub salary_range: Option<String>,
    /// Full-time, Part-time, Contract, etc.
    pub job_type: Option<String>,
    pub posted_date: Option<String>,
    /// Direct URL to apply for the job.
    pub application_url: String,
    pub job_description: Option<String>,
}

/// The kinds of documents an applicant can upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Resume,
    CoverLetter,
}

impl DocumentType {
    pub const ALL: [DocumentType; 2] = [DocumentType::Resume, DocumentType::CoverLetter];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Resume => "resume",
            DocumentType::CoverLetter => "cover_letter",
        }
    }

    /// Recovers the type from a stored filename such as `cover_letter_20240101_120000_ab12cd34.pdf`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|doc_type| {
            filename
                .strip_prefix(doc_type.as_str())
                .is_some_and(|rest| rest.starts_with('_'))
        })
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = crate::JobScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|doc_type| doc_type.as_str() == s)
            .ok_or_else(|| crate::JobScoutError::InvalidRequest(format!("Invalid document type '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub document_type: DocumentType,
    pub size: u64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentInfo>,
    pub total_count: usize,
    pub document_type: Option<DocumentType>,
}

/// An input of an application form found on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
    pub placeholder: String,
    pub options: Option<Vec<String>>,
}

/// The application form of a job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub url: String,
    pub form_fields: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub analysis: JobAnalysis,
    pub success: bool,
    pub message: String,
}

/// The `ScrapedContent` struct holds a fetched page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedContent {
    /// The final URL of the page, after redirects.
    pub url: String,
    /// The raw HTML of the page.
    pub content: String,
    /// Page metadata such as the HTTP status and content type.
    pub metadata: HashMap<String, String>,
    /// When the page was fetched.
    pub timestamp: DateTime<Utc>,
}

/// The details extracted from a job posting page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedJob {
    pub url: String,
    pub is_job_posting: bool,
    pub title: Option<String>,
    pub company: Option<String>,
    pub content: String,
}
