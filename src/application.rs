use crate::llm::{parse_llm_json, ChatClient};
use crate::prompt::{PromptBuilder, FORM_FIELDS_SYSTEM};
use crate::scraping::{FormScraper, JobScraper, Scrape};
use crate::types::{ApplicationResponse, JobAnalysis};
use crate::{JobScoutError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Longest stretch of posting text sent to the model.
const MAX_CONTENT_CHARS: usize = 12_000;

/// The `JobAnalysisService` struct works out what an application for a job posting asks for.
pub struct JobAnalysisService {
    job_scraper: JobScraper,
    form_scraper: FormScraper,
    llm: Arc<dyn ChatClient>,
}

impl JobAnalysisService {
    pub fn new(job_scraper: JobScraper, form_scraper: FormScraper, llm: Arc<dyn ChatClient>) -> Self {
        Self {
            job_scraper,
            form_scraper,
            llm,
        }
    }

    /// Asks the model which application fields a posting requires.
    pub async fn identify_form_fields(&self, content: &str) -> Result<Map<String, Value>> {
        let content: String = content.chars().take(MAX_CONTENT_CHARS).collect();
        let prompt = PromptBuilder::new(FORM_FIELDS_SYSTEM)
            .section("Job Posting Content", content)
            .instruction("Identify the required application form fields.")
            .build();

        let answer = self.llm.complete(&prompt.system, &prompt.user).await?;
        match parse_llm_json(&answer)? {
            Value::Object(fields) => Ok(fields),
            other => Err(JobScoutError::LLMError(format!(
                "Expected a JSON object of form fields, got: {}",
                other
            ))),
        }
    }

    /// Scrapes a posting and its application form.
    ///
    /// Fields found in the page's forms are used as they are; when there are none, or the
    /// form page cannot be scraped, the model reads the posting instead.
    #[instrument(skip(self))]
    pub async fn analyze_job_posting(&self, url: &str) -> Result<ApplicationResponse> {
        let job = self.job_scraper.scrape(url).await?;

        let scraped_fields = match self.form_scraper.scrape(&job.url).await {
            Ok(scrape) => scrape.form_fields,
            Err(e) => {
                warn!("Could not scrape the application form of {}: {}", job.url, e);
                Default::default()
            }
        };

        let form_fields = if scraped_fields.is_empty() {
            self.identify_form_fields(&job.content).await?
        } else {
            scraped_fields
                .into_iter()
                .map(|(name, field)| serde_json::to_value(field).map(|field| (name, field)))
                .collect::<serde_json::Result<Map<String, Value>>>()?
        };
        info!("Identified {} form fields for {}", form_fields.len(), job.url);

        Ok(ApplicationResponse {
            analysis: JobAnalysis {
                url: url.to_string(),
                form_fields,
            },
            success: true,
            message: "Job posting analyzed successfully".to_string(),
        })
    }
}
