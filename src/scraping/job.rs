use super::{element_text, page_text, PageFetcher, Scrape};
use crate::types::ScrapedJob;
use crate::{JobScoutError, Result, ScrapedContent};
use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

/// Selectors of a job board whose posting pages have a known layout.
struct JobBoard {
    domain: &'static str,
    job_pattern: &'static str,
    title_selector: &'static str,
    company_selector: &'static str,
    content_selector: &'static str,
}

static JOB_BOARDS: [JobBoard; 3] = [
    JobBoard {
        domain: "linkedin.com",
        job_pattern: "/jobs/view/",
        title_selector: ".job-details-jobs-unified-top-card__job-title",
        company_selector: ".job-details-jobs-unified-top-card__company-name",
        content_selector: ".job-description",
    },
    JobBoard {
        domain: "indeed.com",
        job_pattern: "/job/",
        title_selector: ".jobsearch-JobInfoHeader-title",
        company_selector: ".jobsearch-CompanyInfoContainer",
        content_selector: ".jobsearch-jobDescriptionText",
    },
    JobBoard {
        domain: "glassdoor.com",
        job_pattern: "/Job/",
        title_selector: ".job-title",
        company_selector: ".employer-name",
        content_selector: ".jobDescriptionContent",
    },
];

/// Words whose presence in a page of an unknown site marks it as a job posting.
const JOB_INDICATORS: [&str; 9] = [
    "job",
    "career",
    "position",
    "vacancy",
    "opening",
    "apply",
    "application",
    "requirements",
    "qualifications",
];

const TITLE_KEYWORDS: [&str; 3] = ["job", "position", "career"];
const COMPANY_CLASS_KEYWORDS: [&str; 3] = ["company", "employer", "organization"];
const CONTENT_CLASS_KEYWORDS: [&str; 3] = ["content", "main", "body"];

/// The parts of a posting found on its page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JobDetails {
    pub title: Option<String>,
    pub company: Option<String>,
    pub content: Option<String>,
}

/// The `JobScraper` struct recognizes job posting pages and extracts their title, company and description.
pub struct JobScraper {
    fetcher: PageFetcher,
}

impl JobScraper {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetches `url`, following redirects, and returns the page if it is a job posting.
    ///
    /// # Returns
    ///
    /// `Ok(Some(page))` for a posting, `Ok(None)` for any other page, or an error if the page could not be fetched.
    pub async fn validate_job_url(&self, url: &str) -> Result<Option<ScrapedContent>> {
        let page = self.fetcher.fetch(url).await?;
        let document = Html::parse_document(&page.content);

        if looks_like_job_posting(&page.url, &document) {
            Ok(Some(page))
        } else {
            debug!("{} does not look like a job posting", page.url);
            Ok(None)
        }
    }
}

#[async_trait]
impl Scrape for JobScraper {
    type Output = ScrapedJob;

    #[instrument(skip(self))]
    async fn scrape(&self, url: &str) -> Result<ScrapedJob> {
        let page = self
            .validate_job_url(url)
            .await?
            .ok_or_else(|| JobScoutError::NotAJobPosting(url.to_string()))?;

        let document = Html::parse_document(&page.content);
        let details = job_details(&page.url, &document);
        let content = details
            .content
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| page_text(&document));

        Ok(ScrapedJob {
            url: page.url,
            is_job_posting: true,
            title: details.title,
            company: details.company,
            content,
        })
    }
}

fn board_for(url: &str) -> Option<&'static JobBoard> {
    let host = Url::parse(url).ok()?.host_str()?.to_lowercase();
    JOB_BOARDS.iter().find(|board| host.contains(board.domain))
}

/// Tells whether the page at `url` is a job posting.
///
/// Known boards are recognized by their posting URL pattern; any other page qualifies when
/// its text mentions one of the job indicators.
pub fn looks_like_job_posting(url: &str, document: &Html) -> bool {
    if let Some(board) = board_for(url) {
        if url.contains(board.job_pattern) {
            return true;
        }
    }

    let text = page_text(document).to_lowercase();
    JOB_INDICATORS.iter().any(|indicator| text.contains(indicator))
}

/// Extracts the job details from a posting page.
pub fn job_details(url: &str, document: &Html) -> JobDetails {
    match board_for(url) {
        Some(board) => JobDetails {
            title: select_text(document, board.title_selector),
            company: select_text(document, board.company_selector),
            content: select_text(document, board.content_selector),
        },
        None => generic_job_details(document),
    }
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(element_text)
}

fn class_contains(element: &ElementRef<'_>, keywords: &[&str]) -> bool {
    element
        .value()
        .attr("class")
        .map(|class| {
            let class = class.to_lowercase();
            keywords.iter().any(|keyword| class.contains(keyword))
        })
        .unwrap_or(false)
}

fn first_matching<'a, F>(document: &'a Html, selector: &str, predicate: F) -> Option<ElementRef<'a>>
where
    F: Fn(&ElementRef<'a>) -> bool,
{
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).find(|element| predicate(element))
}

fn generic_job_details(document: &Html) -> JobDetails {
    let title = first_matching(document, "h1, h2, h3", |heading| {
        let text = element_text(*heading).to_lowercase();
        TITLE_KEYWORDS.iter().any(|keyword| text.contains(keyword))
    })
    .map(element_text);

    let company = first_matching(document, "div, span", |element| {
        class_contains(element, &COMPANY_CLASS_KEYWORDS)
    })
    .map(element_text);

    let content = first_matching(document, "main", |_| true)
        .or_else(|| first_matching(document, "article", |_| true))
        .or_else(|| {
            first_matching(document, "div", |element| {
                class_contains(element, &CONTENT_CLASS_KEYWORDS)
            })
        })
        .map(element_text);

    JobDetails {
        title,
        company,
        content,
    }
}
