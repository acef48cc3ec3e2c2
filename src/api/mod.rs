use crate::application::JobAnalysisService;
use crate::config::{JobProviderKind, Settings};
use crate::documents::DocumentService;
use crate::jobs::JobSearchService;
use crate::llm::{ChatClient, OpenAiChat};
use crate::scraping::{build_client, FormScraper, JobScraper, PageFetcher};
use crate::search::{
    GoogleJobSearch, JobSearchProvider, JobUrlRanker, SearchProvider, SerpApiClient, SerpJobSearch, SerpSearch,
};
use crate::Result;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;
use warp::filters::BoxedFilter;
use warp::{Filter, Rejection, Reply};

pub mod documents;
pub mod errors;
pub mod jobs;

pub use errors::{handle_rejection, ApiError};

/// Largest accepted JSON request body.
pub(crate) const JSON_BODY_LIMIT: u64 = 64 * 1024;

/// Everything the handlers share, built once at startup.
#[derive(Clone)]
pub struct Context {
    pub settings: Arc<Settings>,
    pub job_search: Arc<JobSearchService>,
    pub job_provider: Arc<dyn JobSearchProvider>,
    pub ranker: Arc<JobUrlRanker>,
    pub analysis: Arc<JobAnalysisService>,
    pub documents: Arc<DocumentService>,
}

impl Context {
    /// Wires the services together from the settings.
    ///
    /// All outbound components share one HTTP client. The upload directory is created if missing.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let client = build_client(&settings.scraper)?;
        let llm: Arc<dyn ChatClient> = Arc::new(OpenAiChat::new(
            client.clone(),
            settings.openai_api_key.clone(),
            settings.llm.clone(),
        ));
        let serp = SerpApiClient::new(
            client.clone(),
            settings.search.serpapi_endpoint.clone(),
            settings.serpapi_api_key.clone(),
        );

        let job_provider: Arc<dyn JobSearchProvider> = match settings.search.job_provider {
            JobProviderKind::Serpapi => Arc::new(SerpJobSearch::new(serp.clone(), llm.clone())),
            JobProviderKind::Google => Arc::new(GoogleJobSearch::new(
                client.clone(),
                settings.search.google_endpoint.clone(),
                settings.google_api_key.clone(),
                settings.google_cse_id.clone(),
            )),
        };
        info!("Advanced job search uses {}", job_provider.provider_name());
        let web_search: Arc<dyn SearchProvider> = Arc::new(SerpSearch::new(serp));

        let fetcher = PageFetcher::new(client, settings.scraper.clone());
        let analysis = JobAnalysisService::new(
            JobScraper::new(fetcher.clone()),
            FormScraper::new(fetcher),
            llm.clone(),
        );
        let documents = DocumentService::new(&settings.documents).await?;

        Ok(Self {
            job_search: Arc::new(JobSearchService::new(web_search, settings.scraper.concurrent_requests)),
            job_provider,
            ranker: Arc::new(JobUrlRanker::new(Some(llm))),
            analysis: Arc::new(analysis),
            documents: Arc::new(documents),
            settings: Arc::new(settings),
        })
    }
}

pub(crate) fn with_context(ctx: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// Matches the segments of a prefix such as `/api/v1`.
fn path_prefix(prefix: &str) -> BoxedFilter<()> {
    prefix
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(warp::any().boxed(), |filter, segment| {
            filter.and(warp::path(segment.to_string())).boxed()
        })
}

async fn root(ctx: Context) -> std::result::Result<warp::reply::Json, Rejection> {
    Ok(warp::reply::json(&json!({
        "message": format!("Welcome to {}", ctx.settings.app_name),
        "api_prefix": ctx.settings.api_prefix,
    })))
}

/// All routes of the service, with errors rendered as JSON and requests traced.
pub fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let welcome = warp::path::end()
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(root);
    let api = path_prefix(&ctx.settings.api_prefix).and(jobs::routes(ctx.clone()).or(documents::routes(ctx)));

    welcome
        .or(api)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::tests::fast_config;
    use crate::search::serp::tests::ORGANIC_RESULTS;
    use mockito::Matcher;
    use serde_json::Value;
    use tempfile::TempDir;
    use warp::http::StatusCode;

    async fn context(server: &mockito::Server) -> (Context, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.serpapi_api_key = "serp-key".to_string();
        settings.search.serpapi_endpoint = format!("{}/search.json", server.url());
        settings.llm.endpoint = format!("{}/v1/chat/completions", server.url());
        settings.scraper = fast_config();
        settings.documents.upload_dir = dir.path().to_path_buf();
        settings.documents.max_file_size = 1024;
        (Context::from_settings(settings).await.unwrap(), dir)
    }

    fn body(response: &warp::http::Response<bytes::Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn multipart(filename: &str, content_type: &str, content: &str) -> (String, String) {
        let boundary = "jobscout-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        (format!("multipart/form-data; boundary={}", boundary), body)
    }

    #[tokio::test]
    async fn test_path_prefix() {
        let filter = path_prefix("/api/v1/").and(warp::path::end()).map(|| "ok");
        assert!(warp::test::request().path("/api/v1").matches(&filter).await);
        assert!(!warp::test::request().path("/api/v2").matches(&filter).await);
    }

    #[tokio::test]
    async fn test_root() {
        let server = mockito::Server::new_async().await;
        let (ctx, _dir) = context(&server).await;

        let response = warp::test::request().path("/").reply(&routes(ctx)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body(&response),
            json!({"message": "Welcome to Job Search API", "api_prefix": "/api/v1"})
        );
    }

    #[tokio::test]
    async fn test_search_jobs() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("q".into(), "rust jobs in Berlin".into()))
            .with_body(ORGANIC_RESULTS)
            .create_async()
            .await;
        let (ctx, _dir) = context(&server).await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/jobs/search")
            .json(&json!({"query": "rust", "location": "Berlin"}))
            .reply(&routes(ctx))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body(&response);
        assert_eq!(body["total_results"], 2);
        assert_eq!(body["search_query"], "rust");
        assert_eq!(body["results"][0]["company"], "LinkedIn");
    }

    #[tokio::test]
    async fn test_search_jobs_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"error": "boom"}"#)
            .create_async()
            .await;
        let (ctx, _dir) = context(&server).await;
        let routes = routes(ctx);

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/jobs/search")
            .json(&json!({"query": "  "}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&response), json!({"detail": "Search query cannot be empty"}));

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/jobs/search")
            .json(&json!({"query": "rust"}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body(&response)["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("Error searching jobs: "));
        assert!(detail.contains("boom"));

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/jobs/search")
            .json(&json!({"query": "rust", "num_results": 500}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_batch() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("q".into(), "rust jobs".into()))
            .with_body(ORGANIC_RESULTS)
            .create_async()
            .await;
        let (ctx, _dir) = context(&server).await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/jobs/search/batch")
            .json(&json!([{"query": "rust"}, {"query": ""}]))
            .reply(&routes(ctx))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body(&response);
        assert_eq!(body["rust"].as_array().unwrap().len(), 2);
        assert_eq!(body[""], json!([]));
    }

    #[tokio::test]
    async fn test_search_advanced_direct_postings() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("q".into(), "rust engineer remote".into()))
            .with_body(ORGANIC_RESULTS)
            .create_async()
            .await;
        let (ctx, _dir) = context(&server).await;
        let routes = routes(ctx);

        // Without an OpenAI key the query falls back to the plain parameters.
        let request = json!({"query": "rust engineer", "remote": true, "direct_postings_only": true});
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/jobs/search/advanced")
            .json(&request)
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body(&response);
        assert_eq!(body["provider"], "serpapi_jobs");
        assert_eq!(body["total_results"], 2);
        assert_eq!(body["results"][0]["link"], "https://www.linkedin.com/jobs/view/123");
        assert_eq!(body["results"][0]["is_job_posting"], true);
        assert_eq!(body["results"][1]["is_job_posting"], false);
    }

    #[tokio::test]
    async fn test_analyze_rejects_pages_that_are_not_postings() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/about")
            .with_body("<html><body><p>We make widgets.</p></body></html>")
            .create_async()
            .await;
        let (ctx, _dir) = context(&server).await;

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/jobs/analyze")
            .json(&json!({"job_url": format!("{}/about", server.url())}))
            .reply(&routes(ctx))
            .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_document_routes() {
        let server = mockito::Server::new_async().await;
        let (ctx, _dir) = context(&server).await;
        let routes = routes(ctx);

        let (content_type, upload) = multipart("cv.txt", "text/plain", "Ten years of Rust.");
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/documents/upload/resume")
            .header("content-type", content_type)
            .body(upload)
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let stored = body(&response);
        assert_eq!(stored["document_type"], "resume");
        assert_eq!(stored["original_filename"], "cv.txt");
        assert_eq!(stored["size"], 18);
        let filename = stored["filename"].as_str().unwrap().to_string();

        let response = warp::test::request()
            .path("/api/v1/documents/list?document_type=resume")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["total_count"], 1);

        let response = warp::test::request()
            .path("/api/v1/documents/list?document_type=cover_letter")
            .reply(&routes)
            .await;
        assert_eq!(body(&response)["total_count"], 0);

        let response = warp::test::request()
            .path(&format!("/api/v1/documents/{}", filename))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["content_type"], "application/octet-stream");

        let response = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/v1/documents/{}", filename))
            .reply(&routes)
            .await;
        assert_eq!(body(&response), json!({"success": true}));

        let response = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/v1/documents/{}", filename))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), json!({"detail": "Document not found"}));

        let response = warp::test::request()
            .path(&format!("/api/v1/documents/{}", filename))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), json!({"detail": "Document not found"}));
    }

    #[tokio::test]
    async fn test_upload_rejects_invalid_files() {
        let server = mockito::Server::new_async().await;
        let (ctx, _dir) = context(&server).await;
        let routes = routes(ctx);

        let (content_type, upload) = multipart("photo.png", "image/png", "not really a png");
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/documents/upload/resume")
            .header("content-type", content_type)
            .body(upload)
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body(&response),
            json!({"detail": "Invalid file type. Allowed types: PDF, DOC, DOCX, TXT"})
        );

        let (content_type, upload) = multipart("cv.txt", "text/plain", "hello");
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/documents/upload/photo")
            .header("content-type", content_type)
            .body(upload)
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = warp::test::request()
            .path("/api/v1/documents/..%2Fsecrets")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
