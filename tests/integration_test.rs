use jobscout::api::{self, Context};
use jobscout::config::RateLimit;
use jobscout::Settings;
use mockito::Matcher;
use serde_json::{json, Value};
use warp::http::StatusCode;

const SERP_RESPONSE: &str = r#"{
    "organic_results": [
        {
            "position": 1,
            "title": "Rust Engineer - Ferrous Systems | LinkedIn",
            "link": "https://www.linkedin.com/jobs/view/42",
            "snippet": "Full-time. Build compilers in Berlin.",
            "source": "LinkedIn",
            "date": "2 days ago",
            "location": "Berlin"
        }
    ]
}"#;

const POSTING: &str = r#"
    <html><body>
        <h1>Job opening: Rust Engineer</h1>
        <main><p>Requirements: three years of Rust.</p></main>
        <form action="/apply">
            <input name="full_name" required>
            <input name="email" type="email" required>
            <select name="start"><option value="now">Now</option><option value="later">Later</option></select>
        </form>
    </body></html>
"#;

fn settings(server: &mockito::Server, upload_dir: &std::path::Path) -> Settings {
    let mut settings = Settings::default();
    settings.serpapi_api_key = "serp-key".to_string();
    settings.search.serpapi_endpoint = format!("{}/search.json", server.url());
    settings.scraper.max_retries = 1;
    settings.scraper.rate_limit = RateLimit {
        requests_per_second: 0.0,
        burst_size: 4,
    };
    settings.documents.upload_dir = upload_dir.to_path_buf();
    settings
}

fn json_body(response: &warp::http::Response<bytes::Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

#[tokio::test]
async fn test_search_and_analyze_workflow() {
    let mut server = mockito::Server::new_async().await;
    let search = server
        .mock("GET", "/search.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "rust engineer jobs in Berlin Full-time".into()),
            Matcher::UrlEncoded("num".into(), "5".into()),
            Matcher::UrlEncoded("api_key".into(), "serp-key".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(SERP_RESPONSE)
        .create_async()
        .await;
    let _posting = server
        .mock("GET", "/careers/rust-engineer")
        .with_header("content-type", "text/html")
        .with_body(POSTING)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::from_settings(settings(&server, dir.path())).await.unwrap();
    let routes = api::routes(ctx);

    // Search
    let response = warp::test::request()
        .method("POST")
        .path("/api/v1/jobs/search")
        .json(&json!({"query": "rust engineer", "location": "Berlin", "job_type": "Full-time", "num_results": 5}))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let results = json_body(&response);
    assert_eq!(results["total_results"], 1);
    assert_eq!(results["search_query"], "rust engineer");
    assert_eq!(
        results["results"][0],
        json!({
            "title": "Rust Engineer - Ferrous Systems | LinkedIn",
            "link": "https://www.linkedin.com/jobs/view/42",
            "snippet": "Full-time. Build compilers in Berlin.",
            "company": "LinkedIn",
            "location": "Berlin",
            "posted_date": "2 days ago"
        })
    );
    search.assert_async().await;

    // Analyze the application form of a posting
    let job_url = format!("{}/careers/rust-engineer", server.url());
    let response = warp::test::request()
        .method("POST")
        .path("/api/v1/jobs/analyze")
        .json(&json!({ "job_url": job_url }))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let analysis = json_body(&response);
    assert_eq!(analysis["success"], true);
    assert_eq!(analysis["message"], "Job posting analyzed successfully");
    assert_eq!(analysis["analysis"]["url"], job_url);

    let fields = &analysis["analysis"]["form_fields"];
    assert_eq!(fields.as_object().unwrap().len(), 3);
    assert_eq!(fields["full_name"]["type"], "text");
    assert_eq!(fields["email"]["required"], true);
    assert_eq!(fields["start"]["options"], json!(["now", "later"]));
}

#[tokio::test]
async fn test_document_workflow() {
    let server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::from_settings(settings(&server, dir.path())).await.unwrap();
    let routes = api::routes(ctx);

    let boundary = "X-JOBSCOUT-BOUNDARY";
    let upload = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"letter.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         Dear hiring team,\nI would like to apply.\r\n\
         --{boundary}--\r\n"
    );
    let response = warp::test::request()
        .method("POST")
        .path("/api/v1/documents/upload/cover_letter")
        .header("content-type", format!("multipart/form-data; boundary={}", boundary))
        .body(upload)
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = json_body(&response);
    let filename = stored["filename"].as_str().unwrap().to_string();
    assert!(filename.starts_with("cover_letter_"));
    assert!(filename.ends_with(".txt"));
    assert_eq!(stored["content_type"], "text/plain");
    assert!(dir.path().join(&filename).exists());

    let response = warp::test::request().path("/api/v1/documents/list").reply(&routes).await;
    let listing = json_body(&response);
    assert_eq!(listing["total_count"], 1);
    assert_eq!(listing["documents"][0]["document_type"], "cover_letter");
    assert!(listing["document_type"].is_null());

    let response = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/v1/documents/{}", filename))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!dir.path().join(&filename).exists());

    let response = warp::test::request()
        .path(&format!("/api/v1/documents/{}", filename))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(&response), json!({"detail": "Document not found"}));
}

#[tokio::test]
async fn test_unknown_route() {
    let server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::from_settings(settings(&server, dir.path())).await.unwrap();

    let response = warp::test::request()
        .path("/api/v1/nothing-here")
        .reply(&api::routes(ctx))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(&response), json!({"detail": "Not Found"}));
}
