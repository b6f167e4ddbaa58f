//! URL ingestion against a local fixture server.

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use unified_ingest::config::Config;
use unified_ingest::fetch::{FetchError, HttpFetcher};
use unified_ingest::models::{IngestRequest, LlmMode, NoiseLevel};
use unified_ingest::pipeline::Pipeline;
use unified_ingest::traits::PageFetcher;

const ARTICLE_HTML: &str = r#"<!doctype html>
<html>
  <head><title>Field report</title><script>track()</script></head>
  <body>
    <header>Site banner</header>
    <nav><a href="/">Home</a> <a href="/about">About</a></nav>
    <main>
      <h1>Field report from the northern sites</h1>
      <p>The survey team visited fourteen sites over three weeks and recorded
         soil samples, water levels and vegetation cover at each location.</p>
      <p>Water levels were lower than the previous season at eleven of the
         fourteen sites, with the largest drop recorded near the eastern ridge.</p>
      <p>Vegetation cover recovered well where grazing had been restricted,
         and the team recommends extending the restriction to two more sites.</p>
    </main>
    <footer>Copyright 2026</footer>
  </body>
</html>"#;

async fn article() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], ARTICLE_HTML)
}

async fn empty() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html")], "")
}

async fn missing() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not here")
}

async fn json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], r#"{"ok":true}"#)
}

async fn huge() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html")],
        format!("<p>{}</p>", "x".repeat(64 * 1024)),
    )
}

/// Starts the fixture server on an ephemeral port and returns its base URL.
async fn start_fixture_server() -> String {
    let app = Router::new()
        .route("/reports/field-report", get(article))
        .route("/empty", get(empty))
        .route("/missing", get(missing))
        .route("/data.json", get(json))
        .route("/huge", get(huge));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn pipeline() -> Pipeline {
    Pipeline::from_config(&Config::default()).unwrap()
}

#[tokio::test]
async fn article_page_is_cleaned_and_scored() {
    let base = start_fixture_server().await;
    let url = format!("{}/reports/field-report", base);

    let result = pipeline().ingest(IngestRequest::Url(url.clone())).await.unwrap();

    let text = result.text();
    assert!(text.starts_with("Field report from the northern sites\n\nThe survey team"));
    assert!(!text.contains("Site banner"));
    assert!(!text.contains("Home"));
    assert!(!text.contains("Copyright"));
    assert!(!text.contains("track()"));
    assert_eq!(text.matches("\n\n").count(), 3);

    assert_eq!(result.noise_level(), NoiseLevel::Low);
    assert_eq!(result.page_count(), 1);
    assert!(!result.has_warning("short_content"));

    let meta = result.file_meta();
    assert_eq!(meta.file_name, "field-report");
    assert_eq!(meta.file_extension, "html");
    assert_eq!(meta.file_size_bytes, ARTICLE_HTML.len() as u64);
    assert_eq!(meta.source_url.as_deref(), Some(url.as_str()));
}

#[tokio::test]
async fn empty_page_succeeds_with_strict_guidance() {
    let base = start_fixture_server().await;
    let result = pipeline()
        .ingest(IngestRequest::Url(format!("{}/empty", base)))
        .await
        .unwrap();

    assert_eq!(result.noise_level(), NoiseLevel::High);
    assert!(result.overall_confidence() < 0.5);
    assert_eq!(result.recommended_llm_mode(), LlmMode::Strict);
    assert!(result.has_warning("no_content"));
    assert!(result.has_warning("low_confidence_input"));
    assert_eq!(result.text(), "");
}

#[tokio::test]
async fn http_error_is_extraction_failure() {
    let base = start_fixture_server().await;
    let err = pipeline()
        .ingest(IngestRequest::Url(format!("{}/missing", base)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "extraction_failed");
    assert!(err.to_string().contains("404"), "{err}");
}

#[tokio::test]
async fn non_html_content_is_rejected() {
    let base = start_fixture_server().await;
    let fetcher = HttpFetcher::new(&Config::default().fetch).unwrap();
    let err = fetcher
        .fetch(&format!("{}/data.json", base))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::ContentType { .. }), "{err}");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let base = start_fixture_server().await;
    let mut config = Config::default();
    config.fetch.max_body_bytes = 4 * 1024;
    let fetcher = HttpFetcher::new(&config.fetch).unwrap();
    let err = fetcher.fetch(&format!("{}/huge", base)).await.unwrap_err();
    assert!(matches!(err, FetchError::TooLarge { .. }), "{err}");
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let fetcher = HttpFetcher::new(&Config::default().fetch).unwrap();
    let err = fetcher
        .fetch(&format!("http://127.0.0.1:{}/", port))
        .await
        .unwrap_err();
    assert!(
        matches!(err, FetchError::Transport { .. } | FetchError::Timeout(_)),
        "{err}"
    );
}
