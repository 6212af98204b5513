//! Integration tests for the relay: HTTP front door, disk cache and page
//! loading, end to end.
//!
//! Most tests drive the axum router in memory against a scripted
//! [`PageSource`], so they need neither network access nor a real source
//! site. The `http_fetcher_*` tests stand up a loopback server to exercise
//! the `reqwest` fetcher and its bounded reload loop.
//!
//! Run with:
//!   cargo test --test relay -- --nocapture

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use unmedium::{
    router, sanitize, FetchedPage, PageSource, Relay, RelayConfig, RelayError, RenderWarning,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

const ARTICLE_URL: &str = "https://example.com/article-x";

const ARTICLE_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Site chrome title</title>
<meta name="author" content="Ada Lovelace">
<script>track()</script></head>
<body><nav class="site-nav">Home</nav>
<article class="post" id="main"><h1 class="title">On Engines</h1><div class="meta">Ada Lovelace · 5 min read</div><section class="body"><p class="lead">The engine weaves algebraic patterns.</p><figure class="fig"><div class="placeholder"><noscript><img src="https://cdn.example.com/loom.png" class="lazy"></noscript></div></figure></section></article>
<footer class="site-footer">Subscribe</footer></body></html>"#;

const ANONYMOUS_PAGE: &str = r#"<html><head></head><body><article><h1>Untitled</h1><div>byline</div><p>Nobody wrote this.</p></article></body></html>"#;

/// In-memory page source. Unknown URLs fail like an unreachable site.
struct ScriptedSource {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(pages: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(body) => Ok(FetchedPage {
                url: url.to_string(),
                body: body.clone().into_bytes(),
            }),
            None => Err(RelayError::FetchFailed {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

fn config_in(dir: &Path) -> RelayConfig {
    RelayConfig::builder()
        .cache_dir(dir)
        .poll_interval_ms(50)
        .max_poll_attempts(3)
        .fetch_timeout_secs(5)
        .build()
        .unwrap()
}

fn relay_with(dir: &Path, source: Arc<ScriptedSource>) -> Arc<Relay> {
    Arc::new(Relay::with_source(config_in(dir), source))
}

/// Issue `GET path` against the router; returns status, content type and body.
async fn get(relay: Arc<Relay>, path: &str) -> (StatusCode, String, String) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = router(relay).oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

/// The part of a composed page that came from the article.
fn article_part(html: &str) -> &str {
    let start = html
        .find("</span>")
        .map(|i| i + "</span>".len())
        .or_else(|| html.find("<body>").map(|i| i + "<body>".len()))
        .unwrap();
    let end = html.rfind("</body>").unwrap();
    &html[start..end]
}

// ── Front door ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_request_fetches_and_caches_the_pristine_page() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new(&[(ARTICLE_URL, ARTICLE_PAGE)]);
    let relay = relay_with(dir.path(), source.clone());

    let (status, content_type, html) = get(relay, &format!("/{ARTICLE_URL}")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/html"), "{content_type}");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert_eq!(source.calls(), 1);

    let entry = dir.path().join(sanitize(ARTICLE_URL).as_str());
    assert_eq!(
        entry.file_name().unwrap(),
        "https-example.comarticle-x",
        "cache file should be named after the sanitized URL"
    );
    assert_eq!(std::fs::read_to_string(&entry).unwrap(), ARTICLE_PAGE);
}

#[tokio::test]
async fn second_request_is_served_from_cache_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new(&[(ARTICLE_URL, ARTICLE_PAGE)]);
    let relay = relay_with(dir.path(), source.clone());

    let (_, _, first) = get(relay.clone(), &format!("/{ARTICLE_URL}")).await;
    let (status, _, second) = get(relay, &format!("/{ARTICLE_URL}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(source.calls(), 1, "cache hit must not refetch");
    assert_eq!(first, second);
}

#[tokio::test]
async fn cached_page_survives_a_relay_restart() {
    let dir = TempDir::new().unwrap();
    let first_source = ScriptedSource::new(&[(ARTICLE_URL, ARTICLE_PAGE)]);
    let (_, _, first) = get(relay_with(dir.path(), first_source), &format!("/{ARTICLE_URL}")).await;

    // A fresh relay whose source knows nothing: only the cache can answer.
    let empty_source = ScriptedSource::new(&[]);
    let (status, _, second) =
        get(relay_with(dir.path(), empty_source.clone()), &format!("/{ARTICLE_URL}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty_source.calls(), 0);
    assert_eq!(first, second);
}

#[tokio::test]
async fn served_page_is_the_cleaned_article() {
    let dir = TempDir::new().unwrap();
    let relay = relay_with(dir.path(), ScriptedSource::new(&[(ARTICLE_URL, ARTICLE_PAGE)]));

    let (_, _, html) = get(relay, &format!("/{ARTICLE_URL}")).await;

    // Head
    assert!(html.contains("<meta charset=\"utf-8\">"));
    assert!(html.contains("<title>On Engines</title>"));
    assert!(html.contains("href=\"/resources/base.css\""));
    assert!(html.contains("name=\"viewport\""));
    assert!(html.contains("content=\"Ada Lovelace\""));
    assert!(!html.contains("Site chrome title"));
    assert!(!html.contains("<script"));

    // Byline
    assert!(html.contains("<span class=\"author\">Authored by Ada Lovelace</span>"));

    // Body
    let body = article_part(&html);
    assert!(body.starts_with("<h1>On Engines</h1>"), "{body}");
    assert!(!body.contains("5 min read"), "meta header not stripped: {body}");
    assert!(!body.contains("class="), "class survived: {body}");
    assert!(!body.contains("id="), "id survived: {body}");
    assert!(!body.contains("<section"), "section not unwrapped: {body}");
    assert!(!body.contains("noscript"), "noscript not recovered: {body}");
    assert!(body.contains("<p>The engine weaves algebraic patterns.</p>"));
    assert!(body.contains("<figure><img "), "image not lifted into the figure: {body}");
    assert!(body.contains("src=\"https://cdn.example.com/loom.png\""));
    assert!(body.contains("loading=\"lazy\""));
    assert!(!html.contains("Home"));
    assert!(!html.contains("Subscribe"));
}

#[tokio::test]
async fn page_without_author_has_no_byline() {
    let dir = TempDir::new().unwrap();
    let url = "https://example.com/anonymous";
    let relay = relay_with(dir.path(), ScriptedSource::new(&[(url, ANONYMOUS_PAGE)]));

    let (status, _, html) = get(relay, &format!("/{url}")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!html.contains("Authored by"));
    assert!(!html.contains("name=\"author\""));
    assert!(html.contains("<title>Untitled</title>"));
    assert!(html.contains("<p>Nobody wrote this.</p>"));
}

#[tokio::test]
async fn query_string_is_part_of_the_source_url() {
    let dir = TempDir::new().unwrap();
    let url = "https://example.com/article-x?source=feed";
    let source = ScriptedSource::new(&[(url, ARTICLE_PAGE)]);
    let relay = relay_with(dir.path(), source.clone());

    let (status, _, _) = get(relay, &format!("/{url}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(source.calls(), 1);
    assert!(dir.path().join(sanitize(url).as_str()).is_file());
}

#[tokio::test]
async fn fetch_failure_is_a_500_and_caches_nothing() {
    let dir = TempDir::new().unwrap();
    let url = "https://unreachable.example.com/post";
    let relay = relay_with(dir.path(), ScriptedSource::new(&[]));

    let (status, _, body) = get(relay, &format!("/{url}")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("error retrieving post: "), "{body}");
    assert!(body.contains(url));
    assert!(body.contains("connection refused"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn root_path_is_treated_as_an_empty_url() {
    let dir = TempDir::new().unwrap();
    let relay = relay_with(dir.path(), ScriptedSource::new(&[]));

    let (status, _, body) = get(relay, "/").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("error retrieving post: "));
}

#[tokio::test]
async fn stylesheet_route_serves_css() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new(&[]);
    let relay = relay_with(dir.path(), source.clone());

    let (status, content_type, body) = get(relay, "/resources/base.css").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/css"), "{content_type}");
    assert_eq!(body, unmedium::server::BASE_CSS);
    assert_eq!(source.calls(), 0, "stylesheet must not be fetched as an article");
}

// ── Cache failure modes ──────────────────────────────────────────────────────

#[tokio::test]
async fn cache_write_failure_still_serves_the_page() {
    let dir = TempDir::new().unwrap();
    // Never created: lookups miss and stores fail.
    let cache_dir = dir.path().join("missing");
    let key = sanitize(ARTICLE_URL);

    let source = ScriptedSource::new(&[(ARTICLE_URL, ARTICLE_PAGE)]);
    let relay = relay_with(&cache_dir, source.clone());

    let output = relay.render(ARTICLE_URL).await.unwrap();

    assert!(!output.cache_hit);
    assert!(output.html.contains("<title>On Engines</title>"));
    assert!(
        matches!(
            output.warnings.as_slice(),
            [RenderWarning::CacheWriteFailed { key: k, .. }] if k == key.as_str()
        ),
        "{:?}",
        output.warnings
    );
    assert!(!cache_dir.exists());

    // Nothing was cached, so the next request fetches again.
    relay.render(ARTICLE_URL).await.unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_on_one_url_all_succeed() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new(&[(ARTICLE_URL, ARTICLE_PAGE)]);
    let relay = relay_with(dir.path(), source);

    let requests: Vec<_> = (0..8)
        .map(|_| {
            let relay = relay.clone();
            tokio::spawn(async move { relay.render(ARTICLE_URL).await })
        })
        .collect();

    for request in requests {
        let output = request.await.unwrap().unwrap();
        assert!(output.warnings.is_empty(), "{:?}", output.warnings);
        assert!(output.html.contains("<title>On Engines</title>"));
    }

    let entry = dir.path().join(sanitize(ARTICLE_URL).as_str());
    assert_eq!(std::fs::read_to_string(entry).unwrap(), ARTICLE_PAGE);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn unreadable_cache_entry_is_refetched_and_left_alone() {
    let dir = TempDir::new().unwrap();
    let key = sanitize(ARTICLE_URL);
    let entry = dir.path().join(key.as_str());
    std::fs::create_dir(&entry).unwrap();

    let source = ScriptedSource::new(&[(ARTICLE_URL, ARTICLE_PAGE)]);
    let relay = relay_with(dir.path(), source.clone());

    let output = relay.render(ARTICLE_URL).await.unwrap();

    assert_eq!(source.calls(), 1);
    assert!(!output.cache_hit);
    assert!(output.html.contains("<title>On Engines</title>"));
    assert!(
        matches!(output.warnings.as_slice(), [RenderWarning::CacheReadFailed { .. }]),
        "{:?}",
        output.warnings
    );
    assert!(entry.is_dir(), "broken entry should not be overwritten");
}

#[tokio::test]
async fn ensured_cache_directory_receives_entries() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("nested").join("cache");
    let relay = Relay::with_source(
        config_in(&cache_dir),
        ScriptedSource::new(&[(ARTICLE_URL, ARTICLE_PAGE)]),
    );

    relay.cache().ensure_dir().await.unwrap();
    let output = relay.render(ARTICLE_URL).await.unwrap();

    assert!(output.warnings.is_empty(), "{:?}", output.warnings);
    assert!(cache_dir.join(sanitize(ARTICLE_URL).as_str()).is_file());
}

#[tokio::test]
async fn cached_document_without_article_renders_empty_body() {
    let dir = TempDir::new().unwrap();
    let key = sanitize(ARTICLE_URL);
    std::fs::write(dir.path().join(key.as_str()), "<html><body><p>stale</p></body></html>").unwrap();

    let source = ScriptedSource::new(&[]);
    let relay = relay_with(dir.path(), source.clone());

    let output = relay.render(ARTICLE_URL).await.unwrap();

    assert!(output.cache_hit);
    assert_eq!(source.calls(), 0);
    assert_eq!(output.warnings, vec![RenderWarning::ArticleMissing]);
    assert!(output.html.contains("<body></body>"));
}

// ── HTTP fetcher against a loopback server ───────────────────────────────────

/// Serves a skeleton page for the first `skeleton_loads` requests and the
/// full article afterwards. Returns the base URL and the request counter.
async fn spawn_source_site(skeleton_loads: usize) -> (String, Arc<AtomicUsize>) {
    use axum::{extract::State, response::Html, routing::get, Router};

    async fn page(State((hits, skeleton_loads)): State<(Arc<AtomicUsize>, usize)>) -> Html<&'static str> {
        let n = hits.fetch_add(1, Ordering::SeqCst);
        if n < skeleton_loads {
            Html("<html><body><div id=\"root\">Loading…</div></body></html>")
        } else {
            Html(ARTICLE_PAGE)
        }
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/post", get(page))
        .with_state((hits.clone(), skeleton_loads));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), hits)
}

#[tokio::test]
async fn http_fetcher_reloads_until_the_article_appears() {
    let (base, hits) = spawn_source_site(2).await;
    let dir = TempDir::new().unwrap();
    let relay = Relay::new(config_in(dir.path())).unwrap();
    let url = format!("{base}/post");

    let output = relay.render(&url).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert!(!output.cache_hit);
    assert!(output.html.contains("<title>On Engines</title>"));

    // The stored page is the one with the article, not a skeleton.
    let cached = std::fs::read_to_string(dir.path().join(sanitize(&url).as_str())).unwrap();
    assert_eq!(cached, ARTICLE_PAGE);
}

#[tokio::test]
async fn http_fetcher_gives_up_after_max_attempts() {
    let (base, hits) = spawn_source_site(usize::MAX).await;
    let dir = TempDir::new().unwrap();
    let relay = Relay::new(config_in(dir.path())).unwrap();
    let url = format!("{base}/post");

    let err = relay.render(&url).await.unwrap_err();

    match err {
        RelayError::FetchTimeout { url: failed, attempts } => {
            assert_eq!(failed, url);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected FetchTimeout, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn http_fetcher_rejects_error_status() {
    let (base, _) = spawn_source_site(0).await;
    let dir = TempDir::new().unwrap();
    let relay = Relay::new(config_in(dir.path())).unwrap();

    let err = relay.render(&format!("{base}/missing")).await.unwrap_err();

    match err {
        RelayError::FetchFailed { reason, .. } => assert!(reason.contains("404"), "{reason}"),
        other => panic!("expected FetchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn render_to_file_writes_the_page() {
    let (base, _) = spawn_source_site(0).await;
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir.path().join("cache"));
    let out = dir.path().join("post.html");

    let output = unmedium::render_to_file(format!("{base}/post"), &out, &config)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&out).unwrap(), output.html);
    assert!(!dir.path().join("post.html.tmp").exists());
}
