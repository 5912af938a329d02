//! The crawl engine: a sequential, rate-limited traversal state machine.
//!
//! One fetch is outstanding at a time; every stage for a page (fetch →
//! extract → chunk → persist) completes before the next frontier entry is
//! dequeued. All crawl state is owned by this loop. Cancellation is
//! advisory — a [`StopHandle`] checked at the top of each iteration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

use docharvest_artifacts::{generate_ai_sitemap, generate_llms_txt, generate_summary};
use docharvest_chunk::Chunker;
use docharvest_extract::{SectionTree, StructuredDoc, extract_markdown};
use docharvest_meta::analyze_page;
use docharvest_shared::{CrawlConfig, HarvestError, OutputFormat, PageRecord, Result};

use crate::assets::{self, AssetPolicy};
use crate::fetch::{FetchedBody, Fetcher};
use crate::frontier::{CrawlState, StopHandle, normalize_page_url};
use crate::output::{DownloadedFile, OutputLayout};
use crate::specdetect::SpecRegistry;

// ---------------------------------------------------------------------------
// CrawlOutcome
// ---------------------------------------------------------------------------

/// Terminal status of a crawl. Partial success is the default policy: a
/// crawl completes when at least one page was downloaded, even if some
/// individual fetches failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    Completed,
    Failed,
}

/// Summary of a finished crawl.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub status: CrawlStatus,
    /// Unique links discovered and queued.
    pub pages_found: usize,
    /// HTML pages successfully fetched and processed.
    pub pages_downloaded: usize,
    /// Non-fatal errors, in occurrence order.
    pub errors: Vec<String>,
    /// The crawl's output directory.
    pub output_dir: PathBuf,
    /// Every file written.
    pub files: Vec<DownloadedFile>,
    pub duration: Duration,
}

impl CrawlOutcome {
    pub fn is_success(&self) -> bool {
        self.status == CrawlStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Sequential documentation crawler.
pub struct Crawler {
    config: CrawlConfig,
    fetcher: Fetcher,
    policy: AssetPolicy,
    specs: SpecRegistry,
    stop: StopHandle,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&config.user_agent)?;
        let policy = AssetPolicy::from(&config);

        Ok(Self {
            config,
            fetcher,
            policy,
            specs: SpecRegistry::new(),
            stop: StopHandle::new(),
        })
    }

    /// Handle for requesting a cooperative stop from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Crawl starting from `start_url`, writing all artifacts under a
    /// timestamped directory inside `output_root`.
    ///
    /// The only fatal error is failing to create that directory; everything
    /// else is contained in the outcome's error list.
    #[instrument(skip_all, fields(start_url = %start_url))]
    pub async fn crawl(&self, start_url: &Url, output_root: &Path) -> Result<CrawlOutcome> {
        let start_time = std::time::Instant::now();

        let out_dir = output_root.join(output_dir_name(start_url));
        std::fs::create_dir_all(&out_dir).map_err(|e| HarvestError::io(&out_dir, e))?;

        let mut layout = OutputLayout::new(out_dir.clone(), start_url.clone());
        let mut state = CrawlState::new(start_url);
        let mut records: Vec<PageRecord> = Vec::new();
        let chunker = Chunker::new(self.config.chunk_size, self.config.chunk_overlap);

        info!(
            max_depth = self.config.max_depth,
            rate_limit_ms = self.config.rate_limit_ms,
            out_dir = %out_dir.display(),
            "starting crawl"
        );

        loop {
            if self.stop.is_stop_requested() {
                info!("stop requested; ending crawl before next dequeue");
                break;
            }
            let Some(entry) = state.pop() else { break };

            let key = normalize_page_url(&entry.url);
            if state.is_visited(&key) || entry.depth > self.config.max_depth {
                continue;
            }
            state.mark_visited(key);

            if let Err(e) = self
                .process_page(&entry.url, entry.depth, &chunker, &mut layout, &mut state, &mut records)
                .await
            {
                state.record_error(e.to_string());
            }

            sleep(Duration::from_millis(self.config.rate_limit_ms)).await;
        }

        if self.config.generate_metadata && !records.is_empty() {
            self.write_site_artifacts(start_url, &records, &mut layout, &mut state);
        }

        let pages_found = state.pages_found();
        let pages_downloaded = state.pages_downloaded();
        let errors = state.into_errors();
        let status = if errors.is_empty() || pages_downloaded > 0 {
            CrawlStatus::Completed
        } else {
            CrawlStatus::Failed
        };

        info!(
            ?status,
            pages_found,
            pages_downloaded,
            errors = errors.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "crawl finished"
        );

        Ok(CrawlOutcome {
            status,
            pages_found,
            pages_downloaded,
            errors,
            output_dir: out_dir,
            files: layout.into_files(),
            duration: start_time.elapsed(),
        })
    }

    // -----------------------------------------------------------------------
    // Per-page pipeline
    // -----------------------------------------------------------------------

    async fn process_page(
        &self,
        url: &Url,
        depth: u32,
        chunker: &Chunker,
        layout: &mut OutputLayout,
        state: &mut CrawlState,
        records: &mut Vec<PageRecord>,
    ) -> Result<()> {
        match self.fetcher.fetch(url).await? {
            FetchedBody::Html(body) => {
                self.process_html(url, depth, &body, chunker, layout, state, records)
                    .await
            }
            FetchedBody::Other {
                bytes,
                content_type,
            } => {
                self.process_asset(url, &bytes, &content_type, layout, state);
                Ok(())
            }
        }
    }

    /// Extract, persist, and enqueue from one HTML page.
    ///
    /// Persistence failures are logged and recorded but never abort the
    /// remaining stages for the page.
    async fn process_html(
        &self,
        url: &Url,
        depth: u32,
        body: &str,
        chunker: &Chunker,
        layout: &mut OutputLayout,
        state: &mut CrawlState,
        records: &mut Vec<PageRecord>,
    ) -> Result<()> {
        // The parsed document is not Send; keep it inside this block so
        // nothing holds it across the asset-download awaits below.
        let asset_urls = {
            let doc = Html::parse_document(body);
            let tree = SectionTree::from_html(&doc);
            let structured = StructuredDoc::with_sections(&doc, url.as_str(), &tree);

            if self.config.emits(OutputFormat::Html) {
                self.persist(state, layout.save_text(url, "html", body, "text/html"), url, "html");
            }

            if self.config.emits(OutputFormat::Markdown) {
                match extract_markdown(body, Some(url)) {
                    Ok(md) => {
                        self.persist(
                            state,
                            layout.save_text(url, "md", &md, "text/markdown"),
                            url,
                            "markdown",
                        );
                    }
                    Err(e) => state.record_error(format!("{url}: {e}")),
                }
            }

            if self.config.emits(OutputFormat::Json) {
                match serde_json::to_string_pretty(&structured) {
                    Ok(json) => {
                        self.persist(
                            state,
                            layout.save_text(url, "json", &json, "application/json"),
                            url,
                            "structured json",
                        );
                    }
                    Err(e) => state.record_error(format!("{url}: {e}")),
                }
            }

            if self.config.generate_metadata {
                let record =
                    analyze_page(&doc, url.as_str(), &structured.title, &structured.description);
                if let Ok(json) = serde_json::to_string_pretty(&record) {
                    self.persist(
                        state,
                        layout.save_text(url, "metadata.json", &json, "application/json"),
                        url,
                        "metadata",
                    );
                }
                records.push(record);
            }

            if self.config.emits(OutputFormat::Chunks) {
                let chunks = chunker.chunk_sections(&tree, url.as_str());
                match serde_json::to_string_pretty(&chunks) {
                    Ok(json) => {
                        self.persist(
                            state,
                            layout.save_text(url, "chunks.json", &json, "application/json"),
                            url,
                            "chunks",
                        );
                    }
                    Err(e) => state.record_error(format!("{url}: {e}")),
                }
            }

            state.note_downloaded();

            // Same-host link discovery, one hop deeper.
            if depth < self.config.max_depth {
                for link in discover_links(&doc, url) {
                    state.enqueue(link, depth + 1);
                }
            }

            if self.policy.any_enabled() {
                assets::discover_assets(&doc, url, &self.policy)
            } else {
                Vec::new()
            }
        };

        // Assets are deduplicated on their full URL form.
        for asset_url in asset_urls {
            if state.is_visited(asset_url.as_str()) {
                continue;
            }
            state.mark_visited(asset_url.as_str().to_string());

            if let Err(e) = self.download_asset(&asset_url, layout).await {
                state.record_error(format!("asset {asset_url}: {e}"));
            }
        }

        Ok(())
    }

    /// Handle a non-HTML frontier response: spec detection first, then the
    /// asset inclusion policy.
    fn process_asset(
        &self,
        url: &Url,
        bytes: &[u8],
        content_type: &str,
        layout: &mut OutputLayout,
        state: &mut CrawlState,
    ) {
        if let Some(format) = self.specs.detect(bytes, url) {
            debug!(%url, format = format.name(), "spec format detected");
            match format.parse(bytes, url) {
                Ok(operations) => {
                    if let Ok(json) = serde_json::to_string_pretty(&operations) {
                        self.persist(
                            state,
                            layout.save_text(url, "operations.json", &json, "application/json"),
                            url,
                            "operations",
                        );
                    }
                }
                Err(e) => state.record_error(e.to_string()),
            }
        }

        if self.policy.should_download(content_type) {
            self.persist(
                state,
                layout.save_bytes(url, assets::extension_for(content_type), bytes, content_type),
                url,
                "asset",
            );
        }
    }

    async fn download_asset(&self, url: &Url, layout: &mut OutputLayout) -> Result<()> {
        match self.fetcher.fetch(url).await? {
            // A link that turned out to be a page; leave it to the frontier.
            FetchedBody::Html(_) => Ok(()),
            FetchedBody::Other {
                bytes,
                content_type,
            } => {
                if self.policy.should_download(&content_type) {
                    layout.save_bytes(
                        url,
                        assets::extension_for(&content_type),
                        &bytes,
                        &content_type,
                    )?;
                }
                Ok(())
            }
        }
    }

    /// Log-and-record wrapper for artifact writes.
    fn persist(
        &self,
        state: &mut CrawlState,
        result: Result<PathBuf>,
        url: &Url,
        what: &str,
    ) {
        if let Err(e) = result {
            warn!(%url, what, error = %e, "artifact write failed");
            state.record_error(format!("failed to write {what} for {url}: {e}"));
        }
    }

    // -----------------------------------------------------------------------
    // Site-level artifacts
    // -----------------------------------------------------------------------

    fn write_site_artifacts(
        &self,
        start_url: &Url,
        records: &[PageRecord],
        layout: &mut OutputLayout,
        state: &mut CrawlState,
    ) {
        let site_name = start_url.host_str().unwrap_or("Documentation").to_string();
        let base_url = start_url.as_str().trim_end_matches('/');

        let llms = generate_llms_txt(records, &site_name, base_url);
        self.persist(
            state,
            layout.save_root_text("llms.txt", &llms, "text/plain"),
            start_url,
            "llms.txt",
        );

        match serde_json::to_string_pretty(&generate_ai_sitemap(records, &site_name, base_url)) {
            Ok(json) => self.persist(
                state,
                layout.save_root_text("ai-sitemap.json", &json, "application/json"),
                start_url,
                "ai-sitemap.json",
            ),
            Err(e) => state.record_error(format!("ai-sitemap.json: {e}")),
        }

        match serde_json::to_string_pretty(&generate_summary(records)) {
            Ok(json) => self.persist(
                state,
                layout.save_root_text("ai-summary.json", &json, "application/json"),
                start_url,
                "ai-summary.json",
            ),
            Err(e) => state.record_error(format!("ai-summary.json: {e}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Timestamped output directory name: `<host with dots as underscores>_<UTC>`.
fn output_dir_name(start_url: &Url) -> String {
    let host = start_url.host_str().unwrap_or("site").replace('.', "_");
    format!("{host}_{}", Utc::now().format("%Y%m%d_%H%M%S"))
}

/// Same-registered-hostname links for frontier discovery, fragment and
/// query stripped. Hostname comparison is the sole scoping rule.
fn discover_links(doc: &Html, base_url: &Url) -> Vec<Url> {
    let a_sel = Selector::parse("a[href]").unwrap();
    let base_host = base_url.host_str().unwrap_or_default();

    let mut links = Vec::new();
    for el in doc.select(&a_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }

        let Ok(mut resolved) = base_url.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        if resolved.host_str().unwrap_or_default() != base_host {
            continue;
        }

        resolved.set_fragment(None);
        resolved.set_query(None);
        links.push(resolved);
    }

    links
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod crawler_tests {
    use super::*;
    use docharvest_shared::{AppConfig, ContentType};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(max_depth: u32) -> CrawlConfig {
        let mut config = CrawlConfig::from(&AppConfig::default());
        config.max_depth = max_depth;
        config.rate_limit_ms = 0;
        config
    }

    async fn mount_page(server: &MockServer, route: &str, html: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
            .mount(server)
            .await;
    }

    #[test]
    fn discover_links_is_same_host_only() {
        let html = r##"<html><body>
            <a href="/internal">In</a>
            <a href="https://elsewhere.com/out">Out</a>
            <a href="/page?tab=2#frag">Variant</a>
            <a href="mailto:x@example.com">Mail</a>
        </body></html>"##;
        let doc = Html::parse_document(html);
        let base = Url::parse("https://docs.example.com/start").unwrap();

        let links: Vec<String> = discover_links(&doc, &base)
            .into_iter()
            .map(|u| u.to_string())
            .collect();
        assert_eq!(
            links,
            vec![
                "https://docs.example.com/internal",
                "https://docs.example.com/page",
            ]
        );
    }

    #[test]
    fn output_dir_name_encodes_host() {
        let url = Url::parse("https://docs.example.com/").unwrap();
        assert!(output_dir_name(&url).starts_with("docs_example_com_"));
    }

    #[tokio::test]
    async fn crawls_a_linked_site_breadth_first() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><head><title>Root</title></head><body><main>
                <h1>Root</h1><p>Welcome to the documentation site root page.</p>
                <a href="/page2">Page 2</a>
            </main></body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/page2",
            r#"<html><body><main>
                <h1>Page Two</h1><p>Second page body text.</p>
                <a href="/page3">Page 3</a>
            </main></body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/page3",
            r#"<html><body><main><h1>Page Three</h1><p>Leaf page.</p></main></body></html>"#,
        )
        .await;

        let out = tempfile::tempdir().expect("tempdir");
        let crawler = Crawler::new(test_config(3)).unwrap();
        let start = Url::parse(&server.uri()).unwrap();
        let outcome = crawler.crawl(&start, out.path()).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.pages_downloaded, 3);
        assert_eq!(outcome.pages_found, 2);
        assert!(outcome.errors.is_empty());

        // Per-page artifacts and site-level artifacts exist.
        assert!(outcome.output_dir.join("index.md").exists());
        assert!(outcome.output_dir.join("page2.chunks.json").exists());
        assert!(outcome.output_dir.join("page3.metadata.json").exists());
        assert!(outcome.output_dir.join("llms.txt").exists());
        assert!(outcome.output_dir.join("ai-sitemap.json").exists());
        assert!(outcome.output_dir.join("ai-summary.json").exists());
    }

    #[tokio::test]
    async fn depth_limit_fences_discovery() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><body><main><h1>Root</h1><a href="/page2">2</a></main></body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/page2",
            r#"<html><body><main><h1>Two</h1><a href="/page3">3</a></main></body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/page3",
            r#"<html><body><main><h1>Three</h1></main></body></html>"#,
        )
        .await;

        let out = tempfile::tempdir().expect("tempdir");
        let crawler = Crawler::new(test_config(1)).unwrap();
        let start = Url::parse(&server.uri()).unwrap();
        let outcome = crawler.crawl(&start, out.path()).await.unwrap();

        // Root (depth 0) and page2 (depth 1); page3 sits beyond the fence.
        assert_eq!(outcome.pages_downloaded, 2);
        assert!(!outcome.output_dir.join("page3.md").exists());
    }

    #[tokio::test]
    async fn one_page_site_end_to_end() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><head><title>Lone Page</title></head><body><main>
                <h1>Lone Page</h1><p>A single page with no outgoing links at all.</p>
            </main></body></html>"#,
        )
        .await;

        let out = tempfile::tempdir().expect("tempdir");
        let crawler = Crawler::new(test_config(0)).unwrap();
        let start = Url::parse(&server.uri()).unwrap();
        let outcome = crawler.crawl(&start, out.path()).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.pages_downloaded, 1);
        assert_eq!(outcome.pages_found, 0);

        // The persisted metadata record falls back to `general`.
        let metadata = std::fs::read_to_string(outcome.output_dir.join("index.metadata.json"))
            .expect("metadata record");
        let record: PageRecord = serde_json::from_str(&metadata).expect("valid record");
        assert_eq!(record.content_type, ContentType::General);
        assert!((0.0..=1.0).contains(&record.priority));
    }

    #[tokio::test]
    async fn fetch_errors_are_contained() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><body><main><h1>Root</h1>
                <a href="/missing">Broken</a><a href="/ok">Fine</a>
            </main></body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/ok",
            r#"<html><body><main><h1>Fine</h1><p>Still here.</p></main></body></html>"#,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let out = tempfile::tempdir().expect("tempdir");
        let crawler = Crawler::new(test_config(2)).unwrap();
        let start = Url::parse(&server.uri()).unwrap();
        let outcome = crawler.crawl(&start, out.path()).await.unwrap();

        // Partial success: the failed fetch is an error, not a failed crawl.
        assert!(outcome.is_success());
        assert_eq!(outcome.pages_downloaded, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("404"));
    }

    #[tokio::test]
    async fn cross_domain_links_are_not_followed() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><body><main><h1>Root</h1>
                <a href="https://external.invalid/page">External</a>
            </main></body></html>"#,
        )
        .await;

        let out = tempfile::tempdir().expect("tempdir");
        let crawler = Crawler::new(test_config(3)).unwrap();
        let start = Url::parse(&server.uri()).unwrap();
        let outcome = crawler.crawl(&start, out.path()).await.unwrap();

        assert_eq!(outcome.pages_downloaded, 1);
        assert_eq!(outcome.pages_found, 0);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn stop_requested_before_start_fetches_nothing() {
        let server = MockServer::start().await;
        mount_page(&server, "/", "<html><body><h1>R</h1></body></html>").await;

        let out = tempfile::tempdir().expect("tempdir");
        let crawler = Crawler::new(test_config(3)).unwrap();
        crawler.stop_handle().request_stop();

        let start = Url::parse(&server.uri()).unwrap();
        let outcome = crawler.crawl(&start, out.path()).await.unwrap();
        assert_eq!(outcome.pages_downloaded, 0);
    }

    #[tokio::test]
    async fn assets_are_downloaded_once_per_full_url() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><head><link rel="stylesheet" href="/style.css"></head>
               <body><main><h1>Root</h1><a href="/page2">2</a></main></body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/page2",
            r#"<html><head><link rel="stylesheet" href="/style.css"></head>
               <body><main><h1>Two</h1></main></body></html>"#,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/style.css"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("body { margin: 0 }", "text/css"))
            .expect(1)
            .mount(&server)
            .await;

        let out = tempfile::tempdir().expect("tempdir");
        let crawler = Crawler::new(test_config(2)).unwrap();
        let start = Url::parse(&server.uri()).unwrap();
        let outcome = crawler.crawl(&start, out.path()).await.unwrap();

        assert_eq!(outcome.pages_downloaded, 2);
        assert!(outcome.output_dir.join("style.css").exists());
    }

    #[tokio::test]
    async fn spec_document_emits_operations_artifact() {
        let server = MockServer::start().await;
        let spec = serde_json::json!({
            "openapi": "3.0.0",
            "info": { "title": "Tiny API", "version": "1.0.0" },
            "paths": {
                "/things": { "get": { "operationId": "listThings", "summary": "List" } }
            }
        });
        Mock::given(method("GET"))
            .and(path("/openapi.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(spec.to_string(), "application/json"),
            )
            .mount(&server)
            .await;

        let out = tempfile::tempdir().expect("tempdir");
        let crawler = Crawler::new(test_config(0)).unwrap();
        let start = Url::parse(&format!("{}/openapi.json", server.uri())).unwrap();
        let outcome = crawler.crawl(&start, out.path()).await.unwrap();

        let ops_path = outcome.output_dir.join("openapi.operations.json");
        assert!(ops_path.exists());
        let ops: crate::specdetect::OperationsDoc =
            serde_json::from_str(&std::fs::read_to_string(ops_path).unwrap()).unwrap();
        assert_eq!(ops.title, "Tiny API");
        assert_eq!(ops.operations[0].name, "listThings");
    }
}
