//! Flat Markdown rendering of the cleaned content subtree.
//!
//! Conversion goes through `htmd` with chrome tags skipped, then the
//! [`cleanup`](crate::cleanup) pipeline normalizes fences, links, and
//! whitespace.

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use docharvest_shared::{HarvestError, Result};

use crate::cleanup;

/// Content container selectors, tried in priority order.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "[role=\"main\"]",
    ".main-content",
    ".content",
    ".documentation",
    ".docs-content",
    ".article-content",
    ".post-content",
    "article",
    ".entry-content",
];

/// Convert a raw HTML page to clean Markdown.
///
/// Relative links are resolved against `base_url` when provided. Pages with
/// no recognizable content container fall back to `<body>`, then to the
/// whole document.
pub fn extract_markdown(html: &str, base_url: Option<&Url>) -> Result<String> {
    let content_html = content_html(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "script", "style", "nav", "iframe", "noscript", "svg", "header", "footer", "aside",
            "form", "button",
        ])
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| HarvestError::parse(format!("markdown conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    Ok(cleanup::run_pipeline(&raw_markdown, base_url))
}

/// Pick the main content region, stripping page chrome by omission.
fn content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    for sel_str in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                return el.inner_html();
            }
        }
    }

    if let Ok(body_sel) = Selector::parse("body") {
        if let Some(body) = doc.select(&body_sel).next() {
            return body.inner_html();
        }
    }

    html.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_simple_page() {
        let html =
            "<html><body><main><h1>Hello World</h1><p>Some text.</p></main></body></html>";
        let md = extract_markdown(html, None).unwrap();
        assert!(md.contains("# Hello World"));
        assert!(md.contains("Some text."));
    }

    #[test]
    fn strips_nav_and_footer() {
        let html = r#"<html><body>
            <nav><a href="/">Home</a></nav>
            <main><h1>Content</h1><p>Important text.</p></main>
            <footer><p>Copyright 2024</p></footer>
        </body></html>"#;
        let md = extract_markdown(html, None).unwrap();
        assert!(md.contains("Important text."));
        assert!(!md.contains("Copyright 2024"));
    }

    #[test]
    fn preserves_code_fences() {
        let html = r#"<html><body><main>
            <pre><code class="language-rust">fn main() {}</code></pre>
        </main></body></html>"#;
        let md = extract_markdown(html, None).unwrap();
        assert!(md.contains("```rust"));
        assert!(md.contains("fn main() {}"));
    }

    #[test]
    fn resolves_relative_links_against_base() {
        let html = r#"<html><body><main>
            <p><a href="/api/reference">API</a></p>
        </main></body></html>"#;
        let base = Url::parse("https://docs.example.com/guide/intro").unwrap();
        let md = extract_markdown(html, Some(&base)).unwrap();
        assert!(md.contains("(https://docs.example.com/api/reference)"));
    }

    #[test]
    fn falls_back_to_body_without_main() {
        let html = "<html><body><h1>Direct Body</h1><p>Content in body.</p></body></html>";
        let md = extract_markdown(html, None).unwrap();
        assert!(md.contains("Direct Body"));
        assert!(md.contains("Content in body."));
    }
}
