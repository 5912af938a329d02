//! Content extraction: raw HTML → clean structured views.
//!
//! Turns a fetched page into three coordinated outputs:
//! - a hierarchical [`SectionTree`] built from heading order,
//! - a flat Markdown rendering (via `htmd` plus a cleanup pipeline),
//! - a [`StructuredDoc`] JSON view with title, description, sections,
//!   code blocks, and partitioned links.
//!
//! Navigation chrome, scripts, styles, ads, and social widgets are excluded
//! by tag name and class/id keyword heuristics. The element tree is never
//! mutated; noise is filtered during traversal. Missing optional content
//! (no description, no code, no links) yields empty collections, never an
//! error.

mod cleanup;
mod code;
mod markdown;
mod sections;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

pub use code::CodeBlock;
pub use markdown::extract_markdown;
pub use sections::{SectionNode, SectionTree, SectionView};

/// Tags removed outright from every view.
const NOISE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "iframe", "form", "button",
    "input", "svg", "canvas", "video", "audio", "embed", "object",
];

/// Class/id substrings that mark an element as UI chrome.
const NOISE_KEYWORDS: &[&str] = &[
    "nav",
    "navigation",
    "menu",
    "sidebar",
    "footer",
    "header",
    "banner",
    "advertisement",
    "ads",
    "social",
    "share",
    "comment",
    "disqus",
    "modal",
    "popup",
    "overlay",
];

/// Heading tag names, outermost first.
pub(crate) const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

// ---------------------------------------------------------------------------
// StructuredDoc
// ---------------------------------------------------------------------------

/// Structured JSON view of an extracted page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredDoc {
    /// Source page URL.
    pub url: String,
    /// Title via fallback chain: `<title>` → first h1 → og:title.
    pub title: String,
    /// Description via fallback chain: meta description → og:description →
    /// first substantial paragraph. Empty when none found.
    #[serde(default)]
    pub description: String,
    /// Hierarchical sections in document order.
    pub sections: Vec<SectionView>,
    /// Block and meaningful inline code snippets.
    pub code_blocks: Vec<CodeBlock>,
    /// Same-host links, deduplicated, absolute form.
    pub internal_links: Vec<String>,
    /// Off-host links, deduplicated.
    pub external_links: Vec<String>,
}

impl StructuredDoc {
    /// Build the structured view from an already-parsed document.
    pub fn build(doc: &Html, url: &str) -> Self {
        let tree = SectionTree::from_html(doc);
        Self::with_sections(doc, url, &tree)
    }

    /// Build the structured view reusing a section tree the caller already has.
    pub fn with_sections(doc: &Html, url: &str, tree: &SectionTree) -> Self {
        let (internal_links, external_links) = extract_links(doc, url);
        let structured = Self {
            url: url.to_string(),
            title: extract_title(doc),
            description: extract_description(doc),
            sections: tree.to_views(),
            code_blocks: code::extract_code_blocks(doc),
            internal_links,
            external_links,
        };
        debug!(
            url,
            sections = structured.sections.len(),
            code_blocks = structured.code_blocks.len(),
            "structured extraction complete"
        );
        structured
    }
}

// ---------------------------------------------------------------------------
// Noise filtering
// ---------------------------------------------------------------------------

/// Whether a single element is navigation/script/ad chrome.
pub(crate) fn is_noise_element(el: &ElementRef) -> bool {
    let name = el.value().name();
    if NOISE_TAGS.contains(&name) {
        return true;
    }

    if let Some(class) = el.value().attr("class") {
        let class = class.to_ascii_lowercase();
        if NOISE_KEYWORDS.iter().any(|k| class.contains(k)) {
            return true;
        }
    }

    if let Some(id) = el.value().attr("id") {
        let id = id.to_ascii_lowercase();
        if NOISE_KEYWORDS.iter().any(|k| id.contains(k)) {
            return true;
        }
    }

    false
}

/// Whether an element or any of its ancestors is noise.
pub(crate) fn in_noise(el: &ElementRef) -> bool {
    if is_noise_element(el) {
        return true;
    }
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| is_noise_element(&a))
}

/// Visible text of an element, skipping noise descendants, whitespace-normalized.
pub(crate) fn clean_text(el: &ElementRef) -> String {
    let mut out = String::new();
    collect_text(el, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(el: &ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !is_noise_element(&child_el) {
                collect_text(&child_el, out);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Title & description fallback chains
// ---------------------------------------------------------------------------

/// Extract the page title: `<title>` → first `<h1>` → og:title → "Untitled Page".
pub fn extract_title(doc: &Html) -> String {
    let title_sel = Selector::parse("title").unwrap();
    if let Some(el) = doc.select(&title_sel).next() {
        let text = clean_text(&el);
        if !text.is_empty() {
            return text;
        }
    }

    let h1_sel = Selector::parse("h1").unwrap();
    if let Some(el) = doc.select(&h1_sel).next() {
        let text = clean_text(&el);
        if !text.is_empty() {
            return text;
        }
    }

    let og_sel = Selector::parse("meta[property=\"og:title\"]").unwrap();
    if let Some(el) = doc.select(&og_sel).next() {
        if let Some(content) = el.value().attr("content") {
            if !content.trim().is_empty() {
                return content.trim().to_string();
            }
        }
    }

    "Untitled Page".to_string()
}

/// Extract the page description: meta description → og:description →
/// first paragraph over 50 chars (truncated to 200). Empty when absent.
pub fn extract_description(doc: &Html) -> String {
    for sel_str in [
        "meta[name=\"description\"]",
        "meta[property=\"og:description\"]",
    ] {
        let sel = Selector::parse(sel_str).unwrap();
        if let Some(el) = doc.select(&sel).next() {
            if let Some(content) = el.value().attr("content") {
                if !content.trim().is_empty() {
                    return content.trim().to_string();
                }
            }
        }
    }

    let p_sel = Selector::parse("p").unwrap();
    for p in doc.select(&p_sel) {
        if in_noise(&p) {
            continue;
        }
        let text = clean_text(&p);
        if text.len() > 50 {
            return truncate_chars(&text, 200);
        }
    }

    String::new()
}

/// Truncate to `max` chars on a char boundary, appending "..." when cut.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

// ---------------------------------------------------------------------------
// Link extraction
// ---------------------------------------------------------------------------

/// Partition page links into (internal, external) by hostname comparison
/// against `base_url`, deduplicated in document order.
pub fn extract_links(doc: &Html, base_url: &str) -> (Vec<String>, Vec<String>) {
    let base = Url::parse(base_url).ok();
    let base_host = base
        .as_ref()
        .and_then(|u| u.host_str())
        .unwrap_or_default()
        .to_string();

    let a_sel = Selector::parse("a[href]").unwrap();
    let mut internal = Vec::new();
    let mut external = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for a in doc.select(&a_sel) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };

        if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("javascript:")
        {
            continue;
        }

        let resolved = if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if let Some(base) = &base {
            match base.join(href) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            }
        } else {
            href.to_string()
        };

        if !seen.insert(resolved.clone()) {
            continue;
        }

        let link_host = Url::parse(&resolved)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_default();

        if link_host.is_empty() || link_host == base_host {
            internal.push(resolved);
        } else {
            external.push(resolved);
        }
    }

    (internal, external)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn title_prefers_title_tag() {
        let doc = parse("<html><head><title>Doc Title</title></head><body><h1>Heading</h1></body></html>");
        assert_eq!(extract_title(&doc), "Doc Title");
    }

    #[test]
    fn title_falls_back_to_h1_then_og() {
        let doc = parse("<html><body><h1>From H1</h1></body></html>");
        assert_eq!(extract_title(&doc), "From H1");

        let doc = parse(
            "<html><head><meta property=\"og:title\" content=\"From OG\"></head><body><p>x</p></body></html>",
        );
        assert_eq!(extract_title(&doc), "From OG");

        let doc = parse("<html><body><p>nothing</p></body></html>");
        assert_eq!(extract_title(&doc), "Untitled Page");
    }

    #[test]
    fn description_fallback_chain() {
        let doc = parse(
            "<html><head><meta name=\"description\" content=\"Meta desc\"></head><body></body></html>",
        );
        assert_eq!(extract_description(&doc), "Meta desc");

        let long = "word ".repeat(20);
        let doc = parse(&format!("<html><body><p>{long}</p></body></html>"));
        assert!(extract_description(&doc).starts_with("word word"));

        let doc = parse("<html><body><p>short</p></body></html>");
        assert_eq!(extract_description(&doc), "");
    }

    #[test]
    fn description_truncates_long_paragraphs() {
        let long = "x".repeat(500);
        let doc = parse(&format!("<html><body><p>{long}</p></body></html>"));
        let desc = extract_description(&doc);
        assert!(desc.ends_with("..."));
        assert_eq!(desc.chars().count(), 203);
    }

    #[test]
    fn links_partition_by_host() {
        let html = r##"<html><body>
            <a href="/guide">Guide</a>
            <a href="https://docs.example.com/api">Api</a>
            <a href="https://other.com/page">Other</a>
            <a href="#frag">Anchor</a>
            <a href="mailto:x@example.com">Mail</a>
        </body></html>"##;
        let doc = parse(html);
        let (internal, external) = extract_links(&doc, "https://docs.example.com/start");

        assert_eq!(
            internal,
            vec![
                "https://docs.example.com/guide".to_string(),
                "https://docs.example.com/api".to_string(),
            ]
        );
        assert_eq!(external, vec!["https://other.com/page".to_string()]);
    }

    #[test]
    fn links_deduplicate() {
        let html = r##"<a href="/a">1</a><a href="/a">2</a>"##;
        let doc = parse(html);
        let (internal, _) = extract_links(&doc, "https://example.com/");
        assert_eq!(internal.len(), 1);
    }

    #[test]
    fn noise_elements_are_excluded_from_text() {
        let html = r#"<html><body><div>
            <p>Keep this.</p>
            <div class="sidebar-menu"><p>Drop this.</p></div>
        </div></body></html>"#;
        let doc = parse(html);
        let body_sel = Selector::parse("body").unwrap();
        let body = doc.select(&body_sel).next().unwrap();
        let text = clean_text(&body);
        assert!(text.contains("Keep this."));
        assert!(!text.contains("Drop this."));
    }

    #[test]
    fn structured_doc_empty_page_yields_empty_collections() {
        let doc = parse("<html><body></body></html>");
        let structured = StructuredDoc::build(&doc, "https://example.com/");
        assert!(structured.sections.is_empty());
        assert!(structured.code_blocks.is_empty());
        assert!(structured.internal_links.is_empty());
        assert!(structured.external_links.is_empty());
        assert_eq!(structured.description, "");
    }
}
