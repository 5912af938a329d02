//! Page metadata generation and priority scoring.
//!
//! Classifies each fetched page into a closed set of documentation genres,
//! tags it with taxonomy facets and keywords, and assigns a `[0, 1]`
//! priority score used to order the generated navigation artifacts. The
//! analyzer depends only on the raw page markup; it knows nothing about
//! crawling, chunking, or indexing.

mod classify;
mod score;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use docharvest_shared::PageRecord;

pub use classify::classify_content_type;
pub use score::priority_score;

/// Average reading speed used for the reading-time estimate.
const WORDS_PER_MINUTE: usize = 200;

/// Taxonomy facets and the keywords that populate them.
const TAXONOMY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "framework",
        &["react", "vue", "angular", "django", "flask", "fastapi", "express", "axum", "rails"],
    ),
    (
        "language",
        &["python", "javascript", "typescript", "java", "rust", "c++", "php"],
    ),
    (
        "database",
        &["postgresql", "mysql", "mongodb", "redis", "sqlite", "oracle"],
    ),
    (
        "cloud",
        &["aws", "azure", "gcp", "heroku", "vercel", "netlify", "docker"],
    ),
    (
        "tool",
        &["git", "npm", "yarn", "webpack", "babel", "eslint", "prettier", "cargo"],
    ),
    (
        "platform",
        &["linux", "macos", "windows", "ios", "android", "web"],
    ),
];

/// Stop words excluded from keyword extraction.
const STOP_WORDS: &[&str] = &[
    "that", "with", "have", "this", "will", "your", "from", "they", "know", "want", "been",
    "good", "much", "some", "time", "very", "when", "come", "here", "just", "like", "long",
    "make", "many", "over", "such", "take", "than", "them", "well", "were", "what", "which",
    "their", "there", "would", "about", "into", "more", "other", "these", "then", "also",
];

// ---------------------------------------------------------------------------
// Page analysis
// ---------------------------------------------------------------------------

/// Analyze a fetched HTML page into an immutable [`PageRecord`].
///
/// `title` and `description` are supplied by the extractor so both views of
/// a page agree; everything else is derived here from the markup.
pub fn analyze_page(doc: &Html, url: &str, title: &str, description: &str) -> PageRecord {
    let text = visible_text(doc);
    let classification_input = format!("{title} {description} {text}");

    let content_type = classify_content_type(&classification_input);
    let word_count = text.split_whitespace().count();
    let code_block_count = count_matches(doc, "pre, code");
    let last_updated = extract_last_updated(doc);

    let mut record = PageRecord {
        url: url.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        content_type,
        taxonomies: extract_taxonomies(&text, title, url),
        api_endpoints: extract_api_endpoints(&text),
        keywords: extract_keywords(&text),
        word_count,
        code_block_count,
        heading_count: count_matches(doc, "h1, h2, h3, h4, h5, h6"),
        link_count: count_matches(doc, "a[href]"),
        image_count: count_matches(doc, "img"),
        last_updated,
        reading_time_minutes: reading_time(word_count),
        priority: 0.0,
    };
    record.priority = priority_score(&record);

    debug!(
        url,
        content_type = %record.content_type,
        word_count,
        priority = record.priority,
        "page analyzed"
    );
    record
}

/// Estimated reading time in whole minutes, at least one.
pub fn reading_time(word_count: usize) -> usize {
    ((word_count as f64 / WORDS_PER_MINUTE as f64).round() as usize).max(1)
}

// ---------------------------------------------------------------------------
// Text & counting helpers
// ---------------------------------------------------------------------------

fn count_matches(doc: &Html, selector: &str) -> usize {
    let sel = Selector::parse(selector).unwrap();
    doc.select(&sel).count()
}

/// All visible text in the document, excluding script/style content,
/// whitespace-normalized.
fn visible_text(doc: &Html) -> String {
    let mut out = String::new();
    collect_visible(&doc.root_element(), &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_visible(el: &ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !matches!(child_el.value().name(), "script" | "style" | "noscript") {
                collect_visible(&child_el, out);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Taxonomies, keywords, endpoints
// ---------------------------------------------------------------------------

/// Taxonomy facets matched by keyword presence, plus version numbers found
/// in the URL or title.
fn extract_taxonomies(text: &str, title: &str, url: &str) -> BTreeMap<String, Vec<String>> {
    static VERSION_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\bv?\d+\.\d+(?:\.\d+)?\b").expect("valid regex"));

    let haystack = format!("{title} {text}").to_lowercase();
    let mut taxonomies = BTreeMap::new();

    for (facet, keywords) in TAXONOMY_KEYWORDS {
        let matches: Vec<String> = keywords
            .iter()
            .filter(|kw| haystack.contains(*kw))
            .map(|kw| kw.to_string())
            .collect();
        if !matches.is_empty() {
            taxonomies.insert(facet.to_string(), matches);
        }
    }

    let version_haystack = format!("{url} {title}");
    let versions: Vec<String> = VERSION_RE
        .find_iter(&version_haystack)
        .map(|m| m.as_str().to_string())
        .collect();
    if !versions.is_empty() {
        taxonomies.insert("version".to_string(), dedup_in_order(versions));
    }

    taxonomies
}

/// API endpoint paths: bare `/api/..` paths and method-prefixed routes.
fn extract_api_endpoints(text: &str) -> Vec<String> {
    static PATH_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"/api/[a-zA-Z0-9_/{}?-]+").expect("valid regex"));
    static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?:GET|POST|PUT|DELETE|PATCH)\s+(/[a-zA-Z0-9_/{}?-]+)")
            .expect("valid regex")
    });

    let mut endpoints: Vec<String> = Vec::new();
    endpoints.extend(
        PATH_RE
            .find_iter(text)
            .take(10)
            .map(|m| m.as_str().to_string()),
    );
    endpoints.extend(
        METHOD_RE
            .captures_iter(text)
            .take(10)
            .map(|c| c[1].to_string()),
    );

    dedup_in_order(endpoints)
}

/// Top keywords by frequency: alphabetic words of four-plus characters,
/// stop words removed, ties broken by first occurrence.
fn extract_keywords(text: &str) -> Vec<String> {
    static WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{4,}\b").expect("valid regex"));

    let mut counts: Vec<(String, usize)> = Vec::new();
    for word in WORD_RE.find_iter(&text.to_lowercase()) {
        let word = word.as_str();
        if STOP_WORDS.contains(&word) {
            continue;
        }
        match counts.iter_mut().find(|(w, _)| w == word) {
            Some((_, n)) => *n += 1,
            None => counts.push((word.to_string(), 1)),
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(20).map(|(w, _)| w).collect()
}

fn dedup_in_order(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| {
            let v = v.trim();
            !v.is_empty() && seen.insert(v.to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Last-updated extraction
// ---------------------------------------------------------------------------

/// Last-updated date string from common meta tags or `<time>` elements,
/// verbatim. `None` when the page carries no date.
fn extract_last_updated(doc: &Html) -> Option<String> {
    let meta_selectors = [
        "meta[name=\"last-modified\"]",
        "meta[property=\"article:modified_time\"]",
        "meta[name=\"revised\"]",
    ];

    for sel_str in meta_selectors {
        let sel = Selector::parse(sel_str).unwrap();
        if let Some(el) = doc.select(&sel).next() {
            if let Some(content) = el.value().attr("content") {
                if !content.trim().is_empty() {
                    return Some(content.trim().to_string());
                }
            }
        }
    }

    let time_sel = Selector::parse("time").unwrap();
    for el in doc.select(&time_sel) {
        if let Some(dt) = el.value().attr("datetime") {
            if !dt.trim().is_empty() {
                return Some(dt.trim().to_string());
            }
        }
        let text = el.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            return Some(text);
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
