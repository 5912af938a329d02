//! Code block extraction with surrounding context.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::{HEADING_TAGS, clean_text, in_noise, truncate_chars};

/// Inline snippets shorter than this are ignored.
const MIN_INLINE_LEN: usize = 10;

/// How many steps backwards (previous sibling, then parent) to search for
/// a contextual heading or paragraph.
const CONTEXT_LOOKBACK: usize = 5;

/// A code block or meaningful inline snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Language hint from a `language-*` class, "text" for inline snippets,
    /// empty when no hint was present.
    #[serde(default)]
    pub language: String,
    /// The code text.
    pub code: String,
    /// Nearest preceding heading and/or paragraph, for retrieval context.
    pub context: String,
    pub line_count: usize,
    pub character_count: usize,
}

/// Extract all `<pre><code>` blocks plus meaningful inline `<code>` snippets.
pub fn extract_code_blocks(doc: &Html) -> Vec<CodeBlock> {
    let pre_sel = Selector::parse("pre").unwrap();
    let code_sel = Selector::parse("code").unwrap();

    let mut blocks = Vec::new();

    for pre in doc.select(&pre_sel) {
        if in_noise(&pre) {
            continue;
        }
        let Some(code_el) = pre.select(&code_sel).next() else {
            continue;
        };

        let code = code_el.text().collect::<String>().trim().to_string();
        if code.is_empty() {
            continue;
        }

        blocks.push(CodeBlock {
            language: language_hint(&code_el),
            line_count: code.lines().count().max(1),
            character_count: code.chars().count(),
            context: code_context(&pre),
            code,
        });
    }

    // Inline snippets: <code> outside <pre>, long enough to be meaningful.
    for code_el in doc.select(&code_sel) {
        if in_noise(&code_el) {
            continue;
        }
        let parent_is_pre = code_el
            .parent()
            .and_then(ElementRef::wrap)
            .map(|p| p.value().name() == "pre")
            .unwrap_or(false);
        if parent_is_pre {
            continue;
        }

        let code = code_el.text().collect::<String>().trim().to_string();
        if code.chars().count() <= MIN_INLINE_LEN {
            continue;
        }

        blocks.push(CodeBlock {
            language: "text".to_string(),
            line_count: 1,
            character_count: code.chars().count(),
            context: code_context(&code_el),
            code,
        });
    }

    blocks
}

/// Language from a `language-*` class on the code element.
fn language_hint(code_el: &ElementRef) -> String {
    code_el
        .value()
        .attr("class")
        .and_then(|classes| {
            classes
                .split_whitespace()
                .find_map(|c| c.strip_prefix("language-"))
        })
        .unwrap_or_default()
        .to_string()
}

/// Contextual text for a code element: the nearest preceding heading and/or
/// substantial paragraph within a few steps back through the tree.
fn code_context(el: &ElementRef) -> String {
    let mut parts = Vec::new();

    if let Some(heading) = find_back(el, |e| HEADING_TAGS.contains(&e.value().name())) {
        let text = clean_text(&heading);
        if !text.is_empty() {
            parts.push(format!("Section: {text}"));
        }
    }

    if let Some(para) = find_back(el, |e| e.value().name() == "p" && clean_text(e).len() > 20) {
        parts.push(format!("Context: {}", truncate_chars(&clean_text(&para), 100)));
    }

    if parts.is_empty() {
        "No context available".to_string()
    } else {
        parts.join(" | ")
    }
}

/// Walk backwards (previous sibling, falling back to parent) up to
/// [`CONTEXT_LOOKBACK`] steps, returning the first element matching `pred`.
fn find_back<'a, F>(start: &ElementRef<'a>, pred: F) -> Option<ElementRef<'a>>
where
    F: Fn(&ElementRef<'a>) -> bool,
{
    let mut current = start.prev_sibling().or_else(|| start.parent());

    for _ in 0..CONTEXT_LOOKBACK {
        let node = current?;
        if let Some(el) = ElementRef::wrap(node) {
            if pred(&el) {
                return Some(el);
            }
        }
        current = node.prev_sibling().or_else(|| node.parent());
    }

    None
}
