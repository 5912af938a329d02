//! Post-conversion cleanup pipeline for Markdown output.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The pipeline normalizes blank lines, code fences, leftover HTML, and
//! links.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut result = md.to_string();

    result = collapse_blank_lines(&result);
    result = fix_fence_language_prefixes(&result);
    result = detect_untagged_fence_languages(&result);
    result = strip_html_comments(&result);
    result = strip_leftover_html(&result);
    result = resolve_links(&result, base_url);
    result = normalize_whitespace(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Collapse excessive blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 2+ blank lines into exactly one.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Fix fence language prefixes
// ---------------------------------------------------------------------------

/// Rewrite class-derived fence hints like `language-js` or `highlight-rust`
/// to the bare language name.
fn fix_fence_language_prefixes(md: &str) -> String {
    static LANG_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)(\w+)").expect("valid regex")
    });

    LANG_PREFIX_RE.replace_all(md, "```$1").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Detect languages for untagged fences
// ---------------------------------------------------------------------------

/// Guess a language for fences with no hint, from the code content itself.
///
/// Line-based so a closing fence is never mistaken for an opening one.
fn detect_untagged_fence_languages(md: &str) -> String {
    let mut out = String::new();
    let mut untagged: Option<Vec<&str>> = None;
    let mut in_tagged = false;

    for line in md.lines() {
        let trimmed = line.trim_start();

        // Collecting an untagged block: emit it with a guess at the close.
        if let Some(lines) = untagged.take() {
            if trimmed == "```" {
                let code = lines.join("\n");
                out.push_str("```");
                out.push_str(guess_language(&code));
                out.push('\n');
                for code_line in &lines {
                    out.push_str(code_line);
                    out.push('\n');
                }
                out.push_str(line);
                out.push('\n');
            } else {
                let mut lines = lines;
                lines.push(line);
                untagged = Some(lines);
            }
            continue;
        }

        if in_tagged {
            if trimmed.starts_with("```") {
                in_tagged = false;
            }
            out.push_str(line);
            out.push('\n');
            continue;
        }

        if trimmed == "```" {
            untagged = Some(Vec::new());
        } else {
            if trimmed.starts_with("```") {
                in_tagged = true;
            }
            out.push_str(line);
            out.push('\n');
        }
    }

    // Unclosed fence at EOF: emit verbatim.
    if let Some(lines) = untagged {
        out.push_str("```\n");
        for code_line in lines {
            out.push_str(code_line);
            out.push('\n');
        }
    }

    if !md.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Cheap content-based language heuristic. Empty when nothing matches.
fn guess_language(code: &str) -> &'static str {
    let lower = code.to_ascii_lowercase();

    if ["def ", "import ", "from ", "class "]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        "python"
    } else if ["function", "const ", "let ", "var "]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        "javascript"
    } else if ["<html", "<div", "<span"].iter().any(|kw| code.contains(kw)) {
        "html"
    } else if ["SELECT", "FROM", "WHERE"].iter().any(|kw| code.contains(kw)) {
        "sql"
    } else {
        ""
    }
}

// ---------------------------------------------------------------------------
// Pass 4: Strip HTML comments
// ---------------------------------------------------------------------------

fn strip_html_comments(md: &str) -> String {
    static COMMENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

    COMMENT_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Strip leftover HTML tags
// ---------------------------------------------------------------------------

/// Remove stray container tags that survived conversion, preserving their
/// inner text. Fenced code blocks are left untouched.
fn strip_leftover_html(md: &str) -> String {
    let mut result = String::new();
    let mut in_code_block = false;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            result.push_str(line);
            result.push('\n');
            continue;
        }

        if in_code_block {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        result.push_str(&strip_html_tags(line));
        result.push('\n');
    }

    if result.ends_with('\n') {
        result.pop();
    }

    result
}

fn strip_html_tags(line: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary)(?:\s[^>]*)?>").expect("valid regex")
    });

    HTML_TAG_RE.replace_all(line, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 6: Resolve relative links
// ---------------------------------------------------------------------------

/// Resolve relative URLs in Markdown links against a base URL.
fn resolve_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let full_match = caps.get(0).unwrap();
            let text = &caps[1];
            let href = &caps[2];

            // Image links ![alt](url) are left as-is.
            let start = full_match.start();
            if start > 0 && md.as_bytes()[start - 1] == b'!' {
                return caps[0].to_string();
            }

            if href.starts_with("http://")
                || href.starts_with("https://")
                || href.starts_with('#')
                || href.starts_with("mailto:")
            {
                return format!("[{text}]({href})");
            }

            match base.join(href) {
                Ok(resolved) => format!("[{text}]({resolved})"),
                Err(_) => format!("[{text}]({href})"),
            }
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 7: Whitespace normalization
// ---------------------------------------------------------------------------

fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ensure the text ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_blank_lines_reduces_runs() {
        let input = "Line 1\n\n\n\n\nLine 2";
        assert_eq!(collapse_blank_lines(input), "Line 1\n\nLine 2");
    }

    #[test]
    fn collapse_blank_lines_keeps_single_separator() {
        let input = "Line 1\n\nLine 2";
        assert_eq!(collapse_blank_lines(input), input);
    }

    #[test]
    fn fence_prefix_is_stripped() {
        let input = "```language-javascript\nconsole.log('hi');\n```";
        let result = fix_fence_language_prefixes(input);
        assert!(result.starts_with("```javascript"));
    }

    #[test]
    fn untagged_fence_gets_detected_language() {
        let input = "```\ndef main():\n    pass\n```";
        let result = detect_untagged_fence_languages(input);
        assert!(result.starts_with("```python"));

        let input = "```\nSELECT * FROM users WHERE id = 1\n```";
        let result = detect_untagged_fence_languages(input);
        assert!(result.starts_with("```sql"));
    }

    #[test]
    fn unrecognized_code_stays_untagged() {
        let input = "```\nsome plain output\n```";
        let result = detect_untagged_fence_languages(input);
        assert!(result.starts_with("```\n"));
    }

    #[test]
    fn prose_between_fences_is_not_retagged() {
        let input = "```rust\nlet a = 1;\n```\n\nconst notes here\n\n```\nplain\n```";
        let result = detect_untagged_fence_languages(input);
        // The prose line containing "const " must not become a fence tag.
        assert!(result.contains("\nconst notes here\n"));
        assert!(result.contains("```rust"));
    }

    #[test]
    fn html_comments_are_removed() {
        let input = "before <!-- hidden\nnote --> after";
        assert_eq!(strip_html_comments(input), "before  after");
    }

    #[test]
    fn leftover_div_tags_are_stripped() {
        let input = "# Title\n\n<div class=\"note\">Important info</div>\n\nMore text";
        let result = strip_leftover_html(input);
        assert!(result.contains("Important info"));
        assert!(!result.contains("<div"));
    }

    #[test]
    fn code_blocks_keep_their_html() {
        let input = "# Title\n\n```html\n<div>Preserved</div>\n```\n\nText";
        let result = strip_leftover_html(input);
        assert!(result.contains("<div>Preserved</div>"));
    }

    #[test]
    fn relative_links_resolve() {
        let base = Url::parse("https://docs.example.com/guide/intro").unwrap();
        let input = "[Next](/api/reference)";
        assert_eq!(
            resolve_links(input, Some(&base)),
            "[Next](https://docs.example.com/api/reference)"
        );
    }

    #[test]
    fn absolute_and_anchor_links_untouched() {
        let base = Url::parse("https://docs.example.com/page").unwrap();
        assert_eq!(
            resolve_links("[Link](https://other.com/page)", Some(&base)),
            "[Link](https://other.com/page)"
        );
        assert_eq!(
            resolve_links("[Section](#section-1)", Some(&base)),
            "[Section](#section-1)"
        );
    }

    #[test]
    fn full_pipeline_cleans_markdown() {
        let input = "# Title\n\n\n\n\n\n## Section\n\n<div>Some content</div>\n\n```language-python\nprint('hi')\n```\n\nEnd";
        let base = Url::parse("https://example.com/page").unwrap();
        let result = run_pipeline(input, Some(&base));

        assert!(!result.contains("\n\n\n"));
        assert!(result.contains("```python"));
        assert!(!result.contains("<div>"));
        assert!(result.contains("Some content"));
        assert!(result.ends_with('\n'));
    }
}
