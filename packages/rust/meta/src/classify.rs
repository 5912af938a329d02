//! Content-type classification by keyword-pattern scoring.

use std::sync::LazyLock;

use regex::Regex;

use docharvest_shared::ContentType;

/// Minimum total matches before a type is assigned instead of `General`.
const MIN_MATCHES: usize = 2;

/// Per-type keyword patterns, in tie-break order.
static CONTENT_PATTERNS: LazyLock<Vec<(ContentType, Vec<Regex>)>> = LazyLock::new(|| {
    let table: &[(ContentType, &[&str])] = &[
        (
            ContentType::ApiReference,
            &[
                r"api\s+reference",
                r"api\s+docs",
                r"api\s+documentation",
                r"endpoint",
                r"method",
                r"parameter",
                r"response",
                r"authentication",
                r"authorization",
            ],
        ),
        (
            ContentType::Tutorial,
            &[
                r"tutorial",
                r"getting\s+started",
                r"guide",
                r"walkthrough",
                r"learn",
                r"beginner",
                r"introduction",
                r"quick\s+start",
            ],
        ),
        (
            ContentType::Faq,
            &[
                r"faq",
                r"frequently\s+asked",
                r"questions?",
                r"common\s+issues",
                r"help",
                r"support",
            ],
        ),
        (
            ContentType::HowTo,
            &[
                r"how\s+to",
                r"install",
                r"setup",
                r"configure",
                r"deploy",
                r"build",
                r"create",
                r"implement",
            ],
        ),
        (
            ContentType::Reference,
            &[
                r"reference",
                r"glossary",
                r"terminology",
                r"dictionary",
                r"syntax",
                r"specification",
                r"standard",
            ],
        ),
        (
            ContentType::Conceptual,
            &[
                r"concepts?",
                r"overview",
                r"architecture",
                r"design",
                r"understanding",
                r"background",
                r"theory",
            ],
        ),
        (
            ContentType::Troubleshooting,
            &[
                r"troubleshoot",
                r"debug",
                r"error",
                r"fix",
                r"problem",
                r"issue",
                r"solution",
                r"resolve",
            ],
        ),
    ];

    table
        .iter()
        .map(|(ct, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
                .collect();
            (*ct, compiled)
        })
        .collect()
});

/// Classify page text into a [`ContentType`].
///
/// Each type scores the total number of keyword-pattern matches over the
/// text; the highest scorer wins if it reaches [`MIN_MATCHES`], otherwise
/// the page is `General`. Ties go to the earlier type in the table.
pub fn classify_content_type(text: &str) -> ContentType {
    let mut best = ContentType::General;
    let mut best_score = 0usize;

    for (content_type, patterns) in CONTENT_PATTERNS.iter() {
        let score: usize = patterns.iter().map(|p| p.find_iter(text).count()).sum();
        if score > best_score {
            best = *content_type;
            best_score = score;
        }
    }

    if best_score >= MIN_MATCHES {
        best
    } else {
        ContentType::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_api_reference() {
        let text = "API reference for every endpoint. Each method takes a parameter \
                    and returns a response after authentication.";
        assert_eq!(classify_content_type(text), ContentType::ApiReference);
    }

    #[test]
    fn classifies_tutorial() {
        let text = "Getting started tutorial: a beginner walkthrough to learn the basics.";
        assert_eq!(classify_content_type(text), ContentType::Tutorial);
    }

    #[test]
    fn classifies_troubleshooting() {
        let text = "Debug the error, find the problem, apply the fix, resolve the issue.";
        assert_eq!(classify_content_type(text), ContentType::Troubleshooting);
    }

    #[test]
    fn single_match_is_not_enough() {
        // One lone keyword hit falls back to General.
        assert_eq!(classify_content_type("a glossary of terms"), ContentType::General);
    }

    #[test]
    fn no_keywords_means_general() {
        assert_eq!(
            classify_content_type("migratory birds of the northern hemisphere"),
            ContentType::General
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let text = "TUTORIAL: GETTING STARTED";
        assert_eq!(classify_content_type(text), ContentType::Tutorial);
    }
}
