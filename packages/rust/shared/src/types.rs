//! Core domain types for DocHarvest corpora.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ContentType
// ---------------------------------------------------------------------------

/// Closed set of documentation genres assigned by keyword classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    ApiReference,
    Tutorial,
    Faq,
    HowTo,
    Reference,
    Conceptual,
    Troubleshooting,
    General,
}

impl ContentType {
    /// Snake-case identifier, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiReference => "api_reference",
            Self::Tutorial => "tutorial",
            Self::Faq => "faq",
            Self::HowTo => "how_to",
            Self::Reference => "reference",
            Self::Conceptual => "conceptual",
            Self::Troubleshooting => "troubleshooting",
            Self::General => "general",
        }
    }

    /// Human-readable label ("api_reference" → "Api Reference").
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Base weight for priority scoring. ApiReference ranks highest.
    pub fn base_weight(&self) -> f32 {
        match self {
            Self::ApiReference => 1.0,
            Self::HowTo => 0.9,
            Self::Tutorial => 0.8,
            Self::Reference => 0.7,
            Self::Faq => 0.6,
            Self::Troubleshooting => 0.6,
            Self::Conceptual => 0.5,
            Self::General => 0.3,
        }
    }

    /// All variants, in priority-weight order.
    pub fn all() -> &'static [ContentType] {
        &[
            Self::ApiReference,
            Self::HowTo,
            Self::Tutorial,
            Self::Reference,
            Self::Faq,
            Self::Troubleshooting,
            Self::Conceptual,
            Self::General,
        ]
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// Per-page output formats a crawl can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw fetched HTML.
    Html,
    /// Cleaned Markdown rendering.
    Markdown,
    /// Structured JSON view (sections, code blocks, links).
    Json,
    /// Retrieval chunk list.
    Chunks,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "chunks" => Ok(Self::Chunks),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// PageRecord
// ---------------------------------------------------------------------------

/// Metadata record for a single fetched HTML page.
///
/// Created once per successfully fetched page and immutable afterwards;
/// persisted as `<page>.metadata.json` and consumed by the navigation
/// artifact generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// Original page URL.
    pub url: String,
    /// Page title (extracted with fallback chain).
    pub title: String,
    /// Page description, empty when none could be extracted.
    #[serde(default)]
    pub description: String,
    /// Classified documentation genre.
    pub content_type: ContentType,
    /// Taxonomy tags grouped by facet (framework, language, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub taxonomies: BTreeMap<String, Vec<String>>,
    /// API endpoint paths discovered in the page body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_endpoints: Vec<String>,
    /// Top keywords by frequency.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Word count of the visible page text.
    pub word_count: usize,
    /// Number of `<pre>`/`<code>` elements.
    pub code_block_count: usize,
    /// Number of heading elements.
    pub heading_count: usize,
    /// Number of anchor elements with an href.
    pub link_count: usize,
    /// Number of `<img>` elements.
    pub image_count: usize,
    /// Last-updated date string, verbatim from the page when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Estimated reading time in minutes (≥ 1).
    pub reading_time_minutes: usize,
    /// Priority score in `[0, 1]`.
    pub priority: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_serializes_snake_case() {
        let json = serde_json::to_string(&ContentType::ApiReference).expect("serialize");
        assert_eq!(json, "\"api_reference\"");
        let parsed: ContentType = serde_json::from_str("\"how_to\"").expect("deserialize");
        assert_eq!(parsed, ContentType::HowTo);
    }

    #[test]
    fn content_type_label() {
        assert_eq!(ContentType::ApiReference.label(), "Api Reference");
        assert_eq!(ContentType::General.label(), "General");
    }

    #[test]
    fn base_weights_are_bounded() {
        for ct in ContentType::all() {
            let w = ct.base_weight();
            assert!((0.3..=1.0).contains(&w), "{ct} weight {w} out of band");
        }
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("markdown".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert_eq!("md".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn page_record_roundtrip() {
        let record = PageRecord {
            url: "https://docs.example.com/api".into(),
            title: "API Reference".into(),
            description: "Endpoints and parameters.".into(),
            content_type: ContentType::ApiReference,
            taxonomies: BTreeMap::from([("language".into(), vec!["rust".into()])]),
            api_endpoints: vec!["/api/users".into()],
            keywords: vec!["endpoint".into(), "request".into()],
            word_count: 1200,
            code_block_count: 8,
            heading_count: 12,
            link_count: 30,
            image_count: 0,
            last_updated: Some("2024-03-01T12:00:00Z".into()),
            reading_time_minutes: 6,
            priority: 1.0,
        };

        let json = serde_json::to_string_pretty(&record).expect("serialize");
        let parsed: PageRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.content_type, ContentType::ApiReference);
        assert_eq!(parsed.api_endpoints.len(), 1);
        assert_eq!(parsed.priority, 1.0);
    }
}
