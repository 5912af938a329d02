//! schema.org-flavored JSON sitemap (`ai-sitemap.json`).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use docharvest_shared::PageRecord;

/// Keywords carried per page entity.
const KEYWORDS_PER_PAGE: usize = 5;

/// Top-level sitemap document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSitemap {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(rename = "dateCreated")]
    pub date_created: String,
    #[serde(rename = "mainEntity")]
    pub main_entity: Vec<PageEntity>,
}

/// One page entity in the sitemap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEntity {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub keywords: Vec<String>,
    #[serde(rename = "dateModified", skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
    #[serde(rename = "additionalProperty")]
    pub additional_property: Vec<PropertyValue>,
}

/// A named property on a page entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyValue {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    pub value: Value,
}

impl PropertyValue {
    fn new(name: &str, value: Value) -> Self {
        Self {
            kind: "PropertyValue".into(),
            name: name.into(),
            value,
        }
    }
}

/// Generate the JSON sitemap over all page records, in input order.
pub fn generate_ai_sitemap(pages: &[PageRecord], site_name: &str, base_url: &str) -> AiSitemap {
    let main_entity = pages
        .iter()
        .map(|page| PageEntity {
            kind: "WebPage".into(),
            name: page.title.clone(),
            url: page.url.clone(),
            description: page.description.clone(),
            keywords: page.keywords.iter().take(KEYWORDS_PER_PAGE).cloned().collect(),
            date_modified: page.last_updated.clone(),
            additional_property: vec![
                PropertyValue::new("contentType", json!(page.content_type.as_str())),
                PropertyValue::new("wordCount", json!(page.word_count)),
                PropertyValue::new("readingTime", json!(page.reading_time_minutes)),
                PropertyValue::new("aiPriority", json!(page.priority)),
            ],
        })
        .collect();

    AiSitemap {
        context: "https://schema.org".into(),
        kind: "SiteNavigationElement".into(),
        name: format!("{site_name} AI Sitemap"),
        description: "Machine-readable sitemap for AI agents and LLMs".into(),
        url: base_url.to_string(),
        date_created: Utc::now().to_rfc3339(),
        main_entity,
    }
}
