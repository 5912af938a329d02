//! Site-level artifact generation.
//!
//! From the set of per-page metadata records, generates:
//! - `llms.txt` — a line-oriented navigation document for agents,
//! - `ai-sitemap.json` — a schema.org-flavored sitemap of page entities,
//! - `ai-summary.json` — aggregate statistics for the crawl.
//!
//! Pages are ordered everywhere by their priority score, descending; it is
//! the sole ordering key.

mod sitemap;
mod summary;

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;

use docharvest_shared::{ContentType, PageRecord};

pub use sitemap::{AiSitemap, PageEntity, PropertyValue, generate_ai_sitemap};
pub use summary::{SummaryReport, TypeBreakdown, generate_summary};

/// Endpoints listed per API page in `llms.txt`.
const ENDPOINTS_PER_PAGE: usize = 5;

// ---------------------------------------------------------------------------
// llms.txt
// ---------------------------------------------------------------------------

/// Generate the `llms.txt` navigation document.
pub fn generate_llms_txt(pages: &[PageRecord], site_name: &str, base_url: &str) -> String {
    let sorted = sort_by_priority(pages);

    let content = format!(
        "# {site_name} Documentation\n\
         \n\
         This is a machine-readable sitemap for AI agents and LLMs to efficiently discover and navigate the documentation.\n\
         \n\
         ## Site Information\n\
         - **Base URL**: {base_url}\n\
         - **Total Pages**: {total_pages}\n\
         - **Last Updated**: {last_updated}\n\
         - **Generated**: {generated_at}\n\
         \n\
         ## Content Types\n\
         {type_summary}\n\
         \n\
         ## Priority Pages\n\
         {priority_pages}\n\
         \n\
         ## All Pages\n\
         {page_list}\n\
         \n\
         ## API Endpoints\n\
         {api_endpoints}\n\
         \n\
         ## Search Tips\n\
         - Use the priority pages for high-level understanding\n\
         - Reference pages are good for specific features\n\
         - API documentation is best for technical implementation\n\
         - Tutorial pages provide step-by-step guidance\n",
        total_pages = pages.len(),
        last_updated = latest_update(pages).unwrap_or_else(|| "unknown".into()),
        generated_at = Utc::now().to_rfc3339(),
        type_summary = type_summary(pages),
        priority_pages = priority_list(&sorted),
        page_list = page_list(&sorted),
        api_endpoints = api_endpoint_summary(pages),
    );

    debug!(pages = pages.len(), "llms.txt generated");
    content
}

/// Content-type counts, most common first.
fn type_summary(pages: &[PageRecord]) -> String {
    let mut counts: BTreeMap<ContentType, usize> = BTreeMap::new();
    for page in pages {
        *counts.entry(page.content_type).or_default() += 1;
    }

    let mut entries: Vec<(ContentType, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    entries
        .iter()
        .map(|(ct, n)| format!("- **{}**: {n} pages", ct.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered top-10 priority list.
fn priority_list(sorted: &[&PageRecord]) -> String {
    sorted
        .iter()
        .take(10)
        .enumerate()
        .map(|(i, page)| {
            format!(
                "{}. **{}** ({}) - {}",
                i + 1,
                page.title,
                spaced(page.content_type),
                page.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full page list, priority order.
fn page_list(sorted: &[&PageRecord]) -> String {
    sorted
        .iter()
        .map(|page| format!("- [{}]({}) - {}", page.title, page.url, spaced(page.content_type)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// API operation summaries from api_reference pages.
fn api_endpoint_summary(pages: &[PageRecord]) -> String {
    let api_pages: Vec<&PageRecord> = pages
        .iter()
        .filter(|p| p.content_type == ContentType::ApiReference)
        .collect();

    if api_pages.is_empty() {
        return "No dedicated API documentation pages found.".to_string();
    }

    let mut lines = Vec::new();
    for page in &api_pages {
        if page.api_endpoints.is_empty() {
            continue;
        }
        lines.push(format!("- **{}**: {}", page.title, page.url));
        for endpoint in page.api_endpoints.iter().take(ENDPOINTS_PER_PAGE) {
            lines.push(format!("  - `{endpoint}`"));
        }
    }

    if lines.is_empty() {
        "API endpoints found in documentation pages.".to_string()
    } else {
        lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Pages sorted by priority, descending; ties keep input order.
pub(crate) fn sort_by_priority(pages: &[PageRecord]) -> Vec<&PageRecord> {
    let mut sorted: Vec<&PageRecord> = pages.iter().collect();
    sorted.sort_by(|a, b| {
        b.priority
            .partial_cmp(&a.priority)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted
}

/// Latest last-updated string across pages (lexicographic max, which is
/// correct for ISO-8601 dates).
pub(crate) fn latest_update(pages: &[PageRecord]) -> Option<String> {
    pages
        .iter()
        .filter_map(|p| p.last_updated.clone())
        .max()
}

/// "api_reference" → "api reference".
fn spaced(ct: ContentType) -> String {
    ct.as_str().replace('_', " ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
