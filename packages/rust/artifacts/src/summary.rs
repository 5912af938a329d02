//! Aggregate crawl statistics (`ai-summary.json`).

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use docharvest_shared::PageRecord;

use crate::latest_update;

/// Per-content-type aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub count: usize,
    pub total_words: usize,
    pub avg_reading_time: f64,
}

/// Summary statistics for a documentation set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total_pages: usize,
    pub total_words: usize,
    pub total_reading_time_minutes: usize,
    pub content_type_breakdown: BTreeMap<String, TypeBreakdown>,
    pub average_page_words: usize,
    pub average_reading_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    pub generated_at: String,
}

/// Generate the summary report over all page records.
pub fn generate_summary(pages: &[PageRecord]) -> SummaryReport {
    let total_words: usize = pages.iter().map(|p| p.word_count).sum();
    let total_reading: usize = pages.iter().map(|p| p.reading_time_minutes).sum();

    let mut breakdown: BTreeMap<String, TypeBreakdown> = BTreeMap::new();
    let mut reading_by_type: BTreeMap<String, usize> = BTreeMap::new();
    for page in pages {
        let key = page.content_type.as_str().to_string();
        let entry = breakdown.entry(key.clone()).or_default();
        entry.count += 1;
        entry.total_words += page.word_count;
        *reading_by_type.entry(key).or_default() += page.reading_time_minutes;
    }
    for (key, entry) in breakdown.iter_mut() {
        if entry.count > 0 {
            entry.avg_reading_time = reading_by_type[key] as f64 / entry.count as f64;
        }
    }

    SummaryReport {
        total_pages: pages.len(),
        total_words,
        total_reading_time_minutes: total_reading,
        content_type_breakdown: breakdown,
        average_page_words: if pages.is_empty() {
            0
        } else {
            total_words / pages.len()
        },
        average_reading_time: if pages.is_empty() {
            0.0
        } else {
            total_reading as f64 / pages.len() as f64
        },
        last_updated: latest_update(pages),
        generated_at: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::page;
    use docharvest_shared::ContentType;

    #[test]
    fn summary_aggregates_totals() {
        let pages = vec![
            page("A", ContentType::Tutorial, 0.8),
            page("B", ContentType::Tutorial, 0.6),
            page("C", ContentType::General, 0.3),
        ];
        let summary = generate_summary(&pages);

        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.total_words, 1500);
        assert_eq!(summary.total_reading_time_minutes, 9);
        assert_eq!(summary.average_page_words, 500);
        assert_eq!(summary.content_type_breakdown["tutorial"].count, 2);
        assert_eq!(summary.content_type_breakdown["tutorial"].total_words, 1000);
        assert!((summary.content_type_breakdown["general"].avg_reading_time - 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_set_is_all_zeroes() {
        let summary = generate_summary(&[]);
        assert_eq!(summary.total_pages, 0);
        assert_eq!(summary.average_page_words, 0);
        assert_eq!(summary.average_reading_time, 0.0);
        assert_eq!(summary.last_updated, None);
    }
}
