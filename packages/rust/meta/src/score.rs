//! Priority scoring for prioritized navigation listings.

use docharvest_shared::PageRecord;

/// Bonus per code block, and its cap.
const CODE_BONUS_PER_BLOCK: f32 = 0.05;
const CODE_BONUS_CAP: f32 = 0.2;

/// Flat bonus when the page carries any last-updated date.
///
/// Intentionally not recency-weighted, to stay compatible with existing
/// corpora; a date-based decay is a candidate replacement.
const FRESHNESS_BONUS: f32 = 0.05;

/// Priority score in `[0, 1]` for a page record.
///
/// Weighted sum of: content-type base weight, a title-length band,
/// a description-length bonus, a capped code-block bonus, and the flat
/// freshness bonus. Clamped into `[0, 1]` for arbitrary inputs.
pub fn priority_score(record: &PageRecord) -> f32 {
    let mut score = record.content_type.base_weight();

    // Short, descriptive titles score higher; rambling ones are penalized.
    let title_words = record.title.split_whitespace().count();
    if (3..=10).contains(&title_words) {
        score += 0.2;
    } else if title_words > 15 {
        score -= 0.1;
    }

    if record.description.len() > 50 {
        score += 0.1;
    }

    if record.code_block_count > 0 {
        score += (record.code_block_count as f32 * CODE_BONUS_PER_BLOCK).min(CODE_BONUS_CAP);
    }

    if record.last_updated.is_some() {
        score += FRESHNESS_BONUS;
    }

    score.clamp(0.0, 1.0)
}
