//! Chunk summaries and flat keyword-term search.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Chunk, ChunkMetadata};

// ---------------------------------------------------------------------------
// ChunkIndex
// ---------------------------------------------------------------------------

/// Per-kind counts inside a [`ChunkIndex`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindStats {
    pub count: usize,
    pub total_tokens: usize,
}

/// Summary of a chunk list, for quick lookup without loading every chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkIndex {
    pub total_chunks: usize,
    pub total_tokens: usize,
    /// Stats keyed by chunk kind (serialized snake_case).
    pub chunk_types: BTreeMap<String, KindStats>,
    /// All chunk ids, in emission order.
    pub chunk_ids: Vec<String>,
}

impl ChunkIndex {
    /// Build a summary over a chunk list.
    pub fn build(chunks: &[Chunk]) -> Self {
        let mut chunk_types: BTreeMap<String, KindStats> = BTreeMap::new();
        let mut total_tokens = 0usize;

        for chunk in chunks {
            total_tokens += chunk.metadata.token_count;
            let stats = chunk_types
                .entry(chunk.metadata.chunk_type.as_str().to_string())
                .or_default();
            stats.count += 1;
            stats.total_tokens += chunk.metadata.token_count;
        }

        Self {
            total_chunks: chunks.len(),
            total_tokens,
            chunk_types,
            chunk_ids: chunks.iter().map(|c| c.id.clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Keyword search
// ---------------------------------------------------------------------------

/// A keyword-search result over a chunk list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHit {
    pub chunk_id: String,
    /// Total occurrences of query terms in the chunk content.
    pub score: usize,
    /// First 200 chars of the chunk.
    pub content_preview: String,
    pub metadata: ChunkMetadata,
}

/// Flat keyword-term search: score each chunk by total occurrences of the
/// query's whitespace-separated terms, descending, ties in chunk order.
pub fn keyword_search(chunks: &[Chunk], query: &str, limit: usize) -> Vec<ChunkHit> {
    let terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<ChunkHit> = chunks
        .iter()
        .filter_map(|chunk| {
            let content = chunk.content.to_lowercase();
            let score: usize = terms.iter().map(|t| content.matches(t.as_str()).count()).sum();
            (score > 0).then(|| ChunkHit {
                chunk_id: chunk.id.clone(),
                score,
                content_preview: preview(&chunk.content),
                metadata: chunk.metadata.clone(),
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(limit);
    hits
}

fn preview(content: &str) -> String {
    if content.chars().count() <= 200 {
        return content.to_string();
    }
    let cut: String = content.chars().take(200).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chunker;

    fn sample_chunks() -> Vec<Chunk> {
        let md = "# Install\n\nRun cargo install to install the tool.\n\n# Usage\n\nInvoke the binary with a URL argument.";
        Chunker::default().chunk_markdown(md, "https://example.com/")
    }

    #[test]
    fn index_aggregates_counts_and_tokens() {
        let chunks = sample_chunks();
        let index = ChunkIndex::build(&chunks);

        assert_eq!(index.total_chunks, chunks.len());
        assert_eq!(index.chunk_ids.len(), chunks.len());
        assert_eq!(
            index.total_tokens,
            chunks.iter().map(|c| c.metadata.token_count).sum::<usize>()
        );
        assert!(index.chunk_types.contains_key("markdown_section"));
    }

    #[test]
    fn keyword_search_scores_by_term_occurrences() {
        let chunks = sample_chunks();
        let hits = keyword_search(&chunks, "install", 10);

        assert_eq!(hits.len(), 1);
        // "Install" appears in the header and twice in the body.
        assert_eq!(hits[0].score, 3);
    }

    #[test]
    fn keyword_search_orders_descending() {
        let chunks = sample_chunks();
        let hits = keyword_search(&chunks, "install binary", 10);

        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn no_match_means_no_hits() {
        let chunks = sample_chunks();
        assert!(keyword_search(&chunks, "zebra", 10).is_empty());
        assert!(keyword_search(&chunks, "", 10).is_empty());
    }
}
