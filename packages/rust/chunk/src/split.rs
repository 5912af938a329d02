//! Paragraph-group splitting for sections that exceed the token budget.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Chunk, ChunkKind, ChunkMetadata, Chunker, chunk_id, estimate_tokens};

/// Split `text` into paragraph-group chunks under the chunker's budget.
///
/// Paragraphs (blank-line separated) accumulate until the next addition
/// would exceed the budget; the closed chunk seeds its successor with an
/// overlap tail. A single paragraph larger than the whole budget is still
/// emitted as its own over-budget chunk.
pub(crate) fn split_paragraphs(
    chunker: &Chunker,
    text: &str,
    context: &str,
    url: &str,
) -> Vec<Chunk> {
    static PARA_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0usize;

    for para in PARA_RE.split(text.trim()) {
        let para_tokens = estimate_tokens(para);

        if current_tokens + para_tokens > chunker.chunk_size() && !current.is_empty() {
            chunks.push(make_chunk(&current, current_tokens, context, url));

            let overlap = overlap_tail(&current, chunker.overlap());
            current = if overlap.is_empty() {
                para.to_string()
            } else {
                format!("{overlap}\n\n{para}")
            };
            current_tokens = estimate_tokens(&current);
        } else {
            if current.is_empty() {
                current = para.to_string();
            } else {
                current.push_str("\n\n");
                current.push_str(para);
            }
            current_tokens += para_tokens;
        }
    }

    if !current.trim().is_empty() {
        chunks.push(make_chunk(&current, current_tokens, context, url));
    }

    chunks
}

fn make_chunk(content: &str, token_count: usize, context: &str, url: &str) -> Chunk {
    let content = content.trim().to_string();
    let mut metadata = ChunkMetadata::new(url, ChunkKind::ParagraphGroup, token_count);
    metadata.context = (!context.is_empty()).then(|| context.to_string());
    Chunk {
        id: chunk_id(&content),
        content,
        metadata,
    }
}

/// Overlap seed for the next chunk: the trailing `overlap` fraction of the
/// closed chunk, trimmed to the last few sentence segments when the window
/// contains more than one; otherwise the raw character slice is the
/// contract.
fn overlap_tail(text: &str, overlap: f32) -> String {
    static SENTENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("valid regex"));

    if text.is_empty() || overlap <= 0.0 {
        return String::new();
    }

    let overlap_len = (text.len() as f32 * overlap) as usize;
    if overlap_len == 0 {
        return String::new();
    }

    let mut cut = text.len().saturating_sub(overlap_len);
    while cut < text.len() && !text.is_char_boundary(cut) {
        cut += 1;
    }
    let window = &text[cut..];

    let sentences: Vec<&str> = SENTENCE_RE.split(window).collect();
    if sentences.len() > 1 {
        let keep = sentences.len().min(3);
        sentences[sentences.len() - keep..].join(" ").trim().to_string()
    } else {
        window.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_until_budget_then_closes() {
        let paras: Vec<String> = (0..10)
            .map(|i| format!("paragraph {i} with several filler words inside"))
            .collect();
        let text = paras.join("\n\n");
        let chunker = Chunker::new(30, 0.0);
        let chunks = split_paragraphs(&chunker, &text, "Ctx", "u");

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(estimate_tokens(&chunk.content) <= 30);
            assert_eq!(chunk.metadata.context.as_deref(), Some("Ctx"));
        }
        // All paragraphs survive the split.
        for i in 0..10 {
            let needle = format!("paragraph {i}");
            assert!(chunks.iter().any(|c| c.content.contains(&needle)));
        }
    }

    #[test]
    fn overlap_seeds_next_chunk() {
        let first = "First sentence here. Second sentence follows. Third one ends";
        let text = format!("{first}\n\nanother paragraph of words to push over the limit");
        let chunker = Chunker::new(16, 0.5);
        let chunks = split_paragraphs(&chunker, &text, "", "u");

        assert_eq!(chunks.len(), 2);
        // The second chunk starts with tail text from the first.
        let seed: &str = chunks[1].content.split("\n\n").next().unwrap();
        assert!(
            seed.contains("Third one ends"),
            "seed {seed:?} does not carry the tail of the first chunk"
        );
    }

    #[test]
    fn overlap_tail_prefers_sentence_boundaries() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota. Kappa lambda mu";
        let tail = overlap_tail(text, 0.8);
        // Multiple sentence segments in window → starts at a segment start.
        assert!(tail.starts_with("Delta") || tail.starts_with("Eta") || tail.starts_with("Kappa"));
    }

    #[test]
    fn overlap_tail_falls_back_to_raw_slice() {
        let text = "no sentence punctuation just a stream of words going on";
        let tail = overlap_tail(text, 0.25);
        assert!(!tail.is_empty());
        assert!(text.ends_with(&tail));
    }

    #[test]
    fn zero_overlap_gives_empty_tail() {
        assert_eq!(overlap_tail("Some text here.", 0.0), "");
    }

    #[test]
    fn irreducible_paragraph_still_emitted() {
        let text = "x".repeat(1000);
        let chunker = Chunker::new(50, 0.15);
        let chunks = split_paragraphs(&chunker, &text, "", "u");
        assert_eq!(chunks.len(), 1);
        assert!(estimate_tokens(&chunks[0].content) > 50);
    }
}
