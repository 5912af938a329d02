//! Chunking: bounded, overlapping retrieval units with stable identifiers.
//!
//! Three entry strategies produce the same [`Chunk`] shape:
//! - [`Chunker::chunk_sections`] — one chunk per section under budget,
//!   paragraph-group splitting above it, subsections flattened pre-order;
//! - [`Chunker::chunk_by_tokens`] — fixed-size word windows with fractional
//!   overlap;
//! - [`Chunker::chunk_markdown`] — header-delimited sections over raw
//!   markdown, with the same over/under-budget handling as sections.
//!
//! Token counts are a deliberately cheap approximation (`len / 4`) that must
//! stay byte-for-byte reproducible; chunk ids are content hashes, so
//! identical content always maps to the same id.

mod index;
mod split;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use docharvest_extract::SectionTree;

pub use index::{ChunkHit, ChunkIndex, keyword_search};

/// Token windows shorter than this are dropped unless they are the only one.
const MIN_WINDOW_WORDS: usize = 50;

// ---------------------------------------------------------------------------
// Chunk types
// ---------------------------------------------------------------------------

/// Which strategy produced a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Section,
    ParagraphGroup,
    TokenWindow,
    MarkdownSection,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Section => "section",
            Self::ParagraphGroup => "paragraph_group",
            Self::TokenWindow => "token_window",
            Self::MarkdownSection => "markdown_section",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance and sizing metadata carried by every chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source page URL.
    #[serde(default)]
    pub url: String,
    /// Producing strategy.
    pub chunk_type: ChunkKind,
    /// Estimated token count of `content`.
    pub token_count: usize,
    /// Section title, for section chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_section: Option<String>,
    /// Heading level, for section chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Markdown header text, for markdown-section chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Enclosing section/header title, for paragraph-group chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Window ordinal, for token windows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    /// First word offset, for token windows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_word: Option<usize>,
    /// One-past-last word offset, for token windows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_word: Option<usize>,
    /// Words shared with the previous window (0 for the first).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_words: Option<usize>,
}

impl ChunkMetadata {
    fn new(url: &str, chunk_type: ChunkKind, token_count: usize) -> Self {
        Self {
            url: url.to_string(),
            chunk_type,
            token_count,
            source_section: None,
            level: None,
            header: None,
            context: None,
            chunk_index: None,
            start_word: None,
            end_word: None,
            overlap_words: None,
        }
    }
}

/// A bounded unit of retrievable text with a content-derived stable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

// ---------------------------------------------------------------------------
// Token estimate & chunk identity
// ---------------------------------------------------------------------------

/// Cheap token estimate: one token per four bytes, at least one.
///
/// This exact formula is part of the chunking contract — downstream tests
/// depend on it being reproducible.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() / 4).max(1)
}

/// Content-addressed chunk id: a fixed tag plus a sha256 prefix.
///
/// Identical content always yields the same id; re-indexing the same corpus
/// therefore produces no duplicate identities.
pub fn chunk_id(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("chunk_{}", &digest[..12])
}

// ---------------------------------------------------------------------------
// Chunker
// ---------------------------------------------------------------------------

/// Splits extracted content into retrieval-sized chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    /// Target tokens per chunk.
    chunk_size: usize,
    /// Fractional overlap carried between adjacent chunks.
    overlap: f32,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(400, 0.15)
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: f32) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.clamp(0.0, 0.9),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> f32 {
        self.overlap
    }

    /// Chunk a section tree, flattened pre-order.
    ///
    /// Sections under budget become one chunk each (title + body); larger
    /// sections fall back to paragraph-group splitting with the section
    /// title as context. Subsections are independent — their chunks are
    /// simply appended in traversal order.
    pub fn chunk_sections(&self, tree: &SectionTree, url: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for idx in tree.preorder() {
            let node = tree.node(idx);
            let combined = if node.body.is_empty() {
                node.title.clone()
            } else {
                format!("{}\n\n{}", node.title, node.body)
            };

            if estimate_tokens(&combined) <= self.chunk_size {
                let mut metadata =
                    ChunkMetadata::new(url, ChunkKind::Section, estimate_tokens(&combined));
                metadata.source_section = Some(node.title.clone());
                metadata.level = Some(node.level);
                chunks.push(Chunk {
                    id: chunk_id(&combined),
                    content: combined,
                    metadata,
                });
            } else {
                chunks.extend(split::split_paragraphs(self, &combined, &node.title, url));
            }
        }

        debug!(url, chunks = chunks.len(), "section chunking complete");
        chunks
    }

    /// Chunk a flat text into fixed-size word windows with overlap.
    ///
    /// `step = chunk_size × (1 − overlap)`. A trailing window shorter than
    /// [`MIN_WINDOW_WORDS`] is dropped unless it is the only window.
    pub fn chunk_by_tokens(&self, content: &str, title: &str, url: &str) -> Vec<Chunk> {
        let words: Vec<&str> = content.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let overlap_words = (self.chunk_size as f32 * self.overlap) as usize;
        let step = (self.chunk_size - overlap_words).max(1);

        let mut chunks = Vec::new();
        let mut i = 0;
        while i < words.len() {
            let end = (i + self.chunk_size).min(words.len());
            let window = &words[i..end];

            if window.len() < MIN_WINDOW_WORDS && i > 0 {
                i += step;
                continue;
            }

            let content = window.join(" ");
            let mut metadata = ChunkMetadata::new(url, ChunkKind::TokenWindow, window.len());
            metadata.source_section = (!title.is_empty()).then(|| title.to_string());
            metadata.chunk_index = Some(chunks.len());
            metadata.start_word = Some(i);
            metadata.end_word = Some(end);
            metadata.overlap_words = Some(if i > 0 { overlap_words } else { 0 });

            chunks.push(Chunk {
                id: chunk_id(&content),
                content,
                metadata,
            });

            i += step;
        }

        chunks
    }

    /// Chunk raw markdown by header lines (`#`..`######`).
    ///
    /// Each header opens a section containing its own line; prose before the
    /// first header forms an untitled level-0 section. Sections then get the
    /// same over/under-budget handling as [`Chunker::chunk_sections`].
    pub fn chunk_markdown(&self, markdown: &str, url: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for section in split_markdown_by_headers(markdown) {
            let token_count = estimate_tokens(&section.content);

            if token_count <= self.chunk_size {
                let mut metadata =
                    ChunkMetadata::new(url, ChunkKind::MarkdownSection, token_count);
                metadata.header = Some(section.header.clone());
                metadata.level = Some(section.level);
                chunks.push(Chunk {
                    id: chunk_id(&section.content),
                    content: section.content,
                    metadata,
                });
            } else {
                chunks.extend(split::split_paragraphs(
                    self,
                    &section.content,
                    &section.header,
                    url,
                ));
            }
        }

        debug!(url, chunks = chunks.len(), "markdown chunking complete");
        chunks
    }
}

// ---------------------------------------------------------------------------
// Markdown header splitting
// ---------------------------------------------------------------------------

struct MarkdownSection {
    header: String,
    level: u8,
    content: String,
}

fn split_markdown_by_headers(markdown: &str) -> Vec<MarkdownSection> {
    static HEADER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex"));

    let mut sections = Vec::new();
    let mut current = MarkdownSection {
        header: String::new(),
        level: 0,
        content: String::new(),
    };

    for line in markdown.lines() {
        if let Some(caps) = HEADER_RE.captures(line.trim()) {
            if !current.content.trim().is_empty() {
                sections.push(current);
            }
            current = MarkdownSection {
                header: caps[2].to_string(),
                level: caps[1].len() as u8,
                content: format!("{line}\n"),
            };
        } else {
            current.content.push_str(line);
            current.content.push('\n');
        }
    }

    if !current.content.trim().is_empty() {
        sections.push(current);
    }

    sections
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
