//! Append-only vector store with on-disk persistence.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use docharvest_shared::{HarvestError, Result};

use crate::embedder::EmbeddingCapability;

/// Matrix artifact header: magic + format version.
const MATRIX_MAGIC: &[u8; 4] = b"DHVI";
const MATRIX_VERSION: u32 = 1;

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Raw dot product against the query vector.
    pub score: f32,
    /// The chunk text, taken from the metadata record's `content` field.
    pub content: String,
    /// Full metadata record for the matched row.
    pub metadata: Value,
}

/// A similarity-searchable index over embedded texts.
///
/// Invariant: `embeddings.len() == metadata.len()`, with row `i` of the
/// matrix corresponding exactly to `metadata[i]`. Rows are append-only —
/// never reordered or deduplicated — so an index on disk round-trips to the
/// identical in-memory structure.
#[derive(Debug)]
pub struct VectorIndex {
    embeddings: Vec<Vec<f32>>,
    metadata: Vec<Value>,
    index_path: PathBuf,
    metadata_path: PathBuf,
    embedder: EmbeddingCapability,
}

impl VectorIndex {
    /// Open (or create empty) the index for `collection` under `storage_dir`.
    ///
    /// The persisted pair is `<collection>_index.dhv` plus
    /// `<collection>_meta.json`. When only one of the two exists the index
    /// starts empty with a warning; when both exist but disagree on row
    /// count, loading is rejected.
    pub fn open(
        storage_dir: &Path,
        collection: &str,
        embedder: EmbeddingCapability,
    ) -> Result<Self> {
        let index_path = storage_dir.join(format!("{collection}_index.dhv"));
        let metadata_path = storage_dir.join(format!("{collection}_meta.json"));

        let mut index = Self {
            embeddings: Vec::new(),
            metadata: Vec::new(),
            index_path,
            metadata_path,
            embedder,
        };
        index.load()?;
        Ok(index)
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Embed and append texts with their metadata records, then persist.
    ///
    /// Appends strictly grow the index; nothing is reordered or
    /// deduplicated. Fails when the embedding capability is unavailable —
    /// a distinct outcome from searching an empty index.
    pub fn add_texts(&mut self, texts: &[String], metadatas: Vec<Value>) -> Result<()> {
        if texts.is_empty() {
            return Err(HarvestError::validation("no texts to add"));
        }
        if texts.len() != metadatas.len() {
            return Err(HarvestError::validation(format!(
                "texts/metadatas length mismatch: {} vs {}",
                texts.len(),
                metadatas.len()
            )));
        }

        let embedder = self.embedder.get()?;
        info!(count = texts.len(), "generating embeddings");
        let vectors = embedder.embed(texts)?;

        if vectors.len() != texts.len() {
            return Err(HarvestError::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        if let Some(existing) = self.embeddings.first() {
            if let Some(new) = vectors.first() {
                if new.len() != existing.len() {
                    return Err(HarvestError::validation(format!(
                        "embedding dimension changed: {} vs {}",
                        new.len(),
                        existing.len()
                    )));
                }
            }
        }

        self.embeddings.extend(vectors);
        self.metadata.extend(metadatas);
        self.save()?;

        debug!(rows = self.len(), "index grown");
        Ok(())
    }

    /// Search for the `k` most similar rows to `query`.
    ///
    /// Returns an empty list for an empty index. Similarity is the raw dot
    /// product — the embedding model is assumed to produce comparably
    /// scaled vectors. Results are ordered by score descending; ties keep
    /// insertion order.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let embedder = self.embedder.get()?;
        let query_vec = embedder
            .embed(std::slice::from_ref(&query.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| HarvestError::Embedding("embedder returned no query vector".into()))?;

        let scores: Vec<f32> = self
            .embeddings
            .iter()
            .map(|row| dot(row, &query_vec))
            .collect();

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        Ok(order
            .into_iter()
            .take(k)
            .map(|i| SearchHit {
                score: scores[i],
                content: self.metadata[i]
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                metadata: self.metadata[i].clone(),
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write both artifacts. They are only meaningful together.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.index_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
        }

        write_matrix(&self.index_path, &self.embeddings)?;

        let json = serde_json::to_vec_pretty(&self.metadata)
            .map_err(|e| HarvestError::Index(format!("metadata serialization failed: {e}")))?;
        std::fs::write(&self.metadata_path, json)
            .map_err(|e| HarvestError::io(&self.metadata_path, e))?;

        debug!(rows = self.len(), path = %self.index_path.display(), "index saved");
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        let have_matrix = self.index_path.exists();
        let have_meta = self.metadata_path.exists();

        match (have_matrix, have_meta) {
            (false, false) => return Ok(()),
            (true, false) | (false, true) => {
                warn!(
                    index = %self.index_path.display(),
                    metadata = %self.metadata_path.display(),
                    "found only one half of the index pair; starting empty"
                );
                return Ok(());
            }
            (true, true) => {}
        }

        let embeddings = read_matrix(&self.index_path)?;

        let json = std::fs::read(&self.metadata_path)
            .map_err(|e| HarvestError::io(&self.metadata_path, e))?;
        let metadata: Vec<Value> = serde_json::from_slice(&json)
            .map_err(|e| HarvestError::Index(format!("metadata parse failed: {e}")))?;

        if embeddings.len() != metadata.len() {
            return Err(HarvestError::validation(format!(
                "index row count mismatch: {} embeddings vs {} metadata records",
                embeddings.len(),
                metadata.len()
            )));
        }

        info!(rows = metadata.len(), "loaded vector index");
        self.embeddings = embeddings;
        self.metadata = metadata;
        Ok(())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ---------------------------------------------------------------------------
// Matrix artifact codec
// ---------------------------------------------------------------------------

/// Layout: magic, u32 version, u64 rows, u64 dim, then rows×dim f32 LE.
fn write_matrix(path: &Path, rows: &[Vec<f32>]) -> Result<()> {
    let dim = rows.first().map(|r| r.len()).unwrap_or(0);

    let mut buf = Vec::with_capacity(24 + rows.len() * dim * 4);
    buf.extend_from_slice(MATRIX_MAGIC);
    buf.extend_from_slice(&MATRIX_VERSION.to_le_bytes());
    buf.extend_from_slice(&(rows.len() as u64).to_le_bytes());
    buf.extend_from_slice(&(dim as u64).to_le_bytes());
    for row in rows {
        for value in row {
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    std::fs::write(path, buf).map_err(|e| HarvestError::io(path, e))
}

fn read_matrix(path: &Path) -> Result<Vec<Vec<f32>>> {
    let bytes = std::fs::read(path).map_err(|e| HarvestError::io(path, e))?;

    if bytes.len() < 24 || &bytes[..4] != MATRIX_MAGIC {
        return Err(HarvestError::Index(format!(
            "not a matrix artifact: {}",
            path.display()
        )));
    }

    let version = u32::from_le_bytes(bytes[4..8].try_into().expect("4 bytes"));
    if version != MATRIX_VERSION {
        return Err(HarvestError::Index(format!(
            "unsupported matrix version {version}"
        )));
    }

    let rows = u64::from_le_bytes(bytes[8..16].try_into().expect("8 bytes")) as usize;
    let dim = u64::from_le_bytes(bytes[16..24].try_into().expect("8 bytes")) as usize;

    let expected = 24 + rows * dim * 4;
    if bytes.len() != expected {
        return Err(HarvestError::Index(format!(
            "matrix artifact truncated: {} bytes, expected {expected}",
            bytes.len()
        )));
    }

    let mut matrix = Vec::with_capacity(rows);
    let mut offset = 24;
    for _ in 0..rows {
        let mut row = Vec::with_capacity(dim);
        for _ in 0..dim {
            row.push(f32::from_le_bytes(
                bytes[offset..offset + 4].try_into().expect("4 bytes"),
            ));
            offset += 4;
        }
        matrix.push(row);
    }

    Ok(matrix)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
