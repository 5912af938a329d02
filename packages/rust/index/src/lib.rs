//! Similarity-searchable vector index over chunk text.
//!
//! The index stores an append-only embeddings matrix and a parallel
//! metadata list — row `i` of the matrix always corresponds to
//! `metadata[i]`. Embeddings come from an injected [`Embedder`] capability;
//! the index itself only stores vectors and compares them with a raw dot
//! product. Persistence is a two-artifact pair (binary matrix + JSON
//! metadata list) that is only meaningful together.

mod embedder;
mod store;

pub use embedder::{Embedder, EmbeddingCapability};
pub use store::{SearchHit, VectorIndex};

#[cfg(feature = "fastembed")]
pub use embedder::FastEmbedder;
