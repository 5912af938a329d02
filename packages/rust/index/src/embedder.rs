//! The embedding capability consumed by the vector index.

use std::sync::Arc;

use docharvest_shared::{HarvestError, Result};

/// Produces fixed-length vectors for texts.
///
/// Implementations are blocking and synchronous; callers needing parallel
/// indexing shard work externally and serialize writes to the index.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Every returned vector has the same length.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// An explicitly constructed, possibly-unavailable embedding capability.
///
/// "Not configured" is a distinguishable state rather than a sentinel, so
/// callers can branch cleanly between "no results" and "can't embed".
#[derive(Clone)]
pub enum EmbeddingCapability {
    /// A working embedder.
    Ready(Arc<dyn Embedder>),
    /// No embedder could be constructed; `reason` explains why.
    Unavailable { reason: String },
}

impl EmbeddingCapability {
    /// Wrap a working embedder.
    pub fn ready(embedder: impl Embedder + 'static) -> Self {
        Self::Ready(Arc::new(embedder))
    }

    /// Record that no embedder is available.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Whether embedding can be performed.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Get the embedder, or the capability failure as an error.
    pub(crate) fn get(&self) -> Result<&Arc<dyn Embedder>> {
        match self {
            Self::Ready(embedder) => Ok(embedder),
            Self::Unavailable { reason } => Err(HarvestError::Embedding(reason.clone())),
        }
    }
}

impl std::fmt::Debug for EmbeddingCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("EmbeddingCapability::Ready"),
            Self::Unavailable { reason } => f
                .debug_struct("EmbeddingCapability::Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// fastembed-backed embedder (feature-gated)
// ---------------------------------------------------------------------------

/// Embedder backed by a bundled `fastembed` model.
#[cfg(feature = "fastembed")]
pub struct FastEmbedder {
    model: std::sync::Mutex<fastembed::TextEmbedding>,
}

#[cfg(feature = "fastembed")]
impl FastEmbedder {
    /// Load the default model. Fails (rather than panicking) when the model
    /// files cannot be fetched or initialized.
    pub fn new() -> Result<Self> {
        let model = fastembed::TextEmbedding::try_new(Default::default())
            .map_err(|e| HarvestError::Embedding(format!("failed to load model: {e}")))?;
        Ok(Self {
            model: std::sync::Mutex::new(model),
        })
    }

    /// Construct the capability, degrading to `Unavailable` on load failure.
    pub fn capability() -> EmbeddingCapability {
        match Self::new() {
            Ok(embedder) => EmbeddingCapability::ready(embedder),
            Err(e) => EmbeddingCapability::unavailable(e.to_string()),
        }
    }
}

#[cfg(feature = "fastembed")]
impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| HarvestError::Embedding("embedder lock poisoned".into()))?;
        model
            .embed(texts.to_vec(), None)
            .map_err(|e| HarvestError::Embedding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_capability_surfaces_reason() {
        let cap = EmbeddingCapability::unavailable("model files missing");
        assert!(!cap.is_ready());

        let err = cap.get().err().unwrap();
        assert!(matches!(err, HarvestError::Embedding(_)));
        assert!(err.to_string().contains("model files missing"));
    }

    #[test]
    fn ready_capability_embeds() {
        struct Zeros;
        impl Embedder for Zeros {
            fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
                Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
            }
        }

        let cap = EmbeddingCapability::ready(Zeros);
        assert!(cap.is_ready());
        let vectors = cap.get().unwrap().embed(&["a".into(), "b".into()]).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 4);
    }
}
