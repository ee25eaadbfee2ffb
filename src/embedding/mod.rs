//! Embedding generation for link titles
//!
//! Titles are batched to an external embedding service. The pipeline treats
//! every failure here as degradation, not breakage: rows are persisted
//! without vectors and semantic matching over them is reduced, not broken.

pub mod http;

pub use http::HttpEmbedder;

use thiserror::Error;

use crate::types::Embedding;

/// Titles per embedding service call
pub const EMBED_BATCH_SIZE: usize = 100;

/// Errors from an embedding backend
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    #[error("backend configuration error: {0}")]
    Config(String),
}

/// A batched `texts -> vectors` embedding collaborator.
#[allow(async_fn_in_trait)]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbedError>;
}
