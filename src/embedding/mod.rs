//! Embedding client abstraction and the OpenAI-compatible adapter.

mod openai;

pub use openai::OpenAiEmbeddingClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// The provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(#[from] reqwest::Error),
    /// The provider answered with a non-success status.
    #[error("Embedding request failed with status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Response body, useful for diagnosing quota and auth issues.
        body: String,
    },
    /// The provider answered but the payload carried no usable embedding.
    #[error("Embedding response was malformed: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient {
    /// Produce an embedding vector for a single piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}
