//! Error taxonomy and outcome types for the ingestion and query pipelines.

use serde::Serialize;
use thiserror::Error;

use crate::dynamo::{DynamoError, PaperRecord};
use crate::embedding::EmbeddingClientError;
use crate::generation::GenerationError;
use crate::pinecone::PineconeError;

use super::extract::ExtractError;

/// Answer returned when retrieval finds nothing.
pub const NO_MATCH_ANSWER: &str = "No relevant matches found in the database.";

/// Errors from the chunking stage.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// A chunk size of zero cannot hold any text.
    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors raised while ingesting a document.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload could not be turned into text.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// The chunker rejected its settings.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    /// The vector index rejected the chunk upsert.
    #[error("Vector index error: {0}")]
    Index(#[from] PineconeError),
    /// The metadata store rejected a read or write.
    #[error("Metadata store error: {0}")]
    Store(#[from] DynamoError),
    /// The caller supplied malformed input.
    #[error("{0}")]
    Validation(String),
}

/// Errors raised while answering a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The embedding provider failed for the query text.
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// The query embedding does not match the configured index dimension,
    /// which happens when the embedding model changed since ingestion.
    #[error("Query embedding has {actual} dimensions, index expects {expected}")]
    DimensionMismatch {
        /// Dimension the index was configured with.
        expected: usize,
        /// Dimension the provider actually returned.
        actual: usize,
    },
    /// The vector index failed to search.
    #[error("Vector index error: {0}")]
    Index(#[from] PineconeError),
    /// Fetching document records failed.
    #[error("Metadata store error: {0}")]
    Store(#[from] DynamoError),
    /// The answer model failed.
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// How the original upload fared in object storage.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StorageOutcome {
    /// The PDF is durably stored and reachable at `url`.
    Uploaded {
        /// Public link to the stored object.
        url: String,
    },
    /// The upload failed; ingestion continued with an empty link.
    Failed {
        /// Description of the failure, surfaced to the caller.
        reason: String,
    },
}

impl StorageOutcome {
    /// Link recorded in the metadata store; empty when the upload failed.
    pub fn link(&self) -> &str {
        match self {
            Self::Uploaded { url } => url,
            Self::Failed { .. } => "",
        }
    }
}

/// Result of ingesting one document.
#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    /// Identifier allocated for the document.
    pub paper_id: i64,
    /// Chunks produced by the splitter.
    pub chunk_count: usize,
    /// Chunks embedded successfully.
    pub embedded: usize,
    /// Indices of chunks whose embedding failed after a retry.
    pub failed_chunks: Vec<usize>,
    /// Vectors accepted by the index.
    pub upserted: usize,
    /// Outcome of the object storage upload.
    pub storage: StorageOutcome,
    /// Name of the plain-text artifact recorded in the metadata store.
    pub text_artifact_name: String,
    /// Error from writing the local text artifact, when that write failed.
    pub artifact_error: Option<String>,
}

/// Result of the ingest-and-summarize operation.
#[derive(Debug, Serialize)]
pub struct SummarizeOutcome {
    /// Identifier allocated for the document.
    pub paper_id: i64,
    /// Summary text, or a fixed notice when generation was unavailable.
    pub message: String,
    /// Whether `message` came from the generator.
    pub generated: bool,
}

/// One retrieved chunk, shaped for the HTTP response.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    /// Composite vector id in the `paper_{id}#chunk_{index}` form.
    pub id: String,
    /// Similarity score reported by the index.
    pub score: f32,
    /// Owning document id, when it could be recovered.
    pub paper_id: Option<i64>,
    /// Chunk text, when the index returned metadata.
    pub text: Option<String>,
}

/// Result of answering one query.
#[derive(Debug, Serialize)]
pub struct QueryOutcome {
    /// Generated answer, or the fixed no-match notice.
    pub answer: String,
    /// Ranked matches straight from the index.
    pub matches: Vec<RetrievedChunk>,
    /// Document records referenced by the strongest matches.
    pub documents: Vec<PaperRecord>,
}
