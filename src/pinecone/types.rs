//! Wire types shared by the Pinecone data-plane client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the Pinecone client.
#[derive(Debug, Error)]
pub enum PineconeError {
    /// The configured base URL could not be parsed.
    #[error("Invalid Pinecone URL: {0}")]
    InvalidUrl(String),
    /// Transport-level failure reaching the index.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The index answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status received from the index.
        status: StatusCode,
        /// Raw response body kept for diagnostics.
        body: String,
    },
}

/// Metadata stored alongside every chunk vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Identifier of the paper this chunk belongs to.
    pub paper_id: i64,
    /// Position marker of the chunk inside the paper, e.g. `chunk_3`.
    pub chunk_id: String,
    /// Raw chunk text, used later to assemble answer context.
    pub chunk: String,
}

/// A single vector ready for upsert.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    /// Unique vector id in the `paper_<paper>#chunk_<index>` form.
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Chunk metadata stored with the vector.
    pub metadata: ChunkMetadata,
}

/// One scored match returned by a similarity query.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryMatch {
    /// Vector id of the match.
    pub id: String,
    /// Similarity score assigned by the index.
    pub score: f32,
    /// Metadata stored at upsert time, when the index returns it.
    #[serde(default)]
    pub metadata: Option<ChunkMetadata>,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
pub(crate) struct UpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    pub upserted_count: Option<usize>,
}

/// Subset of index statistics used for startup diagnostics.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexStats {
    /// Dimensionality the index was created with.
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Total number of vectors across all namespaces.
    #[serde(rename = "totalVectorCount", default)]
    pub total_vector_count: Option<u64>,
}
