//! Document ingestion and query pipelines.
//!
//! `PipelineService` wires the chunker, the embedding client, and the typed
//! service clients into the two flows the HTTP surface exposes: ingest a PDF
//! (extract, upload, chunk, embed, index, record) and answer a question
//! (embed, retrieve, fetch documents, generate).

mod chunking;
mod extract;
mod mappers;
mod service;
mod types;

pub use extract::ExtractError;
pub use service::{PipelineApi, PipelineService};
pub use types::{
    ChunkingError, IngestOutcome, NO_MATCH_ANSWER, PipelineError, QueryError, QueryOutcome,
    RetrievedChunk, StorageOutcome, SummarizeOutcome,
};
