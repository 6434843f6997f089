//! Pinecone data-plane integration: batched vector upserts and similarity
//! queries against a single index host.

mod client;
mod types;

pub use client::PineconeService;
pub use types::{ChunkMetadata, IndexStats, PineconeError, QueryMatch, VectorRecord};
