#![deny(missing_docs)]

//! Core library for the Paperstack retrieval-augmented QA backend.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// DynamoDB-compatible metadata store integration.
pub mod dynamo;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Answer and summary generation providers.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and query metrics helpers.
pub mod metrics;
/// Pinecone vector index integration.
pub mod pinecone;
/// Ingestion and query pipeline orchestration.
pub mod pipeline;
/// Object storage client for uploaded PDFs.
pub mod storage;
