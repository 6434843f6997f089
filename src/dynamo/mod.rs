//! DynamoDB-compatible metadata store: one row per ingested paper plus a
//! reserved counter row that backs atomic id allocation.

mod client;
mod scan;
mod types;

pub use client::DynamoService;
pub use types::{AttributeValue, DynamoError, Item, PaperRecord};
