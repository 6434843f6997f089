//! Wire types for the DynamoDB JSON protocol subset the store speaks.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Attribute map forming one stored item.
pub type Item = BTreeMap<String, AttributeValue>;

/// Errors surfaced by the metadata store client.
#[derive(Debug, Error)]
pub enum DynamoError {
    /// Transport-level failure reaching the store.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// A conditional write lost against concurrent table state.
    #[error("Conditional check failed")]
    ConditionFailed,
    /// The store answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status received from the store.
        status: StatusCode,
        /// Raw response body kept for diagnostics.
        body: String,
    },
    /// The id counter did not settle after repeated seed and increment attempts.
    #[error("Paper id allocation did not settle after {0} attempts")]
    AllocationContention(usize),
    /// The store returned a shape the client cannot interpret.
    #[error("Malformed store response: {0}")]
    Malformed(String),
}

/// DynamoDB attribute value in its JSON wire form.
///
/// Numbers travel as strings on the wire. Variants beyond what the paper
/// table writes are kept so rows with extra attributes still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String attribute.
    #[serde(rename = "S")]
    S(String),
    /// Numeric attribute, transported as a string.
    #[serde(rename = "N")]
    N(String),
    /// Boolean attribute.
    #[serde(rename = "BOOL")]
    Bool(bool),
    /// List attribute.
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    /// Nested map attribute.
    #[serde(rename = "M")]
    M(Item),
}

impl AttributeValue {
    /// Build a numeric attribute from an integer.
    pub fn number(value: i64) -> Self {
        Self::N(value.to_string())
    }

    /// Read the attribute as an integer when it is numeric.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::N(raw) => raw.parse().ok(),
            _ => None,
        }
    }

    /// Read the attribute as a string slice when it is a string.
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(value) => Some(value),
            _ => None,
        }
    }
}

/// One row of the paper table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperRecord {
    /// Allocated identifier; the table key.
    #[serde(rename = "PaperID")]
    pub paper_id: i64,
    /// Name of the extracted plain-text artifact.
    #[serde(rename = "PaperTxtName")]
    pub txt_name: String,
    /// Public link to the uploaded PDF; empty when the upload failed.
    #[serde(rename = "PaperLink")]
    pub link: String,
    /// Original filename of the uploaded PDF.
    #[serde(rename = "PaperPDFName")]
    pub pdf_name: String,
}

impl PaperRecord {
    /// Encode the record as a DynamoDB item.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("PaperID".into(), AttributeValue::number(self.paper_id));
        item.insert(
            "PaperTxtName".into(),
            AttributeValue::S(self.txt_name.clone()),
        );
        item.insert("PaperLink".into(), AttributeValue::S(self.link.clone()));
        item.insert(
            "PaperPDFName".into(),
            AttributeValue::S(self.pdf_name.clone()),
        );
        item
    }

    /// Decode a stored item, returning `None` when required attributes are
    /// missing or carry the wrong type.
    pub fn from_item(item: &Item) -> Option<Self> {
        Some(Self {
            paper_id: item.get("PaperID")?.as_i64()?,
            txt_name: item.get("PaperTxtName")?.as_s()?.to_string(),
            link: item.get("PaperLink")?.as_s()?.to_string(),
            pdf_name: item.get("PaperPDFName")?.as_s()?.to_string(),
        })
    }
}

#[derive(Deserialize)]
pub(crate) struct ScanResponse {
    #[serde(rename = "Items", default)]
    pub items: Vec<Item>,
    /// Opaque pagination cursor echoed back as `ExclusiveStartKey`.
    #[serde(rename = "LastEvaluatedKey", default)]
    pub last_evaluated_key: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub(crate) struct BatchGetResponse {
    #[serde(rename = "Responses", default)]
    pub responses: BTreeMap<String, Vec<Item>>,
    #[serde(rename = "UnprocessedKeys", default)]
    pub unprocessed_keys: BTreeMap<String, KeysAndAttributes>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct KeysAndAttributes {
    #[serde(rename = "Keys")]
    pub keys: Vec<Item>,
}

#[derive(Deserialize)]
pub(crate) struct UpdateResponse {
    #[serde(rename = "Attributes", default)]
    pub attributes: Item,
}
