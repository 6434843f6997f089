//! HTTP client wrapper for the Pinecone data plane.

use reqwest::{Client, Method};
use serde_json::json;

use super::types::{
    IndexStats, PineconeError, QueryMatch, QueryResponse, UpsertResponse, VectorRecord,
};

/// Vectors sent per upsert request; the data plane caps batch sizes.
const UPSERT_BATCH_SIZE: usize = 100;

/// Lightweight HTTP client for Pinecone index operations.
pub struct PineconeService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl PineconeService {
    /// Construct a client for the index hosted at `base_url`.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, PineconeError> {
        let client = Client::builder().user_agent("paperstack/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(PineconeError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = %api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized Pinecone HTTP client"
        );
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Upsert chunk vectors in batches, returning the total count accepted.
    pub async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, PineconeError> {
        if records.is_empty() {
            return Ok(0);
        }

        let total = records.len();
        let mut upserted = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let response = self
                .request(Method::POST, "vectors/upsert")
                .json(&json!({ "vectors": batch }))
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = PineconeError::UnexpectedStatus { status, body };
                tracing::error!(error = %error, "Pinecone upsert failed");
                return Err(error);
            }

            let payload: UpsertResponse = response.json().await?;
            upserted += payload.upserted_count.unwrap_or(batch.len());
        }

        tracing::debug!(vectors = total, upserted, "Vectors upserted");
        Ok(upserted)
    }

    /// Query the index for the nearest neighbours of `vector`.
    pub async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, PineconeError> {
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });

        let response = self
            .request(Method::POST, "query")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = PineconeError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Pinecone query failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        Ok(payload.matches)
    }

    /// Fetch index statistics; the server probes this at startup to catch
    /// dimension drift between the index and the embedding model.
    pub async fn describe_index_stats(&self) -> Result<IndexStats, PineconeError> {
        let response = self
            .request(Method::POST, "describe_index_stats")
            .json(&json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PineconeError::UnexpectedStatus { status, body });
        }

        Ok(response.json().await?)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("Api-Key", api_key);
        }
        req
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
