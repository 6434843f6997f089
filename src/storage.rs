//! Object storage client for uploaded PDFs.
//!
//! Raw files land in an S3-compatible bucket via a plain `PUT
//! {base}/{bucket}/{key}`. The same path doubles as the public link stored in
//! the paper record, which assumes a public-read bucket policy.

use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Errors surfaced by the storage client.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transport-level failure reaching the storage endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status received from storage.
        status: StatusCode,
        /// Raw response body kept for diagnostics.
        body: String,
    },
}

/// Client for the S3-compatible bucket holding raw uploads.
pub struct StorageService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) bucket: String,
    pub(crate) auth_token: Option<String>,
}

impl StorageService {
    /// Construct a client for `bucket` hosted at `base_url`.
    pub fn new(
        base_url: &str,
        bucket: &str,
        auth_token: Option<String>,
    ) -> Result<Self, StorageError> {
        let client = Client::builder().user_agent("paperstack/0.1").build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            auth_token,
        })
    }

    /// Upload a PDF under `key` and return its public link.
    pub async fn upload_pdf(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let url = self.object_url(key);
        let mut request = self
            .client
            .put(&url)
            .header("Content-Type", "application/pdf")
            .body(bytes);
        if let Some(token) = &self.auth_token
            && !token.is_empty()
        {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StorageError::UnexpectedStatus { status, body };
            tracing::error!(key, error = %error, "PDF upload failed");
            return Err(error);
        }

        tracing::debug!(key, url = %url, "PDF uploaded");
        Ok(url)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, key)
    }
}
