//! Streaming pagination over table scans without manual cursor loops.

use async_stream::try_stream;
use futures_core::Stream;
use serde_json::json;

use super::client::DynamoService;
use super::types::{DynamoError, Item, ScanResponse};

/// Stream scan pages for `projection`, following `LastEvaluatedKey` until the
/// table is exhausted. Each yielded element is one page of items.
pub(crate) fn scan_pages<'a>(
    service: &'a DynamoService,
    projection: &'a str,
) -> impl Stream<Item = Result<Vec<Item>, DynamoError>> + 'a {
    try_stream! {
        let mut exclusive_start_key: Option<serde_json::Value> = None;

        loop {
            let mut body = json!({
                "TableName": service.table,
                "ProjectionExpression": projection,
            });
            if let Some(key) = exclusive_start_key.clone() {
                body.as_object_mut()
                    .expect("scan body is object")
                    .insert("ExclusiveStartKey".into(), key);
            }

            let mut request = service
                .client
                .post(format!("{}/", service.base_url))
                .header("X-Amz-Target", "DynamoDB_20120810.Scan")
                .header("Content-Type", "application/x-amz-json-1.0");
            if let Some(token) = &service.auth_token && !token.is_empty() {
                request = request.bearer_auth(token);
            }

            let response = request.json(&body).send().await?;

            let status = response.status();
            if status.is_success() {
                let page: ScanResponse = response.json().await?;
                yield page.items;

                match page.last_evaluated_key {
                    Some(next) => exclusive_start_key = Some(next),
                    None => break,
                }
            } else {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status = %status, "Failed to scan metadata table");
                Err(DynamoError::UnexpectedStatus { status, body })?;
            }
        }
    }
}
