//! HTTP client for the DynamoDB-compatible metadata store.
//!
//! Requests follow the DynamoDB JSON protocol: every operation is a POST to
//! the endpoint root with an `X-Amz-Target` header naming the operation.
//! Request signing is left to the deployment (local endpoints and gateway
//! proxies accept a plain bearer token or nothing at all).

use futures_util::pin_mut;
use futures_util::stream::TryStreamExt;
use reqwest::Client;
use serde_json::json;

use super::scan;
use super::types::{
    AttributeValue, BatchGetResponse, DynamoError, Item, PaperRecord, UpdateResponse,
};

/// Reserved key of the row that carries the id allocation counter.
pub(crate) const COUNTER_KEY: i64 = 0;
/// Attribute on the counter row holding the last allocated id.
const COUNTER_ATTRIBUTE: &str = "LastPaperID";
/// Keys sent per BatchGetItem request; the protocol caps this at 100.
const BATCH_GET_LIMIT: usize = 100;
/// Bound on the seed/increment allocation loop.
const MAX_ALLOCATION_ATTEMPTS: usize = 3;

/// Lightweight HTTP client speaking the DynamoDB JSON protocol.
pub struct DynamoService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) table: String,
    pub(crate) auth_token: Option<String>,
}

impl DynamoService {
    /// Construct a client for the store at `base_url` operating on `table`.
    pub fn new(
        base_url: &str,
        table: &str,
        auth_token: Option<String>,
    ) -> Result<Self, DynamoError> {
        let client = Client::builder().user_agent("paperstack/0.1").build()?;
        tracing::debug!(url = %base_url, table, "Initialized metadata store client");
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            auth_token,
        })
    }

    /// Write one paper record, overwriting any previous row with the same id.
    pub async fn put_record(&self, record: &PaperRecord) -> Result<(), DynamoError> {
        let body = json!({
            "TableName": self.table,
            "Item": record.to_item(),
        });
        let response = self.operation("PutItem", &body).await?;
        if !response.status().is_success() {
            return Err(fail_from(response).await);
        }
        tracing::debug!(paper_id = record.paper_id, "Paper record stored");
        Ok(())
    }

    /// Allocate the next paper id.
    ///
    /// The allocator lives in a reserved row (`PaperID = 0`) holding the last
    /// id handed out. Increment-if-exists runs first; when the counter row is
    /// missing it is seeded from the current table maximum with a conditional
    /// put, so two concurrent seeders cannot both win.
    pub async fn allocate_paper_id(&self) -> Result<i64, DynamoError> {
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            match self.increment_counter().await {
                Ok(id) => return Ok(id),
                Err(DynamoError::ConditionFailed) => {}
                Err(other) => return Err(other),
            }

            let seed = self.max_paper_id().await?.unwrap_or(0) + 1;
            match self.seed_counter(seed).await {
                Ok(()) => {
                    tracing::info!(seed, "Seeded paper id counter");
                    return Ok(seed);
                }
                // Lost the seeding race; go back to incrementing.
                Err(DynamoError::ConditionFailed) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(DynamoError::AllocationContention(MAX_ALLOCATION_ATTEMPTS))
    }

    /// Highest paper id currently stored, or `None` when the table holds no
    /// paper rows. The counter row does not count.
    pub async fn max_paper_id(&self) -> Result<Option<i64>, DynamoError> {
        let pages = scan::scan_pages(self, "PaperID");
        pin_mut!(pages);

        let mut max: Option<i64> = None;
        let mut rows = 0usize;
        while let Some(items) = pages.try_next().await? {
            for item in items {
                let Some(id) = item.get("PaperID").and_then(AttributeValue::as_i64) else {
                    continue;
                };
                if id == COUNTER_KEY {
                    continue;
                }
                rows += 1;
                max = Some(max.map_or(id, |current| current.max(id)));
            }
        }
        tracing::debug!(rows, max = ?max, "Scanned table for maximum paper id");
        Ok(max)
    }

    /// Fetch the records for `ids`, silently omitting ids with no row.
    ///
    /// Ids are deduplicated first, and non-positive ids are dropped since they
    /// can never name a paper. Unprocessed keys are re-requested the same way
    /// scan pages are followed.
    pub async fn get_records(&self, ids: &[i64]) -> Result<Vec<PaperRecord>, DynamoError> {
        let mut seen = std::collections::BTreeSet::new();
        let mut pending: Vec<Item> = ids
            .iter()
            .filter(|id| **id > 0 && seen.insert(**id))
            .map(|id| key_for(*id))
            .collect();

        let mut records = Vec::new();
        while !pending.is_empty() {
            let batch: Vec<Item> = pending.drain(..pending.len().min(BATCH_GET_LIMIT)).collect();
            let mut request_items = serde_json::Map::new();
            request_items.insert(self.table.clone(), json!({ "Keys": batch }));
            let body = json!({ "RequestItems": request_items });

            let response = self.operation("BatchGetItem", &body).await?;
            if !response.status().is_success() {
                return Err(fail_from(response).await);
            }

            let payload: BatchGetResponse = response.json().await?;
            if let Some(items) = payload.responses.get(&self.table) {
                for item in items {
                    match PaperRecord::from_item(item) {
                        Some(record) => records.push(record),
                        None => tracing::warn!("Skipping malformed paper row"),
                    }
                }
            }
            if let Some(unprocessed) = payload.unprocessed_keys.get(&self.table) {
                pending.extend(unprocessed.keys.iter().cloned());
            }
        }
        Ok(records)
    }

    async fn increment_counter(&self) -> Result<i64, DynamoError> {
        let body = json!({
            "TableName": self.table,
            "Key": key_for(COUNTER_KEY),
            "UpdateExpression": "ADD #last :one",
            "ConditionExpression": "attribute_exists(PaperID)",
            "ExpressionAttributeNames": { "#last": COUNTER_ATTRIBUTE },
            "ExpressionAttributeValues": { ":one": { "N": "1" } },
            "ReturnValues": "UPDATED_NEW",
        });
        let response = self.operation("UpdateItem", &body).await?;
        if !response.status().is_success() {
            return Err(fail_from(response).await);
        }

        let payload: UpdateResponse = response.json().await?;
        payload
            .attributes
            .get(COUNTER_ATTRIBUTE)
            .and_then(AttributeValue::as_i64)
            .ok_or_else(|| DynamoError::Malformed("counter update returned no numeric value".into()))
    }

    async fn seed_counter(&self, value: i64) -> Result<(), DynamoError> {
        let mut item = key_for(COUNTER_KEY);
        item.insert(COUNTER_ATTRIBUTE.into(), AttributeValue::number(value));
        let body = json!({
            "TableName": self.table,
            "Item": item,
            "ConditionExpression": "attribute_not_exists(PaperID)",
        });
        let response = self.operation("PutItem", &body).await?;
        if !response.status().is_success() {
            return Err(fail_from(response).await);
        }
        Ok(())
    }

    async fn operation(
        &self,
        target: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, DynamoError> {
        let mut request = self
            .client
            .post(format!("{}/", self.base_url))
            .header("X-Amz-Target", format!("DynamoDB_20120810.{target}"))
            .header("Content-Type", "application/x-amz-json-1.0");
        if let Some(token) = &self.auth_token
            && !token.is_empty()
        {
            request = request.bearer_auth(token);
        }
        Ok(request.json(body).send().await?)
    }
}

fn key_for(id: i64) -> Item {
    let mut key = Item::new();
    key.insert("PaperID".into(), AttributeValue::number(id));
    key
}

async fn fail_from(response: reqwest::Response) -> DynamoError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.contains("ConditionalCheckFailedException") {
        return DynamoError::ConditionFailed;
    }
    let error = DynamoError::UnexpectedStatus { status, body };
    tracing::error!(error = %error, "Metadata store request failed");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use reqwest::Client;
    use serde_json::json;

    fn test_service(base_url: String) -> DynamoService {
        DynamoService {
            client: Client::builder()
                .user_agent("paperstack-test")
                .build()
                .expect("client"),
            base_url,
            table: "papers".into(),
            auth_token: None,
        }
    }

    fn condition_failure() -> serde_json::Value {
        json!({
            "__type": "com.amazonaws.dynamodb.v20120810#ConditionalCheckFailedException",
            "message": "The conditional request failed"
        })
    }

    #[tokio::test]
    async fn put_record_sends_the_item_encoding() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.PutItem")
                    .json_body(json!({
                        "TableName": "papers",
                        "Item": {
                            "PaperID": { "N": "4" },
                            "PaperLink": { "S": "https://papers.example/bucket/a.pdf" },
                            "PaperPDFName": { "S": "a.pdf" },
                            "PaperTxtName": { "S": "a.txt" }
                        }
                    }));
                then.status(200).json_body(json!({}));
            })
            .await;

        let service = test_service(server.base_url());
        let record = PaperRecord {
            paper_id: 4,
            txt_name: "a.txt".into(),
            link: "https://papers.example/bucket/a.pdf".into(),
            pdf_name: "a.pdf".into(),
        };
        service.put_record(&record).await.expect("put");
        mock.assert();
    }

    #[tokio::test]
    async fn allocate_increments_an_existing_counter() {
        let server = MockServer::start_async().await;
        let update = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.UpdateItem")
                    .body_contains("attribute_exists(PaperID)");
                then.status(200).json_body(json!({
                    "Attributes": { "LastPaperID": { "N": "8" } }
                }));
            })
            .await;

        let service = test_service(server.base_url());
        let id = service.allocate_paper_id().await.expect("allocate");

        update.assert();
        assert_eq!(id, 8);
    }

    #[tokio::test]
    async fn allocate_seeds_the_counter_from_the_table_maximum() {
        let server = MockServer::start_async().await;
        let update = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.UpdateItem");
                then.status(400).json_body(condition_failure());
            })
            .await;
        let scan = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.Scan");
                then.status(200).json_body(json!({
                    "Items": [
                        { "PaperID": { "N": "3" } },
                        { "PaperID": { "N": "7" } },
                        { "PaperID": { "N": "2" } }
                    ],
                    "Count": 3,
                    "ScannedCount": 3
                }));
            })
            .await;
        let seed = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.PutItem")
                    .body_contains("attribute_not_exists(PaperID)")
                    .body_contains("\"LastPaperID\":{\"N\":\"8\"}");
                then.status(200).json_body(json!({}));
            })
            .await;

        let service = test_service(server.base_url());
        let id = service.allocate_paper_id().await.expect("allocate");

        update.assert();
        scan.assert();
        seed.assert();
        assert_eq!(id, 8);
    }

    #[tokio::test]
    async fn allocate_gives_up_after_repeated_contention() {
        let server = MockServer::start_async().await;
        let update = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.UpdateItem");
                then.status(400).json_body(condition_failure());
            })
            .await;
        let scan = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.Scan");
                then.status(200)
                    .json_body(json!({ "Items": [], "Count": 0, "ScannedCount": 0 }));
            })
            .await;
        let seed = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.PutItem")
                    .body_contains("attribute_not_exists(PaperID)");
                then.status(400).json_body(condition_failure());
            })
            .await;

        let service = test_service(server.base_url());
        let error = service.allocate_paper_id().await.unwrap_err();

        update.assert_hits(3);
        scan.assert_hits(3);
        seed.assert_hits(3);
        assert!(matches!(error, DynamoError::AllocationContention(3)));
    }

    #[tokio::test]
    async fn max_paper_id_is_none_for_an_empty_table() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.Scan");
                then.status(200)
                    .json_body(json!({ "Items": [], "Count": 0, "ScannedCount": 0 }));
            })
            .await;

        let service = test_service(server.base_url());
        assert_eq!(service.max_paper_id().await.expect("scan"), None);
    }

    #[tokio::test]
    async fn max_paper_id_follows_pagination_and_skips_the_counter_row() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST).path("/").json_body(json!({
                    "TableName": "papers",
                    "ProjectionExpression": "PaperID"
                }));
                then.status(200).json_body(json!({
                    "Items": [
                        { "PaperID": { "N": "3" } },
                        { "PaperID": { "N": "0" } }
                    ],
                    "Count": 2,
                    "ScannedCount": 2,
                    "LastEvaluatedKey": { "PaperID": { "N": "3" } }
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST).path("/").json_body(json!({
                    "TableName": "papers",
                    "ProjectionExpression": "PaperID",
                    "ExclusiveStartKey": { "PaperID": { "N": "3" } }
                }));
                then.status(200).json_body(json!({
                    "Items": [
                        { "PaperID": { "N": "7" } },
                        { "PaperID": { "N": "2" } }
                    ],
                    "Count": 2,
                    "ScannedCount": 2
                }));
            })
            .await;

        let service = test_service(server.base_url());
        let max = service.max_paper_id().await.expect("scan");

        first.assert();
        second.assert();
        assert_eq!(max, Some(7));
    }

    #[tokio::test]
    async fn get_records_deduplicates_ids_and_omits_missing_rows() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "DynamoDB_20120810.BatchGetItem")
                    .json_body(json!({
                        "RequestItems": {
                            "papers": {
                                "Keys": [
                                    { "PaperID": { "N": "3" } },
                                    { "PaperID": { "N": "7" } }
                                ]
                            }
                        }
                    }));
                then.status(200).json_body(json!({
                    "Responses": {
                        "papers": [
                            {
                                "PaperID": { "N": "3" },
                                "PaperTxtName": { "S": "three.txt" },
                                "PaperLink": { "S": "https://papers.example/bucket/three.pdf" },
                                "PaperPDFName": { "S": "three.pdf" }
                            }
                        ]
                    },
                    "UnprocessedKeys": {}
                }));
            })
            .await;

        let service = test_service(server.base_url());
        let records = service
            .get_records(&[3, 7, 3, -1])
            .await
            .expect("batch get");

        mock.assert();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].paper_id, 3);
        assert_eq!(records[0].pdf_name, "three.pdf");
    }

    #[tokio::test]
    async fn get_records_follows_unprocessed_keys() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST).path("/").json_body(json!({
                    "RequestItems": {
                        "papers": { "Keys": [ { "PaperID": { "N": "3" } } ] }
                    }
                }));
                then.status(200).json_body(json!({
                    "Responses": { "papers": [] },
                    "UnprocessedKeys": {
                        "papers": { "Keys": [ { "PaperID": { "N": "9" } } ] }
                    }
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST).path("/").json_body(json!({
                    "RequestItems": {
                        "papers": { "Keys": [ { "PaperID": { "N": "9" } } ] }
                    }
                }));
                then.status(200).json_body(json!({
                    "Responses": {
                        "papers": [
                            {
                                "PaperID": { "N": "9" },
                                "PaperTxtName": { "S": "nine.txt" },
                                "PaperLink": { "S": "" },
                                "PaperPDFName": { "S": "nine.pdf" }
                            }
                        ]
                    },
                    "UnprocessedKeys": {}
                }));
            })
            .await;

        let service = test_service(server.base_url());
        let records = service.get_records(&[3]).await.expect("batch get");

        first.assert();
        second.assert();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].paper_id, 9);
    }
}
