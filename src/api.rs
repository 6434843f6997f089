//! HTTP surface for Paperstack.
//!
//! This module exposes a compact Axum router with five endpoints:
//!
//! - `GET /health` – Liveness probe, returns `{"status": "OK"}`.
//! - `POST /query` – Answer a question from the indexed papers; returns the
//!   generated answer alongside the raw matches (`result`) and referenced
//!   paper records (`dynamo_data`).
//! - `POST /summarize` – Multipart PDF upload; ingests the document and
//!   returns a generated summary plus the allocated paper id.
//! - `POST /addToDynamo` – Replay the local metadata file into the metadata
//!   store.
//! - `POST /getFromDynamo` – Fetch paper records by id.
//!
//! Errors convert to a JSON envelope at this boundary: validation problems
//! become `{"error"}` with status 400, everything else `{"error", "trace"}`
//! with status 500, where `trace` renders the full error chain.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::dynamo::PaperRecord;
use crate::generation::ModelKind;
use crate::pipeline::{PipelineApi, PipelineError, QueryError, RetrievedChunk};

/// Build the HTTP router exposing the ingestion and query API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/query", post(query::<S>))
        .route("/summarize", post(summarize::<S>))
        .route("/addToDynamo", post(add_to_dynamo::<S>))
        .route("/getFromDynamo", post(get_from_dynamo::<S>))
        .layer(cors)
        .with_state(service)
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

/// Request body for `POST /query`.
#[derive(Deserialize)]
struct QueryRequest {
    /// Natural-language question.
    query: String,
    /// Model selector, `llama3.2` or `llama3.3`.
    model: String,
}

/// Success response for `POST /query`.
#[derive(Serialize)]
struct QueryResponse {
    /// Ranked matches straight from the vector index.
    result: Vec<RetrievedChunk>,
    /// Paper records referenced by the strongest matches.
    dynamo_data: Vec<PaperRecord>,
    /// Generated answer text.
    answer: String,
}

/// Answer a question from the indexed papers.
async fn query<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError>
where
    S: PipelineApi,
{
    let model: ModelKind = request.model.parse().map_err(|()| {
        AppError::validation(format!(
            "Unknown model '{}'; expected llama3.2 or llama3.3",
            request.model
        ))
    })?;
    let outcome = service.answer(&request.query, model).await?;
    tracing::info!(
        matches = outcome.matches.len(),
        documents = outcome.documents.len(),
        "Query request completed"
    );
    Ok(Json(QueryResponse {
        result: outcome.matches,
        dynamo_data: outcome.documents,
        answer: outcome.answer,
    }))
}

/// Success response for `POST /summarize`.
#[derive(Serialize)]
struct SummarizeResponse {
    /// Generated summary, or the fixed notice when generation was unavailable.
    message: String,
    /// Identifier allocated for the ingested document.
    paper_id: i64,
}

/// Ingest an uploaded PDF and return a summary of its contents.
async fn summarize<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: PipelineApi,
{
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::validation(format!("Malformed multipart body: {error}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.pdf").to_string();
            let bytes = field.bytes().await.map_err(|error| {
                AppError::validation(format!("Failed to read uploaded file: {error}"))
            })?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let Some((filename, bytes)) = upload else {
        return Err(AppError::validation("No file uploaded"));
    };

    let outcome = service.summarize(bytes, &filename).await?;
    tracing::info!(
        paper_id = outcome.paper_id,
        generated = outcome.generated,
        "Summarize request completed"
    );
    Ok(Json(SummarizeResponse {
        message: outcome.message,
        paper_id: outcome.paper_id,
    }))
}

/// Success response for `POST /addToDynamo`.
#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

/// Replay the local metadata file into the metadata store.
async fn add_to_dynamo<S>(State(service): State<Arc<S>>) -> Result<Json<MessageResponse>, AppError>
where
    S: PipelineApi,
{
    let count = service.backfill_metadata().await?;
    tracing::info!(records = count, "Metadata backfill request completed");
    Ok(Json(MessageResponse {
        message: "All items added successfully!".to_string(),
    }))
}

/// Request body for `POST /getFromDynamo`.
#[derive(Deserialize)]
struct GetFromDynamoRequest {
    #[serde(rename = "PaperIDs")]
    paper_ids: Vec<i64>,
}

/// Success response for `POST /getFromDynamo`.
#[derive(Serialize)]
struct GetFromDynamoResponse {
    data: Vec<PaperRecord>,
}

/// Fetch paper records by id; ids with no row are silently omitted.
async fn get_from_dynamo<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<GetFromDynamoRequest>,
) -> Result<Json<GetFromDynamoResponse>, AppError>
where
    S: PipelineApi,
{
    let records = service.get_documents(&request.paper_ids).await?;
    Ok(Json(GetFromDynamoResponse { data: records }))
}

/// Error envelope produced at the HTTP boundary.
struct AppError {
    status: StatusCode,
    error: String,
    trace: Option<String>,
}

impl AppError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
            trace: None,
        }
    }

    fn internal(error: impl Into<anyhow::Error>) -> Self {
        let error = error.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.to_string(),
            trace: Some(format!("{error:#}")),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::Validation(message) => Self::validation(message),
            PipelineError::Extract(inner) => Self::validation(inner.to_string()),
            other => Self::internal(other),
        }
    }
}

impl From<QueryError> for AppError {
    fn from(error: QueryError) -> Self {
        Self::internal(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, "Request failed");
        } else {
            tracing::warn!(status = %self.status, error = %self.error, "Request rejected");
        }
        let mut body = serde_json::Map::new();
        body.insert("error".into(), json!(self.error));
        if let Some(trace) = self.trace {
            body.insert("trace".into(), json!(trace));
        }
        (self.status, Json(serde_json::Value::Object(body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationError;
    use crate::pipeline::{QueryOutcome, SummarizeOutcome};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Clone, Debug)]
    struct AnswerCall {
        query: String,
        model: ModelKind,
    }

    #[derive(Clone, Debug)]
    struct SummarizeCall {
        filename: String,
        byte_len: usize,
    }

    struct StubPipelineService {
        answer_calls: Arc<Mutex<Vec<AnswerCall>>>,
        summarize_calls: Arc<Mutex<Vec<SummarizeCall>>>,
        backfill_calls: Arc<AtomicUsize>,
        documents: Vec<PaperRecord>,
        fail_answer: bool,
    }

    impl StubPipelineService {
        fn new() -> Self {
            Self {
                answer_calls: Arc::new(Mutex::new(Vec::new())),
                summarize_calls: Arc::new(Mutex::new(Vec::new())),
                backfill_calls: Arc::new(AtomicUsize::new(0)),
                documents: vec![PaperRecord {
                    paper_id: 3,
                    txt_name: "three.txt".into(),
                    link: "https://papers.example/bucket/three.pdf".into(),
                    pdf_name: "three.pdf".into(),
                }],
                fail_answer: false,
            }
        }
    }

    #[async_trait]
    impl PipelineApi for StubPipelineService {
        async fn summarize(
            &self,
            pdf_bytes: Vec<u8>,
            filename: &str,
        ) -> Result<SummarizeOutcome, PipelineError> {
            self.summarize_calls.lock().await.push(SummarizeCall {
                filename: filename.to_string(),
                byte_len: pdf_bytes.len(),
            });
            Ok(SummarizeOutcome {
                paper_id: 11,
                message: "summary text".into(),
                generated: true,
            })
        }

        async fn answer(
            &self,
            query_text: &str,
            model: ModelKind,
        ) -> Result<QueryOutcome, QueryError> {
            self.answer_calls.lock().await.push(AnswerCall {
                query: query_text.to_string(),
                model,
            });
            if self.fail_answer {
                return Err(QueryError::Generation(GenerationError::GenerationFailed(
                    "model exploded".into(),
                )));
            }
            Ok(QueryOutcome {
                answer: "stub answer".into(),
                matches: vec![RetrievedChunk {
                    id: "paper_3#chunk_0".into(),
                    score: 0.75,
                    paper_id: Some(3),
                    text: Some("passage".into()),
                }],
                documents: self.documents.clone(),
            })
        }

        async fn get_documents(&self, ids: &[i64]) -> Result<Vec<PaperRecord>, PipelineError> {
            if ids.is_empty() {
                return Err(PipelineError::Validation(
                    "PaperIDs must be a non-empty list of integers".into(),
                ));
            }
            Ok(self
                .documents
                .iter()
                .filter(|record| ids.contains(&record.paper_id))
                .cloned()
                .collect())
        }

        async fn backfill_metadata(&self) -> Result<usize, PipelineError> {
            self.backfill_calls.fetch_add(1, Ordering::SeqCst);
            Ok(2)
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    fn json_request(uri: &str, payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = create_router(Arc::new(StubPipelineService::new()));
        let request = Request::builder()
            .method(Method::GET)
            .uri("/health")
            .body(Body::empty())
            .expect("request");

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "OK" }));
    }

    #[tokio::test]
    async fn query_parses_the_model_and_returns_the_envelope() {
        let service = Arc::new(StubPipelineService::new());
        let app = create_router(service.clone());

        let request = json_request(
            "/query",
            json!({ "query": "what is attention?", "model": "llama3.3" }),
        );
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "stub answer");
        assert_eq!(body["result"][0]["id"], "paper_3#chunk_0");
        assert_eq!(body["dynamo_data"][0]["PaperID"], 3);

        let calls = service.answer_calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, "what is attention?");
        assert_eq!(calls[0].model, ModelKind::Llama33);
    }

    #[tokio::test]
    async fn query_rejects_unknown_models() {
        let service = Arc::new(StubPipelineService::new());
        let app = create_router(service.clone());

        let request = json_request("/query", json!({ "query": "q", "model": "gpt-5" }));
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error").contains("Unknown model"));
        assert!(body.get("trace").is_none());
        assert!(service.answer_calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn query_failures_carry_a_trace() {
        let mut stub = StubPipelineService::new();
        stub.fail_answer = true;
        let app = create_router(Arc::new(stub));

        let request = json_request("/query", json!({ "query": "q", "model": "llama3.2" }));
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().expect("error").contains("Generation error"));
        assert!(body["trace"].as_str().expect("trace").contains("model exploded"));
    }

    #[tokio::test]
    async fn summarize_accepts_a_pdf_upload() {
        let service = Arc::new(StubPipelineService::new());
        let app = create_router(service.clone());

        let boundary = "paperstack-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"paper.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n\
             %PDF-1.4 fake content\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/summarize")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request");

        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "summary text", "paper_id": 11 }));

        let calls = service.summarize_calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filename, "paper.pdf");
        assert_eq!(calls[0].byte_len, "%PDF-1.4 fake content".len());
    }

    #[tokio::test]
    async fn summarize_requires_a_file_field() {
        let service = Arc::new(StubPipelineService::new());
        let app = create_router(service.clone());

        let boundary = "paperstack-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
             no file here\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/summarize")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request");

        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No file uploaded" }));
        assert!(service.summarize_calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn add_to_dynamo_reports_success() {
        let service = Arc::new(StubPipelineService::new());
        let app = create_router(service.clone());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/addToDynamo")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "All items added successfully!" }));
        assert_eq!(service.backfill_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_from_dynamo_returns_matching_records() {
        let app = create_router(Arc::new(StubPipelineService::new()));

        let request = json_request("/getFromDynamo", json!({ "PaperIDs": [3, 99] }));
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["PaperID"], 3);
        assert_eq!(data[0]["PaperPDFName"], "three.pdf");
    }

    #[tokio::test]
    async fn get_from_dynamo_rejects_an_empty_id_list() {
        let app = create_router(Arc::new(StubPipelineService::new()));

        let request = json_request("/getFromDynamo", json!({ "PaperIDs": [] }));
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .expect("error")
                .contains("non-empty list")
        );
    }
}
