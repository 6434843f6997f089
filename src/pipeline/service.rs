//! Pipeline service coordinating extraction, chunking, embedding, indexing,
//! and answer generation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::get_config,
    dynamo::{DynamoService, PaperRecord},
    embedding::{EmbeddingClient, EmbeddingClientError, OpenAiEmbeddingClient},
    generation::{
        ChatGenerator, CompletionGenerator, GeneratorSet, ModelKind, build_answer_prompt,
        build_summary_prompt,
    },
    metrics::{MetricsSnapshot, ServiceMetrics},
    pinecone::{ChunkMetadata, PineconeService, VectorRecord},
    pipeline::{
        chunking::chunk_text,
        extract::{clean_filename, pdf_to_text, write_text_artifact},
        mappers::{context_from_matches, distinct_paper_ids, map_match},
        types::{
            IngestOutcome, NO_MATCH_ANSWER, PipelineError, QueryError, QueryOutcome,
            StorageOutcome, SummarizeOutcome,
        },
    },
    storage::StorageService,
};

/// Matches considered when collecting referenced documents.
const DOCUMENT_MATCH_WINDOW: usize = 5;
/// Matches whose text is concatenated into the answer context.
const CONTEXT_MATCH_WINDOW: usize = 3;

/// Notice returned when ingestion succeeded but the summary model failed.
const SUMMARY_FALLBACK: &str =
    "Document ingested successfully, but summary generation is currently unavailable.";

/// Coordinates both pipelines over injected service handles.
///
/// The service owns long-lived handles to the embedding client, vector index,
/// metadata store, object storage, and the generator pair, so every HTTP
/// handler reuses the same components. Construct it once near process start
/// and share it through an `Arc`.
pub struct PipelineService {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    pinecone: PineconeService,
    dynamo: DynamoService,
    storage: StorageService,
    generators: GeneratorSet,
    metrics: Arc<ServiceMetrics>,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Ingest a PDF and produce a summary of its contents.
    async fn summarize(
        &self,
        pdf_bytes: Vec<u8>,
        filename: &str,
    ) -> Result<SummarizeOutcome, PipelineError>;

    /// Answer a question from the indexed papers with the selected model.
    async fn answer(&self, query_text: &str, model: ModelKind)
        -> Result<QueryOutcome, QueryError>;

    /// Fetch the records for the given paper ids.
    async fn get_documents(&self, ids: &[i64]) -> Result<Vec<PaperRecord>, PipelineError>;

    /// Replay the local metadata file into the metadata store.
    async fn backfill_metadata(&self) -> Result<usize, PipelineError>;
}

impl PipelineService {
    /// Assemble a service from already-constructed dependencies.
    pub fn new(
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
        pinecone: PineconeService,
        dynamo: DynamoService,
        storage: StorageService,
        generators: GeneratorSet,
    ) -> Self {
        Self {
            embedding_client,
            pinecone,
            dynamo,
            storage,
            generators,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    /// Build every dependency from the loaded configuration.
    pub async fn from_config() -> Self {
        let config = get_config();
        let embedding_client: Box<dyn EmbeddingClient + Send + Sync> =
            Box::new(OpenAiEmbeddingClient::new(
                &config.embedding_url,
                config.embedding_api_key.clone(),
                &config.embedding_model,
            ));
        let pinecone = PineconeService::new(&config.pinecone_url, config.pinecone_api_key.clone())
            .expect("Failed to initialize Pinecone client");
        let dynamo = DynamoService::new(
            &config.dynamo_url,
            &config.dynamo_table,
            config.dynamo_auth_token.clone(),
        )
        .expect("Failed to initialize metadata store client");
        let storage = StorageService::new(
            &config.storage_url,
            &config.storage_bucket,
            config.storage_auth_token.clone(),
        )
        .expect("Failed to initialize object storage client");
        let generators = GeneratorSet::new(
            Box::new(CompletionGenerator::new(
                &config.llama_url,
                &config.llama_model,
                config.llama_auth_token.clone(),
            )),
            Box::new(ChatGenerator::new(
                &config.chat_url,
                &config.chat_model,
                config.chat_api_key.clone(),
            )),
        );

        let service = Self::new(embedding_client, pinecone, dynamo, storage, generators);
        service.probe_index().await;
        service
    }

    /// Log index statistics and warn when the index dimension drifts from the
    /// configured embedding dimension. Failures are non-fatal; the index may
    /// simply not be up yet.
    async fn probe_index(&self) {
        match self.pinecone.describe_index_stats().await {
            Ok(stats) => {
                let expected = get_config().embedding_dimension;
                if let Some(dimension) = stats.dimension
                    && dimension != expected
                {
                    tracing::warn!(
                        index_dimension = dimension,
                        configured = expected,
                        "Index dimension differs from the configured embedding dimension"
                    );
                }
                tracing::info!(
                    vectors = ?stats.total_vector_count,
                    "Vector index reachable"
                );
            }
            Err(error) => tracing::warn!(error = %error, "Vector index statistics probe failed"),
        }
    }

    /// Ingest one uploaded PDF end to end and return the allocated paper id
    /// alongside per-stage results.
    pub async fn ingest(
        &self,
        pdf_bytes: Vec<u8>,
        filename: &str,
    ) -> Result<IngestOutcome, PipelineError> {
        let text = pdf_to_text(&pdf_bytes)?;
        self.ingest_text(&text, pdf_bytes, filename).await
    }

    /// Ingest a PDF and produce a summary of its contents.
    ///
    /// Summary generation runs after ingestion has fully completed, so a
    /// generator failure degrades to a fixed notice instead of discarding the
    /// already-indexed document.
    pub async fn summarize(
        &self,
        pdf_bytes: Vec<u8>,
        filename: &str,
    ) -> Result<SummarizeOutcome, PipelineError> {
        let text = pdf_to_text(&pdf_bytes)?;
        let outcome = self.ingest_text(&text, pdf_bytes, filename).await?;
        let (message, generated) = self.summary_message(&text, outcome.paper_id).await;
        Ok(SummarizeOutcome {
            paper_id: outcome.paper_id,
            message,
            generated,
        })
    }

    async fn ingest_text(
        &self,
        text: &str,
        pdf_bytes: Vec<u8>,
        filename: &str,
    ) -> Result<IngestOutcome, PipelineError> {
        let config = get_config();

        let storage = match self.storage.upload_pdf(filename, pdf_bytes).await {
            Ok(url) => StorageOutcome::Uploaded { url },
            Err(error) => {
                tracing::warn!(error = %error, filename, "PDF upload failed; continuing without a link");
                StorageOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        };

        let stem = clean_filename(filename);
        let text_artifact_name = format!("{stem}.txt");
        let artifact_error = match write_text_artifact(&config.artifacts_dir, &stem, text) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "Text artifact written");
                None
            }
            Err(error) => {
                tracing::warn!(error = %error, "Text artifact write failed");
                Some(error.to_string())
            }
        };

        let paper_id = self.dynamo.allocate_paper_id().await?;
        let chunks = chunk_text(text, config.chunk_size, config.chunk_overlap)?;
        let chunk_count = chunks.len();

        let mut records = Vec::with_capacity(chunk_count);
        let mut failed_chunks = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            match self.embed_with_retry(chunk).await {
                Ok(values) => records.push(VectorRecord {
                    id: format!("paper_{paper_id}#chunk_{index}"),
                    values,
                    metadata: ChunkMetadata {
                        paper_id,
                        chunk_id: format!("chunk_{index}"),
                        chunk: chunk.clone(),
                    },
                }),
                Err(error) => {
                    tracing::warn!(error = %error, index, "Chunk embedding failed twice; skipping");
                    failed_chunks.push(index);
                }
            }
        }
        let embedded = records.len();
        let upserted = self.pinecone.upsert(records).await?;

        let record = PaperRecord {
            paper_id,
            txt_name: text_artifact_name.clone(),
            link: storage.link().to_string(),
            pdf_name: filename.to_string(),
        };
        self.dynamo.put_record(&record).await?;

        self.metrics.record_paper(upserted as u64);
        tracing::info!(
            paper_id,
            chunks = chunk_count,
            embedded,
            upserted,
            failed = failed_chunks.len(),
            "Paper ingested"
        );
        let totals = self.metrics.snapshot();
        tracing::debug!(
            papers = totals.papers_ingested,
            chunks = totals.chunks_indexed,
            queries = totals.queries_answered,
            "Service totals"
        );

        Ok(IngestOutcome {
            paper_id,
            chunk_count,
            embedded,
            failed_chunks,
            upserted,
            storage,
            text_artifact_name,
            artifact_error,
        })
    }

    /// Answer a question from the indexed papers.
    pub async fn answer(
        &self,
        query_text: &str,
        model: ModelKind,
    ) -> Result<QueryOutcome, QueryError> {
        let config = get_config();
        let vector = self.embedding_client.embed(query_text).await?;
        let expected = config.embedding_dimension;
        if vector.len() != expected {
            return Err(QueryError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let matches = self.pinecone.query(vector, config.top_k).await?;
        self.metrics.record_query();
        if matches.is_empty() {
            tracing::info!("Query matched nothing; returning the fixed answer");
            return Ok(QueryOutcome {
                answer: NO_MATCH_ANSWER.to_string(),
                matches: Vec::new(),
                documents: Vec::new(),
            });
        }

        let ids = distinct_paper_ids(&matches, DOCUMENT_MATCH_WINDOW);
        let documents = self.dynamo.get_records(&ids).await?;

        let context = context_from_matches(&matches, CONTEXT_MATCH_WINDOW);
        let prompt = build_answer_prompt(query_text, &context);
        let answer = self.generators.select(model).generate(&prompt).await?;

        tracing::info!(
            matches = matches.len(),
            documents = documents.len(),
            model = ?model,
            "Query answered"
        );
        Ok(QueryOutcome {
            answer,
            matches: matches.into_iter().map(map_match).collect(),
            documents,
        })
    }

    /// Fetch the records for `ids`; ids with no row are silently omitted.
    pub async fn get_documents(&self, ids: &[i64]) -> Result<Vec<PaperRecord>, PipelineError> {
        if ids.is_empty() {
            return Err(PipelineError::Validation(
                "PaperIDs must be a non-empty list of integers".into(),
            ));
        }
        Ok(self.dynamo.get_records(ids).await?)
    }

    /// Replay the configured local metadata file into the metadata store.
    pub async fn backfill_metadata(&self) -> Result<usize, PipelineError> {
        let path = get_config().metadata_file.clone();
        self.backfill_from(&path).await
    }

    async fn backfill_from(&self, path: &str) -> Result<usize, PipelineError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|error| {
            PipelineError::Validation(format!("Cannot read metadata file {path}: {error}"))
        })?;
        let entries: std::collections::BTreeMap<String, (i64, String, String)> =
            serde_json::from_str(&raw).map_err(|error| {
                PipelineError::Validation(format!("Malformed metadata file {path}: {error}"))
            })?;

        let count = entries.len();
        for (stem, (paper_id, link, pdf_name)) in entries {
            let record = PaperRecord {
                paper_id,
                txt_name: format!("{stem}.txt"),
                link,
                pdf_name,
            };
            self.dynamo.put_record(&record).await?;
        }
        tracing::info!(records = count, file = path, "Metadata backfill completed");
        Ok(count)
    }

    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        match self.embedding_client.embed(text).await {
            Ok(values) => Ok(values),
            Err(first) => {
                tracing::debug!(error = %first, "Embedding failed; retrying once");
                self.embedding_client.embed(text).await
            }
        }
    }

    async fn summary_message(&self, text: &str, paper_id: i64) -> (String, bool) {
        let prompt = build_summary_prompt(text);
        match self.generators.summarizer().generate(&prompt).await {
            Ok(summary) => (summary, true),
            Err(error) => {
                tracing::warn!(error = %error, paper_id, "Summary generation failed after ingestion");
                (SUMMARY_FALLBACK.to_string(), false)
            }
        }
    }

    /// Current ingestion and query counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn summarize(
        &self,
        pdf_bytes: Vec<u8>,
        filename: &str,
    ) -> Result<SummarizeOutcome, PipelineError> {
        PipelineService::summarize(self, pdf_bytes, filename).await
    }

    async fn answer(
        &self,
        query_text: &str,
        model: ModelKind,
    ) -> Result<QueryOutcome, QueryError> {
        PipelineService::answer(self, query_text, model).await
    }

    async fn get_documents(&self, ids: &[i64]) -> Result<Vec<PaperRecord>, PipelineError> {
        PipelineService::get_documents(self, ids).await
    }

    async fn backfill_metadata(&self) -> Result<usize, PipelineError> {
        PipelineService::backfill_metadata(self).await
    }
}
