//! Local completion runtime provider speaking the `/api/generate` protocol.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{AnswerGenerator, GenerationError};

/// Provider backed by an Ollama-style completion runtime.
pub struct CompletionGenerator {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) auth_token: Option<String>,
}

impl CompletionGenerator {
    /// Create a provider for the runtime at `base_url` serving `model`.
    pub fn new(base_url: &str, model: &str, auth_token: Option<String>) -> Self {
        let http = Client::builder()
            .user_agent("paperstack/0.1")
            .build()
            .expect("Failed to construct reqwest::Client for generation");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            auth_token,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl AnswerGenerator for CompletionGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let mut request = self.http.post(self.endpoint()).json(&payload);
        if let Some(token) = &self.auth_token
            && !token.is_empty()
        {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|error| {
            GenerationError::ProviderUnavailable(format!(
                "failed to reach completion runtime at {}: {error}",
                self.base_url
            ))
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationError::ProviderUnavailable(format!(
                "completion endpoint {} returned 404; is the model pulled?",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::GenerationFailed(format!(
                "completion runtime returned {status}: {body}"
            )));
        }

        let body: CompletionResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!(
                "failed to decode completion response: {error}"
            ))
        })?;

        if !body.done {
            return Err(GenerationError::InvalidResponse(
                "completion response incomplete (streaming not supported)".to_string(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn generator_for(server: &MockServer) -> CompletionGenerator {
        CompletionGenerator::new(&server.base_url(), "llama3.2:3b", Some("token-123".into()))
    }

    #[tokio::test]
    async fn generate_posts_the_prompt_and_trims_the_reply() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .header("authorization", "Bearer token-123")
                    .json_body(json!({
                        "model": "llama3.2:3b",
                        "prompt": "Summarize this.",
                        "stream": false,
                    }));
                then.status(200)
                    .json_body(json!({ "response": "  A concise summary.\n", "done": true }));
            })
            .await;

        let generator = generator_for(&server);
        let answer = generator.generate("Summarize this.").await.unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "A concise summary.");
    }

    #[tokio::test]
    async fn generate_surfaces_runtime_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("model exploded");
            })
            .await;

        let generator = generator_for(&server);
        let error = generator.generate("anything").await.unwrap_err();

        assert!(matches!(error, GenerationError::GenerationFailed(_)));
        assert!(error.to_string().contains("model exploded"));
    }

    #[tokio::test]
    async fn generate_rejects_streaming_replies() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let generator = generator_for(&server);
        let error = generator.generate("anything").await.unwrap_err();

        assert!(matches!(error, GenerationError::InvalidResponse(_)));
    }
}
