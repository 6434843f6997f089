//! Answer and summary generation via pluggable LLM providers.
//!
//! Two providers exist: a local completion runtime (the `llama3.2` route) and
//! a hosted chat-completions API (the `llama3.3` route). Callers pick one via
//! [`ModelKind`] and [`GeneratorSet`] resolves it to a concrete provider, so
//! no model-name branching leaks into the pipeline. The prompt templates live
//! here because both providers must receive identical instructions.

mod chat;
mod completion;

pub use chat::ChatGenerator;
pub use completion::CompletionGenerator;

use async_trait::async_trait;
use thiserror::Error;

/// System instruction given to the chat provider.
pub(crate) const SYSTEM_PROMPT: &str = "You are a helpful assistant for conducting research that answers questions based on provided context. Don't mention anything about the context when answering";

/// Errors surfaced while generating an answer or summary.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider was unreachable.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Model selector accepted by the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Local completion runtime (`llama3.2`).
    Llama32,
    /// Hosted chat-completions model (`llama3.3`).
    Llama33,
}

impl std::str::FromStr for ModelKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "llama3.2" => Ok(Self::Llama32),
            "llama3.3" => Ok(Self::Llama33),
            _ => Err(()),
        }
    }
}

/// Interface implemented by text generation providers.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate text for an assembled prompt.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// The provider pair the pipeline dispatches between.
pub struct GeneratorSet {
    completion: Box<dyn AnswerGenerator>,
    chat: Box<dyn AnswerGenerator>,
}

impl GeneratorSet {
    /// Bundle a completion provider and a chat provider.
    pub fn new(completion: Box<dyn AnswerGenerator>, chat: Box<dyn AnswerGenerator>) -> Self {
        Self { completion, chat }
    }

    /// Pick the provider backing `model`.
    pub fn select(&self, model: ModelKind) -> &dyn AnswerGenerator {
        match model {
            ModelKind::Llama32 => self.completion.as_ref(),
            ModelKind::Llama33 => self.chat.as_ref(),
        }
    }

    /// Provider used for ingest-time summaries.
    pub fn summarizer(&self) -> &dyn AnswerGenerator {
        self.completion.as_ref()
    }
}

/// Assemble the retrieval-augmented answer prompt.
pub fn build_answer_prompt(query: &str, context: &str) -> String {
    format!(
        "This is my question: {query}, please answer the question based on the following context: {context}\n\nDo not mention that you have been given context\n"
    )
}

/// Assemble the ingest-time summary prompt.
pub fn build_summary_prompt(text: &str) -> String {
    format!(
        "Query: Summarize the content clearly and concisely with a maximum word limit of 300 words.\nContext: {text}\n\nProvide a detailed summary based on the context.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl AnswerGenerator for Fixed {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn model_kind_parses_known_tokens() {
        assert_eq!("llama3.2".parse(), Ok(ModelKind::Llama32));
        assert_eq!("llama3.3".parse(), Ok(ModelKind::Llama33));
        assert!("gemini1.5".parse::<ModelKind>().is_err());
        assert!("".parse::<ModelKind>().is_err());
    }

    #[tokio::test]
    async fn generator_set_dispatches_on_model_kind() {
        let set = GeneratorSet::new(Box::new(Fixed("completion")), Box::new(Fixed("chat")));
        let local = set.select(ModelKind::Llama32).generate("x").await.unwrap();
        let hosted = set.select(ModelKind::Llama33).generate("x").await.unwrap();
        assert_eq!(local, "completion");
        assert_eq!(hosted, "chat");
    }

    #[test]
    fn answer_prompt_embeds_query_and_context() {
        let prompt = build_answer_prompt("what is attention?", "Attention is all you need.");
        assert!(prompt.contains("This is my question: what is attention?"));
        assert!(prompt.contains("context: Attention is all you need."));
        assert!(prompt.contains("Do not mention that you have been given context"));
    }

    #[test]
    fn summary_prompt_requests_a_bounded_summary() {
        let prompt = build_summary_prompt("full paper text");
        assert!(prompt.contains("maximum word limit of 300 words"));
        assert!(prompt.contains("Context: full paper text"));
    }
}
