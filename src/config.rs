use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Paperstack server.
#[derive(Debug)]
pub struct Config {
    /// Base URL of the Pinecone index that stores chunk embeddings.
    pub pinecone_url: String,
    /// Optional API key sent with every Pinecone request.
    pub pinecone_api_key: Option<String>,
    /// Base URL of the DynamoDB-compatible metadata store.
    pub dynamo_url: String,
    /// Table that holds one record per ingested paper.
    pub dynamo_table: String,
    /// Optional bearer token for the metadata store.
    pub dynamo_auth_token: Option<String>,
    /// Base URL of the object storage endpoint for uploaded PDFs.
    pub storage_url: String,
    /// Bucket that receives uploaded PDFs.
    pub storage_bucket: String,
    /// Optional bearer token for object storage.
    pub storage_auth_token: Option<String>,
    /// Base URL of the embeddings API.
    pub embedding_url: String,
    /// Optional API key for the embeddings API.
    pub embedding_api_key: Option<String>,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the local completion runtime used for `llama3.2`.
    pub llama_url: String,
    /// Model tag requested from the local completion runtime.
    pub llama_model: String,
    /// Optional bearer token forwarded to the local completion runtime.
    pub llama_auth_token: Option<String>,
    /// Base URL of the hosted chat-completions API used for `llama3.3`.
    pub chat_url: String,
    /// Optional API key for the hosted chat-completions API.
    pub chat_api_key: Option<String>,
    /// Model identifier requested from the hosted chat-completions API.
    pub chat_model: String,
    /// Maximum chunk length, in characters, produced by the splitter.
    pub chunk_size: usize,
    /// Characters of trailing context carried between adjacent chunks.
    pub chunk_overlap: usize,
    /// Number of nearest neighbours requested per retrieval.
    pub top_k: usize,
    /// Directory that receives extracted plain-text artifacts.
    pub artifacts_dir: String,
    /// JSON file consumed by the metadata backfill operation.
    pub metadata_file: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            pinecone_url: load_env("PINECONE_URL")?,
            pinecone_api_key: load_env_optional("PINECONE_API_KEY"),
            dynamo_url: load_env("DYNAMO_URL")?,
            dynamo_table: load_env("TABLE_NAME")?,
            dynamo_auth_token: load_env_optional("DYNAMO_AUTH_TOKEN"),
            storage_url: load_env("STORAGE_URL")?,
            storage_bucket: load_env("STORAGE_BUCKET")?,
            storage_auth_token: load_env_optional("STORAGE_AUTH_TOKEN"),
            embedding_url: load_env_or("EMBEDDING_URL", "https://api.openai.com"),
            embedding_api_key: load_env_optional("EMBEDDING_API_KEY"),
            embedding_model: load_env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
            embedding_dimension: load_env_parsed_or("EMBEDDING_DIMENSION", 1536)?,
            llama_url: load_env("LLAMA_URL")?,
            llama_model: load_env_or("LLAMA_MODEL", "llama3.2:3b"),
            llama_auth_token: load_env_optional("LLAMA_AUTH_TOKEN"),
            chat_url: load_env("CHAT_URL")?,
            chat_api_key: load_env_optional("CHAT_API_KEY"),
            chat_model: load_env_or("CHAT_MODEL", "meta-llama/Llama-3.3-70B-Instruct-Turbo"),
            chunk_size: load_env_parsed_or("CHUNK_SIZE", 4000)?,
            chunk_overlap: load_env_parsed_or("CHUNK_OVERLAP", 500)?,
            top_k: load_env_parsed_or("TOP_K", 10)?,
            artifacts_dir: load_env_or("ARTIFACTS_DIR", "/tmp/pdf_texts"),
            metadata_file: load_env_or("METADATA_FILE", "pdf_metadata.json"),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };
        if config.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::InvalidValue("CHUNK_OVERLAP".into()));
        }
        Ok(config)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_env_parsed_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        pinecone_url = %config.pinecone_url,
        dynamo_url = %config.dynamo_url,
        table = %config.dynamo_table,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
