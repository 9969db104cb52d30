use thiserror::Error;

/// Errors from local image handling. Never retried.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Image file not found: {0}")]
    NotFound(String),

    #[error("Image too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported image format: {ext} (allowed: {allowed})")]
    UnsupportedFormat { ext: String, allowed: String },

    #[error("Corrupt or undecodable image: {0}")]
    Corrupt(String),

    #[error("Failed to read or store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the LLM provider layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Provider reply contained no poems")]
    EmptyResult,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),
}

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Database connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Invalid {
        path: String,
        source: serde_json::Error,
    },
}

/// Top-level error for one pipeline invocation.
///
/// Each variant maps to a stable process exit code so callers can
/// distinguish failure categories without parsing messages.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("At least one of a positive prompt or an image is required")]
    MissingInput,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AgentError {
    /// Exit code for the CLI: 0 success, 1 invalid arguments/media,
    /// 2 provider failure, 3 persistence failure, 4 unclassified.
    pub fn exit_code(&self) -> i32 {
        match self {
            AgentError::MissingInput | AgentError::Media(_) => 1,
            AgentError::Provider(_) => 2,
            AgentError::Record(_) => 3,
            AgentError::Config(_) => 4,
        }
    }
}
