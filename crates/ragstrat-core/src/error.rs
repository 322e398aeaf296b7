//! Error types for ragstrat

use thiserror::Error;

/// Result type alias using RagStratError
pub type Result<T> = std::result::Result<T, RagStratError>;

/// Error type alias for convenience
pub type Error = RagStratError;

/// Main error type for ragstrat
#[derive(Debug, Error)]
pub enum RagStratError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The completion endpoint answered with an error status or an unusable body
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RagStratError {
    /// True for failures raised while talking to the completion endpoint
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Provider(_) | Self::Llm(_))
    }
}
