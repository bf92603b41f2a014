use thiserror::Error;

/// Errors that can occur while answering a question.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The model refused the prompt; resending it gets the same answer.
    #[error("Prompt blocked: {0}")]
    Blocked(String),

    /// The upstream call gave up waiting. Rendered with the bare message.
    #[error("{0}")]
    Timeout(String),
}

impl Error {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth(message.into())
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Error::Timeout(message.into())
    }

    /// Whether the error is a configuration problem rather than a failed generation.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Provider { .. } => true,
            Error::Streaming(_) => true,
            Error::RateLimit => true,
            Error::Timeout(_) => true,
            Error::Auth(_) => false,
            Error::Serialization(_) => false,
            Error::Config(_) => false,
            Error::ModelNotAvailable(_) => false,
            Error::InvalidRequest(_) => false,
            Error::Blocked(_) => false,
        }
    }
}
