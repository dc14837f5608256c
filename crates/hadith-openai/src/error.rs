//! Error types for the OpenAI client.

use hadith_core::error::ExternalError;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failed before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded the client timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-2xx response
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    /// Invalid JSON or unexpected response shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for OpenAIError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OpenAIError::Timeout(e.to_string())
        } else if e.is_decode() {
            OpenAIError::Parse(e.to_string())
        } else {
            OpenAIError::Network(e.to_string())
        }
    }
}

impl From<OpenAIError> for ExternalError {
    fn from(e: OpenAIError) -> Self {
        let message = e.to_string();
        match e {
            OpenAIError::Timeout(_) => ExternalError::Timeout(message),
            OpenAIError::Network(_) | OpenAIError::Config(_) => ExternalError::Unavailable(message),
            OpenAIError::Parse(_) => ExternalError::MalformedOutput(message),
            OpenAIError::Api { status, .. } => match status {
                StatusCode::TOO_MANY_REQUESTS => ExternalError::RateLimited(message),
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ExternalError::Timeout(message),
                s if s.is_client_error() => ExternalError::InvalidInput(message),
                _ => ExternalError::Unavailable(message),
            },
        }
    }
}
