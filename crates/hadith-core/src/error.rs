use thiserror::Error;

use crate::types::CollectionName;

/// Configuration and local I/O errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a call to an external collaborator (embedding service, vector
/// index, reasoning model).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed output: {0}")]
    MalformedOutput(String),
}

impl ExternalError {
    /// Transient failures are worth retrying; the rest are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExternalError::RateLimited(_) | ExternalError::Timeout(_) | ExternalError::Unavailable(_)
        )
    }
}

pub type ExternalResult<T> = std::result::Result<T, ExternalError>;

/// How a request-level failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The same request may succeed later.
    TransientExternal,
    /// The request itself is wrong; retrying will not help.
    PermanentInput,
    /// Nothing could be produced for this request.
    TotalFailure,
}

/// Errors surfaced by `handle_query`. Partial degradation never ends up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid collections: {}. Available: {}", .requested.join(", "), .available.join(", "))]
    UnknownCollections {
        requested: Vec<CollectionName>,
        available: Vec<CollectionName>,
    },

    #[error("No hadith collections found")]
    NoCollections,

    #[error("Collection registry unavailable: {0}")]
    Registry(#[source] ExternalError),

    #[error("Failed to create embedding: {0}")]
    Embedding(#[source] ExternalError),

    #[error("Search failed in all {attempted} collections")]
    AllCollectionsFailed { attempted: usize },
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::InvalidQuery(_) | PipelineError::UnknownCollections { .. } => ErrorClass::PermanentInput,
            PipelineError::Embedding(e) | PipelineError::Registry(e) if e.is_transient() => {
                ErrorClass::TransientExternal
            }
            PipelineError::Embedding(ExternalError::InvalidInput(_)) => ErrorClass::PermanentInput,
            PipelineError::NoCollections
            | PipelineError::Registry(_)
            | PipelineError::Embedding(_)
            | PipelineError::AllCollectionsFailed { .. } => ErrorClass::TotalFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(ExternalError::RateLimited("429".into()).is_transient());
        assert!(ExternalError::Timeout("slow".into()).is_transient());
        assert!(ExternalError::Unavailable("503".into()).is_transient());
        assert!(!ExternalError::InvalidInput("empty".into()).is_transient());
        assert!(!ExternalError::MalformedOutput("json".into()).is_transient());
    }

    #[test]
    fn pipeline_error_classes() {
        assert_eq!(PipelineError::InvalidQuery("empty".into()).class(), ErrorClass::PermanentInput);
        assert_eq!(
            PipelineError::Embedding(ExternalError::RateLimited("429".into())).class(),
            ErrorClass::TransientExternal
        );
        assert_eq!(
            PipelineError::Embedding(ExternalError::InvalidInput("too long".into())).class(),
            ErrorClass::PermanentInput
        );
        assert_eq!(PipelineError::AllCollectionsFailed { attempted: 3 }.class(), ErrorClass::TotalFailure);
    }

    #[test]
    fn unknown_collections_message_lists_both_sides() {
        let err = PipelineError::UnknownCollections {
            requested: vec!["hadith-foo".into()],
            available: vec!["hadith-bukhari".into(), "hadith-muslim".into()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid collections: hadith-foo. Available: hadith-bukhari, hadith-muslim"
        );
    }
}
