use rlm_protocol::{ErrorCode, RlmError};
use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur during text decomposition
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Strategy options failed validation
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Decomposition would exceed the chunk-count ceiling
    #[error("Chunk count exceeds limit of {limit}")]
    ChunkLimitExceeded { limit: usize },

    /// `by_tokens` was requested without a tokenizer provider
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    /// The tokenizer provider failed mid-operation
    #[error("Tokenizer failure: {0}")]
    TokenizerFailed(String),

    /// `by_regex` pattern rejected or failed to compile
    #[error(transparent)]
    Pattern(#[from] rlm_search::SearchError),
}

impl ChunkerError {
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }
}

impl From<ChunkerError> for RlmError {
    fn from(err: ChunkerError) -> Self {
        match err {
            ChunkerError::InvalidOptions(msg) => RlmError::new(ErrorCode::InvalidInput, msg),
            ChunkerError::ChunkLimitExceeded { limit } => RlmError::new(
                ErrorCode::ChunkLimitExceeded,
                format!("chunk count exceeds limit of {limit}"),
            ),
            ChunkerError::TokenizerUnavailable(msg) | ChunkerError::TokenizerFailed(msg) => {
                RlmError::new(ErrorCode::InvalidInput, msg)
            }
            ChunkerError::Pattern(inner) => inner.into(),
        }
    }
}
