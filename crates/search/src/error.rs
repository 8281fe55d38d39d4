use rlm_protocol::{ErrorCode, RlmError};
use thiserror::Error;

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while validating or executing a search.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Pattern rejected before compilation (ReDoS shape, length) or by the
    /// regex compiler itself.
    #[error("Invalid regex: {0}")]
    InvalidRegex(String),

    /// Execution exceeded the wall-clock budget.
    #[error("Regex execution exceeded {budget_ms}ms budget")]
    Timeout { budget_ms: u64 },
}

impl SearchError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRegex(msg.into())
    }
}

impl From<SearchError> for RlmError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidRegex(msg) => RlmError::new(ErrorCode::InvalidRegex, msg),
            SearchError::Timeout { budget_ms } => RlmError::new(
                ErrorCode::RegexTimeout,
                format!("regex execution exceeded {budget_ms}ms budget"),
            ),
        }
    }
}
