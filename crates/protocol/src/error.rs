use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, RlmError>;

/// Stable numeric error codes, preserved across transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Context
    ContextNotFound,
    ContextTooLarge,
    InvalidContextId,
    ContextAlreadyExists,
    // Session
    SessionNotFound,
    SessionExpired,
    SessionMaxReached,
    SessionMemoryExceeded,
    // Execution
    ExecutionTimeout,
    ExecutionFailed,
    InvalidCode,
    SandboxError,
    // Search
    InvalidRegex,
    RegexTimeout,
    RedosDetected,
    // Resource
    MemoryLimitExceeded,
    VariableLimitExceeded,
    ChunkLimitExceeded,
    OutputLimitExceeded,
    // Validation
    InvalidInput,
    MissingField,
    OutOfRange,
    // System
    Internal,
    NotImplemented,
}

impl ErrorCode {
    /// Numeric code carried in the error envelope. Values are frozen; new
    /// codes append within their family block.
    pub fn as_u16(self) -> u16 {
        match self {
            ErrorCode::ContextNotFound => 1001,
            ErrorCode::ContextTooLarge => 1002,
            ErrorCode::InvalidContextId => 1003,
            ErrorCode::ContextAlreadyExists => 1004,
            ErrorCode::SessionNotFound => 2001,
            ErrorCode::SessionExpired => 2002,
            ErrorCode::SessionMaxReached => 2003,
            ErrorCode::SessionMemoryExceeded => 2004,
            ErrorCode::ExecutionTimeout => 3001,
            ErrorCode::ExecutionFailed => 3002,
            ErrorCode::InvalidCode => 3003,
            ErrorCode::SandboxError => 3004,
            ErrorCode::InvalidRegex => 4001,
            ErrorCode::RegexTimeout => 4002,
            ErrorCode::RedosDetected => 4003,
            ErrorCode::MemoryLimitExceeded => 5001,
            ErrorCode::VariableLimitExceeded => 5002,
            ErrorCode::ChunkLimitExceeded => 5003,
            ErrorCode::OutputLimitExceeded => 5004,
            ErrorCode::InvalidInput => 6001,
            ErrorCode::MissingField => 6002,
            ErrorCode::OutOfRange => 6003,
            ErrorCode::Internal => 9001,
            ErrorCode::NotImplemented => 9002,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::ContextNotFound => "CONTEXT_NOT_FOUND",
            ErrorCode::ContextTooLarge => "CONTEXT_TOO_LARGE",
            ErrorCode::InvalidContextId => "INVALID_CONTEXT_ID",
            ErrorCode::ContextAlreadyExists => "CONTEXT_ALREADY_EXISTS",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::SessionExpired => "SESSION_EXPIRED",
            ErrorCode::SessionMaxReached => "SESSION_MAX_REACHED",
            ErrorCode::SessionMemoryExceeded => "SESSION_MEMORY_EXCEEDED",
            ErrorCode::ExecutionTimeout => "EXECUTION_TIMEOUT",
            ErrorCode::ExecutionFailed => "EXECUTION_FAILED",
            ErrorCode::InvalidCode => "INVALID_CODE",
            ErrorCode::SandboxError => "SANDBOX_ERROR",
            ErrorCode::InvalidRegex => "INVALID_REGEX",
            ErrorCode::RegexTimeout => "REGEX_TIMEOUT",
            ErrorCode::RedosDetected => "REDOS_DETECTED",
            ErrorCode::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            ErrorCode::VariableLimitExceeded => "VARIABLE_LIMIT_EXCEEDED",
            ErrorCode::ChunkLimitExceeded => "CHUNK_LIMIT_EXCEEDED",
            ErrorCode::OutputLimitExceeded => "OUTPUT_LIMIT_EXCEEDED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::MissingField => "MISSING_FIELD",
            ErrorCode::OutOfRange => "OUT_OF_RANGE",
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

/// Typed error produced by core components. The RPC layer serializes it into
/// an [`ErrorEnvelope`]; messages never leak internal paths or process state.
#[derive(Debug, Clone, Error)]
#[error("{} ({}): {message}", .code.name(), .code.as_u16())]
pub struct RlmError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl RlmError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::MissingField, format!("missing field '{field}'"))
            .with_details(serde_json::json!({ "field": field }))
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::OutOfRange, message)
    }

    pub fn context_not_found(context_id: &str) -> Self {
        Self::new(
            ErrorCode::ContextNotFound,
            format!("context '{context_id}' is not loaded"),
        )
        .with_details(serde_json::json!({ "context_id": context_id }))
    }

    pub fn session_not_found(session_id: &str) -> Self {
        Self::new(
            ErrorCode::SessionNotFound,
            format!("session '{session_id}' does not exist"),
        )
        .with_details(serde_json::json!({ "session_id": session_id }))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Serialize into the transport-facing envelope.
    pub fn to_envelope(&self, trace_id: Option<String>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: true,
            code: self.code.as_u16(),
            message: self.message.clone(),
            details: self.details.clone(),
            timestamp: crate::unix_ms_now(),
            trace_id,
        }
    }
}

/// Wire shape of every failure: `{error:true, code, message, details?, timestamp, traceId?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error: bool,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::ContextNotFound.as_u16(), 1001);
        assert_eq!(ErrorCode::SessionMemoryExceeded.as_u16(), 2004);
        assert_eq!(ErrorCode::InvalidRegex.as_u16(), 4001);
        assert_eq!(ErrorCode::ChunkLimitExceeded.as_u16(), 5003);
        assert_eq!(ErrorCode::InvalidInput.as_u16(), 6001);
    }

    #[test]
    fn envelope_carries_details() {
        let err = RlmError::context_not_found("doc");
        let envelope = err.to_envelope(Some("t-1".into()));
        assert!(envelope.error);
        assert_eq!(envelope.code, 1001);
        let details = envelope.details.expect("details");
        assert_eq!(details["context_id"], "doc");
        assert!(envelope.timestamp > 0);
    }

    #[test]
    fn display_includes_code_name() {
        let err = RlmError::invalid_input("bad");
        let rendered = err.to_string();
        assert!(rendered.contains("INVALID_INPUT"));
        assert!(rendered.contains("6001"));
    }
}
