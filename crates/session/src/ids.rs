//! Identifier validation shared by the registry and the storage boundary.

use rlm_protocol::{ErrorCode, Result, RlmError};

pub const MAX_ID_LEN: usize = 100;

/// Names that collide with prototype machinery in permissive runtimes;
/// rejected defensively at every state boundary.
pub const RESERVED_VARIABLE_NAMES: &[&str] = &["__proto__", "constructor", "prototype"];

/// Context ids: `[A-Za-z0-9_-]{1,100}`.
pub fn validate_context_id(id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id.chars().count() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(RlmError::new(
            ErrorCode::InvalidContextId,
            format!("context id must match [A-Za-z0-9_-]{{1,{MAX_ID_LEN}}}"),
        )
        .with_details(serde_json::json!({ "context_id": id })))
    }
}

/// Variable names: `[A-Za-z_][A-Za-z0-9_]*`, max 100, with reserved names
/// rejected.
pub fn validate_variable_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    let ok = head_ok
        && rest_ok
        && name.chars().count() <= MAX_ID_LEN
        && !RESERVED_VARIABLE_NAMES.contains(&name);
    if ok {
        Ok(())
    } else {
        Err(RlmError::invalid_input(format!("invalid variable name '{name}'"))
            .with_details(serde_json::json!({ "name": name })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_context_ids() {
        assert!(validate_context_id("doc-1").is_ok());
        assert!(validate_context_id("A_b_C").is_ok());
        assert!(validate_context_id(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn rejects_bad_context_ids() {
        assert!(validate_context_id("").is_err());
        assert!(validate_context_id("has space").is_err());
        assert!(validate_context_id("dot.dot").is_err());
        assert!(validate_context_id("slash/y").is_err());
        assert!(validate_context_id(&"x".repeat(101)).is_err());
    }

    #[test]
    fn rejects_reserved_variable_names() {
        for name in RESERVED_VARIABLE_NAMES {
            assert!(validate_variable_name(name).is_err(), "{name}");
        }
    }

    #[test]
    fn variable_names_must_not_start_with_digit() {
        assert!(validate_variable_name("1abc").is_err());
        assert!(validate_variable_name("_ok1").is_ok());
        assert!(validate_variable_name("answer").is_ok());
    }
}
