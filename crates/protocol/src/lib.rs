//! Shared wire types for the RLM server: the typed error model with stable
//! numeric codes, the transport error envelope, and the character-offset
//! line index used by chunking, search, and ranged reads.

mod error;
mod line_index;

pub use error::{ErrorCode, ErrorEnvelope, Result, RlmError};
pub use line_index::{char_len, char_slice, LineIndex};

use std::time::SystemTime;

/// Milliseconds since the Unix epoch.
pub fn unix_ms(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn unix_ms_now() -> u64 {
    unix_ms(SystemTime::now())
}
