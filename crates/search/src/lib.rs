//! ReDoS-guarded text search for the RLM server.
//!
//! Two scan modes over a single in-memory text: regex search with capture
//! groups and surrounding context windows, and a literal substring scan.
//! Every pattern passes the admission rules in [`redos`] before it is
//! compiled; execution is bounded by a wall-clock budget and a match cap.

mod error;
mod executor;
mod redos;
mod substring;

pub use error::{Result, SearchError};
pub use executor::{
    regex_search, RegexSearchOptions, SearchMatch, SearchOutcome, DEFAULT_BUDGET_MS,
    DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_MATCHES,
};
pub use redos::{compile_safe, validate_pattern, PatternReport, MAX_PATTERN_LEN};
pub use substring::{find_all, FindAllOptions, FindAllOutcome, SubstringMatch};
