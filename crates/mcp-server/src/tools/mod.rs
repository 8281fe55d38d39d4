//! RLM tool surface.
//!
//! Split into schemas (request/response shapes), dispatch (service state
//! and per-tool handlers), and the catalog (names, summaries, workflow
//! instructions).

pub(crate) mod catalog;
mod dispatch;
pub mod schemas;

pub use dispatch::{RlmService, ServiceState};
