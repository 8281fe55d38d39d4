//! Request/response shapes for the tool surface. Requests are strict:
//! unknown fields are rejected at deserialization.

pub mod context;
pub mod decompose;
pub mod execute;
pub mod metrics;
pub mod rank;
pub mod search;
pub mod session;
