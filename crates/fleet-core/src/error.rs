//! Core error type.
//!
//! Sub-crates define their own error enums (`RouteError`, `SessionError`,
//! `SimError`, …) and wrap `CoreError` where they need to.

use thiserror::Error;

/// Errors produced by `fleet-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `fleet-core`.
pub type CoreResult<T> = Result<T, CoreError>;
