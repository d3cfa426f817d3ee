//! Routing error type.

use thiserror::Error;

/// Errors produced by `fleet-route`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouteError {
    #[error("route needs at least 2 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("route vertex {index} has invalid coordinates")]
    InvalidVertex { index: usize },

    #[error("routing needs at least 2 stops, got {0}")]
    TooFewStops(usize),

    #[error("routing provider found no route: {0}")]
    NoRoute(String),

    #[error("routing provider failed: {0}")]
    Provider(String),
}

pub type RouteResult<T> = Result<T, RouteError>;
