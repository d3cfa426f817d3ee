use fleet_route::RouteError;
use thiserror::Error;

/// Validation and state errors raised by a delivery session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("invalid route: {0}")]
    Route(#[from] RouteError),

    #[error("no waypoint has valid destination coordinates")]
    NoDeliverableWaypoints,

    #[error("time scale must be a positive finite number, got {0}")]
    InvalidTimeScale(f64),

    #[error("session has already completed its route")]
    AlreadyCompleted,
}

pub type SessionResult<T> = Result<T, SessionError>;
