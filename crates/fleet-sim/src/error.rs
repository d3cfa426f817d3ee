use fleet_core::{CoreError, PackageId, VehicleId};
use fleet_delivery::SessionError;
use fleet_route::RouteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    // ── Validation ────────────────────────────────────────────────────────
    #[error("cannot create a session for {vehicle}: {source}")]
    Validation {
        vehicle: VehicleId,
        source:  SessionError,
    },

    #[error("{vehicle}: {source}")]
    Session {
        vehicle: VehicleId,
        source:  SessionError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] CoreError),

    // ── Dependency failures ───────────────────────────────────────────────
    #[error("routing failed for {vehicle}: {source}")]
    Dependency {
        vehicle: VehicleId,
        source:  RouteError,
    },

    #[error("{0} previously failed routing; retry it explicitly")]
    PreviouslyFailed(VehicleId),

    // ── State ─────────────────────────────────────────────────────────────
    #[error("no delivery session for {0}")]
    NoSession(VehicleId),

    #[error("stale handle for {vehicle}: generation {given}, current {current}")]
    StaleHandle {
        vehicle: VehicleId,
        given:   u32,
        current: u32,
    },

    // ── Package store ─────────────────────────────────────────────────────
    #[error("{0} has no known origin")]
    NoOrigin(VehicleId),

    #[error("{0} has no undelivered package with valid coordinates")]
    NothingToDeliver(VehicleId),

    #[error("{package} is not assigned to {vehicle}")]
    UnknownPackage {
        vehicle: VehicleId,
        package: PackageId,
    },

    #[error("store parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Runner ────────────────────────────────────────────────────────────
    #[error("simulation thread panicked")]
    ThreadPanicked,
}

pub type SimResult<T> = Result<T, SimError>;
