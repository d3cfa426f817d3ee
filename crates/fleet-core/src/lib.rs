//! `fleet-core` — foundational types for the fleet delivery simulator.
//!
//! This crate is a dependency of every other `fleet-*` crate.  It has no
//! `fleet-*` dependencies and only `thiserror` (plus optional `serde`) from
//! the outside world.
//!
//! # What lives here
//!
//! | Module     | Contents                                              |
//! |------------|-------------------------------------------------------|
//! | [`ids`]    | `VehicleId`, `PackageId`, `WaypointId`                |
//! | [`geo`]    | `GeoPoint`, haversine `distance_km`                   |
//! | [`time`]   | `Clock`, `SystemClock`, `ManualClock`                 |
//! | [`config`] | `DeliveryConfig`, `DetectionRule`                     |
//! | [`error`]  | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{DeliveryConfig, DetectionRule, MPH_TO_KMH};
pub use error::{CoreError, CoreResult};
pub use geo::{distance_km, GeoPoint, EARTH_RADIUS_KM};
pub use ids::{PackageId, VehicleId, WaypointId};
pub use time::{Clock, ManualClock, SystemClock};
