//! `fleet-route` — route consumption: polylines, sampling, and providers.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                     |
//! |--------------|--------------------------------------------------------------|
//! | [`route`]    | `Route` — validated polyline with cached cumulative lengths  |
//! | [`sampler`]  | `total_length`, `position_at_progress`, `progress_of_vertex` |
//! | [`provider`] | `RoutingProvider` trait, `RoutePlan`, `StraightLineRouter`   |
//! | [`error`]    | `RouteError`, `RouteResult<T>`                               |
//!
//! Route *computation* (stop ordering, turn-by-turn) belongs to whatever
//! implements [`RoutingProvider`].  This crate only walks the polyline it
//! returns.

pub mod error;
pub mod provider;
pub mod route;
pub mod sampler;

#[cfg(test)]
mod tests;

pub use error::{RouteError, RouteResult};
pub use provider::{RoutePlan, RoutingProvider, StraightLineRouter};
pub use route::Route;
pub use sampler::{position_at_progress, total_length};
