//! The routing-provider seam.
//!
//! # Pluggability
//!
//! The orchestrator asks a [`RoutingProvider`] for a road route once per
//! route generation (never per tick).  A real deployment plugs in a client
//! for its routing service; [`StraightLineRouter`] joins the stops with
//! straight legs and is always available, which makes it the default for
//! tests, demos and offline use.

use fleet_core::{distance_km, GeoPoint};

use crate::{Route, RouteError, RouteResult};

// ── RoutePlan ─────────────────────────────────────────────────────────────────

/// A provider's answer: the road polyline plus its own distance and duration
/// estimates.
///
/// The provider's `total_distance_m` may differ from the haversine length of
/// `vertices` (road snapping, elevation, …).  Progress is always measured
/// against the haversine length; the provider figures are kept for display
/// and arrival estimates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutePlan {
    pub vertices:             Vec<GeoPoint>,
    pub total_distance_m:     f64,
    pub total_duration_secs:  f64,
}

impl RoutePlan {
    /// Validate the polyline into a [`Route`].
    pub fn to_route(&self) -> RouteResult<Route> {
        Route::new(self.vertices.clone())
    }
}

// ── RoutingProvider ───────────────────────────────────────────────────────────

/// Pluggable road-routing service.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so bulk route generation can share
/// one provider with the background simulation thread.
pub trait RoutingProvider: Send + Sync {
    /// Compute a route visiting `stops` in the given order.
    ///
    /// Fails with [`RouteError::NoRoute`] or [`RouteError::Provider`] when the
    /// service cannot answer; the caller records that against the vehicle.
    fn compute_route(&self, stops: &[GeoPoint]) -> RouteResult<RoutePlan>;
}

// ── StraightLineRouter ────────────────────────────────────────────────────────

/// Default average speed for [`StraightLineRouter`] duration estimates.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Haversine fallback provider.
///
/// The polyline is the stop list itself; distance is the sum of the legs and
/// duration assumes a constant `speed_kmh`.
#[derive(Debug, Clone)]
pub struct StraightLineRouter {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for StraightLineRouter {
    fn default() -> Self {
        Self { speed_kmh: DEFAULT_SPEED_KMH }
    }
}

impl StraightLineRouter {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }
}

impl RoutingProvider for StraightLineRouter {
    fn compute_route(&self, stops: &[GeoPoint]) -> RouteResult<RoutePlan> {
        if stops.len() < 2 {
            return Err(RouteError::TooFewStops(stops.len()));
        }
        if let Some(index) = stops.iter().position(|s| !s.is_valid()) {
            return Err(RouteError::InvalidVertex { index });
        }
        if !self.speed_kmh.is_finite() || self.speed_kmh <= 0.0 {
            return Err(RouteError::Provider(format!(
                "speed must be positive, got {}",
                self.speed_kmh
            )));
        }

        let km: f64 = stops.windows(2).map(|w| distance_km(w[0], w[1])).sum();
        Ok(RoutePlan {
            vertices:            stops.to_vec(),
            total_distance_m:    km * 1_000.0,
            total_duration_secs: km / self.speed_kmh * 3_600.0,
        })
    }
}
