//! Route generation through a [`RoutingProvider`] and the failed-route set.
//!
//! Generation turns a store snapshot into a session:
//!
//! ```text
//! stops     = [origin] ++ [dest of each undelivered package with valid coords]
//! plan      = provider.compute_route(stops)       ── Err → failed set
//! waypoints = one per undelivered package (invalid coords kept, excluded later)
//! eta       = plan.duration × progress of the route vertex nearest the stop
//! ```
//!
//! Stops are visited in store order; reordering them is the provider's
//! business.

use std::collections::BTreeSet;
use std::sync::Arc;

use fleet_core::{Clock, VehicleId, WaypointId};
use fleet_delivery::Waypoint;
use fleet_delivery::waypoint::eta_label;
use fleet_route::RoutingProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Fleet, PackageStore, SessionHandle, SimError, SimResult};

// ── FailedRoutes ──────────────────────────────────────────────────────────────

/// Vehicles whose route could not be generated.
///
/// Bulk generation skips them so a provider that keeps rejecting a vehicle
/// is not hammered every cycle.  A manual retry clears the entry.  The set is
/// serialisable (with the `serde` feature) for the caller to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct FailedRoutes {
    vehicles: BTreeSet<VehicleId>,
}

impl FailedRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, vehicle: VehicleId) -> bool {
        self.vehicles.contains(&vehicle)
    }

    /// Returns `true` if the vehicle was not already recorded.
    pub fn insert(&mut self, vehicle: VehicleId) -> bool {
        self.vehicles.insert(vehicle)
    }

    /// Returns `true` if the vehicle was recorded.
    pub fn remove(&mut self, vehicle: VehicleId) -> bool {
        self.vehicles.remove(&vehicle)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.vehicles.iter().copied()
    }
}

impl FromIterator<VehicleId> for FailedRoutes {
    fn from_iter<I: IntoIterator<Item = VehicleId>>(iter: I) -> Self {
        Self { vehicles: iter.into_iter().collect() }
    }
}

// ── GenerationReport ──────────────────────────────────────────────────────────

/// Outcome of [`Fleet::generate_all_routes`].
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub created: Vec<SessionHandle>,
    /// Previously failed, or nothing deliverable.
    pub skipped: Vec<VehicleId>,
    pub failed:  Vec<(VehicleId, SimError)>,
}

// ── Generation ────────────────────────────────────────────────────────────────

impl<C: Clock> Fleet<C> {
    /// Request a route for `vehicle` and install a fresh session for it.
    ///
    /// # Errors
    ///
    /// - [`SimError::PreviouslyFailed`] if the vehicle is in the failed set
    ///   (use [`retry_route`][Self::retry_route]);
    /// - [`SimError::Dependency`] if the provider fails (the vehicle is
    ///   added to the failed set);
    /// - [`SimError::NoOrigin`] / [`SimError::NothingToDeliver`] /
    ///   [`SimError::Validation`] for unusable store data.
    pub fn generate_route<P, S>(
        &mut self,
        vehicle:  VehicleId,
        provider: &P,
        store:    &S,
    ) -> SimResult<SessionHandle>
    where
        P: RoutingProvider + ?Sized,
        S: PackageStore + ?Sized,
    {
        if self.failed.contains(vehicle) {
            return Err(SimError::PreviouslyFailed(vehicle));
        }
        self.build_route(vehicle, provider, store)
    }

    /// Manual retry: forget a previous failure, then generate.
    pub fn retry_route<P, S>(
        &mut self,
        vehicle:  VehicleId,
        provider: &P,
        store:    &S,
    ) -> SimResult<SessionHandle>
    where
        P: RoutingProvider + ?Sized,
        S: PackageStore + ?Sized,
    {
        if self.failed.remove(vehicle) {
            info!(%vehicle, "retrying route generation");
        }
        self.build_route(vehicle, provider, store)
    }

    /// Generate routes for many vehicles, skipping those that failed before
    /// and those with nothing to deliver.  Never stops at the first error.
    pub fn generate_all_routes<P, S>(
        &mut self,
        vehicles: impl IntoIterator<Item = VehicleId>,
        provider: &P,
        store:    &S,
    ) -> GenerationReport
    where
        P: RoutingProvider + ?Sized,
        S: PackageStore + ?Sized,
    {
        let mut report = GenerationReport::default();
        for vehicle in vehicles {
            if self.failed.contains(vehicle) {
                report.skipped.push(vehicle);
                continue;
            }
            match self.build_route(vehicle, provider, store) {
                Ok(handle) => report.created.push(handle),
                Err(SimError::NothingToDeliver(_)) => report.skipped.push(vehicle),
                Err(e) => report.failed.push((vehicle, e)),
            }
        }
        info!(
            created = report.created.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "bulk route generation finished"
        );
        report
    }

    fn build_route<P, S>(
        &mut self,
        vehicle:  VehicleId,
        provider: &P,
        store:    &S,
    ) -> SimResult<SessionHandle>
    where
        P: RoutingProvider + ?Sized,
        S: PackageStore + ?Sized,
    {
        let origin = store
            .vehicle_origin(vehicle)
            .filter(|o| o.is_valid())
            .ok_or(SimError::NoOrigin(vehicle))?;

        let packages: Vec<_> = store
            .packages_for(vehicle)
            .into_iter()
            .filter(|p| !p.delivered)
            .collect();

        let mut stops = Vec::with_capacity(packages.len() + 1);
        stops.push(origin);
        stops.extend(packages.iter().filter_map(|p| p.destination.filter(|d| d.is_valid())));
        if stops.len() < 2 {
            return Err(SimError::NothingToDeliver(vehicle));
        }

        let plan = provider
            .compute_route(&stops)
            .and_then(|plan| plan.to_route().map(|route| (plan, route)));
        let (plan, route) = match plan {
            Ok(ok) => ok,
            Err(source) => {
                warn!(%vehicle, error = %source, "routing failed; vehicle added to the failed set");
                self.failed.insert(vehicle);
                return Err(SimError::Dependency { vehicle, source });
            }
        };

        let waypoints = (0u32..)
            .zip(&packages)
            .map(|(i, p)| {
                let waypoint = Waypoint {
                    id:          WaypointId(i),
                    package:     p.id,
                    destination: p.destination,
                    delivered:   false,
                    eta_label:   None,
                };
                match waypoint.deliverable_position() {
                    Some(dest) => {
                        let secs = plan.total_duration_secs * route.progress_nearest(dest);
                        waypoint.with_eta_label(eta_label(secs))
                    }
                    None => waypoint,
                }
            })
            .collect();

        self.create_session_with_route(vehicle, Arc::new(route), waypoints)
    }
}
