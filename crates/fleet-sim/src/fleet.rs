//! The `Fleet` orchestrator and its tick entry points.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use fleet_core::{Clock, DeliveryConfig, GeoPoint, VehicleId};
use fleet_delivery::{DeliverySession, SessionError, SessionSnapshot, TickResult, Waypoint};
use fleet_route::Route;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{FailedRoutes, FleetObserver, SimError, SimResult};

// ── SessionHandle ─────────────────────────────────────────────────────────────

/// Names one specific session.
///
/// Creating a new session for a vehicle replaces the old one and bumps the
/// generation, so a handle kept from before the replacement no longer
/// resolves (see [`Fleet::session_by_handle`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
pub struct SessionHandle {
    pub vehicle:    VehicleId,
    pub generation: u32,
}

/// One arena entry.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) generation: u32,
    pub(crate) session:    DeliverySession,
}

// ── Fleet ─────────────────────────────────────────────────────────────────────

/// Owns every vehicle's [`DeliverySession`] and drives them through time.
///
/// Sessions live in a `VehicleId`-keyed arena.  Only the fleet mutates them,
/// and only through the session's transitions (`start`, `stop`,
/// `set_time_scale`, `tick`); everyone else gets `&DeliverySession` or a
/// [`SessionSnapshot`].  State leaves the fleet as observer events.
///
/// `C` is the time source: [`fleet_core::SystemClock`] in production,
/// [`fleet_core::ManualClock`] in tests.
///
/// Create via [`FleetBuilder`][crate::FleetBuilder].
pub struct Fleet<C: Clock> {
    pub(crate) config:          DeliveryConfig,
    pub(crate) clock:           C,
    pub(crate) sessions:        BTreeMap<VehicleId, Slot>,
    pub(crate) next_generation: u32,
    pub(crate) failed:          FailedRoutes,
}

impl<C: Clock> Fleet<C> {
    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[inline]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Vehicles whose routing failed and which bulk generation skips.
    #[inline]
    pub fn failed_routes(&self) -> &FailedRoutes {
        &self.failed
    }

    pub fn session(&self, vehicle: VehicleId) -> Option<&DeliverySession> {
        self.sessions.get(&vehicle).map(|slot| &slot.session)
    }

    /// Resolve a handle, rejecting it if the session was since replaced.
    pub fn session_by_handle(&self, handle: SessionHandle) -> SimResult<&DeliverySession> {
        let slot = self
            .sessions
            .get(&handle.vehicle)
            .ok_or(SimError::NoSession(handle.vehicle))?;
        if slot.generation != handle.generation {
            return Err(SimError::StaleHandle {
                vehicle: handle.vehicle,
                given:   handle.generation,
                current: slot.generation,
            });
        }
        Ok(&slot.session)
    }

    /// The current handle for `vehicle`'s session.
    pub fn handle(&self, vehicle: VehicleId) -> Option<SessionHandle> {
        self.sessions
            .get(&vehicle)
            .map(|slot| SessionHandle { vehicle, generation: slot.generation })
    }

    /// All sessions in ascending `VehicleId` order.
    pub fn sessions(&self) -> impl Iterator<Item = &DeliverySession> + '_ {
        self.sessions.values().map(|slot| &slot.session)
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.sessions().map(DeliverySession::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.values().filter(|slot| slot.session.is_active()).count()
    }

    // ── Session lifecycle ─────────────────────────────────────────────────

    /// Validate `vertices` and `waypoints` and install an `Idle` session for
    /// `vehicle`, replacing any previous one.
    ///
    /// On error nothing changes: a previous session (if any) is kept.
    pub fn create_session(
        &mut self,
        vehicle:   VehicleId,
        vertices:  Vec<GeoPoint>,
        waypoints: Vec<Waypoint>,
    ) -> SimResult<SessionHandle> {
        let route = Route::new(vertices).map_err(|e| SimError::Validation {
            vehicle,
            source: SessionError::Route(e),
        })?;
        self.create_session_with_route(vehicle, Arc::new(route), waypoints)
    }

    /// Like [`create_session`][Self::create_session] for an already
    /// validated route.
    pub fn create_session_with_route(
        &mut self,
        vehicle:   VehicleId,
        route:     Arc<Route>,
        waypoints: Vec<Waypoint>,
    ) -> SimResult<SessionHandle> {
        let session =
            DeliverySession::new(vehicle, route, waypoints, self.config.default_time_scale)
                .map_err(|source| SimError::Validation { vehicle, source })?;

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        info!(
            %vehicle,
            generation,
            route_km = session.route().total_distance_km(),
            waypoints = session.waypoints().len(),
            "delivery session created"
        );
        if let Some(old) = self.sessions.insert(vehicle, Slot { generation, session }) {
            info!(%vehicle, replaced = old.generation, "previous session discarded");
        }
        Ok(SessionHandle { vehicle, generation })
    }

    /// Drop `vehicle`'s session.
    pub fn remove_session(&mut self, vehicle: VehicleId) -> Option<DeliverySession> {
        self.sessions.remove(&vehicle).map(|slot| slot.session)
    }

    /// Resume or begin moving `vehicle`.  Starting an active session is a
    /// no-op; starting a completed one is an error.
    pub fn start(&mut self, vehicle: VehicleId) -> SimResult<()> {
        let now = self.clock.now();
        let session = self.session_mut(vehicle)?;
        session
            .start(now)
            .map(|_| ())
            .map_err(|source| SimError::Session { vehicle, source })
    }

    /// Pause `vehicle`.  Returns `false` if it was not moving.
    pub fn stop(&mut self, vehicle: VehicleId) -> SimResult<bool> {
        Ok(self.session_mut(vehicle)?.stop())
    }

    /// Change `vehicle`'s time multiplier from the next tick on.
    pub fn set_time_scale(&mut self, vehicle: VehicleId, factor: f64) -> SimResult<()> {
        self.session_mut(vehicle)?
            .set_time_scale(factor)
            .map_err(|source| SimError::Session { vehicle, source })
    }

    // ── Ticking ───────────────────────────────────────────────────────────

    /// Advance a single vehicle to the clock's current time.
    ///
    /// Returns `Ok(None)` if the session exists but is not active.
    pub fn tick<O: FleetObserver>(
        &mut self,
        vehicle:  VehicleId,
        observer: &mut O,
    ) -> SimResult<Option<TickResult>> {
        let now = self.clock.now();
        let config = &self.config;
        let session = match self.sessions.get_mut(&vehicle) {
            Some(slot) => &mut slot.session,
            None => {
                warn!(%vehicle, "tick requested for a vehicle without a session");
                return Err(SimError::NoSession(vehicle));
            }
        };
        let result = session.tick(now, config);
        if let Some(r) = &result {
            dispatch(r, session.delivered_count(), observer);
        }
        Ok(result)
    }

    /// Advance every active session to the clock's current time.
    ///
    /// All sessions see the same `now`.  Returns the number of sessions still
    /// active afterwards.
    pub fn tick_all<O: FleetObserver>(&mut self, observer: &mut O) -> usize {
        let now = self.clock.now();
        let results = self.step_sessions(now);

        for r in &results {
            let delivered_count = self
                .sessions
                .get(&r.vehicle)
                .map_or(0, |slot| slot.session.delivered_count());
            dispatch(r, delivered_count, observer);
        }

        let active = self.active_count();
        observer.on_tick_end(now, active);
        active
    }

    /// Tick phase.  Results come back in ascending `VehicleId` order.
    fn step_sessions(&mut self, now: Duration) -> Vec<TickResult> {
        let config = &self.config;

        #[cfg(not(feature = "parallel"))]
        {
            self.sessions
                .values_mut()
                .filter_map(|slot| slot.session.tick(now, config))
                .collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            // Order-preserving collect keeps the dispatch deterministic.
            self.sessions
                .par_iter_mut()
                .filter_map(|(_, slot)| slot.session.tick(now, config))
                .collect()
        }
    }

    fn session_mut(&mut self, vehicle: VehicleId) -> SimResult<&mut DeliverySession> {
        match self.sessions.get_mut(&vehicle) {
            Some(slot) => Ok(&mut slot.session),
            None => {
                warn!(%vehicle, "no delivery session for vehicle");
                Err(SimError::NoSession(vehicle))
            }
        }
    }
}

/// Turn one tick's result into observer calls, in commit order.
fn dispatch<O: FleetObserver>(r: &TickResult, delivered_count: usize, observer: &mut O) {
    for &package in &r.delivered {
        observer.on_package_delivered(r.vehicle, package);
    }
    observer.on_position_updated(r.vehicle, r.position, r.speed_kmh, r.progress);
    for &package in &r.swept {
        observer.on_package_delivered(r.vehicle, package);
    }
    if r.completed {
        observer.on_route_completed(r.vehicle, delivered_count);
    }
}
