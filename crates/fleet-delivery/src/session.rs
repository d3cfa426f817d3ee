//! The per-vehicle delivery session state machine.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use fleet_core::{DeliveryConfig, GeoPoint, MPH_TO_KMH, PackageId, VehicleId};
use fleet_route::Route;
use tracing::{debug, info, warn};

use crate::{check_deliveries, SessionError, SessionResult, SpeedProfile, Waypoint};

// ── SessionState ──────────────────────────────────────────────────────────────

/// Lifecycle of a session.
///
/// ```text
///            start              progress reaches 1
///   Idle ───────────▶ Active ─────────────────────▶ Completed
///     ▲                 │
///     └──── stop ───────┘   (pause: progress and deliveries kept)
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionState {
    Idle,
    Active,
    Completed,
}

// ── TickResult ────────────────────────────────────────────────────────────────

/// What one tick did.  Produced by [`DeliverySession::tick`] and consumed
/// immediately by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    pub vehicle:   VehicleId,
    /// Packages delivered by the in-transit check this tick.
    pub delivered: Vec<PackageId>,
    /// Packages delivered by the final sweep (only on the completing tick).
    pub swept:     Vec<PackageId>,
    /// Committed position after this tick.
    pub position:  GeoPoint,
    /// Committed progress after this tick.
    pub progress:  f64,
    /// Speed used for this tick, km/h.
    pub speed_kmh: f64,
    /// `true` on the tick that reached the end of the route.
    pub completed: bool,
}

impl TickResult {
    /// The end-of-route position, on the completing tick only.
    pub fn final_position(&self) -> Option<GeoPoint> {
        self.completed.then_some(self.position)
    }
}

// ── SessionSnapshot ───────────────────────────────────────────────────────────

/// An immutable copy of a session's observable state, for UIs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSnapshot {
    pub vehicle:    VehicleId,
    pub state:      SessionState,
    pub progress:   f64,
    pub position:   GeoPoint,
    pub speed_kmh:  f64,
    pub time_scale: f64,
    pub delivered:  Vec<PackageId>,
    pub remaining:  usize,
}

// ── DeliverySession ───────────────────────────────────────────────────────────

/// Mutable delivery state for one vehicle on one route.
///
/// Invariants:
///
/// - `delivered ⊆ { w.package | w ∈ waypoints }`, and `w.delivered` is `true`
///   exactly for those waypoints;
/// - `progress ∈ [0, 1]`, non-decreasing;
/// - `position == route.position_at(progress)` after every commit;
/// - `Completed` is terminal and the final sweep ran exactly once.
///
/// Every mutator is a state transition; there is no way to set progress,
/// position or the delivered set directly.  The orchestrator owns each
/// session exclusively and hands out only shared references.
#[derive(Debug, Clone)]
pub struct DeliverySession {
    vehicle:      VehicleId,
    route:        Arc<Route>,
    waypoints:    Vec<Waypoint>,
    progress:     f64,
    position:     GeoPoint,
    speed_kmh:    f64,
    delivered:    BTreeSet<PackageId>,
    /// Packages whose destination is unusable; logged once, never delivered.
    excluded:     BTreeSet<PackageId>,
    state:        SessionState,
    time_scale:   f64,
    last_tick_at: Option<Duration>,
    profile:      SpeedProfile,
}

impl DeliverySession {
    /// Create an `Idle` session at the start of `route`.
    ///
    /// Waypoints repeating an earlier package id are dropped.  Waypoints
    /// without valid coordinates are kept but excluded from delivery.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoDeliverableWaypoints`] if no waypoint has valid
    ///   coordinates;
    /// - [`SessionError::InvalidTimeScale`] if `time_scale` is not positive.
    pub fn new(
        vehicle:    VehicleId,
        route:      Arc<Route>,
        waypoints:  Vec<Waypoint>,
        time_scale: f64,
    ) -> SessionResult<Self> {
        check_time_scale(time_scale)?;

        let mut seen = BTreeSet::new();
        let mut kept = Vec::with_capacity(waypoints.len());
        for w in waypoints {
            if seen.insert(w.package) {
                kept.push(w);
            } else {
                warn!(%vehicle, package = %w.package, "duplicate waypoint for package dropped");
            }
        }

        if !kept.iter().any(|w| w.deliverable_position().is_some()) {
            return Err(SessionError::NoDeliverableWaypoints);
        }

        let mut excluded = BTreeSet::new();
        let mut delivered = BTreeSet::new();
        for w in &kept {
            if w.delivered {
                delivered.insert(w.package);
            } else if w.deliverable_position().is_none() {
                warn!(
                    %vehicle,
                    package = %w.package,
                    destination = ?w.destination,
                    "package has no valid destination; it cannot be delivered on this route"
                );
                excluded.insert(w.package);
            }
        }

        let position = route.first();
        Ok(Self {
            vehicle,
            route,
            waypoints: kept,
            progress: 0.0,
            position,
            speed_kmh: 0.0,
            delivered,
            excluded,
            state: SessionState::Idle,
            time_scale,
            last_tick_at: None,
            profile: SpeedProfile::default(),
        })
    }

    /// Like [`new`][Self::new] but validates a raw polyline first.
    pub fn from_vertices(
        vehicle:    VehicleId,
        vertices:   Vec<GeoPoint>,
        waypoints:  Vec<Waypoint>,
        time_scale: f64,
    ) -> SessionResult<Self> {
        let route = Route::new(vertices)?;
        Self::new(vehicle, Arc::new(route), waypoints, time_scale)
    }

    /// Replace the speed profile (before starting, typically).
    pub fn with_profile(mut self, profile: SpeedProfile) -> Self {
        self.profile = profile;
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    #[inline]
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    #[inline]
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    #[inline]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[inline]
    pub fn position(&self) -> GeoPoint {
        self.position
    }

    /// Speed of the last tick in km/h; zero while idle or completed.
    #[inline]
    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    #[inline]
    pub fn delivered(&self) -> &BTreeSet<PackageId> {
        &self.delivered
    }

    #[inline]
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    #[inline]
    pub fn excluded(&self) -> &BTreeSet<PackageId> {
        &self.excluded
    }

    /// Undelivered packages that can still be delivered by proximity.
    pub fn remaining(&self) -> usize {
        self.waypoints
            .iter()
            .filter(|w| !self.delivered.contains(&w.package) && !self.excluded.contains(&w.package))
            .count()
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    #[inline]
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    #[inline]
    pub fn last_tick_at(&self) -> Option<Duration> {
        self.last_tick_at
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            vehicle:    self.vehicle,
            state:      self.state,
            progress:   self.progress,
            position:   self.position,
            speed_kmh:  self.speed_kmh,
            time_scale: self.time_scale,
            delivered:  self.delivered.iter().copied().collect(),
            remaining:  self.remaining(),
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// `Idle → Active`.  Time spent idle is not simulated: the first tick
    /// after a start measures from `now`.
    ///
    /// Returns `Ok(false)` if the session was already active.
    pub fn start(&mut self, now: Duration) -> SessionResult<bool> {
        match self.state {
            SessionState::Completed => Err(SessionError::AlreadyCompleted),
            SessionState::Active => Ok(false),
            SessionState::Idle => {
                self.state = SessionState::Active;
                self.last_tick_at = Some(now);
                info!(vehicle = %self.vehicle, progress = self.progress, "delivery session started");
                Ok(true)
            }
        }
    }

    /// `Active → Idle`.  Progress and deliveries are kept.
    ///
    /// Returns `false` if the session was not active.
    pub fn stop(&mut self) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        self.state = SessionState::Idle;
        self.speed_kmh = 0.0;
        info!(vehicle = %self.vehicle, progress = self.progress, "delivery session stopped");
        true
    }

    /// Change the time multiplier.  Applies to the whole wall-clock delta of
    /// the next tick; ticks already committed are unaffected.
    pub fn set_time_scale(&mut self, factor: f64) -> SessionResult<()> {
        check_time_scale(factor)?;
        self.time_scale = factor;
        Ok(())
    }

    /// Advance to wall-clock time `now`.
    ///
    /// Returns `None` (and changes nothing) unless the session is `Active`.
    pub fn tick(&mut self, now: Duration, config: &DeliveryConfig) -> Option<TickResult> {
        if self.state != SessionState::Active {
            return None;
        }

        // ── Move ──────────────────────────────────────────────────────────
        let last = self.last_tick_at.unwrap_or(now);
        let sim_secs = now.saturating_sub(last).as_secs_f64() * self.time_scale;

        let speed_mph = self.profile.speed_at(self.progress, config.base_speed_mph);
        let distance_km = speed_mph * MPH_TO_KMH / 3_600.0 * sim_secs;

        let total = self.route.total_distance_km();
        let progress = if total > 0.0 {
            (self.progress + distance_km / total).clamp(self.progress, 1.0)
        } else {
            1.0
        };
        let position = self.route.position_at(progress);

        // ── Detect ────────────────────────────────────────────────────────
        let delivered = check_deliveries(
            position,
            &self.waypoints,
            &self.delivered,
            config.in_transit,
            progress,
        );

        // ── Commit ────────────────────────────────────────────────────────
        self.progress = progress;
        self.position = position;
        self.speed_kmh = speed_mph * MPH_TO_KMH;
        self.last_tick_at = Some(now);
        self.commit_deliveries(&delivered);

        let mut result = TickResult {
            vehicle:   self.vehicle,
            delivered,
            swept:     Vec::new(),
            position,
            progress,
            speed_kmh: self.speed_kmh,
            completed: false,
        };

        // ── Complete ──────────────────────────────────────────────────────
        if progress >= 1.0 {
            let swept = check_deliveries(
                position,
                &self.waypoints,
                &self.delivered,
                config.final_sweep,
                progress,
            );
            self.commit_deliveries(&swept);
            self.state = SessionState::Completed;
            self.speed_kmh = 0.0;
            info!(
                vehicle = %self.vehicle,
                delivered = self.delivered.len(),
                undelivered = self.waypoints.len() - self.delivered.len(),
                "route completed"
            );
            result.swept = swept;
            result.completed = true;
        }

        Some(result)
    }

    fn commit_deliveries(&mut self, packages: &[PackageId]) {
        for &package in packages {
            if self.delivered.insert(package) {
                debug!(vehicle = %self.vehicle, %package, progress = self.progress, "package delivered");
            }
            for w in self.waypoints.iter_mut().filter(|w| w.package == package) {
                w.delivered = true;
            }
        }
    }
}

fn check_time_scale(factor: f64) -> SessionResult<()> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(SessionError::InvalidTimeScale(factor))
    }
}
