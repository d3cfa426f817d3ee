//! Outbound events: the only way state leaves the orchestrator.

use std::sync::mpsc::Sender;
use std::time::Duration;

use fleet_core::{GeoPoint, PackageId, VehicleId};
use serde::{Deserialize, Serialize};

/// Callbacks invoked by the [`Fleet`][crate::Fleet] as ticks commit.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  For one vehicle, calls arrive in tick
/// order; across vehicles within one tick, in ascending `VehicleId` order.
///
/// # Example — completion printer
///
/// ```rust,ignore
/// struct Done;
///
/// impl FleetObserver for Done {
///     fn on_route_completed(&mut self, vehicle: VehicleId, delivered: usize) {
///         println!("{vehicle} finished with {delivered} deliveries");
///     }
/// }
/// ```
pub trait FleetObserver {
    /// The vehicle moved.  `progress` never decreases between two calls for
    /// the same vehicle.
    fn on_position_updated(
        &mut self,
        _vehicle:   VehicleId,
        _position:  GeoPoint,
        _speed_kmh: f64,
        _progress:  f64,
    ) {}

    /// A package was handed over.  Fired at most once per package per route.
    fn on_package_delivered(&mut self, _vehicle: VehicleId, _package: PackageId) {}

    /// The vehicle reached the end of its route; `delivered_count` includes
    /// the final sweep.
    fn on_route_completed(&mut self, _vehicle: VehicleId, _delivered_count: usize) {}

    /// Called once at the end of every `tick_all`, with the number of
    /// sessions still active.
    fn on_tick_end(&mut self, _now: Duration, _active: usize) {}
}

/// A [`FleetObserver`] that does nothing.
pub struct NoopObserver;

impl FleetObserver for NoopObserver {}

impl<O: FleetObserver + ?Sized> FleetObserver for &mut O {
    fn on_position_updated(&mut self, vehicle: VehicleId, position: GeoPoint, speed_kmh: f64, progress: f64) {
        (**self).on_position_updated(vehicle, position, speed_kmh, progress);
    }

    fn on_package_delivered(&mut self, vehicle: VehicleId, package: PackageId) {
        (**self).on_package_delivered(vehicle, package);
    }

    fn on_route_completed(&mut self, vehicle: VehicleId, delivered_count: usize) {
        (**self).on_route_completed(vehicle, delivered_count);
    }

    fn on_tick_end(&mut self, now: Duration, active: usize) {
        (**self).on_tick_end(now, active);
    }
}

/// Fan out to two observers, first `A` then `B`.
impl<A: FleetObserver, B: FleetObserver> FleetObserver for (A, B) {
    fn on_position_updated(&mut self, vehicle: VehicleId, position: GeoPoint, speed_kmh: f64, progress: f64) {
        self.0.on_position_updated(vehicle, position, speed_kmh, progress);
        self.1.on_position_updated(vehicle, position, speed_kmh, progress);
    }

    fn on_package_delivered(&mut self, vehicle: VehicleId, package: PackageId) {
        self.0.on_package_delivered(vehicle, package);
        self.1.on_package_delivered(vehicle, package);
    }

    fn on_route_completed(&mut self, vehicle: VehicleId, delivered_count: usize) {
        self.0.on_route_completed(vehicle, delivered_count);
        self.1.on_route_completed(vehicle, delivered_count);
    }

    fn on_tick_end(&mut self, now: Duration, active: usize) {
        self.0.on_tick_end(now, active);
        self.1.on_tick_end(now, active);
    }
}

// ── FleetEvent ────────────────────────────────────────────────────────────────

/// The three event kinds as plain data, for logs and channels.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub enum FleetEvent {
    PositionUpdated {
        vehicle:   VehicleId,
        position:  GeoPoint,
        speed_kmh: f64,
        progress:  f64,
    },
    PackageDelivered {
        vehicle: VehicleId,
        package: PackageId,
    },
    RouteCompleted {
        vehicle:         VehicleId,
        delivered_count: usize,
    },
}

impl FleetEvent {
    pub fn vehicle(&self) -> VehicleId {
        match *self {
            FleetEvent::PositionUpdated { vehicle, .. }
            | FleetEvent::PackageDelivered { vehicle, .. }
            | FleetEvent::RouteCompleted { vehicle, .. } => vehicle,
        }
    }
}

/// Records every event in order.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<FleetEvent>,
}

impl EventLog {
    /// Events for one vehicle, in emission order.
    pub fn for_vehicle(&self, vehicle: VehicleId) -> impl Iterator<Item = &FleetEvent> + '_ {
        self.events.iter().filter(move |e| e.vehicle() == vehicle)
    }

    /// Every delivered package, in emission order.
    pub fn deliveries(&self) -> Vec<(VehicleId, PackageId)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                FleetEvent::PackageDelivered { vehicle, package } => Some((vehicle, package)),
                _ => None,
            })
            .collect()
    }

    /// `delivered_count` of the completion event for `vehicle`, if any.
    pub fn completion(&self, vehicle: VehicleId) -> Option<usize> {
        self.for_vehicle(vehicle).find_map(|e| match *e {
            FleetEvent::RouteCompleted { delivered_count, .. } => Some(delivered_count),
            _ => None,
        })
    }
}

impl FleetObserver for EventLog {
    fn on_position_updated(&mut self, vehicle: VehicleId, position: GeoPoint, speed_kmh: f64, progress: f64) {
        self.events.push(FleetEvent::PositionUpdated { vehicle, position, speed_kmh, progress });
    }

    fn on_package_delivered(&mut self, vehicle: VehicleId, package: PackageId) {
        self.events.push(FleetEvent::PackageDelivered { vehicle, package });
    }

    fn on_route_completed(&mut self, vehicle: VehicleId, delivered_count: usize) {
        self.events.push(FleetEvent::RouteCompleted { vehicle, delivered_count });
    }
}

/// Forwards events to another thread (typically the UI's).
///
/// A disconnected receiver is not an error: the simulation keeps running
/// with nobody watching.
pub struct ChannelObserver {
    tx: Sender<FleetEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<FleetEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: FleetEvent) {
        let _ = self.tx.send(event);
    }
}

impl FleetObserver for ChannelObserver {
    fn on_position_updated(&mut self, vehicle: VehicleId, position: GeoPoint, speed_kmh: f64, progress: f64) {
        self.send(FleetEvent::PositionUpdated { vehicle, position, speed_kmh, progress });
    }

    fn on_package_delivered(&mut self, vehicle: VehicleId, package: PackageId) {
        self.send(FleetEvent::PackageDelivered { vehicle, package });
    }

    fn on_route_completed(&mut self, vehicle: VehicleId, delivered_count: usize) {
        self.send(FleetEvent::RouteCompleted { vehicle, delivered_count });
    }
}
