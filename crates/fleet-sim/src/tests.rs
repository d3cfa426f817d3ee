//! Unit tests for fleet-sim.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fleet_core::{
    Clock, DeliveryConfig, GeoPoint, ManualClock, PackageId, SystemClock, VehicleId, WaypointId,
};
use fleet_delivery::{SessionError, SessionState, Waypoint};
use fleet_route::{RouteError, RouteResult, RoutePlan, RoutingProvider, StraightLineRouter};

use crate::{
    load_store_readers, run_until_idle, CancelToken, EventLog, FailedRoutes, Fleet, FleetBuilder,
    FleetEvent, FleetObserver, InMemoryStore, IntervalScheduler, ManualScheduler, NoopObserver,
    PackageRecord, PackageStore, Scheduler, SimError, SimulationHandle, StoreWriteBack,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const V1: VehicleId = VehicleId(1);
const V2: VehicleId = VehicleId(2);

fn fleet(clock: &ManualClock) -> Fleet<ManualClock> {
    FleetBuilder::new(clock.clone()).build().unwrap()
}

fn fleet_with(clock: &ManualClock, config: DeliveryConfig) -> Fleet<ManualClock> {
    FleetBuilder::new(clock.clone()).config(config).build().unwrap()
}

fn p(lng: f64, lat: f64) -> GeoPoint {
    GeoPoint::new(lng, lat)
}

fn wp(i: u32, lng: f64, lat: f64) -> Waypoint {
    Waypoint::new(WaypointId(i), PackageId(i), p(lng, lat))
}

/// ≈2.22 km due north.
fn long_line() -> Vec<GeoPoint> {
    vec![p(0.0, 0.0), p(0.0, 0.02)]
}

/// Tick every 1 s of wall time until `vehicle` completes (or `max` ticks).
fn drive<O: FleetObserver>(
    fleet: &mut Fleet<ManualClock>,
    clock: &ManualClock,
    vehicle: VehicleId,
    observer: &mut O,
    max: usize,
) {
    for _ in 0..max {
        clock.advance(Duration::from_secs(1));
        fleet.tick(vehicle, observer).unwrap();
        if fleet.session(vehicle).unwrap().state() == SessionState::Completed {
            return;
        }
    }
}

/// Always fails, counting calls.
#[derive(Default)]
struct DownProvider {
    calls: AtomicUsize,
}

impl RoutingProvider for DownProvider {
    fn compute_route(&self, _stops: &[GeoPoint]) -> RouteResult<RoutePlan> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RouteError::Provider("service unavailable".into()))
    }
}

/// Vehicle 1 at the origin with three open packages (one without
/// coordinates) and one already delivered.  Vehicle 2 has nothing open.
fn sample_store() -> InMemoryStore {
    let mut store = InMemoryStore::new();
    store.add_vehicle(V1, p(0.0, 0.0));
    store.add_vehicle(V2, p(1.0, 1.0));
    let pkg = |id, vehicle, destination, delivered| PackageRecord {
        id: PackageId(id),
        vehicle,
        destination,
        delivered,
    };
    store.add_package(pkg(10, V1, Some(p(0.0, 0.005)), false));
    store.add_package(pkg(11, V1, Some(p(0.0, 0.01)), false));
    store.add_package(pkg(12, V1, None, false));
    store.add_package(pkg(13, V1, Some(p(0.0, 0.002)), true));
    store.add_package(pkg(20, V2, Some(p(1.0, 1.01)), true));
    store
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use super::*;

    #[test]
    fn defaults() {
        let fleet = fleet(&ManualClock::new());
        assert_eq!(fleet.config(), &DeliveryConfig::default());
        assert!(fleet.is_empty());
        assert!(fleet.failed_routes().is_empty());
    }

    #[test]
    fn invalid_config_rejected() {
        let config = DeliveryConfig { base_speed_mph: -1.0, ..DeliveryConfig::default() };
        let err = FleetBuilder::new(ManualClock::new()).config(config).build().err().unwrap();
        assert!(matches!(err, SimError::Config(_)));
    }
}

// ── Session lifecycle ─────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use super::*;

    #[test]
    fn single_vertex_route_creates_nothing() {
        let mut fleet = fleet(&ManualClock::new());
        let err = fleet
            .create_session(V1, vec![p(0.0, 0.0)], vec![wp(0, 0.0, 0.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::Validation { source: SessionError::Route(RouteError::TooFewVertices(1)), .. }
        ));
        assert!(fleet.session(V1).is_none());
    }

    #[test]
    fn failed_replacement_keeps_old_session() {
        let mut fleet = fleet(&ManualClock::new());
        let h = fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        assert!(fleet.create_session(V1, vec![], vec![]).is_err());
        assert!(fleet.session_by_handle(h).is_ok());
    }

    #[test]
    fn no_deliverable_waypoints_rejected() {
        let mut fleet = fleet(&ManualClock::new());
        let err = fleet
            .create_session(
                V1,
                long_line(),
                vec![Waypoint::without_destination(WaypointId(0), PackageId(0))],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::Validation { source: SessionError::NoDeliverableWaypoints, .. }
        ));
    }

    #[test]
    fn replacement_invalidates_old_handle() {
        let mut fleet = fleet(&ManualClock::new());
        let old = fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        let new = fleet.create_session(V1, long_line(), vec![wp(1, 0.0, 0.015)]).unwrap();

        assert_ne!(old.generation, new.generation);
        assert_eq!(fleet.handle(V1), Some(new));
        assert!(matches!(
            fleet.session_by_handle(old),
            Err(SimError::StaleHandle { given, current, .. })
                if given == old.generation && current == new.generation
        ));
        assert_eq!(fleet.session_by_handle(new).unwrap().waypoints()[0].package, PackageId(1));
        assert_eq!(fleet.len(), 1);
    }

    #[test]
    fn removed_session_is_gone() {
        let mut fleet = fleet(&ManualClock::new());
        let h = fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        let removed = fleet.remove_session(V1).unwrap();
        assert_eq!(removed.vehicle(), V1);
        assert!(fleet.is_empty());
        assert!(matches!(fleet.session_by_handle(h), Err(SimError::NoSession(_))));
        assert!(matches!(fleet.start(V1), Err(SimError::NoSession(_))));
        assert!(fleet.remove_session(V1).is_none());
    }

    #[test]
    fn commands_without_session() {
        let mut fleet = fleet(&ManualClock::new());
        assert!(matches!(fleet.start(V1), Err(SimError::NoSession(v)) if v == V1));
        assert!(matches!(fleet.stop(V1), Err(SimError::NoSession(_))));
        assert!(matches!(fleet.set_time_scale(V1, 2.0), Err(SimError::NoSession(_))));
        assert!(matches!(fleet.tick(V1, &mut NoopObserver), Err(SimError::NoSession(_))));
    }

    #[test]
    fn invalid_time_scale() {
        let mut fleet = fleet(&ManualClock::new());
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        for bad in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                fleet.set_time_scale(V1, bad),
                Err(SimError::Session { source: SessionError::InvalidTimeScale(_), .. })
            ));
        }
        assert_eq!(fleet.session(V1).unwrap().time_scale(), 1.0);
    }

    #[test]
    fn idle_session_does_not_move() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        clock.advance(Duration::from_secs(60));
        let mut log = EventLog::default();
        assert!(fleet.tick(V1, &mut log).unwrap().is_none());
        assert_eq!(fleet.tick_all(&mut log), 0);
        assert!(log.events.is_empty());
        assert_eq!(fleet.session(V1).unwrap().progress(), 0.0);
    }

    #[test]
    fn start_after_completion_is_an_error() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        fleet.set_time_scale(V1, 10_000.0).unwrap();
        fleet.start(V1).unwrap();
        drive(&mut fleet, &clock, V1, &mut NoopObserver, 10);
        assert_eq!(fleet.session(V1).unwrap().state(), SessionState::Completed);
        assert!(matches!(
            fleet.start(V1),
            Err(SimError::Session { source: SessionError::AlreadyCompleted, .. })
        ));
        assert!(!fleet.stop(V1).unwrap());
    }

    #[test]
    fn new_sessions_take_default_time_scale() {
        let config = DeliveryConfig { default_time_scale: 4.0, ..DeliveryConfig::default() };
        let mut fleet = fleet_with(&ManualClock::new(), config);
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        assert_eq!(fleet.session(V1).unwrap().time_scale(), 4.0);
    }
}

// ── Ticking ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod ticking {
    use super::*;

    /// Short route, huge time scale: a single tick finishes it.
    #[test]
    fn one_tick_completes_short_route() {
        let clock = ManualClock::new();
        // Base speed is configured in mph and converted to km inside the tick.
        let config = DeliveryConfig { base_speed_mph: 36.0, ..DeliveryConfig::default() };
        let mut fleet = fleet_with(&clock, config);
        fleet
            .create_session(V1, vec![p(0.0, 0.0), p(0.0, 0.01)], vec![wp(7, 0.0, 0.01)])
            .unwrap();
        fleet.set_time_scale(V1, 3600.0).unwrap();
        fleet.start(V1).unwrap();

        clock.advance(Duration::from_secs(1));
        let mut log = EventLog::default();
        let r = fleet.tick(V1, &mut log).unwrap().unwrap();

        assert_eq!(r.progress, 1.0);
        assert!(r.completed);
        let s = fleet.session(V1).unwrap();
        assert_eq!(s.state(), SessionState::Completed);
        assert!(s.delivered().contains(&PackageId(7)));
        assert_eq!(log.deliveries(), vec![(V1, PackageId(7))]);
        assert_eq!(log.completion(V1), Some(1));
        assert!(matches!(log.events.last(), Some(FleetEvent::RouteCompleted { .. })));
    }

    /// Two stops 80 m apart: the in-transit radius picks them up on
    /// different ticks, each within 100 m of the vehicle.
    #[test]
    fn close_stops_delivered_separately() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        let a = p(0.0, 0.010);
        let b = p(0.0, 0.010_72);
        assert!((a.distance_km(b) - 0.08).abs() < 0.001);

        fleet
            .create_session(
                V1,
                long_line(),
                vec![
                    Waypoint::new(WaypointId(0), PackageId(1), a),
                    Waypoint::new(WaypointId(1), PackageId(2), b),
                ],
            )
            .unwrap();
        fleet.start(V1).unwrap();

        let mut log = EventLog::default();
        drive(&mut fleet, &clock, V1, &mut log, 2_000);
        assert_eq!(fleet.session(V1).unwrap().state(), SessionState::Completed);

        // Each delivery is followed by the position of the tick that made it.
        let mut delivered_at = Vec::new();
        for (i, e) in log.events.iter().enumerate() {
            if let FleetEvent::PackageDelivered { package, .. } = *e {
                let position = log.events[i..]
                    .iter()
                    .find_map(|e| match *e {
                        FleetEvent::PositionUpdated { position, .. } => Some(position),
                        _ => None,
                    })
                    .unwrap();
                delivered_at.push((package, position));
            }
        }
        assert_eq!(delivered_at.len(), 2);
        assert_eq!(delivered_at[0].0, PackageId(1));
        assert_eq!(delivered_at[1].0, PackageId(2));
        assert!(delivered_at[0].1.distance_km(a) <= 0.1);
        assert!(delivered_at[1].1.distance_km(b) <= 0.1);
        assert_ne!(delivered_at[0].1, delivered_at[1].1);
        assert_eq!(log.completion(V1), Some(2));
    }

    #[test]
    fn progress_never_decreases() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.02)]).unwrap();
        fleet.start(V1).unwrap();
        let mut log = EventLog::default();
        drive(&mut fleet, &clock, V1, &mut log, 2_000);

        let progress: Vec<f64> = log
            .events
            .iter()
            .filter_map(|e| match *e {
                FleetEvent::PositionUpdated { progress, .. } => Some(progress),
                _ => None,
            })
            .collect();
        assert!(progress.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(progress.last().copied(), Some(1.0));
    }

    #[test]
    fn stop_and_resume_keeps_progress() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        fleet
            .create_session(V1, long_line(), vec![wp(0, 0.0, 0.005), wp(1, 0.0, 0.018)])
            .unwrap();
        fleet.set_time_scale(V1, 10.0).unwrap();
        fleet.start(V1).unwrap();

        let mut log = EventLog::default();
        for _ in 0..10 {
            clock.advance(Duration::from_secs(1));
            fleet.tick(V1, &mut log).unwrap();
        }
        assert!(fleet.stop(V1).unwrap());
        let before = fleet.session(V1).unwrap().snapshot();
        assert_eq!(before.state, SessionState::Idle);
        assert_eq!(before.speed_kmh, 0.0);

        // A long pause is not simulated.
        clock.advance(Duration::from_secs(3_600));
        fleet.tick_all(&mut log);
        fleet.start(V1).unwrap();
        fleet.tick(V1, &mut log).unwrap();
        let after = fleet.session(V1).unwrap().snapshot();
        assert_eq!(after.progress, before.progress);
        assert_eq!(after.delivered, before.delivered);

        drive(&mut fleet, &clock, V1, &mut log, 2_000);
        let deliveries = log.deliveries();
        assert_eq!(deliveries, vec![(V1, PackageId(0)), (V1, PackageId(1))]);
        assert_eq!(log.completion(V1), Some(2));
    }

    #[test]
    fn tick_all_dispatches_in_vehicle_order() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        // Created out of order on purpose.
        fleet.create_session(V2, long_line(), vec![wp(0, 0.0, 0.02)]).unwrap();
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.02)]).unwrap();
        fleet.start(V2).unwrap();
        fleet.start(V1).unwrap();

        clock.advance(Duration::from_secs(1));
        let mut log = EventLog::default();
        assert_eq!(fleet.tick_all(&mut log), 2);
        let order: Vec<VehicleId> = log.events.iter().map(FleetEvent::vehicle).collect();
        assert_eq!(order, vec![V1, V2]);
    }

    #[test]
    fn tick_end_reports_active_count() {
        #[derive(Default)]
        struct Ends(Vec<(Duration, usize)>);
        impl FleetObserver for Ends {
            fn on_tick_end(&mut self, now: Duration, active: usize) {
                self.0.push((now, active));
            }
        }

        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.02)]).unwrap();
        fleet.start(V1).unwrap();
        let mut ends = Ends::default();
        clock.advance(Duration::from_secs(2));
        fleet.tick_all(&mut ends);
        fleet.stop(V1).unwrap();
        fleet.tick_all(&mut ends);
        assert_eq!(ends.0, vec![(Duration::from_secs(2), 1), (Duration::from_secs(2), 0)]);
    }

    #[test]
    fn observer_pair_sees_same_events() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        fleet.set_time_scale(V1, 100.0).unwrap();
        fleet.start(V1).unwrap();
        let mut pair = (EventLog::default(), EventLog::default());
        drive(&mut fleet, &clock, V1, &mut pair, 500);
        assert!(!pair.0.events.is_empty());
        assert_eq!(pair.0.events, pair.1.events);
    }

    #[test]
    fn channel_observer_forwards() {
        let (tx, rx) = std::sync::mpsc::channel();
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        fleet.start(V1).unwrap();
        clock.advance(Duration::from_secs(1));
        fleet.tick_all(&mut crate::ChannelObserver::new(tx));
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, FleetEvent::PositionUpdated { vehicle, .. } if vehicle == V1));
    }

    #[test]
    fn snapshots_cover_all_sessions() {
        let mut fleet = fleet(&ManualClock::new());
        fleet.create_session(V2, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        let snaps = fleet.snapshots();
        assert_eq!(snaps.iter().map(|s| s.vehicle).collect::<Vec<_>>(), vec![V1, V2]);
        assert!(snaps.iter().all(|s| s.remaining == 1));
    }
}

// ── Route generation ──────────────────────────────────────────────────────────

#[cfg(test)]
mod routes {
    use super::*;

    #[test]
    fn generated_session_matches_store() {
        let store = sample_store();
        let mut fleet = fleet(&ManualClock::new());
        let handle = fleet.generate_route(V1, &StraightLineRouter::default(), &store).unwrap();

        let s = fleet.session_by_handle(handle).unwrap();
        let packages: Vec<PackageId> = s.waypoints().iter().map(|w| w.package).collect();
        assert_eq!(packages, vec![PackageId(10), PackageId(11), PackageId(12)]);
        let ids: Vec<u32> = s.waypoints().iter().map(|w| w.id.get()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(s.route().vertices().len(), 3);
        assert!(s.excluded().contains(&PackageId(12)));

        // 1.11 km at 40 km/h ≈ 100 s; the first stop is halfway.
        assert_eq!(s.waypoints()[0].eta_label.as_deref(), Some("~1 min"));
        assert_eq!(s.waypoints()[1].eta_label.as_deref(), Some("~2 min"));
        assert_eq!(s.waypoints()[2].eta_label, None);
    }

    #[test]
    fn provider_failure_marks_vehicle() {
        let store = sample_store();
        let provider = DownProvider::default();
        let mut fleet = fleet(&ManualClock::new());

        let err = fleet.generate_route(V1, &provider, &store).unwrap_err();
        assert!(matches!(err, SimError::Dependency { vehicle, .. } if vehicle == V1));
        assert!(fleet.failed_routes().contains(V1));
        assert!(fleet.session(V1).is_none());

        // Not re-requested automatically.
        assert!(matches!(
            fleet.generate_route(V1, &provider, &store),
            Err(SimError::PreviouslyFailed(_))
        ));
        let report = fleet.generate_all_routes([V1], &provider, &store);
        assert_eq!(report.skipped, vec![V1]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        // A manual retry goes through.
        fleet.retry_route(V1, &StraightLineRouter::default(), &store).unwrap();
        assert!(!fleet.failed_routes().contains(V1));
        assert!(fleet.session(V1).is_some());
    }

    #[test]
    fn bulk_generation_report() {
        let store = sample_store();
        let mut fleet = fleet(&ManualClock::new());
        let ghost = VehicleId(99);
        let report =
            fleet.generate_all_routes([V1, V2, ghost], &StraightLineRouter::default(), &store);

        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].vehicle, V1);
        assert_eq!(report.skipped, vec![V2]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0], (v, SimError::NoOrigin(_)) if v == ghost));
        assert!(fleet.failed_routes().is_empty());
    }

    #[test]
    fn seeded_failed_set_is_honoured() {
        let store = sample_store();
        let failed: FailedRoutes = [V1].into_iter().collect();
        let mut fleet = FleetBuilder::new(ManualClock::new())
            .failed_routes(failed)
            .build()
            .unwrap();
        assert!(matches!(
            fleet.generate_route(V1, &StraightLineRouter::default(), &store),
            Err(SimError::PreviouslyFailed(_))
        ));
    }

    #[test]
    fn invalid_origin() {
        let mut store = sample_store();
        store.add_vehicle(V1, p(f64::NAN, 0.0));
        let mut fleet = fleet(&ManualClock::new());
        assert!(matches!(
            fleet.generate_route(V1, &StraightLineRouter::default(), &store),
            Err(SimError::NoOrigin(_))
        ));
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod store {
    use super::*;

    #[test]
    fn write_back_marks_delivered() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        let store = sample_store();
        fleet.generate_route(V1, &StraightLineRouter::default(), &store).unwrap();
        fleet.start(V1).unwrap();

        let mut observer = (EventLog::default(), StoreWriteBack::new(store));
        drive(&mut fleet, &clock, V1, &mut observer, 1_000);
        let (log, mut write_back) = observer;
        assert_eq!(fleet.session(V1).unwrap().state(), SessionState::Completed);

        assert!(write_back.take_error().is_none());
        let store = write_back.into_inner();
        assert!(store.package(PackageId(10)).unwrap().delivered);
        assert!(store.package(PackageId(11)).unwrap().delivered);
        assert!(!store.package(PackageId(12)).unwrap().delivered);
        assert_eq!(log.completion(V1), Some(2));
    }

    /// At 20× with 1 s ticks one step is ~0.3 km, longer than the in-transit
    /// radius: the vehicle jumps over the halfway stop, and the final sweep
    /// only looks around the end of the route.
    #[test]
    fn coarse_steps_skip_mid_route_stop() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        let store = sample_store();
        fleet.generate_route(V1, &StraightLineRouter::default(), &store).unwrap();
        fleet.set_time_scale(V1, 20.0).unwrap();
        fleet.start(V1).unwrap();

        let mut observer = (EventLog::default(), StoreWriteBack::new(store));
        drive(&mut fleet, &clock, V1, &mut observer, 1_000);
        let (log, write_back) = observer;

        assert_eq!(log.deliveries(), vec![(V1, PackageId(11))]);
        assert_eq!(log.completion(V1), Some(1));
        let session = fleet.session(V1).unwrap();
        assert_eq!(session.state(), SessionState::Completed);
        assert!(!session.delivered().contains(&PackageId(10)));
        assert!(!write_back.into_inner().package(PackageId(10)).unwrap().delivered);
    }

    #[test]
    fn write_back_keeps_first_error() {
        let mut write_back = StoreWriteBack::new(sample_store());
        write_back.on_package_delivered(V2, PackageId(10));
        write_back.on_package_delivered(V1, PackageId(404));
        assert!(matches!(
            write_back.take_error(),
            Some(SimError::UnknownPackage { vehicle, package }) if vehicle == V2 && package == PackageId(10)
        ));
        assert!(write_back.take_error().is_none());
    }

    #[test]
    fn packages_for_keeps_assignment_order() {
        let store = sample_store();
        let ids: Vec<u32> = store.packages_for(V1).iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![10, 11, 12, 13]);
        assert_eq!(store.vehicles(), vec![V1, V2]);
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use super::*;

    const VEHICLES: &str = "vehicle_id,origin_lng,origin_lat\n1,-73.9857,40.7484\n2,-73.9772,40.7527\n";

    #[test]
    fn loads_both_files() {
        let packages = "package_id,vehicle_id,dest_lng,dest_lat,delivered\n\
                        10,1,-73.98,40.75,false\n\
                        11,1,,,\n\
                        12,2,-73.97,40.76,true\n";
        let store = load_store_readers(Cursor::new(VEHICLES), Cursor::new(packages)).unwrap();

        assert_eq!(store.vehicles(), vec![V1, V2]);
        assert_eq!(store.vehicle_origin(V1), Some(p(-73.9857, 40.7484)));
        assert_eq!(store.packages().len(), 3);
        assert_eq!(store.package(PackageId(11)).unwrap().destination, None);
        assert!(!store.package(PackageId(11)).unwrap().delivered);
        assert!(store.package(PackageId(12)).unwrap().delivered);
    }

    #[test]
    fn unknown_vehicle_rejected() {
        let packages = "package_id,vehicle_id,dest_lng,dest_lat,delivered\n10,7,0,0,false\n";
        let err = load_store_readers(Cursor::new(VEHICLES), Cursor::new(packages)).unwrap_err();
        assert!(matches!(err, SimError::Parse(msg) if msg.contains("unknown vehicle")));
    }

    #[test]
    fn bad_delivered_flag_rejected() {
        let packages = "package_id,vehicle_id,dest_lng,dest_lat,delivered\n10,1,0,0,maybe\n";
        assert!(matches!(
            load_store_readers(Cursor::new(VEHICLES), Cursor::new(packages)),
            Err(SimError::Parse(_))
        ));
    }

    #[test]
    fn from_files() {
        let dir = tempfile::tempdir().unwrap();
        let vehicles = dir.path().join("vehicles.csv");
        let packages = dir.path().join("packages.csv");
        std::fs::write(&vehicles, VEHICLES).unwrap();
        std::fs::write(&packages, "package_id,vehicle_id,dest_lng,dest_lat,delivered\n").unwrap();
        let store = crate::load_store_csv(&vehicles, &packages).unwrap();
        assert_eq!(store.vehicles().len(), 2);
        assert!(store.packages().is_empty());

        let missing = dir.path().join("missing.csv");
        assert!(matches!(crate::load_store_csv(&missing, &packages), Err(SimError::Io(_))));
    }
}

// ── Runner ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod runner {
    use super::*;

    fn running_fleet(clock: &ManualClock) -> Fleet<ManualClock> {
        let mut fleet = fleet(clock);
        fleet.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        fleet.create_session(V2, long_line(), vec![wp(1, 0.0, 0.02)]).unwrap();
        fleet.set_time_scale(V2, 2.0).unwrap();
        fleet.start(V1).unwrap();
        fleet.start(V2).unwrap();
        fleet
    }

    #[test]
    fn runs_until_every_route_completes() {
        let clock = ManualClock::new();
        let mut fleet = running_fleet(&clock);
        let mut scheduler = ManualScheduler::new(clock.clone(), Duration::from_secs(1));
        let mut log = EventLog::default();

        let ticks = run_until_idle(&mut fleet, &mut scheduler, &CancelToken::new(), &mut log);

        assert!(ticks > 0);
        assert_eq!(ticks, scheduler.steps_taken());
        assert_eq!(fleet.active_count(), 0);
        assert_eq!(log.completion(V1), Some(1));
        assert_eq!(log.completion(V2), Some(1));
        assert_eq!(clock.now(), Duration::from_secs(ticks));
    }

    #[test]
    fn max_steps_ends_the_run() {
        let clock = ManualClock::new();
        let mut fleet = running_fleet(&clock);
        let mut scheduler =
            ManualScheduler::new(clock.clone(), Duration::from_secs(1)).with_max_steps(3);
        let ticks = run_until_idle(&mut fleet, &mut scheduler, &CancelToken::new(), &mut NoopObserver);
        assert_eq!(ticks, 3);
        assert_eq!(fleet.active_count(), 2);
    }

    #[test]
    fn cancelled_before_start() {
        let clock = ManualClock::new();
        let mut fleet = running_fleet(&clock);
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut scheduler = ManualScheduler::new(clock.clone(), Duration::from_secs(1));
        assert_eq!(run_until_idle(&mut fleet, &mut scheduler, &cancel, &mut NoopObserver), 0);
    }

    #[test]
    fn nothing_active_returns_immediately() {
        let clock = ManualClock::new();
        let mut fleet = fleet(&clock);
        let mut scheduler = ManualScheduler::new(clock.clone(), Duration::from_secs(1));
        let ticks = run_until_idle(&mut fleet, &mut scheduler, &CancelToken::new(), &mut NoopObserver);
        assert_eq!(ticks, 0);
        assert_eq!(scheduler.steps_taken(), 0);
    }

    #[test]
    fn interval_scheduler_honours_cancel() {
        let mut scheduler = IntervalScheduler::new(Duration::from_millis(1));
        let cancel = CancelToken::new();
        assert!(scheduler.wait_next(&cancel));
        cancel.cancel();
        assert!(!scheduler.wait_next(&cancel));
    }

    #[test]
    fn background_thread_completes_routes() {
        let clock = ManualClock::new();
        let fleet = running_fleet(&clock);
        let scheduler =
            ManualScheduler::new(clock.clone(), Duration::from_secs(1)).with_max_steps(5_000);

        let handle = SimulationHandle::spawn(fleet, scheduler, EventLog::default()).unwrap();
        let log = handle.wait().unwrap();
        assert_eq!(log.completion(V1), Some(1));
        assert_eq!(log.completion(V2), Some(1));
    }

    #[test]
    fn cancel_token_stops_background_thread() {
        let fleet = FleetBuilder::new(SystemClock::new()).build().unwrap();
        let scheduler = IntervalScheduler::new(Duration::from_millis(1));
        let handle = SimulationHandle::spawn(fleet, scheduler, EventLog::default()).unwrap();

        let token = handle.cancel_token();
        assert!(!token.is_cancelled());
        token.cancel();
        let log = handle.wait().unwrap();
        assert!(log.events.is_empty());
    }

    #[test]
    fn background_thread_accepts_commands() {
        let fleet = FleetBuilder::new(SystemClock::new()).build().unwrap();
        let scheduler = IntervalScheduler::new(Duration::from_millis(1));
        let handle = SimulationHandle::spawn(fleet, scheduler, NoopObserver).unwrap();

        assert!(matches!(handle.start(V1), Err(SimError::NoSession(_))));
        let h = handle.create_session(V1, long_line(), vec![wp(0, 0.0, 0.01)]).unwrap();
        handle.set_time_scale(V1, 1_000.0).unwrap();
        handle.start(V1).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while handle.snapshot(V1).unwrap().progress == 0.0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.snapshot(V1).unwrap().progress > 0.0);
        assert!(handle.with_fleet(|f| f.session_by_handle(h).is_ok()));
        handle.shutdown().unwrap();
    }
}
