//! Unit tests for fleet-route.

use fleet_core::{distance_km, GeoPoint};

use crate::{Route, RouteError};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// ≈1.11 km due north from the origin.
fn north_route() -> Route {
    Route::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.01)]).unwrap()
}

/// L-shaped route: north ≈1.11 km, then east ≈1.11 km.
fn l_route() -> Route {
    Route::new(vec![
        GeoPoint::new(0.0, 0.0),
        GeoPoint::new(0.0, 0.01),
        GeoPoint::new(0.01, 0.01),
    ])
    .unwrap()
}

/// Along-route distance of a point known to lie on `l_route`.
fn along_l(route: &Route, p: GeoPoint) -> f64 {
    let v = route.vertices();
    if p.lng == 0.0 {
        distance_km(v[0], p)
    } else {
        route.cumulative_km()[1] + distance_km(v[1], p)
    }
}

// ── Route construction ────────────────────────────────────────────────────────

#[cfg(test)]
mod route {
    use super::*;

    #[test]
    fn rejects_single_vertex() {
        let err = Route::new(vec![GeoPoint::new(0.0, 0.0)]).unwrap_err();
        assert_eq!(err, RouteError::TooFewVertices(1));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Route::new(vec![]).unwrap_err(), RouteError::TooFewVertices(0));
    }

    #[test]
    fn rejects_nan_vertex() {
        let err = Route::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(f64::NAN, 0.0)])
            .unwrap_err();
        assert_eq!(err, RouteError::InvalidVertex { index: 1 });
    }

    #[test]
    fn total_is_sum_of_segments() {
        let r = l_route();
        let expected = crate::total_length(r.vertices());
        assert!((r.total_distance_km() - expected).abs() < 1e-12);
        assert!((r.total_distance_km() - 2.0 * 1.11195).abs() < 0.001);
        assert_eq!(r.cumulative_km().len(), 3);
        assert_eq!(r.cumulative_km()[0], 0.0);
    }

    #[test]
    fn progress_nearest_picks_closest_vertex() {
        let r = l_route();
        let p = r.progress_nearest(GeoPoint::new(0.0001, 0.0099));
        assert!((p - 0.5).abs() < 1e-3, "got {p}");
        assert_eq!(r.progress_nearest(GeoPoint::new(-1.0, -1.0)), 0.0);
    }
}

// ── Sampling ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod sampler {
    use super::*;

    #[test]
    fn bounds_are_exact_vertices() {
        let r = l_route();
        assert_eq!(r.position_at(0.0), r.vertices()[0]);
        assert_eq!(r.position_at(1.0), r.vertices()[2]);
        assert_eq!(r.position_at(-0.5), r.vertices()[0]);
        assert_eq!(r.position_at(1.7), r.vertices()[2]);
        assert_eq!(r.position_at(f64::NAN), r.vertices()[0]);
    }

    #[test]
    fn midpoint_of_single_segment() {
        let r = north_route();
        let p = r.position_at(0.5);
        assert_eq!(p.lng, 0.0);
        assert!((p.lat - 0.005).abs() < 1e-9);
    }

    #[test]
    fn halfway_on_l_route_is_the_corner() {
        let r = l_route();
        let p = r.position_at(0.5);
        assert!(distance_km(p, r.vertices()[1]) < 1e-6);
    }

    #[test]
    fn sampled_distance_matches_progress() {
        let r = l_route();
        let total = r.total_distance_km();
        for i in 0..=100 {
            let progress = i as f64 / 100.0;
            let d = along_l(&r, r.position_at(progress));
            assert!(
                (d - progress * total).abs() < 1e-4,
                "progress {progress}: along {d} vs {}",
                progress * total
            );
        }
    }

    #[test]
    fn distance_is_monotonic_in_progress() {
        let r = l_route();
        let mut last = -1.0;
        for i in 0..=200 {
            let d = along_l(&r, r.position_at(i as f64 / 200.0));
            assert!(d >= last, "step {i}: {d} < {last}");
            last = d;
        }
    }

    #[test]
    fn zero_length_segments_are_skipped() {
        let r = Route::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.01),
        ])
        .unwrap();
        let p = r.position_at(0.25);
        assert!((p.lat - 0.0025).abs() < 1e-9);
    }

    #[test]
    fn degenerate_route_stays_put() {
        let r = Route::new(vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(1.0, 1.0)]).unwrap();
        assert_eq!(r.total_distance_km(), 0.0);
        assert_eq!(r.position_at(0.5), GeoPoint::new(1.0, 1.0));
    }
}

// ── Providers ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod provider {
    use super::*;
    use crate::{RoutingProvider, StraightLineRouter};

    #[test]
    fn straight_line_plan() {
        let stops = [GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.01), GeoPoint::new(0.01, 0.01)];
        let plan = StraightLineRouter::new(40.0).compute_route(&stops).unwrap();
        assert_eq!(plan.vertices, stops.to_vec());
        assert!((plan.total_distance_m - 2_223.9).abs() < 1.0, "got {}", plan.total_distance_m);
        // 2.2239 km at 40 km/h ≈ 200 s
        assert!((plan.total_duration_secs - 200.15).abs() < 0.5, "got {}", plan.total_duration_secs);
        assert!(plan.to_route().is_ok());
    }

    #[test]
    fn straight_line_needs_two_stops() {
        let err = StraightLineRouter::default()
            .compute_route(&[GeoPoint::new(0.0, 0.0)])
            .unwrap_err();
        assert_eq!(err, RouteError::TooFewStops(1));
    }

    #[test]
    fn straight_line_rejects_invalid_stop() {
        let err = StraightLineRouter::default()
            .compute_route(&[GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, f64::NAN)])
            .unwrap_err();
        assert_eq!(err, RouteError::InvalidVertex { index: 1 });
    }
}
