//! Proximity-based delivery detection.

use std::collections::BTreeSet;

use fleet_core::{DetectionRule, GeoPoint, PackageId};

use crate::Waypoint;

/// Packages that become deliverable at `position`.
///
/// A waypoint qualifies when its package is not yet in `delivered`, it has
/// valid destination coordinates, and `rule` accepts the haversine distance
/// at `progress`.  Waypoints without usable coordinates are skipped here;
/// the session logs them once when it is created.
///
/// Pure: `delivered` is not touched.  The caller commits the returned ids,
/// so calling twice with the same inputs after committing returns nothing.
pub fn check_deliveries(
    position:  GeoPoint,
    waypoints: &[Waypoint],
    delivered: &BTreeSet<PackageId>,
    rule:      DetectionRule,
    progress:  f64,
) -> Vec<PackageId> {
    if progress <= rule.min_progress {
        return Vec::new();
    }
    waypoints
        .iter()
        .filter(|w| !delivered.contains(&w.package))
        .filter_map(|w| {
            let dest = w.deliverable_position()?;
            rule.accepts(position.distance_km(dest), progress).then_some(w.package)
        })
        .collect()
}
