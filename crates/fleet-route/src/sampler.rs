//! Walking a polyline by distance fraction.
//!
//! # Algorithm
//!
//! The target distance is `progress * total_length`.  The segment that
//! contains it is the first one whose *end* cumulative distance reaches the
//! target; the cumulative table is sorted, so a binary search replaces the
//! linear walk.  Inside that segment the remaining fraction is applied to
//! longitude and latitude independently:
//!
//! ```text
//!   cum:   0 ──── c1 ────── c2 ─── … ── total
//!                     ▲ target
//!   frac = (target - c1) / (c2 - c1)
//!   pos  = lerp(v1, v2, frac)
//! ```
//!
//! Linear lng/lat blending is not geodesic, but the along-route error is
//! bounded by a single segment and negligible at city scale.

use fleet_core::{distance_km, GeoPoint};

use crate::Route;

/// Sum of haversine lengths of consecutive vertex pairs, in kilometres.
///
/// `Route` caches this at construction; call this directly only for raw
/// vertex lists.
pub fn total_length(vertices: &[GeoPoint]) -> f64 {
    vertices
        .windows(2)
        .map(|w| distance_km(w[0], w[1]))
        .sum()
}

/// Running total of segment lengths, one entry per vertex.
pub(crate) fn cumulative_lengths(vertices: &[GeoPoint]) -> Vec<f64> {
    let mut out = Vec::with_capacity(vertices.len());
    let mut acc = 0.0;
    out.push(acc);
    for w in vertices.windows(2) {
        acc += distance_km(w[0], w[1]);
        out.push(acc);
    }
    out
}

/// Interpolated coordinate at `progress` along `route`.
///
/// `progress <= 0` (or NaN) yields the first vertex and `progress >= 1` the
/// last, exactly.
pub fn position_at_progress(route: &Route, progress: f64) -> GeoPoint {
    if progress.is_nan() || progress <= 0.0 {
        return route.first();
    }
    if progress >= 1.0 {
        return route.last();
    }

    let cum = route.cumulative_km();
    let total = route.total_distance_km();
    if total <= 0.0 {
        // Every vertex coincides.
        return route.first();
    }
    let target = progress * total;

    // First vertex index whose cumulative distance reaches the target; the
    // containing segment ends there.  Always in 1..len because cum[0] = 0 <
    // target < total = cum[len - 1].
    let end = cum.partition_point(|&c| c < target).clamp(1, cum.len() - 1);
    let start = end - 1;

    let seg = cum[end] - cum[start];
    let vertices = route.vertices();
    if seg <= 0.0 {
        return vertices[end];
    }
    let frac = ((target - cum[start]) / seg).clamp(0.0, 1.0);
    vertices[start].lerp(vertices[end], frac)
}

/// Progress fraction at which the route reaches vertex `index`.
///
/// Out-of-range indices clamp to the last vertex.
pub fn progress_of_vertex(route: &Route, index: usize) -> f64 {
    let total = route.total_distance_km();
    if total <= 0.0 {
        return 0.0;
    }
    let cum = route.cumulative_km();
    cum[index.min(cum.len() - 1)] / total
}
