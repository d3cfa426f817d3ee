//! The immutable `Route` polyline.

use fleet_core::GeoPoint;

use crate::sampler;
use crate::{RouteError, RouteResult};

/// An ordered polyline a vehicle drives along.
///
/// Invariants, checked by [`Route::new`] and never broken afterwards (all
/// fields are private and there are no mutators):
///
/// - at least two vertices, all with valid coordinates;
/// - `cumulative_km[i]` is the haversine length from vertex 0 to vertex `i`,
///   so `cumulative_km[0] == 0` and the last entry is the total length.
///
/// Sessions hold routes behind an `Arc` so the UI can keep drawing the same
/// polyline without copying it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Route {
    vertices:      Vec<GeoPoint>,
    cumulative_km: Vec<f64>,
}

impl Route {
    /// Validate `vertices` and cache the cumulative segment lengths.
    pub fn new(vertices: Vec<GeoPoint>) -> RouteResult<Self> {
        if vertices.len() < 2 {
            return Err(RouteError::TooFewVertices(vertices.len()));
        }
        if let Some(index) = vertices.iter().position(|v| !v.is_valid()) {
            return Err(RouteError::InvalidVertex { index });
        }
        let cumulative_km = sampler::cumulative_lengths(&vertices);
        Ok(Self { vertices, cumulative_km })
    }

    #[inline]
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    #[inline]
    pub fn first(&self) -> GeoPoint {
        self.vertices[0]
    }

    #[inline]
    pub fn last(&self) -> GeoPoint {
        self.vertices[self.vertices.len() - 1]
    }

    /// Total haversine length in kilometres (cached).
    #[inline]
    pub fn total_distance_km(&self) -> f64 {
        self.cumulative_km[self.cumulative_km.len() - 1]
    }

    /// Cumulative distance from the start to each vertex, in kilometres.
    #[inline]
    pub fn cumulative_km(&self) -> &[f64] {
        &self.cumulative_km
    }

    /// Interpolated position at `progress` (see
    /// [`sampler::position_at_progress`]).
    #[inline]
    pub fn position_at(&self, progress: f64) -> GeoPoint {
        sampler::position_at_progress(self, progress)
    }

    /// Progress fraction at which the route passes closest to `point`,
    /// measured at vertex granularity.
    pub fn progress_nearest(&self, point: GeoPoint) -> f64 {
        let nearest = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.distance_km(point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        sampler::progress_of_vertex(self, nearest)
    }
}
