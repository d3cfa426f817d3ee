//! Geographic coordinate type and great-circle distance.
//!
//! Coordinates are stored as `f64` longitude/latitude in that order, which is
//! the order routing providers and map layers hand polylines around in.
//! Single precision is not enough here: delivery radii are compared at the
//! metre level and a boundary test must be exact.

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Haversine great-circle distance in kilometres.
    #[inline]
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        distance_km(self, other)
    }

    /// `true` if both components are finite and inside the WGS-84 ranges.
    ///
    /// Packages whose destination fails this check can never be delivered by
    /// proximity.
    pub fn is_valid(self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Linear interpolation toward `other`; `t` is not clamped.
    ///
    /// Longitude and latitude are blended independently.  Good enough at
    /// city scale; not geodesic.
    #[inline]
    pub fn lerp(self, other: GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lng: self.lng + (other.lng - self.lng) * t,
            lat: self.lat + (other.lat - self.lat) * t,
        }
    }
}

/// Haversine great-circle distance between `a` and `b` in kilometres.
///
/// NaN inputs propagate to a NaN result; callers reject invalid coordinates
/// before they get here.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat * 0.5).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lng * 0.5).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lng, self.lat)
    }
}
