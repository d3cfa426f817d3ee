//! Route stops tied to packages.

use fleet_core::{GeoPoint, PackageId, WaypointId};

/// One package destination along a session's route.
///
/// `destination` is `None` when the package store had no usable coordinates.
/// Such waypoints stay in the session (so the UI can list them) but are
/// never delivered by proximity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    pub id:          WaypointId,
    pub package:     PackageId,
    pub destination: Option<GeoPoint>,
    /// Flips to `true` once, never back.
    pub delivered:   bool,
    /// Human-readable estimated arrival, e.g. `"~12 min"`.
    pub eta_label:   Option<String>,
}

impl Waypoint {
    pub fn new(id: WaypointId, package: PackageId, destination: GeoPoint) -> Self {
        Self {
            id,
            package,
            destination: Some(destination),
            delivered:   false,
            eta_label:   None,
        }
    }

    /// A waypoint whose package has no known destination.
    pub fn without_destination(id: WaypointId, package: PackageId) -> Self {
        Self {
            id,
            package,
            destination: None,
            delivered:   false,
            eta_label:   None,
        }
    }

    pub fn with_eta_label(mut self, label: impl Into<String>) -> Self {
        self.eta_label = Some(label.into());
        self
    }

    /// The destination, if present and made of valid coordinates.
    #[inline]
    pub fn deliverable_position(&self) -> Option<GeoPoint> {
        self.destination.filter(|p| p.is_valid())
    }
}

/// Format an arrival estimate the way the dashboard shows it.
pub fn eta_label(secs: f64) -> String {
    let minutes = (secs / 60.0).round().max(0.0) as u64;
    if minutes < 1 {
        "< 1 min".to_string()
    } else if minutes < 60 {
        format!("~{minutes} min")
    } else {
        format!("~{}h {:02}m", minutes / 60, minutes % 60)
    }
}
