//! Plain data row types written by output backends.

use std::fmt;

/// Which fleet event a row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Position,
    Delivered,
    Completed,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Position => "position",
            EventKind::Delivered => "delivered",
            EventKind::Completed => "completed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fleet event.  Fields that do not apply to `kind` are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    /// Index of the `tick_all` call the event belongs to.
    pub tick:            u64,
    pub vehicle_id:      u32,
    pub kind:            EventKind,
    pub package_id:      Option<u32>,
    pub lng:             Option<f64>,
    pub lat:             Option<f64>,
    pub speed_kmh:       Option<f64>,
    pub progress:        Option<f64>,
    pub delivered_count: Option<u64>,
}

impl EventRow {
    pub(crate) fn bare(tick: u64, vehicle_id: u32, kind: EventKind) -> Self {
        Self {
            tick,
            vehicle_id,
            kind,
            package_id:      None,
            lng:             None,
            lat:             None,
            speed_kmh:       None,
            progress:        None,
            delivered_count: None,
        }
    }
}

/// Summary for one `tick_all` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummaryRow {
    pub tick:            u64,
    /// Clock reading at the tick, in milliseconds.
    pub time_ms:         u64,
    pub active_vehicles: u64,
}
