//! `OutputObserver<W>` — bridges `FleetObserver` to an `OutputWriter`.

use std::time::Duration;

use fleet_core::{GeoPoint, PackageId, VehicleId};
use fleet_sim::FleetObserver;
use tracing::warn;

use crate::row::{EventKind, EventRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`FleetObserver`] that writes events and tick summaries to any
/// [`OutputWriter`] backend.
///
/// Rows are buffered per tick and written at `on_tick_end`.  Events from
/// single-vehicle `Fleet::tick` calls join the next tick's batch.
///
/// Errors from the writer are stored internally because `FleetObserver`
/// methods have no return value.  After the run, call
/// [`finish`][Self::finish] and check [`take_error`][Self::take_error].
pub struct OutputObserver<W: OutputWriter> {
    writer:            W,
    tick:              u64,
    /// Write position rows only every n-th tick.  Deliveries and
    /// completions are always written.
    position_interval: u64,
    pending:           Vec<EventRow>,
    last_error:        Option<OutputError>,
}

impl<W: OutputWriter> OutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            tick:              0,
            position_interval: 1,
            pending:           Vec::new(),
            last_error:        None,
        }
    }

    /// Thin out position rows (one tick in `n`).  `0` is treated as `1`.
    pub fn with_position_interval(mut self, n: u64) -> Self {
        self.position_interval = n.max(1);
        self
    }

    /// Write buffered rows and flush the backend.
    pub fn finish(&mut self) {
        self.flush_pending();
        let result = self.writer.finish();
        self.store_err(result);
    }

    /// Take the stored write error (if any).
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the run).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let rows = std::mem::take(&mut self.pending);
        let result = self.writer.write_events(&rows);
        self.store_err(result);
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                warn!(error = %e, "fleet output write failed");
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> FleetObserver for OutputObserver<W> {
    fn on_position_updated(&mut self, vehicle: VehicleId, position: GeoPoint, speed_kmh: f64, progress: f64) {
        if self.tick % self.position_interval != 0 {
            return;
        }
        self.pending.push(EventRow {
            lng:       Some(position.lng),
            lat:       Some(position.lat),
            speed_kmh: Some(speed_kmh),
            progress:  Some(progress),
            ..EventRow::bare(self.tick, vehicle.get(), EventKind::Position)
        });
    }

    fn on_package_delivered(&mut self, vehicle: VehicleId, package: PackageId) {
        self.pending.push(EventRow {
            package_id: Some(package.get()),
            ..EventRow::bare(self.tick, vehicle.get(), EventKind::Delivered)
        });
    }

    fn on_route_completed(&mut self, vehicle: VehicleId, delivered_count: usize) {
        self.pending.push(EventRow {
            delivered_count: Some(delivered_count as u64),
            ..EventRow::bare(self.tick, vehicle.get(), EventKind::Completed)
        });
    }

    fn on_tick_end(&mut self, now: Duration, active: usize) {
        self.flush_pending();
        let row = TickSummaryRow {
            tick:            self.tick,
            time_ms:         u64::try_from(now.as_millis()).unwrap_or(u64::MAX),
            active_vehicles: active as u64,
        };
        let result = self.writer.write_tick_summary(&row);
        self.store_err(result);
        self.tick += 1;
    }
}
