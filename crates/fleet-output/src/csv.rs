//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `fleet_events.csv`
//! - `tick_summaries.csv`
//!
//! Fields that do not apply to an event are left empty.

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{EventRow, OutputError, OutputResult, TickSummaryRow};

pub const EVENTS_FILE: &str = "fleet_events.csv";
pub const SUMMARIES_FILE: &str = "tick_summaries.csv";

/// Writes fleet output to two CSV files.
pub struct CsvWriter {
    events:    Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut events = Writer::from_path(dir.join(EVENTS_FILE))?;
        events.write_record([
            "tick",
            "vehicle_id",
            "event",
            "package_id",
            "lng",
            "lat",
            "speed_kmh",
            "progress",
            "delivered_count",
        ])?;

        let mut summaries = Writer::from_path(dir.join(SUMMARIES_FILE))?;
        summaries.write_record(["tick", "time_ms", "active_vehicles"])?;

        Ok(Self { events, summaries, finished: false })
    }
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

impl OutputWriter for CsvWriter {
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Finished);
        }
        for row in rows {
            self.events.write_record(&[
                row.tick.to_string(),
                row.vehicle_id.to_string(),
                row.kind.to_string(),
                opt(row.package_id),
                opt(row.lng),
                opt(row.lat),
                opt(row.speed_kmh),
                opt(row.progress),
                opt(row.delivered_count),
            ])?;
        }
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Finished);
        }
        self.summaries.write_record(&[
            row.tick.to_string(),
            row.time_ms.to_string(),
            row.active_vehicles.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.events.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
