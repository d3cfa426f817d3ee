//! `fleet-output` — writing the fleet's event stream to disk.
//!
//! | Backend | Files created                                  |
//! |---------|------------------------------------------------|
//! | CSV     | `fleet_events.csv`, `tick_summaries.csv`       |
//!
//! Backends implement [`OutputWriter`] and are driven by
//! [`OutputObserver`], which implements `fleet_sim::FleetObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fleet_output::{CsvWriter, OutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = OutputObserver::new(writer).with_position_interval(10);
//! run_until_idle(&mut fleet, &mut scheduler, &cancel, &mut obs);
//! obs.finish();
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::OutputObserver;
pub use row::{EventKind, EventRow, TickSummaryRow};
pub use writer::OutputWriter;
