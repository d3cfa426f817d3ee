//! The `OutputWriter` trait implemented by backend writers.

use crate::{EventRow, OutputResult, TickSummaryRow};

/// Trait implemented by output backends.
///
/// All methods are infallible from the observer's perspective; errors are
/// stored and retrieved with [`OutputObserver::take_error`][crate::OutputObserver::take_error].
pub trait OutputWriter {
    /// Write a batch of event rows.
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()>;

    /// Write one tick summary row.
    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()>;

    /// Flush all underlying file handles.
    ///
    /// Idempotent; writes after `finish` fail with `OutputError::Finished`.
    fn finish(&mut self) -> OutputResult<()>;
}
