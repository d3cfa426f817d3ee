//! Fluent builder for constructing a [`Fleet`].

use std::collections::BTreeMap;

use fleet_core::{Clock, DeliveryConfig};

use crate::{FailedRoutes, Fleet, SimResult};

/// Fluent builder for [`Fleet<C>`].
///
/// # Required inputs
///
/// - `C: Clock` — the time source
///
/// # Optional inputs (have defaults)
///
/// | Method                | Default                      |
/// |-----------------------|------------------------------|
/// | `.config(c)`          | `DeliveryConfig::default()`  |
/// | `.failed_routes(f)`   | empty                        |
///
/// # Example
///
/// ```rust,ignore
/// let fleet = FleetBuilder::new(SystemClock::new())
///     .config(config)
///     .failed_routes(persisted_failures)
///     .build()?;
/// ```
pub struct FleetBuilder<C: Clock> {
    clock:  C,
    config: Option<DeliveryConfig>,
    failed: Option<FailedRoutes>,
}

impl<C: Clock> FleetBuilder<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, config: None, failed: None }
    }

    /// Engine tunables.  Validated by [`build`][Self::build].
    pub fn config(mut self, config: DeliveryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Seed the failed-route set, e.g. from a previous run.
    pub fn failed_routes(mut self, failed: FailedRoutes) -> Self {
        self.failed = Some(failed);
        self
    }

    /// Validate the configuration and return an empty fleet.
    pub fn build(self) -> SimResult<Fleet<C>> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Fleet {
            config,
            clock:           self.clock,
            sessions:        BTreeMap::new(),
            next_generation: 0,
            failed:          self.failed.unwrap_or_default(),
        })
    }
}
