//! `fleet-sim` — the delivery orchestrator.
//!
//! # Tick loop
//!
//! ```text
//! every tick_interval (real time, independent of time scale):
//!   now = clock.now()
//!   for each Active session (parallel with the `parallel` feature):
//!     ① move      — speed profile × scaled wall delta → new progress/position
//!     ② detect    — in-transit proximity check
//!     ③ commit    — progress, position, speed, delivered set, last_tick_at
//!     ④ complete  — at progress 1: final sweep, state → Completed
//!   dispatch, in ascending VehicleId order:
//!     packageDelivered*  positionUpdated  packageDelivered*(sweep)  routeCompleted?
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`fleet`]    | `Fleet<C>` — keyed session arena and the tick entry points    |
//! | [`builder`]  | `FleetBuilder<C>`                                             |
//! | [`observer`] | `FleetObserver`, `FleetEvent`, `EventLog`, `ChannelObserver`  |
//! | [`routes`]   | route generation, `FailedRoutes`, `GenerationReport`          |
//! | [`store`]    | `PackageStore`, `InMemoryStore`, `StoreWriteBack`             |
//! | [`loader`]   | CSV snapshots → `InMemoryStore`                               |
//! | [`runner`]   | `Scheduler`, `CancelToken`, `run_until_idle`, `SimulationHandle` |
//! | [`error`]    | `SimError`, `SimResult<T>`                                    |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Steps sessions on Rayon's thread pool.                 |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use fleet_core::SystemClock;
//! use fleet_route::StraightLineRouter;
//! use fleet_sim::{run_until_idle, CancelToken, EventLog, FleetBuilder, IntervalScheduler};
//!
//! let mut fleet = FleetBuilder::new(SystemClock::new()).config(config).build()?;
//! let report = fleet.generate_all_routes(store.vehicles(), &StraightLineRouter::default(), &store);
//! for handle in &report.created {
//!     fleet.start(handle.vehicle)?;
//! }
//! let mut log = EventLog::default();
//! let mut scheduler = IntervalScheduler::new(fleet.config().tick_interval());
//! run_until_idle(&mut fleet, &mut scheduler, &CancelToken::new(), &mut log);
//! ```

pub mod builder;
pub mod error;
pub mod fleet;
pub mod loader;
pub mod observer;
pub mod routes;
pub mod runner;
pub mod store;

#[cfg(test)]
mod tests;

pub use builder::FleetBuilder;
pub use error::{SimError, SimResult};
pub use fleet::{Fleet, SessionHandle};
pub use loader::{load_store_csv, load_store_readers};
pub use observer::{ChannelObserver, EventLog, FleetEvent, FleetObserver, NoopObserver};
pub use routes::{FailedRoutes, GenerationReport};
pub use runner::{
    run_until_idle, CancelToken, IntervalScheduler, ManualScheduler, Scheduler, SimulationHandle,
};
pub use store::{InMemoryStore, PackageRecord, PackageStore, StoreWriteBack};
