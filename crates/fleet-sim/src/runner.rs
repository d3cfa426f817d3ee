//! Driving a fleet through time: schedulers, cancellation, and the
//! background simulation thread.
//!
//! The tick cadence is real time (`DeliveryConfig::tick_interval_ms`) and
//! never depends on any session's time scale.  A [`Scheduler`] decides when
//! the next tick happens; [`IntervalScheduler`] sleeps for it, while
//! [`ManualScheduler`] advances a [`ManualClock`] and returns at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use fleet_core::{Clock, GeoPoint, ManualClock, VehicleId};
use fleet_delivery::{SessionSnapshot, Waypoint};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{Fleet, FleetObserver, SessionHandle, SimError, SimResult};

// ── CancelToken ───────────────────────────────────────────────────────────────

/// Shared stop flag.  Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Decides when the next tick runs.
pub trait Scheduler: Send {
    /// Block until the next tick is due.  Returns `false` to end the run,
    /// e.g. because `cancel` fired.
    fn wait_next(&mut self, cancel: &CancelToken) -> bool;
}

/// Fixed real-time cadence.
///
/// A tick that runs late does not cause a burst of catch-up ticks: the next
/// deadline is rescheduled one interval after the late wake-up.  Time lost
/// that way is still simulated, since sessions measure the wall delta.
#[derive(Debug)]
pub struct IntervalScheduler {
    interval: Duration,
    next:     Option<Instant>,
}

impl IntervalScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval, next: None }
    }
}

impl Scheduler for IntervalScheduler {
    fn wait_next(&mut self, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        let deadline = self.next.unwrap_or(now + self.interval);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        let woke = Instant::now();
        let mut next = deadline + self.interval;
        if next <= woke {
            next = woke + self.interval;
        }
        self.next = Some(next);
        !cancel.is_cancelled()
    }
}

/// Deterministic scheduler for tests and offline replays: every call
/// advances `clock` by `step` without sleeping.
#[derive(Debug)]
pub struct ManualScheduler {
    clock:     ManualClock,
    step:      Duration,
    max_steps: Option<u64>,
    taken:     u64,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock, step: Duration) -> Self {
        Self { clock, step, max_steps: None, taken: 0 }
    }

    /// End the run after `n` ticks.
    pub fn with_max_steps(mut self, n: u64) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Ticks granted so far.
    pub fn steps_taken(&self) -> u64 {
        self.taken
    }
}

impl Scheduler for ManualScheduler {
    fn wait_next(&mut self, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() || self.max_steps.is_some_and(|max| self.taken >= max) {
            return false;
        }
        self.clock.advance(self.step);
        self.taken += 1;
        true
    }
}

// ── run_until_idle ────────────────────────────────────────────────────────────

/// Tick `fleet` on `scheduler`'s cadence until no session is active, the
/// scheduler gives up, or `cancel` fires.  Returns the number of ticks run.
pub fn run_until_idle<C, S, O>(
    fleet:     &mut Fleet<C>,
    scheduler: &mut S,
    cancel:    &CancelToken,
    observer:  &mut O,
) -> u64
where
    C: Clock,
    S: Scheduler + ?Sized,
    O: FleetObserver,
{
    let mut ticks = 0u64;
    if fleet.active_count() == 0 {
        debug!("run_until_idle: no active sessions");
        return ticks;
    }
    info!(active = fleet.active_count(), "simulation run started");

    while scheduler.wait_next(cancel) {
        let active = fleet.tick_all(observer);
        ticks += 1;
        if active == 0 {
            break;
        }
    }

    if cancel.is_cancelled() {
        info!(ticks, "simulation run cancelled");
    } else {
        info!(ticks, active = fleet.active_count(), "simulation run finished");
    }
    ticks
}

// ── SimulationHandle ──────────────────────────────────────────────────────────

/// A fleet ticking on its own thread.
///
/// The thread keeps ticking while every session is idle, so vehicles started
/// later through the handle pick up immediately.  Commands and the tick loop
/// serialise on one mutex: a command never observes a half-applied tick.
///
/// Dropping the handle cancels the thread and joins it.
pub struct SimulationHandle<C: Clock + 'static, O: FleetObserver + Send + 'static> {
    fleet:  Arc<Mutex<Fleet<C>>>,
    cancel: CancelToken,
    thread: Option<JoinHandle<O>>,
}

impl<C, O> SimulationHandle<C, O>
where
    C: Clock + 'static,
    O: FleetObserver + Send + 'static,
{
    /// Move `fleet` onto a background thread driven by `scheduler`.
    pub fn spawn<S>(fleet: Fleet<C>, mut scheduler: S, mut observer: O) -> SimResult<Self>
    where
        S: Scheduler + 'static,
    {
        let fleet = Arc::new(Mutex::new(fleet));
        let cancel = CancelToken::new();

        let thread = std::thread::Builder::new()
            .name("fleet-sim".to_string())
            .spawn({
                let fleet = Arc::clone(&fleet);
                let cancel = cancel.clone();
                move || {
                    let mut ticks = 0u64;
                    while scheduler.wait_next(&cancel) {
                        fleet.lock().tick_all(&mut observer);
                        ticks += 1;
                    }
                    debug!(ticks, "simulation thread exiting");
                    observer
                }
            })?;

        info!("simulation thread started");
        Ok(Self { fleet, cancel, thread: Some(thread) })
    }

    pub fn start(&self, vehicle: VehicleId) -> SimResult<()> {
        self.fleet.lock().start(vehicle)
    }

    pub fn stop(&self, vehicle: VehicleId) -> SimResult<bool> {
        self.fleet.lock().stop(vehicle)
    }

    pub fn set_time_scale(&self, vehicle: VehicleId, factor: f64) -> SimResult<()> {
        self.fleet.lock().set_time_scale(vehicle, factor)
    }

    pub fn create_session(
        &self,
        vehicle:   VehicleId,
        vertices:  Vec<GeoPoint>,
        waypoints: Vec<Waypoint>,
    ) -> SimResult<SessionHandle> {
        self.fleet.lock().create_session(vehicle, vertices, waypoints)
    }

    pub fn snapshot(&self, vehicle: VehicleId) -> Option<SessionSnapshot> {
        self.fleet.lock().session(vehicle).map(|s| s.snapshot())
    }

    /// Run `f` with exclusive access to the fleet, between two ticks.
    pub fn with_fleet<R>(&self, f: impl FnOnce(&mut Fleet<C>) -> R) -> R {
        f(&mut *self.fleet.lock())
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the thread to end on its own (its scheduler gave up) and
    /// return the observer.
    pub fn wait(mut self) -> SimResult<O> {
        self.join()
    }

    /// Cancel the thread, join it, and return the observer.
    pub fn shutdown(mut self) -> SimResult<O> {
        self.cancel.cancel();
        self.join()
    }

    fn join(&mut self) -> SimResult<O> {
        let thread = self.thread.take().ok_or(SimError::ThreadPanicked)?;
        thread.join().map_err(|_| {
            warn!("simulation thread panicked");
            SimError::ThreadPanicked
        })
    }
}

impl<C, O> Drop for SimulationHandle<C, O>
where
    C: Clock + 'static,
    O: FleetObserver + Send + 'static,
{
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.cancel.cancel();
            let _ = thread.join();
        }
    }
}
