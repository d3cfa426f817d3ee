//! `fleet-delivery` — moving one vehicle along its route and handing over
//! packages.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                        |
//! |--------------|-----------------------------------------------------------------|
//! | [`speed`]    | `SpeedProfile` — ramp-up, cruise oscillation, ramp-down         |
//! | [`waypoint`] | `Waypoint` — one package destination on the route               |
//! | [`detector`] | `check_deliveries` — proximity test against undelivered stops   |
//! | [`session`]  | `DeliverySession`, `SessionState`, `TickResult`                 |
//! | [`error`]    | `SessionError`, `SessionResult<T>`                              |
//!
//! # Tick model
//!
//! ```text
//! sim_delta  = (now - last_tick_at) * time_scale
//! speed      = SpeedProfile::speed_at(progress, base_speed)        (mph)
//! distance   = speed * 1.60934 / 3600 * sim_delta                  (km)
//! progress'  = min(progress + distance / route_length, 1)
//! position'  = route.position_at(progress')
//! delivered += check_deliveries(position', in-transit rule)
//! if progress' == 1: delivered += check_deliveries(final-sweep rule); Completed
//! ```
//!
//! The session never reads a clock and never emits events: the orchestrator
//! in `fleet-sim` feeds it `now` and turns its [`TickResult`] into events.

pub mod detector;
pub mod error;
pub mod session;
pub mod speed;
pub mod waypoint;


pub use detector::check_deliveries;
pub use error::{SessionError, SessionResult};
pub use session::{DeliverySession, SessionSnapshot, SessionState, TickResult};
pub use speed::SpeedProfile;
pub use waypoint::Waypoint;
