//! Physics-based interpolation engine.
//!
//! Drives per-frame numeric values toward a moving target by simulating a
//! damped spring at a fixed internal tick rate (1/60 s), decoupled from the
//! display rate. Values between ticks are linearly interpolated, so motion
//! stays smooth at any display refresh rate.
//!
//! The target can be a single number or an arbitrarily nested structure of
//! numbers ([`Value`]); every leaf is simulated independently with the same
//! spring parameters.
//!
//! - [`Session`] is the core state machine: feed it target changes and frame
//!   timestamps, pull interpolated values out.
//! - [`Motion`] wires a session to a [`FrameScheduler`] and a [`Clock`] and
//!   keeps itself scheduled until the animation settles.

#[macro_use]
extern crate tracing;

pub mod catchup;
pub mod clock;
pub mod config;
pub mod driver;
pub mod session;
pub mod stepper;
pub mod value;

pub use clock::Clock;
pub use config::{preset, register_preset, ConfigError, SpringConfig, SpringDesc};
pub use driver::{FrameHandle, FrameScheduler, ManualScheduler, Motion};
pub use session::{FrameEvents, MotionEvent, Session};
pub use value::{Value, ValueError};

/// Returns the crate version string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
