//! Animation session: the Idle/Running state machine owning the simulation
//! state across frames.

use std::time::Duration;

use arrayvec::ArrayVec;

use crate::catchup::{simulate, Accumulator};
use crate::config::{ConfigError, SpringDesc};
use crate::value::{all_converged, rest_state, Value};

/// Lifecycle notification emitted by [`Session::frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    /// The first frame of a new excursion: the target moved away from the
    /// current values and simulation is starting.
    Start,
    /// Every leaf reached exact rest; no further frames are needed.
    End,
    /// Accumulated time was dropped by the stall guard; nothing was
    /// simulated this frame and the next real frame starts fresh.
    Restart,
}

/// Events emitted by a single frame. At most two: Start can coincide with
/// Restart when an excursion begins right after a stall.
pub type FrameEvents = ArrayVec<MotionEvent, 2>;

/// Drives the spring simulation for one target across frames.
///
/// The session is a pure state machine: the owner feeds it target changes
/// via [`on_target_changed`](Self::on_target_changed) and frame timestamps
/// via [`frame`](Self::frame), and pulls interpolated values out of
/// [`current`](Self::current). Scheduling lives elsewhere (see
/// [`Motion`](crate::Motion)); the session only reports, through the
/// returned events and [`is_running`](Self::is_running), whether more
/// frames are wanted.
#[derive(Debug)]
pub struct Session {
    target: Value,
    spring: SpringDesc,

    /// Interpolated values exposed to the owner, valid between frames.
    current: Value,
    current_velocity: Value,
    /// Values exactly on the last completed tick boundary.
    ideal: Value,
    ideal_velocity: Value,

    accumulator: Accumulator,
    prev_time: Duration,
    running: bool,
}

impl Session {
    /// Creates a session at rest at the given target.
    pub fn new(target: Value, spring: impl Into<SpringDesc>, now: Duration) -> Self {
        let (current, current_velocity) = rest_state(&target);
        let (ideal, ideal_velocity) = rest_state(&target);
        Self {
            target,
            spring: spring.into(),
            current,
            current_velocity,
            ideal,
            ideal_velocity,
            accumulator: Accumulator::default(),
            prev_time: now,
            running: false,
        }
    }

    /// Replaces the target.
    ///
    /// While idle this begins a fresh excursion: the frame timer and the
    /// accumulator are reset so the first frame does not absorb idle time.
    /// While running the target is swapped in place and the catch-up state
    /// carries on; new branches in the target are picked up lazily on the
    /// next frame.
    pub fn on_target_changed(&mut self, target: Value, now: Duration) {
        if !self.running {
            self.prev_time = now;
            self.accumulator.reset();
        }
        self.target = target;
    }

    /// Replaces the spring selection, failing fast on an invalid config or
    /// unknown preset name. Takes effect on the next frame.
    pub fn set_spring(&mut self, spring: impl Into<SpringDesc>) -> Result<(), ConfigError> {
        let spring = spring.into();
        spring.resolve()?;
        self.spring = spring;
        Ok(())
    }

    /// Runs one animation frame at the given timestamp.
    ///
    /// Named spring presets are re-resolved here, so registry changes apply
    /// from the next frame onward. Resolution failure (e.g. the preset was
    /// removed while in use) aborts the frame without consuming time.
    pub fn frame(&mut self, now: Duration) -> Result<FrameEvents, ConfigError> {
        let mut events = FrameEvents::new();

        if all_converged(&self.current, &self.target, &self.current_velocity) {
            if self.running {
                self.running = false;
                debug!("motion settled");
                events.push(MotionEvent::End);
            }
            return Ok(events);
        }

        let config = self.spring.resolve()?;

        if !self.running {
            debug!("motion starting");
            self.running = true;
            events.push(MotionEvent::Start);
        }

        let elapsed = now.saturating_sub(self.prev_time);
        self.prev_time = now;

        let Some(plan) = self.accumulator.accumulate(elapsed) else {
            events.push(MotionEvent::Restart);
            return Ok(events);
        };

        trace!(
            "frame: {} ticks, completion {:.4}",
            plan.ticks,
            plan.completion
        );
        simulate(
            plan,
            &config,
            &self.target,
            &mut self.ideal,
            &mut self.ideal_velocity,
            &mut self.current,
            &mut self.current_velocity,
        );

        Ok(events)
    }

    /// The interpolated values as of the last completed frame.
    pub fn current(&self) -> &Value {
        &self.current
    }

    /// The interpolated velocities as of the last completed frame.
    pub fn velocities(&self) -> &Value {
        &self.current_velocity
    }

    pub fn target(&self) -> &Value {
        &self.target
    }

    pub fn spring(&self) -> &SpringDesc {
        &self.spring
    }

    /// Whether an excursion is in flight and further frames are wanted.
    pub fn is_running(&self) -> bool {
        self.running
    }
}
