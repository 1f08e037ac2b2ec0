//! Fixed-step catch-up: reconciling wall-clock time with the simulation
//! tick, and running the integrator across a whole value tree.
//!
//! Elapsed wall time is collected into an accumulator and converted into a
//! whole number of fixed-size ticks plus a fractional remainder. The ticks
//! advance the ideal (tick-boundary) state; the remainder linearly
//! interpolates between that state and a one-tick lookahead, which is what
//! decouples the exposed value from the discrete simulation step.

use std::time::Duration;

use crate::config::SpringConfig;
use crate::stepper::step;
use crate::value::Value;

/// Length of one simulation tick in seconds.
///
/// This is the physical time unit fed to the integrator. It never varies,
/// regardless of the actual display refresh rate.
pub const TICK: f64 = 1. / 60.;

/// Accumulated time beyond this many ticks means the host was likely
/// suspended; catch-up is dropped instead of simulating a burst of stale
/// ticks.
const STALL_TICKS: f64 = 10.;

/// How one frame's worth of accumulated time splits into simulation work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchUpPlan {
    /// Whole ticks to run this frame.
    pub ticks: u32,
    /// Fractional position between the last completed tick and the next,
    /// in `0..1`.
    pub completion: f64,
}

/// Fixed-step time accumulator with a stall guard.
#[derive(Debug, Default)]
pub struct Accumulator {
    /// Wall time not yet consumed by whole ticks, in seconds.
    accumulated: f64,
}

impl Accumulator {
    /// Folds in the elapsed time since the previous frame and plans this
    /// frame's simulation work. The planned whole ticks are consumed from
    /// the accumulator; the fractional remainder carries over.
    ///
    /// Returns `None` when there is nothing to simulate: either the elapsed
    /// time was zero, or the stall guard fired and dropped the accumulated
    /// time. Both cases call for a restart notification and an immediate
    /// reschedule without integrating.
    pub fn accumulate(&mut self, elapsed: Duration) -> Option<CatchUpPlan> {
        self.accumulated += elapsed.as_secs_f64();

        if self.accumulated > STALL_TICKS * TICK {
            warn!(
                "dropping {:?} of accumulated time after a stall",
                Duration::from_secs_f64(self.accumulated)
            );
            self.accumulated = 0.;
        }

        if self.accumulated == 0. {
            return None;
        }

        let ticks = (self.accumulated / TICK).floor();
        // The division can round up across a tick boundary, leaving a
        // sub-ulp negative residual; never let it inject time.
        let completion = ((self.accumulated - ticks * TICK) / TICK).max(0.);
        self.accumulated = (self.accumulated - ticks * TICK).max(0.);

        Some(CatchUpPlan {
            ticks: ticks as u32,
            completion,
        })
    }

    /// Discards any accumulated time. Called when a new animation excursion
    /// starts.
    pub fn reset(&mut self) {
        self.accumulated = 0.;
    }

    pub fn accumulated(&self) -> Duration {
        Duration::from_secs_f64(self.accumulated)
    }
}

/// Runs the planned ticks on every leaf of the target tree.
///
/// Each leaf is advanced from its ideal (tick-boundary) state toward the
/// live target value: the target is re-read on every recursion, so a target
/// that moved between frames is picked up mid-catch-up. After the whole
/// ticks, one extra lookahead step is taken and the exposed current
/// value/velocity is interpolated between the two at the plan's completion
/// fraction.
///
/// Branches present in the target but missing from the state are lazily
/// initialized at rest at the target's values before being simulated, so a
/// freshly grown branch starts settled rather than animating from an
/// undefined origin. Branches the target no longer has are left untouched.
pub fn simulate(
    plan: CatchUpPlan,
    config: &SpringConfig,
    target: &Value,
    ideal: &mut Value,
    ideal_velocity: &mut Value,
    current: &mut Value,
    current_velocity: &mut Value,
) {
    match target {
        Value::Number(dest) => {
            let (Some(mut x), Some(mut v)) = (ideal.as_number(), ideal_velocity.as_number())
            else {
                // A container was replaced by a leaf; re-seed at rest.
                reseed(target, ideal, ideal_velocity, current, current_velocity);
                return;
            };

            for _ in 0..plan.ticks {
                (x, v) = step(TICK, x, v, *dest, config);
            }
            let (next_x, next_v) = step(TICK, x, v, *dest, config);

            *ideal = Value::Number(x);
            *ideal_velocity = Value::Number(v);
            *current = Value::Number(x + (next_x - x) * plan.completion);
            *current_velocity = Value::Number(v + (next_v - v) * plan.completion);
        }
        Value::List(targets) => {
            let matching = matches!(ideal, Value::List(_))
                && matches!(ideal_velocity, Value::List(_))
                && matches!(current, Value::List(_))
                && matches!(current_velocity, Value::List(_));
            if !matching {
                reseed(target, ideal, ideal_velocity, current, current_velocity);
                return;
            }

            for (i, sub_target) in targets.iter().enumerate() {
                simulate(
                    plan,
                    config,
                    sub_target,
                    list_slot(ideal, i, sub_target, false),
                    list_slot(ideal_velocity, i, sub_target, true),
                    list_slot(current, i, sub_target, false),
                    list_slot(current_velocity, i, sub_target, true),
                );
            }
        }
        Value::Map(targets) => {
            let matching = matches!(ideal, Value::Map(_))
                && matches!(ideal_velocity, Value::Map(_))
                && matches!(current, Value::Map(_))
                && matches!(current_velocity, Value::Map(_));
            if !matching {
                reseed(target, ideal, ideal_velocity, current, current_velocity);
                return;
            }

            for (key, sub_target) in targets {
                simulate(
                    plan,
                    config,
                    sub_target,
                    map_slot(ideal, key, sub_target, false),
                    map_slot(ideal_velocity, key, sub_target, true),
                    map_slot(current, key, sub_target, false),
                    map_slot(current_velocity, key, sub_target, true),
                );
            }
        }
    }
}

/// Replaces a mismatched state subtree with the target's values at rest.
fn reseed(
    target: &Value,
    ideal: &mut Value,
    ideal_velocity: &mut Value,
    current: &mut Value,
    current_velocity: &mut Value,
) {
    trace!("re-seeding state subtree to match the target shape");
    *ideal = target.clone();
    *ideal_velocity = target.zeroed();
    *current = target.clone();
    *current_velocity = target.zeroed();
}

/// Returns the `index`-th slot of a list state tree, lazily growing it with
/// rest values taken from the target branch.
fn list_slot<'a>(tree: &'a mut Value, index: usize, seed: &Value, velocity: bool) -> &'a mut Value {
    let Value::List(items) = tree else {
        unreachable!("caller checked the container kind");
    };
    while items.len() <= index {
        // The target grew; only the final slot's seed is meaningful, but
        // intermediate ones are overwritten on their own visit anyway.
        items.push(if velocity { seed.zeroed() } else { seed.clone() });
    }
    &mut items[index]
}

/// Returns the map slot for `key`, lazily inserting a rest-value branch
/// copied from the target.
fn map_slot<'a>(tree: &'a mut Value, key: &str, seed: &Value, velocity: bool) -> &'a mut Value {
    let Value::Map(entries) = tree else {
        unreachable!("caller checked the container kind");
    };
    let pos = match entries.iter().position(|(k, _)| k == key) {
        Some(pos) => pos,
        None => {
            entries.push((
                key.to_owned(),
                if velocity { seed.zeroed() } else { seed.clone() },
            ));
            entries.len() - 1
        }
    };
    &mut entries[pos].1
}
