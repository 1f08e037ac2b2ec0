//! Numerical integrator for a single spring coordinate.

use crate::config::SpringConfig;

/// Advances one (position, velocity) pair by one fixed time step.
///
/// Unit mass, spring force `-stiffness * (x - dest_x)`, damper force
/// `-damping * v`, integrated with semi-implicit Euler: the new velocity is
/// computed first and then used to advance the position.
///
/// When the new state lands within `precision` of the target in both
/// position and velocity, the result snaps to exactly `(dest_x, 0.)`. This
/// is the only way a coordinate reaches exact rest; without it the spring
/// would approach the target asymptotically forever.
pub fn step(dt: f64, x: f64, v: f64, dest_x: f64, config: &SpringConfig) -> (f64, f64) {
    let f_spring = -config.stiffness * (x - dest_x);
    let f_damper = -config.damping * v;
    let a = f_spring + f_damper;

    let new_v = v + a * dt;
    let new_x = x + new_v * dt;

    if new_v.abs() < config.precision && (new_x - dest_x).abs() < config.precision {
        (dest_x, 0.)
    } else {
        (new_x, new_v)
    }
}
