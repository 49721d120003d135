//! PID controller turning angular error into an acceleration command.
//!
//! The output is clamped to the axis's symmetric acceleration limit. Windup
//! handling: the integrator is clamped first, so its contribution alone
//! never exceeds the output limit, and the summed output is clamped again.
//! Zero Ki disables the integral term; zero Kd disables the derivative.

/// Internal controller state, preserved across ticks.
///
/// Reset on `zero()` and whenever feedback is restarted, so a fresh run
/// never inherits a stale integrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    integral: f64,
    prev_error: f64,
    /// The derivative needs one prior error sample before it contributes.
    primed: bool,
}

impl PidState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Compute one controller cycle.
///
/// `limit` is the symmetric output clamp (the axis's maximum acceleration).
/// A non-positive `dt` leaves the state untouched and produces no output.
pub fn pid_compute(
    state: &mut PidState,
    gains: &PidGains,
    error: f64,
    dt: f64,
    limit: f64,
) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    let p_term = gains.kp * error;

    let i_term = if gains.ki != 0.0 {
        state.integral += error * dt;
        let i_max = limit / gains.ki.abs();
        state.integral = state.integral.clamp(-i_max, i_max);
        gains.ki * state.integral
    } else {
        state.integral = 0.0;
        0.0
    };

    let d_term = if gains.kd != 0.0 && state.primed {
        gains.kd * (error - state.prev_error) / dt
    } else {
        0.0
    };

    state.prev_error = error;
    state.primed = true;

    (p_term + i_term + d_term).clamp(-limit, limit)
}
