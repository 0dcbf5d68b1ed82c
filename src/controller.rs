//! # PID channels
//!
//! Each controlled axis owns one [PidChannel]. The feedback law itself is the [pid] crate's: error is
//! `setpoint - measurement`, the integral accumulates `ki * error` once per update and the derivative acts
//! on the measurement. One update happens per processed detection, so the sample period is the frame period.
//!
//! The proportional and derivative terms are not bounded on their own, the integral is held within the output
//! bound. The channel adds an output bound that does not have to be symmetric: every output is clamped to
//! `[min, max]` whatever the measurement.

use ::pid::Pid;

use crate::config::PidConfig;

/// One independently tuned controller, with its own setpoint, gains and state
#[derive(Debug, Clone)]
pub struct PidChannel {
    pid: Pid<f64>,
    min: f64,
    max: f64,
}

impl PidChannel {
    /// Create a channel from its configuration
    pub fn new(config: &PidConfig) -> Self {
        // Only the integral and the sum are bounded. The crate's limits are symmetric, so they take the
        // widest side of [min, max] and the exact bound is applied in update().
        let limit = config.min.abs().max(config.max.abs());
        let mut pid = Pid::new(config.setpoint, limit);
        pid.p(config.kp, f64::MAX).i(config.ki, limit).d(config.kd, f64::MAX);

        Self {
            pid,
            min: config.min,
            max: config.max,
        }
    }

    /// Feed one measurement and get the bounded output
    pub fn update(&mut self, measurement: f64) -> f64 {
        let output = self.pid.next_control_output(measurement).output;
        output.clamp(self.min, self.max)
    }

    /// Target value of the measurement
    pub fn setpoint(&self) -> f64 {
        self.pid.setpoint
    }

    /// Move the target value; accumulated state is kept
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.pid.setpoint(setpoint);
    }

    /// Output bound
    pub fn output_limits(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Forget the accumulated integral
    pub fn reset(&mut self) {
        self.pid.reset_integral_term();
    }
}
