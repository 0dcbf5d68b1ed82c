//! # Target policies
//!
//! A policy decides, for one kind of detection, which detections are the target, when the target is reached
//! and what velocity command steers the drone toward it otherwise. Two policies are provided:
//!  - [TagPolicy] follows an AprilTag using its estimated pose, and lands on the base station it marks with
//!    a forward burst.
//!  - [ObjectPolicy] follows an object using its bounding box and lands in front of it.
//!
//! Each policy owns its PID channels; their state persists from frame to frame and is never shared.

mod object;
mod tag;

pub use object::ObjectPolicy;
pub use tag::TagPolicy;

use std::time::Duration;

use crate::command::VelocityCommand;

/// Maneuver executed once the target is reached
///
/// The steps are strictly sequential: optional burst, `burst_wait`, land, `land_wait`, disarm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingSequence {
    /// Velocity command sent before landing, if any
    pub burst: Option<VelocityCommand>,
    /// Wait after the burst, before landing
    pub burst_wait: Duration,
    /// Wait after the land command, before disarming
    pub land_wait: Duration,
}

/// Behaviour of the control loop for one kind of detection
pub trait TargetPolicy {
    /// Detection type the policy understands
    type Detection;

    /// True if the detection is the followed target
    fn matches(&self, detection: &Self::Detection) -> bool;

    /// True if the drone is close and centered enough to land
    fn is_reached(&self, detection: &Self::Detection) -> bool;

    /// Update the PID channels with the detection and compose the next velocity command
    fn compose(&mut self, detection: &Self::Detection) -> VelocityCommand;

    /// Maneuver to run when [TargetPolicy::is_reached] holds
    fn landing_sequence(&self) -> LandingSequence;
}

/// Delay from seconds; negative or NaN is zero, overflow saturates
pub(crate) fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}
