use std::time::Duration;

use log::debug;

use crate::command::VelocityCommand;
use crate::config::{FrameGeometry, ObjectPolicyConfig};
use crate::controller::PidChannel;
use crate::detection::ObjectDetection;
use crate::geometry::is_close;
use crate::target::{seconds, LandingSequence, TargetPolicy};

/// # Object following
///
/// The bounding box stands in for the missing pose: its width measures proximity and its center the
/// offsets. A narrow box means the object is far, so the forward channel output is negated, and so is the
/// lateral one. The yaw is never commanded.
pub struct ObjectPolicy {
    config: ObjectPolicyConfig,
    frame: FrameGeometry,
    command_duration: f64,
    x: PidChannel,
    y: PidChannel,
    z: PidChannel,
}

impl ObjectPolicy {
    /// Create the policy and its three PID channels
    pub fn new(config: ObjectPolicyConfig, frame: FrameGeometry, command_duration: f64) -> Self {
        Self {
            x: PidChannel::new(&config.x_pid),
            y: PidChannel::new(&config.y_pid),
            z: PidChannel::new(&config.z_pid),
            config,
            frame,
            command_duration,
        }
    }

    /// Policy configuration
    pub fn config(&self) -> &ObjectPolicyConfig {
        &self.config
    }
}

impl TargetPolicy for ObjectPolicy {
    type Detection = ObjectDetection;

    fn matches(&self, detection: &ObjectDetection) -> bool {
        detection.class_id == self.config.class_id && detection.score >= self.config.score_threshold
    }

    fn is_reached(&self, detection: &ObjectDetection) -> bool {
        let bbox = &detection.bbox;
        let tolerance = self.config.center_tolerance;

        is_close(bbox.horizontal_center(), self.frame.center_x(), tolerance)
            && is_close(bbox.vertical_center(), self.frame.center_y(), tolerance)
            && bbox.width() < self.config.max_width
            && bbox.width() > self.config.min_width
    }

    fn compose(&mut self, detection: &ObjectDetection) -> VelocityCommand {
        let bbox = &detection.bbox;

        let command = VelocityCommand::new(
            -self.x.update(bbox.width()),
            -self.y.update(bbox.horizontal_center()),
            self.z.update(bbox.vertical_center()),
            0.0,
            self.command_duration,
        );
        debug!(
            "object {} width={:.1} -> {:?}",
            detection.class_id,
            bbox.width(),
            command
        );

        command
    }

    fn landing_sequence(&self) -> LandingSequence {
        LandingSequence {
            burst: None,
            burst_wait: Duration::ZERO,
            land_wait: seconds(self.config.land_wait),
        }
    }
}
