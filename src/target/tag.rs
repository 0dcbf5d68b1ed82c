use log::debug;

use crate::command::VelocityCommand;
use crate::config::{FrameGeometry, TagPolicyConfig};
use crate::controller::PidChannel;
use crate::detection::TagDetection;
use crate::geometry::is_close;
use crate::target::{seconds, LandingSequence, TargetPolicy};

/// # AprilTag following
///
/// Channels and their measurements:
/// * forward/backward: tag depth (pose translation `z`)
/// * right/left: tag center `x`
/// * up/down: tag center `y`
/// * yaw: tag yaw angle, only updated when the yaw leaves the `[min_yaw_angle, max_yaw_angle]` band. Inside
///   the band the last computed yaw rate is sent again.
///
/// Only detections of the configured tag id carrying a pose are followed.
pub struct TagPolicy {
    config: TagPolicyConfig,
    frame: FrameGeometry,
    command_duration: f64,
    x: PidChannel,
    y: PidChannel,
    z: PidChannel,
    yaw: PidChannel,
    yaw_rate: f64,
}

impl TagPolicy {
    /// Create the policy and its four PID channels
    ///
    /// `command_duration` is the duration attached to every tracking command, in seconds.
    pub fn new(config: TagPolicyConfig, frame: FrameGeometry, command_duration: f64) -> Self {
        Self {
            x: PidChannel::new(&config.x_pid),
            y: PidChannel::new(&config.y_pid),
            z: PidChannel::new(&config.z_pid),
            yaw: PidChannel::new(&config.yaw_pid),
            yaw_rate: 0.0,
            config,
            frame,
            command_duration,
        }
    }

    /// Yaw rate sent with the last command
    pub fn yaw_rate(&self) -> f64 {
        self.yaw_rate
    }

    /// Policy configuration
    pub fn config(&self) -> &TagPolicyConfig {
        &self.config
    }
}

impl TargetPolicy for TagPolicy {
    type Detection = TagDetection;

    fn matches(&self, detection: &TagDetection) -> bool {
        detection.tag_id == self.config.tag_id && detection.pose.is_some()
    }

    fn is_reached(&self, detection: &TagDetection) -> bool {
        let pose = match &detection.pose {
            Some(pose) => pose,
            None => return false,
        };
        let tolerance = self.config.pixel_tolerance;

        detection.center.x.abs() - self.frame.center_x() <= tolerance
            && detection.center.y.abs() - self.frame.center_y() <= tolerance
            && is_close(pose.depth(), self.config.proximity_goal, self.config.depth_tolerance)
    }

    fn compose(&mut self, detection: &TagDetection) -> VelocityCommand {
        let (depth, yaw) = match &detection.pose {
            Some(pose) => (pose.depth(), pose.euler_angles().yaw),
            None => (self.config.proximity_goal, 0.0),
        };

        if yaw < self.config.min_yaw_angle || yaw > self.config.max_yaw_angle {
            self.yaw_rate = self.yaw.update(yaw);
        }

        let command = VelocityCommand::new(
            self.x.update(depth),
            self.y.update(detection.center.x),
            self.z.update(detection.center.y),
            self.yaw_rate,
            self.command_duration,
        );
        debug!(
            "tag {} depth={:.3} yaw={:.3} -> {:?}",
            detection.tag_id, depth, yaw, command
        );

        command
    }

    fn landing_sequence(&self) -> LandingSequence {
        LandingSequence {
            burst: Some(VelocityCommand::new(
                self.config.burst_velocity,
                0.0,
                0.0,
                0.0,
                self.config.burst_duration,
            )),
            burst_wait: seconds(self.config.burst_duration),
            land_wait: seconds(self.config.land_wait),
        }
    }
}
