//! # Flight configuration
//!
//! Every policy constant of the control loop lives here: frame geometry, PID gains and bounds, landing
//! thresholds, the flight session timings and the camera settings. All structures implement
//! [Default] with the values the flight programs were tuned with, and can be loaded from a JSON file in
//! which any missing field falls back to its default:
//!
//! ``` no_run
//! # fn load() -> cognifly_servo::Result<()> {
//! let config = cognifly_servo::ServoConfig::from_json_file("flight.json")?;
//! println!("Aiming for {} m", config.tag.proximity_goal);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Longest accepted delay or command duration, in seconds
pub const MAX_DELAY: f64 = 3600.0;

/// Top-level configuration of a flight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    /// Size of the frames handed to the detector
    pub frame: FrameGeometry,
    /// Drone connection and flight sequencing
    pub session: SessionConfig,
    /// Frame source
    pub camera: CameraConfig,
    /// AprilTag following
    pub tag: TagPolicyConfig,
    /// Object (bounding box) following
    pub object: ObjectPolicyConfig,
}

impl ServoConfig {
    /// Parse a configuration from a JSON string
    ///
    /// Setpoints not given in the document follow the other settings: the lateral and vertical channels aim at
    /// the center of the configured frame, the tag forward channel at `proximity_goal` and the object forward
    /// channel at the middle of the width band.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))?;
        let mut config =
            ServoConfig::deserialize(&document).map_err(|e| Error::ConfigError(e.to_string()))?;
        config.derive_setpoints(&document);
        config.validate()?;
        Ok(config)
    }

    fn derive_setpoints(&mut self, document: &serde_json::Value) {
        let (center_x, center_y) = (self.frame.center_x(), self.frame.center_y());
        let tag_goal = self.tag.proximity_goal;
        let object_goal = (self.object.min_width + self.object.max_width) / 2.0;

        let channels = [
            ("/tag/x_pid/setpoint", &mut self.tag.x_pid, tag_goal),
            ("/tag/y_pid/setpoint", &mut self.tag.y_pid, center_x),
            ("/tag/z_pid/setpoint", &mut self.tag.z_pid, center_y),
            ("/object/x_pid/setpoint", &mut self.object.x_pid, object_goal),
            ("/object/y_pid/setpoint", &mut self.object.y_pid, center_x),
            ("/object/z_pid/setpoint", &mut self.object.z_pid, center_y),
        ];
        for (pointer, pid, setpoint) in channels {
            if document.pointer(pointer).is_none() {
                pid.setpoint = setpoint;
            }
        }
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the bounds that would otherwise make the loop misbehave silently, or panic mid-flight
    pub fn validate(&self) -> Result<()> {
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(Error::ConfigError("frame size must be non-zero".to_owned()));
        }
        if self.object.min_width >= self.object.max_width {
            return Err(Error::ConfigError(format!(
                "bounding box width band ({}, {}) is empty",
                self.object.min_width, self.object.max_width
            )));
        }
        if self.tag.min_yaw_angle > self.tag.max_yaw_angle {
            return Err(Error::ConfigError(format!(
                "yaw band [{}, {}] is inverted",
                self.tag.min_yaw_angle, self.tag.max_yaw_angle
            )));
        }
        let delays = [
            ("session.arm_delay", self.session.arm_delay),
            ("session.takeoff_delay", self.session.takeoff_delay),
            ("session.command_duration", self.session.command_duration),
            ("camera.retry_delay", self.camera.retry_delay),
            ("tag.burst_duration", self.tag.burst_duration),
            ("tag.land_wait", self.tag.land_wait),
            ("object.land_wait", self.object.land_wait),
        ];
        for (name, delay) in delays.iter() {
            if !(0.0..=MAX_DELAY).contains(delay) {
                return Err(Error::ConfigError(format!(
                    "{} = {} is outside [0, {}] seconds",
                    name, delay, MAX_DELAY
                )));
            }
        }
        let channels = [
            ("tag.x_pid", &self.tag.x_pid),
            ("tag.y_pid", &self.tag.y_pid),
            ("tag.z_pid", &self.tag.z_pid),
            ("tag.yaw_pid", &self.tag.yaw_pid),
            ("object.x_pid", &self.object.x_pid),
            ("object.y_pid", &self.object.y_pid),
            ("object.z_pid", &self.object.z_pid),
        ];
        for (name, pid) in channels.iter() {
            if pid.min > pid.max {
                return Err(Error::ConfigError(format!(
                    "{} output bound [{}, {}] is inverted",
                    name, pid.min, pid.max
                )));
            }
        }
        Ok(())
    }
}

/// Resolution of the frames returned by the detector, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameGeometry {
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

impl FrameGeometry {
    /// Horizontal center of the frame
    pub fn center_x(&self) -> f64 {
        self.width as f64 / 2.0
    }

    /// Vertical center of the frame
    pub fn center_y(&self) -> f64 {
        self.height as f64 / 2.0
    }
}

/// Which matching detections of a frame drive a velocity command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Only the first matching detection of a frame is acted upon
    FirstMatch,
    /// Every matching detection issues a command; later commands supersede earlier ones
    EveryMatch,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy::FirstMatch
    }
}

/// Drone connection and flight sequencing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Hostname or address of the drone
    pub drone_host: String,
    /// UDP port the drone listens on
    pub drone_port: u16,
    /// Wait after arming before taking off (seconds)
    pub arm_delay: f64,
    /// Wait after the takeoff command before tracking starts (seconds)
    pub takeoff_delay: f64,
    /// Duration attached to every tracking velocity command (seconds)
    pub command_duration: f64,
    /// Which matching detections drive commands
    pub match_policy: MatchPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            drone_host: "192.168.5.247".to_owned(),
            drone_port: 8988,
            arm_delay: 5.0,
            takeoff_delay: 2.0,
            command_duration: 1.0,
            match_policy: MatchPolicy::default(),
        }
    }
}

/// Pinhole camera intrinsics, in pixels, as recovered by [calibration](crate::calibration)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Horizontal focal length
    pub fx: f64,
    /// Vertical focal length
    pub fy: f64,
    /// Principal point, x
    pub cx: f64,
    /// Principal point, y
    pub cy: f64,
}

/// Frame source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Directory holding the frames to replay
    pub frames_dir: PathBuf,
    /// Additional attempts when the camera cannot be opened; 0 aborts on the first failure
    pub open_retries: u32,
    /// Wait between two open attempts (seconds)
    pub retry_delay: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("frames"),
            open_retries: 0,
            retry_delay: 1.0,
        }
    }
}

impl CameraConfig {
    pub(crate) fn retry_delay(&self) -> Duration {
        crate::target::seconds(self.retry_delay)
    }
}

/// Gains, setpoint and output bound of one PID channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Target value of the measurement
    pub setpoint: f64,
    /// Lower output bound
    pub min: f64,
    /// Upper output bound
    pub max: f64,
}

impl PidConfig {
    /// Channel with an output bound symmetric around zero
    pub fn symmetric(kp: f64, ki: f64, kd: f64, setpoint: f64, limit: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint,
            min: -limit,
            max: limit,
        }
    }
}

const TAG_MAX_VELOCITY: f64 = 0.5;
const TAG_MAX_YAW_VELOCITY: f64 = 0.2;
const OBJECT_MAX_VELOCITY: f64 = 0.7;

/// Tag-following policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagPolicyConfig {
    /// Identity of the tag to follow
    pub tag_id: u32,
    /// Distance to the tag the drone aims for (meters)
    pub proximity_goal: f64,
    /// Relative tolerance on the distance for landing
    pub depth_tolerance: f64,
    /// Pixel tolerance on the tag center for landing
    pub pixel_tolerance: f64,
    /// Lower edge of the yaw band inside which the yaw command is held (radians)
    pub min_yaw_angle: f64,
    /// Upper edge of the yaw band inside which the yaw command is held (radians)
    pub max_yaw_angle: f64,
    /// Forward velocity of the burst that carries the drone over the base station
    pub burst_velocity: f64,
    /// Duration of the burst (seconds)
    pub burst_duration: f64,
    /// Wait between the land command and disarming (seconds)
    pub land_wait: f64,
    /// Forward/backward channel, driven by tag depth
    pub x_pid: PidConfig,
    /// Right/left channel, driven by the tag horizontal center
    pub y_pid: PidConfig,
    /// Up/down channel, driven by the tag vertical center
    pub z_pid: PidConfig,
    /// Yaw channel, driven by the tag yaw angle
    pub yaw_pid: PidConfig,
}

impl Default for TagPolicyConfig {
    fn default() -> Self {
        let frame = FrameGeometry::default();
        let proximity_goal = 3.0;
        Self {
            tag_id: 0,
            proximity_goal,
            depth_tolerance: 0.2,
            pixel_tolerance: 15.0,
            min_yaw_angle: -1.0,
            max_yaw_angle: 0.07,
            burst_velocity: -3.0,
            burst_duration: 1.4,
            land_wait: 1.0,
            x_pid: PidConfig::symmetric(0.05, 0.0, 0.0001, proximity_goal, TAG_MAX_VELOCITY),
            y_pid: PidConfig::symmetric(0.001, 0.0, 0.001, frame.center_x(), TAG_MAX_VELOCITY),
            z_pid: PidConfig::symmetric(0.005, 0.0, 0.0, frame.center_y(), TAG_MAX_VELOCITY),
            yaw_pid: PidConfig::symmetric(2.0, 1.0, 2.0, 0.0, TAG_MAX_YAW_VELOCITY),
        }
    }
}

/// Bounding-box following policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectPolicyConfig {
    /// Minimum detection score
    pub score_threshold: f32,
    /// Class to follow (43 is "bottle" in the COCO labels)
    pub class_id: u32,
    /// Relative tolerance of the bounding-box center against the frame center
    pub center_tolerance: f64,
    /// Bounding-box width above which the drone is close enough (exclusive)
    pub min_width: f64,
    /// Bounding-box width below which the drone is close enough (exclusive)
    pub max_width: f64,
    /// Wait between the land command and disarming (seconds)
    pub land_wait: f64,
    /// Forward/backward channel, driven by the bounding-box width
    pub x_pid: PidConfig,
    /// Right/left channel, driven by the bounding-box horizontal center
    pub y_pid: PidConfig,
    /// Up/down channel, driven by the bounding-box vertical center
    pub z_pid: PidConfig,
}

impl Default for ObjectPolicyConfig {
    fn default() -> Self {
        let frame = FrameGeometry::default();
        let (min_width, max_width) = (110.0, 150.0);
        Self {
            score_threshold: 0.3,
            class_id: 43,
            center_tolerance: 10.0,
            min_width,
            max_width,
            land_wait: 3.0,
            x_pid: PidConfig::symmetric(
                0.005,
                0.0,
                0.0001,
                (min_width + max_width) / 2.0,
                OBJECT_MAX_VELOCITY,
            ),
            y_pid: PidConfig::symmetric(0.001, 0.0, 0.0001, frame.center_x(), OBJECT_MAX_VELOCITY),
            z_pid: PidConfig::symmetric(0.001, 0.0, 0.0, frame.center_y(), OBJECT_MAX_VELOCITY),
        }
    }
}
