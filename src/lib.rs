//! # Cognifly visual servoing
//!
//! This crate flies a small quadcopter toward a visually detected target: an AprilTag fiducial marking a base
//! station, or an object such as a bottle. For every camera frame a detector reports the target, the target
//! geometry is turned into a four-axis velocity command by independent PID channels, and the command is sent
//! to the drone over the network. When the drone is close and centered enough it runs a landing maneuver and
//! disarms.
//!
//! ## Building blocks
//!
//! | Part | Module | Role |
//! |------|--------|------|
//! | Frame source | [camera] | Blocking source of color frames |
//! | Detector | [detection] | External detector behind the [Detector] trait, or a recorded replay |
//! | Geometry | [geometry] | Euler angles from a tag pose, bounding-box centers |
//! | PID channel | [controller] | One bounded controller per axis |
//! | Target policy | [target] | Target filter, landing condition and command composition |
//! | Drone link | [link] | Fire-and-forget commands to the drone |
//! | Control loop | [servo] | Frame loop driving all of the above |
//! | Calibration | [calibration] | Camera intrinsics from chessboard pictures |
//!
//! ## Usage
//!
//! The basic procedure is:
//!  - Load a [ServoConfig], or use the defaults
//!  - Open a frame source, a detector, a [target policy](target::TargetPolicy) and a [drone link](link::DroneLink)
//!  - Assemble them in a [ServoLoop], call [ServoLoop::take_off()] then [ServoLoop::run()]
//!
//! Every part is injected into the loop so any of them can be substituted, for example by a simulated drone.

#![warn(missing_docs)]

mod command;
mod error;

pub mod calibration;
pub mod camera;
pub mod config;
pub mod controller;
pub mod detection;
pub mod geometry;
pub mod link;
pub mod servo;
pub mod target;

pub use crate::camera::{Frame, FrameSource, ImageDirectory};
pub use crate::command::{CommandKind, DroneCommand, VelocityCommand};
pub use crate::config::ServoConfig;
pub use crate::detection::{Detector, ObjectDetection, ReplayDetector, TagDetection, TagPose};
pub use crate::error::{Error, Result};
pub use crate::servo::{FlightOutcome, FlightState, ServoLoop, StepOutcome};
pub use crate::target::{ObjectPolicy, TagPolicy};
