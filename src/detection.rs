//! # Detections
//!
//! Detection algorithms are external: anything that turns a [Frame] into a list of detections can drive the
//! loop by implementing [Detector]. This module defines the two detection shapes the target policies
//! understand, and a [ReplayDetector] that plays back detections recorded as JSON lines, one line per frame.
//!
//! A recorded tag detection line looks like:
//! ```text
//! [{"tag_id":0,"center":[325.0,238.0],"pose":{"rotation":[1,0,0,0,1,0,0,0,1],"translation":[0.0,0.0,3.05]}}]
//! ```
//! Matrices are stored column-major.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::{Matrix3, Point2, Vector3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::camera::Frame;
use crate::geometry::{BoundingBox, EulerAngles};
use crate::{Error, Result};

/// Produces the detections of one frame
pub trait Detector {
    /// Detection type handed to the target policy
    type Detection;

    /// Run the detector on a frame. An empty list is a normal outcome.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Self::Detection>>;
}

/// Pose of a tag in the camera frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagPose {
    /// Rotation, camera <- tag
    pub rotation: Matrix3<f64>,
    /// Translation, camera <- tag (meters). `z` is the distance along the optical axis.
    pub translation: Vector3<f64>,
}

impl TagPose {
    /// Distance to the tag along the optical axis
    pub fn depth(&self) -> f64 {
        self.translation.z
    }

    /// Orientation of the tag
    pub fn euler_angles(&self) -> EulerAngles {
        EulerAngles::from_rotation(&self.rotation)
    }
}

/// One AprilTag seen in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDetection {
    /// Decoded tag identity
    pub tag_id: u32,
    /// Tag center, in pixels
    pub center: Point2<f64>,
    /// Pose, present when the detector ran pose estimation
    #[serde(default)]
    pub pose: Option<TagPose>,
}

/// One object seen in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    /// Label index of the detected class
    pub class_id: u32,
    /// Detection confidence
    pub score: f32,
    /// Enclosing box
    pub bbox: BoundingBox,
}

/// Plays back recorded detections, one JSON line per frame
///
/// Every call to [Detector::detect] consumes one line regardless of the frame content. Blank lines are
/// frames without detections, and once the recording is exhausted every frame yields no detection.
pub struct ReplayDetector<T> {
    frames: VecDeque<Vec<T>>,
}

impl<T: DeserializeOwned> ReplayDetector<T> {
    /// Load a recording from a JSON-lines file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a recording from any buffered reader
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut frames = VecDeque::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                frames.push_back(Vec::new());
                continue;
            }
            let detections: Vec<T> = serde_json::from_str(&line)
                .map_err(|e| Error::DecodeError(format!("line {}: {}", number + 1, e)))?;
            frames.push_back(detections);
        }

        Ok(Self::from_frames(frames))
    }
}

impl<T> ReplayDetector<T> {
    /// Replay detections prepared in memory
    pub fn from_frames(frames: impl IntoIterator<Item = Vec<T>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Number of recorded frames not played yet
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl<T> Detector for ReplayDetector<T> {
    type Detection = T;

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<T>> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}
