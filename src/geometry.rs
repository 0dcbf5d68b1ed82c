//! # Detection geometry
//!
//! Turns raw detector output into the scalars the controllers consume: Euler angles from a tag pose rotation
//! matrix, and centers and size of an object bounding box.

use std::f64::consts::FRAC_PI_2;

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Relative tolerance used when no other is given, enough to absorb rounding on values near 1
pub const DEFAULT_REL_TOL: f64 = 1e-9;

/// Relative closeness test
///
/// `a` and `b` are close when `|a - b| <= rel_tol * max(|a|, |b|)`. The tolerance is relative to the larger
/// magnitude, so a comparison against `0.0` only succeeds for an exact zero unless `rel_tol >= 1`.
pub fn is_close(a: f64, b: f64, rel_tol: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= rel_tol * a.abs().max(b.abs())
}

/// Orientation of a tag relative to the camera, in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    /// Rotation recovered from the first column of the matrix
    pub roll: f64,
    /// Rotation recovered from `R[2,0]`
    pub pitch: f64,
    /// Rotation recovered from the last row of the matrix
    pub yaw: f64,
}

impl EulerAngles {
    /// Extract the angles from a rotation matrix
    ///
    /// When `R[2,0]` is ±1 the pitch is ±90° and `cos(pitch)` vanishes; the roll is then fixed to 0 and the yaw
    /// is read from the first row instead. This is a regular branch, not an error.
    pub fn from_rotation(r: &Matrix3<f64>) -> Self {
        let r20 = r[(2, 0)];

        if !is_close(r20, 1.0, DEFAULT_REL_TOL) && !is_close(r20, -1.0, DEFAULT_REL_TOL) {
            let pitch = -r20.asin();
            let cos_pitch = pitch.cos();
            let yaw = (r[(2, 1)] / cos_pitch).atan2(r[(2, 2)] / cos_pitch);
            let roll = (r[(1, 0)] / cos_pitch).atan2(r[(0, 0)] / cos_pitch);

            Self { roll, pitch, yaw }
        } else {
            let roll = 0.0;
            if is_close(r20, -1.0, DEFAULT_REL_TOL) {
                Self {
                    roll,
                    pitch: FRAC_PI_2,
                    yaw: roll + r[(0, 1)].atan2(r[(0, 2)]),
                }
            } else {
                Self {
                    roll,
                    pitch: -FRAC_PI_2,
                    yaw: -roll + (-r[(0, 1)]).atan2(-r[(0, 2)]),
                }
            }
        }
    }

    /// True when the matrix hit the ±90° pitch branch
    pub fn is_gimbal_locked(&self) -> bool {
        self.pitch.abs() == FRAC_PI_2
    }
}

/// Axis-aligned rectangle enclosing a detected object, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub xmin: f64,
    /// Top edge
    pub ymin: f64,
    /// Right edge
    pub xmax: f64,
    /// Bottom edge
    pub ymax: f64,
}

impl BoundingBox {
    /// Build a box from its edges
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Box width; grows as the drone gets closer to the object
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Box height
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Horizontal center
    pub fn horizontal_center(&self) -> f64 {
        self.xmax - self.width() / 2.0
    }

    /// Vertical center
    pub fn vertical_center(&self) -> f64 {
        self.ymax - self.height() / 2.0
    }
}
