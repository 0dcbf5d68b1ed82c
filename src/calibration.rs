//! # Camera calibration
//!
//! Recovers the pinhole intrinsics needed for tag pose estimation from a set of chessboard pictures. Corner
//! finding and the least-squares solve are delegated to a [CalibrationBackend]; this module prepares the
//! chessboard model, loads and checks the pictures and validates the solution:
//!  - an image that cannot be read is skipped with a warning,
//!  - an image whose resolution differs from the first one aborts the calibration,
//!  - an image without a detectable chessboard is skipped with a warning,
//!  - distortion is held at zero, a solution with non-zero distortion is rejected.

use std::path::Path;

use image::GrayImage;
use log::{info, warn};
use nalgebra::{Matrix3, Point2, Point3};

use crate::config::CameraIntrinsics;
use crate::{Error, Result};

/// Number of inner corners of the chessboard along each direction
///
/// The larger count always comes first, whatever order the board dimensions were given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSize {
    /// Corners along the long side
    pub major: u32,
    /// Corners along the short side
    pub minor: u32,
}

impl PatternSize {
    /// Pattern from the corner counts in the vertical and horizontal directions
    pub fn new(rows: u32, cols: u32) -> Self {
        if rows < cols {
            Self {
                major: cols,
                minor: rows,
            }
        } else {
            Self {
                major: rows,
                minor: cols,
            }
        }
    }

    /// Total number of corners
    pub fn corner_count(&self) -> usize {
        (self.major * self.minor) as usize
    }
}

/// Chessboard corner positions in the board plane (`z = 0`), row by row
///
/// `square_size` only scales the model, it does not affect the intrinsics.
pub fn object_points(pattern: PatternSize, square_size: f32) -> Vec<Point3<f32>> {
    let mut points = Vec::with_capacity(pattern.corner_count());
    for y in 0..pattern.minor {
        for x in 0..pattern.major {
            points.push(Point3::new(x as f32 * square_size, y as f32 * square_size, 0.0));
        }
    }
    points
}

/// Output of a calibration solve
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSolution {
    /// Camera matrix `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`
    pub camera_matrix: Matrix3<f64>,
    /// Distortion coefficients
    pub distortion: Vec<f64>,
    /// RMS reprojection error, in pixels
    pub rms_error: f64,
}

/// Corner finder and least-squares solver
pub trait CalibrationBackend {
    /// Find the inner corners of the chessboard, `None` if the board is not visible
    fn find_corners(&mut self, image: &GrayImage, pattern: PatternSize) -> Option<Vec<Point2<f32>>>;

    /// Solve for the camera matrix with tangential and radial distortion held at zero
    fn calibrate(
        &mut self,
        object_points: &[Vec<Point3<f32>>],
        image_points: &[Vec<Point2<f32>>],
        image_size: (u32, u32),
    ) -> Result<CalibrationSolution>;
}

/// Outcome of a successful calibration
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    /// Recovered intrinsics
    pub intrinsics: CameraIntrinsics,
    /// Resolution of the calibration images
    pub image_size: (u32, u32),
    /// Number of images in which the chessboard was found
    pub used_images: usize,
    /// RMS reprojection error reported by the solver
    pub rms_error: f64,
}

/// Runs a calibration over a set of chessboard pictures
pub struct Calibrator<B> {
    backend: B,
    pattern: PatternSize,
    square_size: f32,
}

impl<B: CalibrationBackend> Calibrator<B> {
    /// Create a calibrator for a chessboard
    pub fn new(backend: B, pattern: PatternSize, square_size: f32) -> Self {
        Self {
            backend,
            pattern,
            square_size,
        }
    }

    /// Calibrate from image files
    pub fn run<P: AsRef<Path>>(&mut self, files: &[P]) -> Result<CalibrationReport> {
        let model = object_points(self.pattern, self.square_size);
        let mut image_size: Option<(u32, u32)> = None;
        let mut image_points = Vec::new();

        for file in files {
            let path = file.as_ref();
            let image = match image::open(path) {
                Ok(image) => image,
                Err(e) => {
                    warn!("error opening {} ({}), skipping", path.display(), e);
                    continue;
                }
            };

            let size = (image.width(), image.height());
            match image_size {
                None => image_size = Some(size),
                Some(expected) if expected != size => {
                    return Err(Error::ImageSizeMismatch {
                        expected,
                        found: size,
                    })
                }
                Some(_) => (),
            }
            info!("loaded {} of size {}x{}", path.display(), size.0, size.1);

            let gray = image.to_luma8();
            match self.backend.find_corners(&gray, self.pattern) {
                Some(corners) => image_points.push(corners),
                None => warn!("no chessboard found in {}, skipping", path.display()),
            }
        }

        let image_size = match (image_size, image_points.is_empty()) {
            (Some(size), false) => size,
            _ => {
                return Err(Error::CalibrationError(
                    "no chessboard found in any image".to_owned(),
                ))
            }
        };

        let object_points = vec![model; image_points.len()];
        let solution = self
            .backend
            .calibrate(&object_points, &image_points, image_size)?;

        if solution.distortion.iter().any(|&c| c != 0.0) {
            return Err(Error::NonZeroDistortion(solution.distortion));
        }

        let k = &solution.camera_matrix;
        let intrinsics = CameraIntrinsics {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
        };
        info!(
            "fx = {}, fy = {}, cx = {}, cy = {} (pixels)",
            intrinsics.fx, intrinsics.fy, intrinsics.cx, intrinsics.cy
        );

        Ok(CalibrationReport {
            intrinsics,
            image_size,
            used_images: image_points.len(),
            rms_error: solution.rms_error,
        })
    }

    /// Give the backend back
    pub fn into_backend(self) -> B {
        self.backend
    }
}
