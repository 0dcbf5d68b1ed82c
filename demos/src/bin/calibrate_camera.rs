// Calibrate the camera intrinsics from chessboard pictures
//
// Corners are read from a sidecar file next to every picture, `IMAGE.corners.json`,
// holding the inner corners as `[[x, y], ...]` in row order. A picture without
// sidecar counts as one in which no chessboard was found. The intrinsics are
// solved in closed form (Zhang's planar method) with distortion held at zero, and
// printed as JSON for the tag pose estimator.

use std::collections::VecDeque;
use std::f64::consts::SQRT_2;
use std::path::{Path, PathBuf};

use clap::Parser;
use cognifly_servo::calibration::{
    CalibrationBackend, CalibrationSolution, Calibrator, PatternSize,
};
use cognifly_servo::Error;
use image::GrayImage;
use log::warn;
use nalgebra::{DMatrix, DVector, Matrix3, Point2, Point3, Vector3};

#[derive(Parser, Debug)]
#[command(name = "calibrate_camera")]
#[command(about = "Calibrate camera intrinsics from chessboard pictures", long_about = None)]
struct Args {
    /// Input image files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Number of chessboard corners in the vertical direction
    #[arg(short, long)]
    rows: u32,

    /// Number of chessboard corners in the horizontal direction
    #[arg(short, long)]
    cols: u32,

    /// Chessboard square size in user-chosen units (does not affect the results)
    #[arg(short, long, default_value = "1.0")]
    size: f32,
}

/// Corners recorded next to the pictures, handed out in picture order
struct SidecarCorners {
    corners: VecDeque<Option<Vec<Point2<f32>>>>,
}

impl SidecarCorners {
    /// Queue the sidecar of every picture the calibrator will be able to read
    fn load(files: &[PathBuf]) -> Self {
        let mut corners = VecDeque::new();
        for file in files {
            if image::open(file).is_err() {
                continue;
            }
            corners.push_back(read_sidecar(file));
        }
        Self { corners }
    }
}

fn read_sidecar(image: &Path) -> Option<Vec<Point2<f32>>> {
    let mut name = image.as_os_str().to_owned();
    name.push(".corners.json");
    let path = PathBuf::from(name);

    let json = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<Vec<[f32; 2]>>(&json) {
        Ok(points) => Some(points.iter().map(|p| Point2::new(p[0], p[1])).collect()),
        Err(e) => {
            warn!("Cannot parse {}: {}", path.display(), e);
            None
        }
    }
}

impl CalibrationBackend for SidecarCorners {
    fn find_corners(&mut self, _image: &GrayImage, pattern: PatternSize) -> Option<Vec<Point2<f32>>> {
        let corners = self.corners.pop_front().flatten()?;
        if corners.len() != pattern.corner_count() {
            warn!(
                "{} corners recorded, {} expected",
                corners.len(),
                pattern.corner_count()
            );
            return None;
        }
        Some(corners)
    }

    fn calibrate(
        &mut self,
        object_points: &[Vec<Point3<f32>>],
        image_points: &[Vec<Point2<f32>>],
        _image_size: (u32, u32),
    ) -> cognifly_servo::Result<CalibrationSolution> {
        let homographies = object_points
            .iter()
            .zip(image_points)
            .map(|(model, corners)| homography(model, corners))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::CalibrationError("degenerate chessboard view".to_owned()))?;

        let camera_matrix = intrinsics_from_homographies(&homographies)?;
        let rms_error = reprojection_error(&camera_matrix, &homographies, object_points, image_points)?;

        Ok(CalibrationSolution {
            camera_matrix,
            distortion: vec![0.0; 5],
            rms_error,
        })
    }
}

/// Right singular vector of the smallest singular value
fn null_vector(a: DMatrix<f64>) -> Option<DVector<f64>> {
    if a.nrows() < a.ncols() {
        return None;
    }
    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let smallest = svd.singular_values.imin();
    Some(v_t.row(smallest).transpose())
}

/// Similarity moving the centroid to the origin with a mean distance of sqrt(2)
fn normalization(points: &[(f64, f64)]) -> Matrix3<f64> {
    let n = points.len() as f64;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
    let (mx, my) = (sx / n, sy / n);
    let spread = points
        .iter()
        .map(|(x, y)| ((x - mx).powi(2) + (y - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let scale = if spread > 0.0 { SQRT_2 / spread } else { 1.0 };

    Matrix3::new(
        scale, 0.0, -scale * mx, //
        0.0, scale, -scale * my, //
        0.0, 0.0, 1.0,
    )
}

fn transform(t: &Matrix3<f64>, (x, y): (f64, f64)) -> (f64, f64) {
    let p = t * Vector3::new(x, y, 1.0);
    (p.x / p.z, p.y / p.z)
}

/// Board plane to image homography, normalized DLT
fn homography(model: &[Point3<f32>], corners: &[Point2<f32>]) -> Option<Matrix3<f64>> {
    let src: Vec<(f64, f64)> = model.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    let dst: Vec<(f64, f64)> = corners.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    let (src_t, dst_t) = (normalization(&src), normalization(&dst));

    let mut a = DMatrix::<f64>::zeros(2 * src.len(), 9);
    for (i, (s, d)) in src.iter().zip(&dst).enumerate() {
        let (x, y) = transform(&src_t, *s);
        let (u, v) = transform(&dst_t, *d);
        let rows = [
            [-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u],
            [0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v],
        ];
        for (offset, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                a[(2 * i + offset, j)] = *value;
            }
        }
    }

    let h = null_vector(a)?;
    let h = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
    let h = dst_t.try_inverse()? * h * src_t;
    if h[(2, 2)].abs() < f64::EPSILON {
        return None;
    }
    Some(h / h[(2, 2)])
}

fn constraint(h: &Matrix3<f64>, i: usize, j: usize) -> [f64; 6] {
    let (hi, hj) = (h.column(i), h.column(j));
    [
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ]
}

fn intrinsics_from_homographies(homographies: &[Matrix3<f64>]) -> cognifly_servo::Result<Matrix3<f64>> {
    if homographies.len() < 3 {
        return Err(Error::CalibrationError(format!(
            "{} chessboard views, at least 3 needed",
            homographies.len()
        )));
    }

    let mut v = DMatrix::<f64>::zeros(2 * homographies.len(), 6);
    for (n, h) in homographies.iter().enumerate() {
        let v12 = constraint(h, 0, 1);
        let v11 = constraint(h, 0, 0);
        let v22 = constraint(h, 1, 1);
        for j in 0..6 {
            v[(2 * n, j)] = v12[j];
            v[(2 * n + 1, j)] = v11[j] - v22[j];
        }
    }

    let degenerate = || Error::CalibrationError("chessboard views do not constrain the intrinsics".to_owned());
    let mut b = null_vector(v).ok_or_else(degenerate)?;
    if b[0] < 0.0 {
        b = -b;
    }
    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    let denominator = b11 * b22 - b12 * b12;
    let v0 = (b12 * b13 - b11 * b23) / denominator;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denominator).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    let k = Matrix3::new(
        alpha, gamma, u0, //
        0.0, beta, v0, //
        0.0, 0.0, 1.0,
    );
    if k.iter().all(|x| x.is_finite()) {
        Ok(k)
    } else {
        Err(degenerate())
    }
}

fn reprojection_error(
    k: &Matrix3<f64>,
    homographies: &[Matrix3<f64>],
    object_points: &[Vec<Point3<f32>>],
    image_points: &[Vec<Point2<f32>>],
) -> cognifly_servo::Result<f64> {
    let k_inv = k
        .try_inverse()
        .ok_or_else(|| Error::CalibrationError("singular camera matrix".to_owned()))?;

    let mut squared = 0.0;
    let mut count = 0usize;
    for ((h, model), corners) in homographies.iter().zip(object_points).zip(image_points) {
        let r1 = k_inv * h.column(0);
        let scale = 1.0 / r1.norm();
        let (r1, r2, t) = (r1 * scale, k_inv * h.column(1) * scale, k_inv * h.column(2) * scale);

        for (p, c) in model.iter().zip(corners) {
            let projected = k * (r1 * p.x as f64 + r2 * p.y as f64 + t);
            let du = projected.x / projected.z - c.x as f64;
            let dv = projected.y / projected.z - c.y as f64;
            squared += du * du + dv * dv;
            count += 1;
        }
    }

    Ok((squared / count as f64).sqrt())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let pattern = PatternSize::new(args.rows, args.cols);
    let backend = SidecarCorners::load(&args.files);
    let mut calibrator = Calibrator::new(backend, pattern, args.size);
    let report = calibrator.run(&args.files)?;

    println!(
        "Calibrated from {} of {} images ({}x{}), RMS error {:.3} px",
        report.used_images,
        args.files.len(),
        report.image_size.0,
        report.image_size.1,
        report.rms_error
    );
    println!("{}", serde_json::to_string_pretty(&report.intrinsics)?);
    Ok(())
}
