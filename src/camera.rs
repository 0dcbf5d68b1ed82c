//! # Frame sources
//!
//! The control loop pulls frames through the [FrameSource] trait; reading a frame blocks until one is
//! available. [ImageDirectory] replays the images of a directory in file-name order, which is how recorded
//! flights are fed to the loop. [open_with_retry] applies the camera retry policy of the configuration:
//! with the default of zero retries a camera that cannot be opened aborts the flight at once.

use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};
use log::{info, warn};

use crate::config::CameraConfig;
use crate::{Error, Result};

/// One color frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position of the frame in the stream, starting at 0
    pub sequence: u64,
    /// Pixels
    pub image: RgbImage,
}

impl Frame {
    /// Wrap an image as a frame
    pub fn new(sequence: u64, image: RgbImage) -> Self {
        Self { sequence, image }
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Grayscale copy, as consumed by tag detectors
    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }
}

/// Blocking source of frames
pub trait FrameSource {
    /// Read the next frame. `Ok(None)` signals the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replays the images of a directory, sorted by file name
#[derive(Debug)]
pub struct ImageDirectory {
    files: Vec<PathBuf>,
    next: usize,
}

impl ImageDirectory {
    /// Open a directory of frames
    ///
    /// Fails with [Error::CameraUnavailable] if the directory cannot be read or holds no image.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| Error::CameraUnavailable(format!("{}: {}", dir.display(), e)))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(Error::CameraUnavailable(format!(
                "{}: no image found",
                dir.display()
            )));
        }
        files.sort();

        info!("Opened {} with {} frames", dir.display(), files.len());
        Ok(Self { files, next: 0 })
    }

    /// Number of frames in the directory
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if the directory holds no frame
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageDirectory {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let path = match self.files.get(self.next) {
            Some(path) => path,
            None => return Ok(None),
        };
        let image = image::open(path)?.to_rgb8();
        let frame = Frame::new(self.next as u64, image);
        self.next += 1;

        Ok(Some(frame))
    }
}

/// Open a frame source, retrying as configured
///
/// `open` is called once, then up to `config.open_retries` more times with `config.retry_delay` seconds
/// between attempts. The last error is returned when every attempt failed.
pub async fn open_with_retry<S, F>(config: &CameraConfig, mut open: F) -> Result<S>
where
    F: FnMut() -> Result<S>,
{
    let mut attempt = 0;
    loop {
        match open() {
            Ok(source) => return Ok(source),
            Err(e) if attempt < config.open_retries => {
                attempt += 1;
                warn!(
                    "Cannot open camera ({}), retry {}/{}",
                    e, attempt, config.open_retries
                );
                tokio::time::sleep(config.retry_delay()).await;
            }
            Err(e) => return Err(e),
        }
    }
}
