use std::array::TryFromSliceError;

use num_enum::TryFromPrimitiveError;

use crate::command::CommandKind;

/// [Result] alias for return types of the crate API
pub type Result<T> = std::result::Result<T, Error>;

/// Error enum type
#[derive(Debug)]
pub enum Error {
    /// The frame source could not be opened. The String names the source.
    CameraUnavailable(String),
    /// Filesystem or socket error.
    IoError(std::io::Error),
    /// An image could not be decoded.
    ImageError(image::ImageError),
    /// A recorded detection, config file or command datagram could not be decoded. The String contains the reason.
    DecodeError(String),
    /// Invalid configuration. The String contains the reason.
    ConfigError(String),
    /// The drone link is closed.
    Disconnected,
    /// Camera calibration failed. The String contains the reason.
    CalibrationError(String),
    /// A calibration image does not have the resolution of the first loaded image.
    ImageSizeMismatch {
        /// Resolution of the first loaded image
        expected: (u32, u32),
        /// Resolution of the offending image
        found: (u32, u32),
    },
    /// The calibration solve returned distortion coefficients although distortion is held at zero.
    NonZeroDistortion(Vec<f64>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::CameraUnavailable(source) => write!(f, "cannot open camera {}", source),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ImageError(e) => write!(f, "image error: {}", e),
            Error::DecodeError(reason) => write!(f, "decode error: {}", reason),
            Error::ConfigError(reason) => write!(f, "configuration error: {}", reason),
            Error::Disconnected => write!(f, "drone link disconnected"),
            Error::CalibrationError(reason) => write!(f, "calibration failed: {}", reason),
            Error::ImageSizeMismatch { expected, found } => write!(
                f,
                "image size {}x{} differs from {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            Error::NonZeroDistortion(coefficients) => {
                write!(f, "non-zero distortion coefficients {:?}", coefficients)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}

impl From<image::ImageError> for Error {
    fn from(error: image::ImageError) -> Self {
        Self::ImageError(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::DecodeError(format!("{}", error))
    }
}

impl From<TryFromSliceError> for Error {
    fn from(e: TryFromSliceError) -> Self {
        Self::DecodeError(format!("{:?}", e))
    }
}

impl From<TryFromPrimitiveError<CommandKind>> for Error {
    fn from(e: TryFromPrimitiveError<CommandKind>) -> Self {
        Self::DecodeError(format!("unknown command kind {}", e.number))
    }
}

impl<T> From<flume::SendError<T>> for Error {
    fn from(_: flume::SendError<T>) -> Self {
        self::Error::Disconnected
    }
}
