use thiserror::Error;

use crate::format::{OutputFormat, PixelFormat};

/// The central error type for all operations in rasterpal.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Cannot allocate {width}x{height} bitmap with format {format:?}: {reason}")]
    Allocation {
        width: u32,
        height: u32,
        format: PixelFormat,
        reason: &'static str,
    },

    #[error("Expected a {expected} native image, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{operation}: pixel ({x}, {y}) is outside the {width}x{height} bitmap")]
    OutOfBounds {
        operation: &'static str,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("{operation}: invalid resolution {horizontal}x{vertical}, both axes must be positive")]
    InvalidResolution {
        operation: &'static str,
        horizontal: f32,
        vertical: f32,
    },

    #[error("No encoder registered for output format {0}")]
    UnsupportedFormat(OutputFormat),

    #[error("{operation}: image has already been released")]
    UseAfterRelease { operation: &'static str },

    #[error("Codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Foreign payloads (`image::ImageError`, `std::io::Error`) only compare by variant.
impl PartialEq for RasterError {
    fn eq(&self, other: &Self) -> bool {
        use RasterError::*;
        match (self, other) {
            (
                Allocation {
                    width: w1,
                    height: h1,
                    format: f1,
                    reason: r1,
                },
                Allocation {
                    width: w2,
                    height: h2,
                    format: f2,
                    reason: r2,
                },
            ) => w1 == w2 && h1 == h2 && f1 == f2 && r1 == r2,
            (
                TypeMismatch {
                    expected: e1,
                    found: f1,
                },
                TypeMismatch {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,
            (
                OutOfBounds {
                    operation: o1,
                    x: x1,
                    y: y1,
                    ..
                },
                OutOfBounds {
                    operation: o2,
                    x: x2,
                    y: y2,
                    ..
                },
            ) => o1 == o2 && x1 == x2 && y1 == y2,
            (
                InvalidResolution {
                    operation: o1,
                    horizontal: h1,
                    vertical: v1,
                },
                InvalidResolution {
                    operation: o2,
                    horizontal: h2,
                    vertical: v2,
                },
            ) => o1 == o2 && h1 == h2 && v1 == v2,
            (UnsupportedFormat(a), UnsupportedFormat(b)) => a == b,
            (UseAfterRelease { operation: a }, UseAfterRelease { operation: b }) => a == b,
            (Codec(_), Codec(_)) => true,
            (Io(_), Io(_)) => true,
            _ => false,
        }
    }
}

/// A centralized result type for our library.
pub type Result<T> = std::result::Result<T, RasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_rejected_value() {
        let err = RasterError::OutOfBounds {
            operation: "get_pixel",
            x: 10,
            y: 0,
            width: 10,
            height: 4,
        };
        assert_eq!(
            err.to_string(),
            "get_pixel: pixel (10, 0) is outside the 10x4 bitmap"
        );

        let err = RasterError::UnsupportedFormat(OutputFormat::Gif);
        assert_eq!(err.to_string(), "No encoder registered for output format GIF");
    }

    #[test]
    fn test_io_errors_compare_by_variant() {
        let a = RasterError::from(std::io::Error::other("disk full"));
        let b = RasterError::from(std::io::Error::other("broken pipe"));
        assert_eq!(a, b);
        assert_ne!(a, RasterError::UseAfterRelease { operation: "save" });
    }
}
