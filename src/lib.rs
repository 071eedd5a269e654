//! Bitmap images over a native raster buffer: pixel access, size and
//! resolution metadata, transparency keying, a bound drawing canvas, and
//! export to BMP, PNG, GIF, or JPEG.
//!
//! ```no_run
//! use rasterpal::{Image, OutputFormat, PixelFormat, Resolution, Size};
//! use image::Rgba;
//!
//! # fn main() -> rasterpal::Result<()> {
//! let mut image = Image::create(Size::new(64, 64), Resolution::default(), PixelFormat::Rgb24)?;
//! image.set_pixel((10, 10), Rgba([255, 0, 0, 255]))?;
//! image.save_to_path("dot.png", OutputFormat::Png)?;
//! # Ok(())
//! # }
//! ```

pub mod canvas;
pub mod error;
pub mod format;
pub mod geometry;
pub mod image_handler;
pub mod native;
pub mod raster;
pub mod utils;

pub use crate::canvas::Canvas;
pub use crate::error::{RasterError, Result};
pub use crate::format::{EncoderId, OutputFormat, PixelFormat};
pub use crate::geometry::{PixelCoord, Point, PointF, Rect, Resolution, Size};
pub use crate::native::codec::CodecRegistry;
pub use crate::native::{Color, NativeImage, NativePixelFormat};
pub use crate::raster::Image;
