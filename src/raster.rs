//! [`Image`]: an owning handle over one native raster buffer.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::canvas::Canvas;
use crate::error::{RasterError, Result};
use crate::format::{self, OutputFormat, PixelFormat};
use crate::geometry::{PixelCoord, Resolution, Size};
use crate::native::codec::{self, CodecRegistry};
use crate::native::{Color, NativeBitmap, NativeImage, NativePixelFormat};

/// Buffer shared between an [`Image`] and the canvases created from it.
pub(crate) type SharedBitmap = Arc<RwLock<NativeBitmap>>;

/// A bitmap image backed by exactly one native buffer.
///
/// Size, resolution, and pixel format are always read from the buffer itself.
/// The buffer is released by [`Image::release`] or on drop, whichever comes
/// first; any later call fails with [`RasterError::UseAfterRelease`].
#[derive(Debug)]
pub struct Image {
    bitmap: Option<SharedBitmap>,
    codecs: Arc<CodecRegistry>,
}

impl Image {
    /// Allocate a new zero-filled buffer and stamp `resolution` on it.
    pub fn create(size: Size, resolution: Resolution, pixel_format: PixelFormat) -> Result<Self> {
        let allocation_error = |reason| RasterError::Allocation {
            width: size.width,
            height: size.height,
            format: pixel_format,
            reason,
        };

        if size.is_empty() {
            return Err(allocation_error("width and height must be positive"));
        }
        let native = format::to_native(pixel_format)
            .ok_or_else(|| allocation_error("pixel format has no native layout"))?;
        if !resolution.is_valid() {
            return Err(RasterError::InvalidResolution {
                operation: "create",
                horizontal: resolution.horizontal,
                vertical: resolution.vertical,
            });
        }

        let mut bitmap = NativeBitmap::allocate(size.width, size.height, native)
            .map_err(|failure| allocation_error(failure.reason()))?;
        bitmap.set_resolution(resolution);

        tracing::debug!(
            "Allocated {}x{} {:?} bitmap at {}x{} dpi",
            size.width,
            size.height,
            native,
            resolution.horizontal,
            resolution.vertical
        );
        Ok(Self::wrap(bitmap))
    }

    /// Take ownership of a native image. Only raster bitmaps are accepted.
    pub fn adopt(native: impl Into<NativeImage>) -> Result<Self> {
        let bitmap = match native.into() {
            NativeImage::Bitmap(bitmap) => bitmap,
            other => {
                return Err(RasterError::TypeMismatch {
                    expected: "bitmap",
                    found: other.kind(),
                });
            }
        };

        let abstract_format = format::from_native(bitmap.format());
        if abstract_format == PixelFormat::Default {
            tracing::warn!(
                "Adopted bitmap has native format {:?} with no abstract equivalent, reporting Default",
                bitmap.format()
            );
        }
        tracing::debug!(
            "Adopted {}x{} {:?} bitmap",
            bitmap.size().width,
            bitmap.size().height,
            bitmap.format()
        );
        Ok(Self::wrap(bitmap))
    }

    /// Decode an encoded image (BMP, PNG, GIF, JPEG, ...) and adopt the result.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::adopt(codec::decode(bytes)?)
    }

    fn wrap(bitmap: NativeBitmap) -> Self {
        Self {
            bitmap: Some(Arc::new(RwLock::new(bitmap))),
            codecs: Arc::new(CodecRegistry::host()),
        }
    }

    /// Use `codecs` instead of the host registry when saving.
    pub fn with_codecs(mut self, codecs: Arc<CodecRegistry>) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    fn shared(&self, operation: &'static str) -> Result<&SharedBitmap> {
        self.bitmap
            .as_ref()
            .ok_or(RasterError::UseAfterRelease { operation })
    }

    pub fn pixel_format(&self) -> Result<PixelFormat> {
        Ok(format::from_native(self.native_format()?))
    }

    pub fn native_format(&self) -> Result<NativePixelFormat> {
        Ok(self.shared("pixel_format")?.read().format())
    }

    pub fn size(&self) -> Result<Size> {
        Ok(self.shared("size")?.read().size())
    }

    pub fn resolution(&self) -> Result<Resolution> {
        Ok(self.shared("resolution")?.read().resolution())
    }

    /// Rewrite resolution metadata in place. Pixels are untouched.
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        let shared = self.shared("set_resolution")?;
        if !resolution.is_valid() {
            return Err(RasterError::InvalidResolution {
                operation: "set_resolution",
                horizontal: resolution.horizontal,
                vertical: resolution.vertical,
            });
        }
        shared.write().set_resolution(resolution);
        Ok(())
    }

    /// Read the pixel at `at`. Fractional coordinates are truncated toward zero.
    pub fn get_pixel(&self, at: impl PixelCoord) -> Result<Color> {
        let bitmap = self.shared("get_pixel")?.read();
        let (x, y) = locate(&bitmap, at, "get_pixel")?;
        Ok(bitmap.get(x, y))
    }

    /// Write the pixel at `at`. Fractional coordinates are truncated toward zero.
    pub fn set_pixel(&mut self, at: impl PixelCoord, color: Color) -> Result<()> {
        let mut bitmap = self.shared("set_pixel")?.write();
        let (x, y) = locate(&bitmap, at, "set_pixel")?;
        bitmap.set(x, y, color);
        Ok(())
    }

    /// Make every opaque pixel whose RGB equals `color` fully transparent.
    ///
    /// Only the key's RGB is compared; its alpha is ignored, and pixels that
    /// are already translucent are left alone. With `None` the key is the
    /// bottom-left pixel; if that pixel is already not fully opaque nothing
    /// happens. The buffer is converted to 32-bit
    /// ARGB first, so afterwards [`Image::pixel_format`] reports
    /// [`PixelFormat::Rgba32`].
    pub fn make_transparent(&mut self, color: Option<Color>) -> Result<()> {
        let mut bitmap = self.shared("make_transparent")?.write();
        let size = bitmap.size();
        if size.is_empty() {
            return Ok(());
        }

        let key = match color {
            Some(color) => color,
            None => {
                let corner = bitmap.get(0, size.height - 1);
                if corner[3] < 255 {
                    return Ok(());
                }
                corner
            }
        };

        bitmap.convert_to_argb32();
        let mut cleared = key;
        cleared[3] = 0;
        let mut count = 0usize;
        for y in 0..size.height {
            for x in 0..size.width {
                let pixel = bitmap.get(x, y);
                if pixel[3] == 255 && pixel.0[..3] == key.0[..3] {
                    bitmap.set(x, y, cleared);
                    count += 1;
                }
            }
        }
        tracing::debug!("make_transparent cleared {} pixels matching {:?}", count, key);
        Ok(())
    }

    /// A drawing surface over this image's buffer. The canvas keeps the buffer
    /// alive even if the image is released first.
    pub fn create_canvas(&self) -> Result<Canvas> {
        Ok(Canvas::new(Arc::clone(self.shared("create_canvas")?)))
    }

    /// Encode into a new byte vector.
    pub fn save_to_vec(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let shared = self.shared("save")?;
        let selection = format::encoder_for(format, &self.codecs)?;
        let bitmap = shared.read();
        codec::encode(&bitmap, &selection)
    }

    /// Encode and write to `writer`. Nothing is written if encoding fails.
    pub fn save_to_writer<W: Write + ?Sized>(&self, writer: &mut W, format: OutputFormat) -> Result<()> {
        let bytes = self.save_to_vec(format)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Encode and write to a file. The file is not touched if encoding fails.
    pub fn save_to_path(&self, path: impl AsRef<Path>, format: OutputFormat) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.save_to_vec(format)?;
        fs::write(path, &bytes)?;
        tracing::debug!("Saved {} ({} bytes) to {}", format, bytes.len(), path.display());
        Ok(())
    }

    /// Release the native buffer. Calling this again is a no-op.
    pub fn release(&mut self) {
        if let Some(shared) = self.bitmap.take() {
            tracing::debug!(
                "Released image buffer ({} canvas handle(s) still attached)",
                Arc::strong_count(&shared) - 1
            );
        }
    }

    pub fn is_released(&self) -> bool {
        self.bitmap.is_none()
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        self.release();
    }
}

impl TryFrom<NativeImage> for Image {
    type Error = RasterError;

    fn try_from(native: NativeImage) -> Result<Self> {
        Image::adopt(native)
    }
}

fn locate(bitmap: &NativeBitmap, at: impl PixelCoord, operation: &'static str) -> Result<(u32, u32)> {
    let (x, y) = at.to_pixel();
    bitmap.locate(x, y).ok_or_else(|| {
        let size = bitmap.size();
        RasterError::OutOfBounds {
            operation,
            x,
            y,
            width: size.width,
            height: size.height,
        }
    })
}
