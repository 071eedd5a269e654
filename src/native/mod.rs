//! The host-side raster layer: buffers, per-pixel access, and metadata.
//!
//! [`NativeBitmap`] owns the actual pixel storage. Direct-color layouts are
//! backed by `image::DynamicImage`; indexed layouts keep one palette index per
//! pixel next to their palette. Callers outside this module address pixels
//! only through [`NativeBitmap::get`] and [`NativeBitmap::set`], after bounds
//! have been checked with [`NativeBitmap::locate`].

pub mod codec;
pub mod palette;

use image::{
    DynamicImage, GenericImage, GenericImageView, ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba,
    RgbaImage,
};

use crate::geometry::{Rect, Resolution, Size};
use crate::utils::convert::{color_to_luma16, luma16_to_color};

/// 8-bit RGBA color.
pub type Color = Rgba<u8>;

/// Pixel layouts the host can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativePixelFormat {
    Indexed1,
    Indexed4,
    Indexed8,
    Gray16,
    Rgb24,
    /// 32 bits per pixel, the fourth byte is unused and always reads as opaque.
    Rgb32,
    Argb32,
    Gray8,
    GrayAlpha16,
    GrayAlpha32,
    Rgb48,
    Argb64,
    RgbFloat96,
    ArgbFloat128,
}

impl NativePixelFormat {
    pub fn bits_per_pixel(&self) -> u32 {
        match self {
            NativePixelFormat::Indexed1 => 1,
            NativePixelFormat::Indexed4 => 4,
            NativePixelFormat::Indexed8 | NativePixelFormat::Gray8 => 8,
            NativePixelFormat::Gray16 | NativePixelFormat::GrayAlpha16 => 16,
            NativePixelFormat::Rgb24 => 24,
            NativePixelFormat::Rgb32 | NativePixelFormat::Argb32 | NativePixelFormat::GrayAlpha32 => 32,
            NativePixelFormat::Rgb48 => 48,
            NativePixelFormat::Argb64 => 64,
            NativePixelFormat::RgbFloat96 => 96,
            NativePixelFormat::ArgbFloat128 => 128,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            NativePixelFormat::Indexed1 | NativePixelFormat::Indexed4 | NativePixelFormat::Indexed8
        )
    }

    pub fn has_alpha(&self) -> bool {
        matches!(
            self,
            NativePixelFormat::Argb32
                | NativePixelFormat::GrayAlpha16
                | NativePixelFormat::GrayAlpha32
                | NativePixelFormat::Argb64
                | NativePixelFormat::ArgbFloat128
        )
    }
}

#[derive(Debug, Clone)]
enum Pixels {
    Indexed { palette: Vec<Color>, indices: Vec<u8> },
    Direct(DynamicImage),
}

/// Why a bitmap could not be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationFailure {
    /// The sample count does not fit in `usize`.
    Overflow,
    /// The allocator refused the reservation.
    OutOfMemory,
}

impl AllocationFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            AllocationFailure::Overflow => "buffer exceeds addressable memory",
            AllocationFailure::OutOfMemory => "buffer exceeds available memory",
        }
    }
}

fn zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>, AllocationFailure> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| AllocationFailure::OutOfMemory)?;
    data.resize(len, T::default());
    Ok(data)
}

fn zeroed_buffer<P>(width: u32, height: u32) -> Result<ImageBuffer<P, Vec<P::Subpixel>>, AllocationFailure>
where
    P: Pixel,
    P::Subpixel: Default,
{
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(usize::from(P::CHANNEL_COUNT)))
        .ok_or(AllocationFailure::Overflow)?;
    ImageBuffer::from_raw(width, height, zeroed(len)?).ok_or(AllocationFailure::Overflow)
}

/// A raster buffer owned by the host.
#[derive(Debug, Clone)]
pub struct NativeBitmap {
    format: NativePixelFormat,
    width: u32,
    height: u32,
    resolution: Resolution,
    pixels: Pixels,
}

impl NativeBitmap {
    /// Allocate a zero-filled bitmap. Indexed layouts start on palette entry 0.
    ///
    /// Storage is reserved fallibly, so an oversized request comes back as an
    /// [`AllocationFailure`] instead of aborting the process.
    pub fn allocate(
        width: u32,
        height: u32,
        format: NativePixelFormat,
    ) -> Result<Self, AllocationFailure> {
        let pixels = match format {
            NativePixelFormat::Indexed1 | NativePixelFormat::Indexed4 | NativePixelFormat::Indexed8 => {
                let len = (width as usize)
                    .checked_mul(height as usize)
                    .ok_or(AllocationFailure::Overflow)?;
                Pixels::Indexed {
                    palette: palette::default_palette(format).unwrap_or_default(),
                    indices: zeroed(len)?,
                }
            }
            NativePixelFormat::Gray8 => {
                Pixels::Direct(DynamicImage::ImageLuma8(zeroed_buffer::<Luma<u8>>(width, height)?))
            }
            NativePixelFormat::Gray16 => {
                Pixels::Direct(DynamicImage::ImageLuma16(zeroed_buffer::<Luma<u16>>(width, height)?))
            }
            NativePixelFormat::GrayAlpha16 => {
                Pixels::Direct(DynamicImage::ImageLumaA8(zeroed_buffer::<LumaA<u8>>(width, height)?))
            }
            NativePixelFormat::GrayAlpha32 => {
                Pixels::Direct(DynamicImage::ImageLumaA16(zeroed_buffer::<LumaA<u16>>(width, height)?))
            }
            NativePixelFormat::Rgb24 => {
                Pixels::Direct(DynamicImage::ImageRgb8(zeroed_buffer::<Rgb<u8>>(width, height)?))
            }
            NativePixelFormat::Rgb32 | NativePixelFormat::Argb32 => {
                Pixels::Direct(DynamicImage::ImageRgba8(zeroed_buffer::<Rgba<u8>>(width, height)?))
            }
            NativePixelFormat::Rgb48 => {
                Pixels::Direct(DynamicImage::ImageRgb16(zeroed_buffer::<Rgb<u16>>(width, height)?))
            }
            NativePixelFormat::Argb64 => {
                Pixels::Direct(DynamicImage::ImageRgba16(zeroed_buffer::<Rgba<u16>>(width, height)?))
            }
            NativePixelFormat::RgbFloat96 => {
                Pixels::Direct(DynamicImage::ImageRgb32F(zeroed_buffer::<Rgb<f32>>(width, height)?))
            }
            NativePixelFormat::ArgbFloat128 => {
                Pixels::Direct(DynamicImage::ImageRgba32F(zeroed_buffer::<Rgba<f32>>(width, height)?))
            }
        };

        Ok(Self {
            format,
            width,
            height,
            resolution: Resolution::default(),
            pixels,
        })
    }

    /// Take over an already decoded image. Its layout decides the native format.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (format, image) = match image {
            DynamicImage::ImageLuma8(_) => (NativePixelFormat::Gray8, image),
            DynamicImage::ImageLumaA8(_) => (NativePixelFormat::GrayAlpha16, image),
            DynamicImage::ImageRgb8(_) => (NativePixelFormat::Rgb24, image),
            DynamicImage::ImageRgba8(_) => (NativePixelFormat::Argb32, image),
            DynamicImage::ImageLuma16(_) => (NativePixelFormat::Gray16, image),
            DynamicImage::ImageLumaA16(_) => (NativePixelFormat::GrayAlpha32, image),
            DynamicImage::ImageRgb16(_) => (NativePixelFormat::Rgb48, image),
            DynamicImage::ImageRgba16(_) => (NativePixelFormat::Argb64, image),
            DynamicImage::ImageRgb32F(_) => (NativePixelFormat::RgbFloat96, image),
            DynamicImage::ImageRgba32F(_) => (NativePixelFormat::ArgbFloat128, image),
            other => (
                NativePixelFormat::Argb32,
                DynamicImage::ImageRgba8(other.to_rgba8()),
            ),
        };

        Self {
            format,
            width: image.width(),
            height: image.height(),
            resolution: Resolution::default(),
            pixels: Pixels::Direct(image),
        }
    }

    pub fn format(&self) -> NativePixelFormat {
        self.format
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    /// The palette of an indexed bitmap.
    pub fn palette(&self) -> Option<&[Color]> {
        match &self.pixels {
            Pixels::Indexed { palette, .. } => Some(palette),
            Pixels::Direct(_) => None,
        }
    }

    /// Bounds-check a signed coordinate.
    pub fn locate(&self, x: i32, y: i32) -> Option<(u32, u32)> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        (x < self.width && y < self.height).then_some((x, y))
    }

    /// Read one pixel. `(x, y)` must come from [`NativeBitmap::locate`].
    pub fn get(&self, x: u32, y: u32) -> Color {
        match &self.pixels {
            Pixels::Indexed { palette, indices } => {
                palette[indices[self.offset(x, y)] as usize]
            }
            Pixels::Direct(DynamicImage::ImageLuma16(buf)) => luma16_to_color(buf.get_pixel(x, y)[0]),
            Pixels::Direct(image) => {
                let mut color = image.get_pixel(x, y);
                if self.format == NativePixelFormat::Rgb32 {
                    color[3] = 255;
                }
                color
            }
        }
    }

    /// Write one pixel. `(x, y)` must come from [`NativeBitmap::locate`].
    ///
    /// Indexed layouts store the nearest palette entry; layouts without alpha
    /// drop the alpha channel.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let offset = self.offset(x, y);
        let format = self.format;
        match &mut self.pixels {
            Pixels::Indexed { palette, indices } => {
                indices[offset] = palette::nearest(palette, color);
            }
            Pixels::Direct(DynamicImage::ImageLuma16(buf)) => {
                buf.put_pixel(x, y, Luma([color_to_luma16(color)]));
            }
            Pixels::Direct(image) => {
                let mut color = color;
                if format == NativePixelFormat::Rgb32 {
                    color[3] = 255;
                }
                image.put_pixel(x, y, color);
            }
        }
    }

    /// Set every pixel inside `rect` (clipped to the bitmap) to `color`.
    pub fn fill(&mut self, rect: Rect, color: Color) {
        let Some((xs, ys)) = rect.clip(self.size()) else {
            return;
        };
        for y in ys {
            for x in xs.clone() {
                self.set(x, y, color);
            }
        }
    }

    /// Re-layout as [`NativePixelFormat::Argb32`], keeping every pixel's color.
    pub fn convert_to_argb32(&mut self) {
        if self.format == NativePixelFormat::Argb32 {
            return;
        }
        let converted: RgbaImage = ImageBuffer::from_fn(self.width, self.height, |x, y| self.get(x, y));
        self.pixels = Pixels::Direct(DynamicImage::ImageRgba8(converted));
        self.format = NativePixelFormat::Argb32;
    }

    /// Full-color view of the buffer for encoders.
    pub fn to_dynamic(&self) -> DynamicImage {
        match &self.pixels {
            Pixels::Indexed { palette, .. } => {
                let rgba: RgbaImage = ImageBuffer::from_fn(self.width, self.height, |x, y| self.get(x, y));
                if palette.iter().all(|c| c[3] == 255) {
                    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8())
                } else {
                    DynamicImage::ImageRgba8(rgba)
                }
            }
            Pixels::Direct(image) if self.format == NativePixelFormat::Rgb32 => {
                DynamicImage::ImageRgb8(image.to_rgb8())
            }
            Pixels::Direct(image) => image.clone(),
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// One drawing command recorded in a [`Metafile`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetafileRecord {
    FillRect { rect: Rect, color: Color },
    Line { from: (i32, i32), to: (i32, i32), color: Color },
}

/// A vector picture: a list of drawing commands, not a pixel buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metafile {
    bounds: Size,
    records: Vec<MetafileRecord>,
}

impl Metafile {
    pub fn new(bounds: Size) -> Self {
        Self {
            bounds,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: MetafileRecord) {
        self.records.push(record);
    }

    pub fn bounds(&self) -> Size {
        self.bounds
    }

    pub fn records(&self) -> &[MetafileRecord] {
        &self.records
    }
}

/// Any image object the host can hand over.
#[derive(Debug, Clone)]
pub enum NativeImage {
    Bitmap(NativeBitmap),
    Metafile(Metafile),
}

impl NativeImage {
    pub fn kind(&self) -> &'static str {
        match self {
            NativeImage::Bitmap(_) => "bitmap",
            NativeImage::Metafile(_) => "metafile",
        }
    }
}

impl From<NativeBitmap> for NativeImage {
    fn from(bitmap: NativeBitmap) -> Self {
        NativeImage::Bitmap(bitmap)
    }
}

impl From<Metafile> for NativeImage {
    fn from(metafile: Metafile) -> Self {
        NativeImage::Metafile(metafile)
    }
}

impl From<DynamicImage> for NativeImage {
    fn from(image: DynamicImage) -> Self {
        NativeImage::Bitmap(NativeBitmap::from_dynamic(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_allocate_reports_requested_layout() {
        let bmp = NativeBitmap::allocate(7, 3, NativePixelFormat::Indexed4).unwrap();
        assert_eq!(bmp.format(), NativePixelFormat::Indexed4);
        assert_eq!(bmp.size(), Size::new(7, 3));
        assert_eq!(bmp.palette().map(|p| p.len()), Some(16));
        assert_eq!(bmp.get(6, 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_allocate_rejects_unaddressable_sizes() {
        let result = NativeBitmap::allocate(u32::MAX, u32::MAX, NativePixelFormat::ArgbFloat128);
        assert!(result.is_err());
    }

    #[test]
    fn test_allocate_reports_out_of_memory_instead_of_aborting() {
        let result = NativeBitmap::allocate(u32::MAX, 1 << 20, NativePixelFormat::Argb32);
        assert!(matches!(
            result,
            Err(AllocationFailure::OutOfMemory | AllocationFailure::Overflow)
        ));
    }

    #[test]
    fn test_locate_bounds() {
        let bmp = NativeBitmap::allocate(4, 2, NativePixelFormat::Rgb24).unwrap();
        assert_eq!(bmp.locate(3, 1), Some((3, 1)));
        assert_eq!(bmp.locate(4, 0), None);
        assert_eq!(bmp.locate(-1, 0), None);
        assert_eq!(bmp.locate(0, 2), None);
    }

    #[test]
    fn test_rgb32_reads_opaque() {
        let mut bmp = NativeBitmap::allocate(2, 2, NativePixelFormat::Rgb32).unwrap();
        assert_eq!(bmp.get(0, 0), Rgba([0, 0, 0, 255]));
        bmp.set(1, 1, Rgba([10, 20, 30, 40]));
        assert_eq!(bmp.get(1, 1), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_from_dynamic_picks_native_format() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
        let bmp = NativeBitmap::from_dynamic(rgb);
        assert_eq!(bmp.format(), NativePixelFormat::Rgb24);
        assert_eq!(bmp.get(1, 0), Rgba([1, 2, 3, 255]));

        let bmp = NativeBitmap::from_dynamic(DynamicImage::new_rgb16(1, 1));
        assert_eq!(bmp.format(), NativePixelFormat::Rgb48);
    }

    #[test]
    fn test_convert_to_argb32_keeps_colors() {
        let mut bmp = NativeBitmap::allocate(3, 1, NativePixelFormat::Indexed8).unwrap();
        bmp.set(2, 0, Rgba([255, 0, 0, 255]));
        bmp.convert_to_argb32();
        assert_eq!(bmp.format(), NativePixelFormat::Argb32);
        assert!(bmp.palette().is_none());
        assert_eq!(bmp.get(2, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(bmp.get(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_fill_is_clipped() {
        let mut bmp = NativeBitmap::allocate(3, 3, NativePixelFormat::Rgb24).unwrap();
        let white = Rgba([255, 255, 255, 255]);
        bmp.fill(Rect::new(1, 1, 10, 10), white);
        assert_eq!(bmp.get(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(bmp.get(2, 2), white);
    }

    #[test]
    fn test_metafile_is_not_a_bitmap() {
        let mut meta = Metafile::new(Size::new(10, 10));
        meta.push(MetafileRecord::FillRect {
            rect: Rect::new(0, 0, 5, 5),
            color: Rgba([0, 0, 0, 255]),
        });
        let native = NativeImage::from(meta);
        assert_eq!(native.kind(), "metafile");
    }
}
