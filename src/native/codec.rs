//! Encoder registry and the encode/decode entry points over `image`.

use std::collections::BTreeSet;
use std::io::Cursor;

use image::codecs::jpeg::{JpegEncoder, PixelDensity, PixelDensityUnit};
use image::{DynamicImage, ImageFormat};

use super::NativeBitmap;
use crate::error::Result;
use crate::format::{DEFAULT_JPEG_QUALITY, EncoderId, EncoderSelection};
use crate::geometry::Resolution;

const INCHES_PER_METER: f32 = 1.0 / 0.0254;
const CM_PER_INCH: f32 = 2.54;

/// BITMAPINFOHEADER pixels-per-meter fields, little-endian `i32`.
const BMP_PPM_X: usize = 38;
const BMP_PPM_Y: usize = 42;
const BMP_INFO_HEADER_LEN: u32 = 40;

/// The set of encoders a host makes available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecRegistry {
    encoders: BTreeSet<EncoderId>,
}

impl CodecRegistry {
    /// Every encoder this build of the host ships with.
    pub fn host() -> Self {
        Self {
            encoders: EncoderId::ALL.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            encoders: BTreeSet::new(),
        }
    }

    pub fn with(mut self, encoder: EncoderId) -> Self {
        self.encoders.insert(encoder);
        self
    }

    pub fn without(mut self, encoder: EncoderId) -> Self {
        self.encoders.remove(&encoder);
        self
    }

    pub fn supports(&self, encoder: EncoderId) -> bool {
        self.encoders.contains(&encoder)
    }

    pub fn encoders(&self) -> impl Iterator<Item = EncoderId> + '_ {
        self.encoders.iter().copied()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::host()
    }
}

/// Encode the bitmap with the selected encoder into a fresh byte buffer.
///
/// The buffer is converted to the closest layout each encoder accepts:
/// BMP takes 8-bit RGB/RGBA, GIF takes RGBA, JPEG takes 8-bit gray or RGB,
/// PNG takes everything except float samples.
///
/// BMP and JPEG carry the bitmap's resolution in their headers. The PNG and
/// GIF encoders have no density field to set, so those files carry none.
pub fn encode(bitmap: &NativeBitmap, selection: &EncoderSelection) -> Result<Vec<u8>> {
    let source = bitmap.to_dynamic();
    let mut buf = Vec::new();

    match selection.encoder {
        EncoderId::Bmp => {
            let image = if source.color().has_alpha() {
                DynamicImage::ImageRgba8(source.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(source.to_rgb8())
            };
            image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Bmp)?;
            stamp_bmp_density(&mut buf, bitmap.resolution);
        }
        EncoderId::Png => {
            let image = match source {
                DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb16(source.to_rgb16()),
                DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba16(source.to_rgba16()),
                other => other,
            };
            image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        }
        EncoderId::Gif => {
            DynamicImage::ImageRgba8(source.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)?;
        }
        EncoderId::Jpeg => {
            let quality = selection.params.quality().unwrap_or(DEFAULT_JPEG_QUALITY);
            let image = match source {
                DynamicImage::ImageLuma8(_)
                | DynamicImage::ImageLuma16(_)
                | DynamicImage::ImageLumaA8(_)
                | DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLuma8(source.to_luma8()),
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            };
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder.set_pixel_density(PixelDensity {
                density: (dpi_u16(bitmap.resolution.horizontal), dpi_u16(bitmap.resolution.vertical)),
                unit: PixelDensityUnit::Inches,
            });
            image.write_with_encoder(encoder)?;
        }
    }

    tracing::debug!(
        "Encoded {}x{} {:?} bitmap with {:?}: {} bytes",
        bitmap.width,
        bitmap.height,
        bitmap.format,
        selection.encoder,
        buf.len()
    );
    Ok(buf)
}

/// Decode any container `image` recognizes (BMP, PNG, GIF, JPEG, ...).
///
/// Resolution is read back from BMP and JFIF headers. Anything else, or a
/// header without a usable density, leaves the 96 dpi default.
pub fn decode(bytes: &[u8]) -> Result<NativeBitmap> {
    let image = image::load_from_memory(bytes)?;
    let mut bitmap = NativeBitmap::from_dynamic(image);

    let density = match image::guess_format(bytes) {
        Ok(ImageFormat::Bmp) => read_bmp_density(bytes),
        Ok(ImageFormat::Jpeg) => read_jfif_density(bytes),
        _ => None,
    };
    if let Some(resolution) = density.filter(Resolution::is_valid) {
        bitmap.set_resolution(resolution);
    }
    Ok(bitmap)
}

fn dpi_u16(dpi: f32) -> u16 {
    dpi.round().clamp(1.0, f32::from(u16::MAX)) as u16
}

fn stamp_bmp_density(buf: &mut [u8], resolution: Resolution) {
    if buf.len() < BMP_PPM_Y + 4 {
        return;
    }
    let ppm = |dpi: f32| ((dpi * INCHES_PER_METER).round() as i32).to_le_bytes();
    buf[BMP_PPM_X..BMP_PPM_X + 4].copy_from_slice(&ppm(resolution.horizontal));
    buf[BMP_PPM_Y..BMP_PPM_Y + 4].copy_from_slice(&ppm(resolution.vertical));
}

fn read_bmp_density(bytes: &[u8]) -> Option<Resolution> {
    let le_bytes = |at: usize| -> Option<[u8; 4]> { bytes.get(at..at + 4)?.try_into().ok() };
    let header_len = u32::from_le_bytes(le_bytes(14)?);
    if header_len < BMP_INFO_HEADER_LEN {
        return None;
    }
    let x = i32::from_le_bytes(le_bytes(BMP_PPM_X)?);
    let y = i32::from_le_bytes(le_bytes(BMP_PPM_Y)?);
    if x <= 0 || y <= 0 {
        return None;
    }
    Some(Resolution::new(x as f32 / INCHES_PER_METER, y as f32 / INCHES_PER_METER))
}

/// Walk the marker segments ahead of the scan data looking for a JFIF APP0.
fn read_jfif_density(bytes: &[u8]) -> Option<Resolution> {
    let mut at = 2;
    loop {
        let marker = bytes.get(at..at + 2)?;
        if marker[0] != 0xFF || marker[1] == 0xDA {
            return None;
        }
        let len = usize::from(u16::from_be_bytes([*bytes.get(at + 2)?, *bytes.get(at + 3)?]));
        let body = bytes.get(at + 4..at + 2 + len)?;
        if marker[1] == 0xE0 && body.len() >= 12 && body.starts_with(b"JFIF\0") {
            let x = f32::from(u16::from_be_bytes([body[8], body[9]]));
            let y = f32::from(u16::from_be_bytes([body[10], body[11]]));
            return match body[7] {
                1 => Some(Resolution::new(x, y)),
                2 => Some(Resolution::new(x * CM_PER_INCH, y * CM_PER_INCH)),
                _ => None,
            };
        }
        at += 2 + len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{EncoderParam, EncoderParams};
    use crate::native::NativePixelFormat;
    use image::Rgba;

    fn selection(encoder: EncoderId) -> EncoderSelection {
        EncoderSelection {
            encoder,
            params: EncoderParams::new(),
        }
    }

    fn checkerboard(format: NativePixelFormat) -> NativeBitmap {
        let mut bmp = NativeBitmap::allocate(8, 6, format).unwrap();
        for y in 0..6 {
            for x in 0..8 {
                let c = if (x + y) % 2 == 0 { 255 } else { 0 };
                bmp.set(x, y, Rgba([c, c, c, 255]));
            }
        }
        bmp
    }

    #[test]
    fn test_registry_membership() {
        let registry = CodecRegistry::empty().with(EncoderId::Png);
        assert!(registry.supports(EncoderId::Png));
        assert!(!registry.supports(EncoderId::Jpeg));
        assert_eq!(CodecRegistry::default().encoders().count(), 4);
    }

    #[test]
    fn test_container_signatures() {
        let bmp = checkerboard(NativePixelFormat::Rgb24);
        assert!(encode(&bmp, &selection(EncoderId::Bmp)).unwrap().starts_with(b"BM"));
        assert!(encode(&bmp, &selection(EncoderId::Png)).unwrap().starts_with(b"\x89PNG"));
        assert!(encode(&bmp, &selection(EncoderId::Gif)).unwrap().starts_with(b"GIF8"));
        assert!(encode(&bmp, &selection(EncoderId::Jpeg)).unwrap().starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn test_every_allocatable_layout_encodes() {
        let formats = [
            NativePixelFormat::Indexed1,
            NativePixelFormat::Indexed4,
            NativePixelFormat::Indexed8,
            NativePixelFormat::Gray16,
            NativePixelFormat::Rgb24,
            NativePixelFormat::Rgb32,
            NativePixelFormat::Argb32,
            NativePixelFormat::RgbFloat96,
        ];
        for format in formats {
            let bmp = checkerboard(format);
            for encoder in EncoderId::ALL {
                let bytes = encode(&bmp, &selection(encoder));
                assert!(bytes.is_ok(), "{format:?} with {encoder:?}: {bytes:?}");
            }
        }
    }

    #[test]
    fn test_jpeg_quality_changes_output() {
        let bmp = checkerboard(NativePixelFormat::Rgb24);
        let low = EncoderSelection {
            encoder: EncoderId::Jpeg,
            params: EncoderParams::new().with(EncoderParam::Quality(5)),
        };
        let high = EncoderSelection {
            encoder: EncoderId::Jpeg,
            params: EncoderParams::new().with(EncoderParam::Quality(100)),
        };
        assert_ne!(encode(&bmp, &low).unwrap(), encode(&bmp, &high).unwrap());
    }

    #[test]
    fn test_decode_png_back() {
        let bmp = checkerboard(NativePixelFormat::Rgb24);
        let bytes = encode(&bmp, &selection(EncoderId::Png)).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format(), NativePixelFormat::Rgb24);
        assert_eq!(decoded.get(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(decoded.get(1, 0), Rgba([0, 0, 0, 255]));
    }

    fn assert_close(actual: Resolution, horizontal: f32, vertical: f32) {
        assert!((actual.horizontal - horizontal).abs() < 0.02, "{actual:?}");
        assert!((actual.vertical - vertical).abs() < 0.02, "{actual:?}");
    }

    #[test]
    fn test_jpeg_carries_resolution() {
        let mut bmp = checkerboard(NativePixelFormat::Rgb24);
        bmp.set_resolution(Resolution::new(300.0, 150.0));
        let bytes = encode(&bmp, &selection(EncoderId::Jpeg)).unwrap();

        assert_eq!(&bytes[2..4], &[0xFF, 0xE0]);
        assert_eq!(&bytes[6..11], b"JFIF\0");
        assert_eq!(bytes[13], 1);
        assert_eq!(&bytes[14..18], &[0x01, 0x2C, 0x00, 0x96]);
        assert_close(decode(&bytes).unwrap().resolution(), 300.0, 150.0);
    }

    #[test]
    fn test_bmp_carries_resolution() {
        let mut bmp = checkerboard(NativePixelFormat::Argb32);
        bmp.set_resolution(Resolution::new(72.0, 300.0));
        let bytes = encode(&bmp, &selection(EncoderId::Bmp)).unwrap();

        assert_eq!(i32::from_le_bytes(bytes[38..42].try_into().unwrap()), 2835);
        assert_eq!(i32::from_le_bytes(bytes[42..46].try_into().unwrap()), 11811);
        assert_close(decode(&bytes).unwrap().resolution(), 72.0, 300.0);
    }

    #[test]
    fn test_png_decodes_at_default_resolution() {
        let mut bmp = checkerboard(NativePixelFormat::Rgb24);
        bmp.set_resolution(Resolution::new(300.0, 300.0));
        let bytes = encode(&bmp, &selection(EncoderId::Png)).unwrap();
        assert_eq!(decode(&bytes).unwrap().resolution(), Resolution::default());
    }

    #[test]
    fn test_jfif_in_centimeters_converts_to_dpi() {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        bytes.extend_from_slice(b"JFIF\0");
        bytes.extend_from_slice(&[1, 2, 2, 0x00, 0x64, 0x00, 0x32, 0, 0]);
        bytes.extend_from_slice(&[0xFF, 0xDA]);
        assert_close(read_jfif_density(&bytes).unwrap(), 254.0, 127.0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode(b"definitely not an image").is_err());
    }
}
