//! Pure translation between the abstract formats exposed by [`crate::Image`]
//! and what the native host understands.
//!
//! Pixel formats translate both ways. Going outward, the [`PixelFormat::Default`]
//! sentinel has no native counterpart. Coming back, every native format without
//! a known mapping collapses to that sentinel instead of failing.
//!
//! Output formats translate to an [`EncoderSelection`]: the encoder to run plus
//! the parameters to hand it.

use std::fmt;

use crate::error::{RasterError, Result};
use crate::native::NativePixelFormat;
use crate::native::codec::CodecRegistry;

/// Pixel layout of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Unspecified; reported for native layouts this crate does not model.
    Default,
    Bpp1Indexed,
    Bpp4Indexed,
    Bpp8Indexed,
    Bpp16Gray,
    Rgb24,
    Rgb32,
    Rgba32,
}

impl PixelFormat {
    /// The seven concrete formats, in bit-depth order.
    pub const CONCRETE: [PixelFormat; 7] = [
        PixelFormat::Bpp1Indexed,
        PixelFormat::Bpp4Indexed,
        PixelFormat::Bpp8Indexed,
        PixelFormat::Bpp16Gray,
        PixelFormat::Rgb24,
        PixelFormat::Rgb32,
        PixelFormat::Rgba32,
    ];
}

/// Translate to the native layout. `None` for [`PixelFormat::Default`].
pub fn to_native(format: PixelFormat) -> Option<NativePixelFormat> {
    let native = match format {
        PixelFormat::Bpp1Indexed => NativePixelFormat::Indexed1,
        PixelFormat::Bpp4Indexed => NativePixelFormat::Indexed4,
        PixelFormat::Bpp8Indexed => NativePixelFormat::Indexed8,
        PixelFormat::Bpp16Gray => NativePixelFormat::Gray16,
        PixelFormat::Rgb24 => NativePixelFormat::Rgb24,
        PixelFormat::Rgb32 => NativePixelFormat::Rgb32,
        PixelFormat::Rgba32 => NativePixelFormat::Argb32,
        PixelFormat::Default => return None,
    };
    Some(native)
}

/// Translate a native layout back. Never fails.
pub fn from_native(native: NativePixelFormat) -> PixelFormat {
    match native {
        NativePixelFormat::Indexed1 => PixelFormat::Bpp1Indexed,
        NativePixelFormat::Indexed4 => PixelFormat::Bpp4Indexed,
        NativePixelFormat::Indexed8 => PixelFormat::Bpp8Indexed,
        NativePixelFormat::Gray16 => PixelFormat::Bpp16Gray,
        NativePixelFormat::Rgb24 => PixelFormat::Rgb24,
        NativePixelFormat::Rgb32 => PixelFormat::Rgb32,
        NativePixelFormat::Argb32 => PixelFormat::Rgba32,
        NativePixelFormat::Gray8
        | NativePixelFormat::GrayAlpha16
        | NativePixelFormat::GrayAlpha32
        | NativePixelFormat::Rgb48
        | NativePixelFormat::Argb64
        | NativePixelFormat::RgbFloat96
        | NativePixelFormat::ArgbFloat128 => PixelFormat::Default,
    }
}

/// JPEG quality used when the caller does not pick one.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Encoded file format requested from `save`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Bitmap,
    Png,
    Gif,
    /// `quality` is 0..=100; `None` means [`DEFAULT_JPEG_QUALITY`].
    Jpeg { quality: Option<u8> },
}

impl OutputFormat {
    /// JPEG at the default quality.
    pub const fn jpeg() -> Self {
        OutputFormat::Jpeg { quality: None }
    }

    pub const fn jpeg_with_quality(quality: u8) -> Self {
        OutputFormat::Jpeg {
            quality: Some(quality),
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Bitmap => "bmp",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
            OutputFormat::Jpeg { .. } => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Bitmap => "image/bmp",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Jpeg { .. } => "image/jpeg",
        }
    }

    /// Pick a format from a file extension (case-insensitive, dot optional).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "bmp" | "dib" => Some(OutputFormat::Bitmap),
            "png" => Some(OutputFormat::Png),
            "gif" => Some(OutputFormat::Gif),
            "jpg" | "jpeg" | "jpe" => Some(OutputFormat::jpeg()),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Bitmap => f.write_str("BMP"),
            OutputFormat::Png => f.write_str("PNG"),
            OutputFormat::Gif => f.write_str("GIF"),
            OutputFormat::Jpeg { quality: None } => f.write_str("JPEG"),
            OutputFormat::Jpeg { quality: Some(q) } => write!(f, "JPEG (quality {q})"),
        }
    }
}

/// Identifies an encoder in the host's [`CodecRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EncoderId {
    Bmp,
    Png,
    Gif,
    Jpeg,
}

impl EncoderId {
    pub const ALL: [EncoderId; 4] = [EncoderId::Bmp, EncoderId::Png, EncoderId::Gif, EncoderId::Jpeg];
}

/// A single encoder knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderParam {
    /// Lossy compression quality, 0..=100.
    Quality(u8),
}

/// Parameters passed along with an encoder. Empty for most formats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderParams(Vec<EncoderParam>);

impl EncoderParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, param: EncoderParam) -> Self {
        self.0.push(param);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EncoderParam> {
        self.0.iter()
    }

    pub fn quality(&self) -> Option<u8> {
        self.0.iter().find_map(|p| match p {
            EncoderParam::Quality(q) => Some(*q),
        })
    }
}

/// Concrete encoder plus its parameters, ready to hand to the codec layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSelection {
    pub encoder: EncoderId,
    pub params: EncoderParams,
}

/// Choose the encoder and build its parameters for `format`.
///
/// Fails with [`RasterError::UnsupportedFormat`] when `registry` has no
/// encoder for the requested kind.
pub fn encoder_for(format: OutputFormat, registry: &CodecRegistry) -> Result<EncoderSelection> {
    let (encoder, params) = match format {
        OutputFormat::Bitmap => (EncoderId::Bmp, EncoderParams::new()),
        OutputFormat::Png => (EncoderId::Png, EncoderParams::new()),
        OutputFormat::Gif => (EncoderId::Gif, EncoderParams::new()),
        OutputFormat::Jpeg { quality } => {
            let quality = quality.unwrap_or(DEFAULT_JPEG_QUALITY).min(100);
            (
                EncoderId::Jpeg,
                EncoderParams::new().with(EncoderParam::Quality(quality)),
            )
        }
    };

    if !registry.supports(encoder) {
        return Err(RasterError::UnsupportedFormat(format));
    }

    tracing::trace!("{} -> {:?} {:?}", format, encoder, params);
    Ok(EncoderSelection { encoder, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTRA_NATIVE: [NativePixelFormat; 7] = [
        NativePixelFormat::Gray8,
        NativePixelFormat::GrayAlpha16,
        NativePixelFormat::GrayAlpha32,
        NativePixelFormat::Rgb48,
        NativePixelFormat::Argb64,
        NativePixelFormat::RgbFloat96,
        NativePixelFormat::ArgbFloat128,
    ];

    #[test]
    fn test_pixel_format_round_trips_both_ways() {
        for format in PixelFormat::CONCRETE {
            let native = to_native(format).expect("concrete format has a native layout");
            assert_eq!(from_native(native), format);
            assert_eq!(to_native(from_native(native)), Some(native));
        }
    }

    #[test]
    fn test_default_is_never_translated_outward() {
        assert_eq!(to_native(PixelFormat::Default), None);
    }

    #[test]
    fn test_unmodeled_native_formats_fall_back_to_default() {
        for native in EXTRA_NATIVE {
            assert_eq!(from_native(native), PixelFormat::Default, "{native:?}");
        }
    }

    #[test]
    fn test_only_jpeg_carries_parameters() {
        let registry = CodecRegistry::host();
        for format in [OutputFormat::Bitmap, OutputFormat::Png, OutputFormat::Gif] {
            let selection = encoder_for(format, &registry).unwrap();
            assert!(selection.params.is_empty(), "{format}");
        }

        let selection = encoder_for(OutputFormat::jpeg(), &registry).unwrap();
        assert_eq!(selection.encoder, EncoderId::Jpeg);
        assert_eq!(selection.params.quality(), Some(DEFAULT_JPEG_QUALITY));
    }

    #[test]
    fn test_jpeg_default_quality_matches_explicit_80() {
        let registry = CodecRegistry::host();
        assert_eq!(
            encoder_for(OutputFormat::jpeg(), &registry).unwrap(),
            encoder_for(OutputFormat::jpeg_with_quality(80), &registry).unwrap()
        );
    }

    #[test]
    fn test_jpeg_quality_is_clamped() {
        let registry = CodecRegistry::host();
        let selection = encoder_for(OutputFormat::jpeg_with_quality(250), &registry).unwrap();
        assert_eq!(selection.params.quality(), Some(100));
    }

    #[test]
    fn test_missing_encoder_is_reported() {
        let registry = CodecRegistry::host().without(EncoderId::Gif);
        assert_eq!(
            encoder_for(OutputFormat::Gif, &registry),
            Err(RasterError::UnsupportedFormat(OutputFormat::Gif))
        );
        assert!(encoder_for(OutputFormat::Png, &registry).is_ok());
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(OutputFormat::from_extension("PNG"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_extension(".jpeg"), Some(OutputFormat::jpeg()));
        assert_eq!(OutputFormat::from_extension("tiff"), None);
        assert_eq!(OutputFormat::Bitmap.extension(), "bmp");
        assert_eq!(OutputFormat::jpeg_with_quality(5).mime_type(), "image/jpeg");
    }
}
