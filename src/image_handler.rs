use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::format::OutputFormat;
use crate::raster::Image;

/// Load image from bytes (supports PNG, JPEG, BMP, GIF, etc.)
pub fn load_from_bytes(bytes: &[u8]) -> Result<Image> {
    Image::decode(bytes)
}

/// Load image from a file on disk
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Image> {
    let bytes = fs::read(path.as_ref())?;
    let image = Image::decode(&bytes)?;
    tracing::debug!("Loaded {}", path.as_ref().display());
    Ok(image)
}

/// Output format implied by a path's extension. JPEG gets `jpeg_quality` if given.
pub fn output_format_for_path(path: &Path, jpeg_quality: Option<u8>) -> Option<OutputFormat> {
    let format = OutputFormat::from_extension(path.extension()?.to_str()?)?;
    Some(match (format, jpeg_quality) {
        (OutputFormat::Jpeg { .. }, Some(q)) => OutputFormat::jpeg_with_quality(q),
        (format, _) => format,
    })
}
