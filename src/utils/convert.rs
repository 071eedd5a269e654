use image::Rgba;

use crate::native::Color;

/// Rec. 601 luminance of an 8-bit RGB color, in [0, 1].
pub fn luminance(color: Color) -> f32 {
    let r = color[0] as f32 / 255.0;
    let g = color[1] as f32 / 255.0;
    let b = color[2] as f32 / 255.0;
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Converts a color to a 16-bit gray sample. Alpha is dropped.
pub fn color_to_luma16(color: Color) -> u16 {
    let y = luminance(color).clamp(0.0, 1.0);
    (y * 65535.0).round() as u16
}

/// Expands a 16-bit gray sample to an opaque 8-bit color.
pub fn luma16_to_color(luma: u16) -> Color {
    let v = ((u32::from(luma) * 255 + 32767) / 65535) as u8;
    Rgba([v, v, v, 255])
}

/// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<Color> {
    let digits = s.trim().trim_start_matches('#');
    let mut rgba = [0, 0, 0, 255];
    match digits.len() {
        6 => hex::decode_to_slice(digits, &mut rgba[..3]).ok()?,
        8 => hex::decode_to_slice(digits, &mut rgba).ok()?,
        _ => return None,
    }
    Some(Rgba(rgba))
}

/// Formats a color as `#RRGGBBAA`.
pub fn to_hex_color(color: Color) -> String {
    format!("#{}", hex::encode_upper(color.0))
}
