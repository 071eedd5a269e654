//! Fixed palettes for the indexed layouts.

use image::Rgba;

use super::{Color, NativePixelFormat};

const fn opaque(r: u8, g: u8, b: u8) -> Color {
    Rgba([r, g, b, 255])
}

const MONO: [Color; 2] = [opaque(0, 0, 0), opaque(255, 255, 255)];

const SYSTEM16: [Color; 16] = [
    opaque(0, 0, 0),
    opaque(128, 0, 0),
    opaque(0, 128, 0),
    opaque(128, 128, 0),
    opaque(0, 0, 128),
    opaque(128, 0, 128),
    opaque(0, 128, 128),
    opaque(128, 128, 128),
    opaque(192, 192, 192),
    opaque(255, 0, 0),
    opaque(0, 255, 0),
    opaque(255, 255, 0),
    opaque(0, 0, 255),
    opaque(255, 0, 255),
    opaque(0, 255, 255),
    opaque(255, 255, 255),
];

const CUBE_LEVELS: [u8; 6] = [0, 51, 102, 153, 204, 255];

/// Palette a freshly allocated bitmap of `format` starts with.
/// `None` for direct-color layouts.
pub fn default_palette(format: NativePixelFormat) -> Option<Vec<Color>> {
    match format {
        NativePixelFormat::Indexed1 => Some(MONO.to_vec()),
        NativePixelFormat::Indexed4 => Some(SYSTEM16.to_vec()),
        NativePixelFormat::Indexed8 => Some(halftone256()),
        _ => None,
    }
}

// 16 system colors, a 6x6x6 color cube, then 24 grays.
fn halftone256() -> Vec<Color> {
    let mut palette = Vec::with_capacity(256);
    palette.extend_from_slice(&SYSTEM16);
    for r in CUBE_LEVELS {
        for g in CUBE_LEVELS {
            for b in CUBE_LEVELS {
                palette.push(opaque(r, g, b));
            }
        }
    }
    for i in 0..24u8 {
        let v = 8 + i * 10;
        palette.push(opaque(v, v, v));
    }
    palette
}

/// Index of the palette entry closest to `color` (squared RGBA distance).
/// Ties resolve to the lowest index.
pub fn nearest(palette: &[Color], color: Color) -> u8 {
    palette
        .iter()
        .enumerate()
        .min_by_key(|(_, entry)| {
            entry
                .0
                .iter()
                .zip(color.0.iter())
                .map(|(&a, &b)| {
                    let d = i32::from(a) - i32::from(b);
                    d * d
                })
                .sum::<i32>()
        })
        .map(|(i, _)| i as u8)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_sizes_match_bit_depth() {
        assert_eq!(default_palette(NativePixelFormat::Indexed1).unwrap().len(), 2);
        assert_eq!(default_palette(NativePixelFormat::Indexed4).unwrap().len(), 16);
        assert_eq!(default_palette(NativePixelFormat::Indexed8).unwrap().len(), 256);
        assert!(default_palette(NativePixelFormat::Rgb24).is_none());
    }

    #[test]
    fn test_nearest_prefers_exact_and_first_match() {
        let palette = halftone256();
        assert_eq!(nearest(&palette, opaque(255, 255, 255)), 15);
        assert_eq!(nearest(&palette, opaque(0, 0, 0)), 0);
        let idx = nearest(&palette, opaque(50, 100, 150));
        assert_eq!(palette[idx as usize], opaque(51, 102, 153));
    }

    #[test]
    fn test_nearest_on_mono() {
        assert_eq!(nearest(&MONO, opaque(40, 40, 40)), 0);
        assert_eq!(nearest(&MONO, opaque(200, 210, 220)), 1);
    }
}
