//! Plain geometry types used to address pixels and describe bitmap metadata.

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Fractional pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Bitmap dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Dots per unit on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Resolution {
    pub const fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.horizontal.is_finite()
            && self.vertical.is_finite()
            && self.horizontal > 0.0
            && self.vertical > 0.0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(96.0, 96.0)
    }
}

/// Axis-aligned rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersects with `0..size.width` x `0..size.height`, returning
    /// half-open pixel ranges, or `None` when nothing remains.
    pub fn clip(&self, size: Size) -> Option<(std::ops::Range<u32>, std::ops::Range<u32>)> {
        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.width)).min(i64::from(size.width));
        let y1 = (i64::from(self.y) + i64::from(self.height)).min(i64::from(size.height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32..x1 as u32, y0 as u32..y1 as u32))
    }
}

/// Anything that can address a single pixel.
///
/// Fractional coordinates are truncated toward zero, never rounded, so
/// `(2.9, 0.7)` addresses pixel `(2, 0)` and `(-0.5, 0.0)` addresses `(0, 0)`.
/// Non-finite components map to `i32::MIN` and therefore never hit the bitmap.
pub trait PixelCoord {
    fn to_pixel(self) -> (i32, i32);
}

impl PixelCoord for Point {
    fn to_pixel(self) -> (i32, i32) {
        (self.x, self.y)
    }
}

impl PixelCoord for (i32, i32) {
    fn to_pixel(self) -> (i32, i32) {
        self
    }
}

impl PixelCoord for PointF {
    fn to_pixel(self) -> (i32, i32) {
        (truncate(self.x), truncate(self.y))
    }
}

impl PixelCoord for (f32, f32) {
    fn to_pixel(self) -> (i32, i32) {
        PointF::new(self.0, self.1).to_pixel()
    }
}

fn truncate(v: f32) -> i32 {
    if v.is_finite() { v as i32 } else { i32::MIN }
}
