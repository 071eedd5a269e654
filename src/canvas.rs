//! Drawing surface bound to an image's buffer.

use crate::geometry::{PixelCoord, Point, Rect, Size};
use crate::native::{Color, Metafile, MetafileRecord};
use crate::raster::SharedBitmap;

/// Draws straight into the buffer of the [`crate::Image`] it was created from.
///
/// Every call takes the buffer lock for its whole duration, so a single
/// drawing operation never interleaves with a pixel write from the image.
/// Anything drawn outside the buffer is clipped.
#[derive(Debug, Clone)]
pub struct Canvas {
    target: SharedBitmap,
}

impl Canvas {
    pub(crate) fn new(target: SharedBitmap) -> Self {
        Self { target }
    }

    pub fn size(&self) -> Size {
        self.target.read().size()
    }

    /// `None` outside the buffer.
    pub fn get_pixel(&self, at: impl PixelCoord) -> Option<Color> {
        let bitmap = self.target.read();
        let (x, y) = at.to_pixel();
        bitmap.locate(x, y).map(|(x, y)| bitmap.get(x, y))
    }

    /// Returns whether the pixel was inside the buffer.
    pub fn set_pixel(&self, at: impl PixelCoord, color: Color) -> bool {
        let mut bitmap = self.target.write();
        let (x, y) = at.to_pixel();
        match bitmap.locate(x, y) {
            Some((x, y)) => {
                bitmap.set(x, y, color);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self, color: Color) {
        let mut bitmap = self.target.write();
        let size = bitmap.size();
        bitmap.fill(Rect::new(0, 0, size.width, size.height), color);
    }

    pub fn fill_rect(&self, rect: Rect, color: Color) {
        self.target.write().fill(rect, color);
    }

    /// Bresenham line, both endpoints included.
    ///
    /// The segment is clipped to the buffer first, so the walk never leaves
    /// it no matter how far away the endpoints are.
    pub fn draw_line(&self, from: Point, to: Point, color: Color) {
        let mut bitmap = self.target.write();
        let Some((from, to)) = clip_segment(from, to, bitmap.size()) else {
            return;
        };

        let (mut x, mut y) = (i64::from(from.x), i64::from(from.y));
        let (x1, y1) = (i64::from(to.x), i64::from(to.y));
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            // x and y stay between the two clipped endpoints.
            if let Some((px, py)) = bitmap.locate(x as i32, y as i32) {
                bitmap.set(px, py, color);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Play back the records of a vector picture onto this canvas.
    pub fn draw_metafile(&self, metafile: &Metafile) {
        for record in metafile.records() {
            match *record {
                MetafileRecord::FillRect { rect, color } => self.fill_rect(rect, color),
                MetafileRecord::Line { from, to, color } => {
                    self.draw_line(Point::new(from.0, from.1), Point::new(to.0, to.1), color)
                }
            }
        }
    }
}

/// Liang-Barsky clip of a segment to the pixel grid of `size`.
fn clip_segment(from: Point, to: Point, size: Size) -> Option<(Point, Point)> {
    if size.is_empty() {
        return None;
    }
    let (x0, y0) = (f64::from(from.x), f64::from(from.y));
    let (dx, dy) = (f64::from(to.x) - x0, f64::from(to.y) - y0);
    let (x_max, y_max) = (f64::from(size.width - 1), f64::from(size.height - 1));

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [(-dx, x0), (dx, x_max - x0), (-dy, y0), (dy, y_max - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let at = |t: f64| {
        Point::new(
            (x0 + t * dx).round().clamp(0.0, x_max) as i32,
            (y0 + t * dy).round().clamp(0.0, y_max) as i32,
        )
    };
    Some((at(t0), at(t1)))
}
