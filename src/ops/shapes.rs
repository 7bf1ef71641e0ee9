use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Outline primitives the shape tools place by dragging between two points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Line,
    Rectangle,
    Ellipse,
}

/// A stroked shape spanning two canvas points.
#[derive(Clone, Copy, Debug)]
pub struct PlacedShape {
    pub kind: ShapeKind,
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub color: Rgba<u8>,
    pub stroke_width: f32,
}

impl PlacedShape {
    pub fn draw(&self, image: &mut RgbaImage) {
        match self.kind {
            ShapeKind::Line => stamp_segment(image, self.start, self.end, self.color, self.stroke_width),
            ShapeKind::Rectangle => stroke_rect(image, self.start, self.end, self.color, self.stroke_width),
            ShapeKind::Ellipse => stroke_ellipse(image, self.start, self.end, self.color, self.stroke_width),
        }
    }
}

/// Round-capped stroke from `a` to `b`. A zero-length segment draws a dot.
pub fn stamp_segment(image: &mut RgbaImage, a: (f32, f32), b: (f32, f32), color: Rgba<u8>, width: f32) {
    let bounds = Bounds::around(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1));
    let radius = width.max(1.0) * 0.5;
    // Filled capsule: distance to the segment minus the radius
    rasterize_coverage(image, bounds.pad(radius + 2.0), color, |px, py| {
        coverage(sdf_line_segment(px, py, a.0, a.1, b.0, b.1) - radius)
    });
}

/// Outline of the axis-aligned rectangle with corners `a` and `b`.
pub fn stroke_rect(image: &mut RgbaImage, a: (f32, f32), b: (f32, f32), color: Rgba<u8>, width: f32) {
    let (cx, cy) = ((a.0 + b.0) * 0.5, (a.1 + b.1) * 0.5);
    let (hx, hy) = (((b.0 - a.0) * 0.5).abs(), ((b.1 - a.1) * 0.5).abs());
    let bounds = Bounds::around(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1));
    rasterize_band(image, bounds, width, color, |px, py| sdf_box(px - cx, py - cy, hx, hy));
}

/// Outline of the ellipse inscribed in the box spanned by `a` and `b`.
pub fn stroke_ellipse(image: &mut RgbaImage, a: (f32, f32), b: (f32, f32), color: Rgba<u8>, width: f32) {
    let (cx, cy) = ((a.0 + b.0) * 0.5, (a.1 + b.1) * 0.5);
    let (rx, ry) = (((b.0 - a.0) * 0.5).abs(), ((b.1 - a.1) * 0.5).abs());
    // A flat ellipse is the segment along its long axis
    if rx < 0.5 || ry < 0.5 {
        let (from, to) = if rx >= ry {
            ((cx - rx, cy), (cx + rx, cy))
        } else {
            ((cx, cy - ry), (cx, cy + ry))
        };
        stamp_segment(image, from, to, color, width);
        return;
    }
    let bounds = Bounds::around(cx - rx, cy - ry, cx + rx, cy + ry);
    rasterize_band(image, bounds, width, color, |px, py| sdf_ellipse(px - cx, py - cy, rx, ry));
}

// ============================================================================
// SDF functions: return signed distance (negative = inside)
// ============================================================================

/// SDF for a box centred at origin with half-extents (hx, hy).
#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

/// Approximate SDF for an axis-aligned ellipse with radii (rx, ry) > 0.
#[inline]
fn sdf_ellipse(px: f32, py: f32, rx: f32, ry: f32) -> f32 {
    let nx = px / rx;
    let ny = py / ry;
    let len = (nx * nx + ny * ny).sqrt();
    if len < 1e-8 {
        return -rx.min(ry);
    }
    let scale = (rx * rx * ny * ny + ry * ry * nx * nx).sqrt() / (rx * ry * len);
    (len - 1.0) / scale
}

/// Distance from (px, py) to the segment a→b.
#[inline]
fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq < 1e-6 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

/// Float-space bounding box, inclusive of anti-aliasing padding once padded.
#[derive(Clone, Copy, Debug)]
struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    fn around(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    fn pad(self, by: f32) -> Self {
        Self {
            min_x: self.min_x - by,
            min_y: self.min_y - by,
            max_x: self.max_x + by,
            max_y: self.max_y + by,
        }
    }

    /// Pixel range `[x0, x1) × [y0, y1)` clamped to the image.
    fn clamp_to(self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if !(self.min_x.is_finite() && self.min_y.is_finite() && self.max_x.is_finite() && self.max_y.is_finite()) {
            return None;
        }
        let x0 = self.min_x.floor().max(0.0) as u32;
        let y0 = self.min_y.floor().max(0.0) as u32;
        let x1 = (self.max_x.ceil().max(0.0) as u32).min(width);
        let y1 = (self.max_y.ceil().max(0.0) as u32).min(height);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

/// Stroke the zero contour of `sdf` with a band `stroke_width` wide.
fn rasterize_band(
    image: &mut RgbaImage,
    bounds: Bounds,
    stroke_width: f32,
    color: Rgba<u8>,
    sdf: impl Fn(f32, f32) -> f32 + Sync,
) {
    let half = stroke_width.max(1.0) * 0.5;
    rasterize_coverage(image, bounds.pad(half + 2.0), color, |px, py| {
        coverage(sdf(px, py).abs() - half)
    });
}

/// Blend `color` over every pixel in `bounds` weighted by `cov(px, py)`.
/// Rows are processed in parallel; pixel centres sit at +0.5.
fn rasterize_coverage(
    image: &mut RgbaImage,
    bounds: Bounds,
    color: Rgba<u8>,
    cov: impl Fn(f32, f32) -> f32 + Sync,
) {
    let (width, height) = image.dimensions();
    let Some((x0, y0, x1, y1)) = bounds.clamp_to(width, height) else {
        return;
    };
    let stride = width as usize * 4;
    let raw: &mut [u8] = image;
    raw[y0 as usize * stride..y1 as usize * stride]
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(row, row_buf)| {
            let py = (y0 as usize + row) as f32 + 0.5;
            for x in x0..x1 {
                let c = cov(x as f32 + 0.5, py);
                if c > 0.001 {
                    let idx = x as usize * 4;
                    blend_pixel(&mut row_buf[idx..idx + 4], color, c);
                }
            }
        });
}

/// Source-over blend of `color` with the given coverage.
#[inline]
fn blend_pixel(dst: &mut [u8], color: Rgba<u8>, coverage: f32) {
    let a = coverage * color[3] as f32 / 255.0;
    for i in 0..3 {
        let d = dst[i] as f32;
        dst[i] = (d + (color[i] as f32 - d) * a).round().clamp(0.0, 255.0) as u8;
    }
    let da = dst[3] as f32 / 255.0;
    dst[3] = ((da + a * (1.0 - da)) * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Anti-aliased coverage for a signed distance (1 inside, 0 outside).
#[inline]
fn coverage(d: f32) -> f32 {
    smoothstep(0.5, -0.5, d)
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
