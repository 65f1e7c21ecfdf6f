//! Alpha-over compositing and corner anchoring

use image::{Rgba, RgbaImage};
use serde::Serialize;
use std::fmt;

/// One of the four image corners a badge can be anchored to.
///
/// The declaration order is the row-major order of the 2x2 quadrant pool:
/// top-left, top-right, bottom-left, bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// All corners in pool order.
    pub const ALL: [Corner; 4] =
        [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft, Corner::BottomRight];

    /// Corner for a flat row-major index into the 2x2 pool.
    pub fn from_pool_index(index: usize) -> Option<Corner> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Corner::TopLeft => "top-left",
            Corner::TopRight => "top-right",
            Corner::BottomLeft => "bottom-left",
            Corner::BottomRight => "bottom-right",
        }
    }

    fn is_right(&self) -> bool {
        matches!(self, Corner::TopRight | Corner::BottomRight)
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Corner::BottomLeft | Corner::BottomRight)
    }

    /// Position of an `overlay`-sized image anchored at this corner of a
    /// `canvas`-sized image, inset by `margin` pixels from both edges.
    ///
    /// May be negative when the overlay is larger than the canvas.
    pub fn anchor(&self, canvas: (u32, u32), overlay: (u32, u32), margin: u32) -> (i64, i64) {
        let x = if self.is_right() {
            canvas.0 as i64 - overlay.0 as i64 - margin as i64
        } else {
            margin as i64
        };
        let y = if self.is_bottom() {
            canvas.1 as i64 - overlay.1 as i64 - margin as i64
        } else {
            margin as i64
        };
        (x, y)
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite `src` over `dst` with straight (non-premultiplied) alpha.
pub fn over(src: &Rgba<u8>, dst: &Rgba<u8>) -> Rgba<u8> {
    let src_alpha = src[3] as f32 / 255.0;
    let dst_alpha = dst[3] as f32 / 255.0;

    // out_alpha = src_alpha + dst_alpha * (1 - src_alpha)
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    if out_alpha == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let composite = |c: usize| -> u8 {
        let s = src[c] as f32 / 255.0;
        let d = dst[c] as f32 / 255.0;
        let result = (s * src_alpha + d * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        (result.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    Rgba([composite(0), composite(1), composite(2), (out_alpha * 255.0).round() as u8])
}

/// Composite `overlay` onto `canvas` with its top-left corner at `(x, y)`.
///
/// Parts of the overlay falling outside the canvas are clipped.
pub fn composite_at(canvas: &mut RgbaImage, overlay: &RgbaImage, x: i64, y: i64) {
    let (canvas_w, canvas_h) = (canvas.width() as i64, canvas.height() as i64);

    for (ox, oy, src) in overlay.enumerate_pixels() {
        if src[3] == 0 {
            continue;
        }
        let dest_x = x + ox as i64;
        let dest_y = y + oy as i64;
        if dest_x < 0 || dest_y < 0 || dest_x >= canvas_w || dest_y >= canvas_h {
            continue;
        }

        let dst = canvas.get_pixel_mut(dest_x as u32, dest_y as u32);
        *dst = over(src, dst);
    }
}

/// Composite `overlay` onto `canvas` anchored at `corner`, inset by `margin`.
pub fn composite_at_corner(canvas: &mut RgbaImage, overlay: &RgbaImage, corner: Corner, margin: u32) {
    let (x, y) = corner.anchor(canvas.dimensions(), overlay.dimensions(), margin);
    composite_at(canvas, overlay, x, y);
}
