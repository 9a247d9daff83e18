//! Geometric utilities for detection fusion.
//!
//! This module provides the integer axis-aligned bounding box used across
//! the engine, with the overlap and clamping operations every other
//! component builds on.

use serde::{Deserialize, Serialize};

use crate::domain::GridCoords;

/// An axis-aligned rectangle in image pixel space.
///
/// A well-formed box satisfies `x2 > x1` and `y2 > y1` with both corners
/// inside `[0, width] x [0, height]`. Boxes arriving from untrusted
/// producers are re-validated via [`BBox::from_slice`]; malformed ones are
/// skipped by consumers rather than raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    /// Left edge.
    pub x1: i32,
    /// Top edge.
    pub y1: i32,
    /// Right edge (exclusive).
    pub x2: i32,
    /// Bottom edge (exclusive).
    pub y2: i32,
}

impl BBox {
    /// Creates a bounding box from corner coordinates.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Builds a bounding box from a 4-element coordinate slice.
    ///
    /// Returns `None` when the slice has the wrong length or describes an
    /// empty rectangle. Callers treat `None` as "skip this candidate".
    pub fn from_slice(coords: &[i32]) -> Option<Self> {
        match coords {
            &[x1, y1, x2, y2] if x2 > x1 && y2 > y1 => Some(Self { x1, y1, x2, y2 }),
            _ => None,
        }
    }

    /// The box's area in pixels. Degenerate boxes have zero area.
    pub fn area(&self) -> i64 {
        let w = (self.x2 - self.x1).max(0) as i64;
        let h = (self.y2 - self.y1).max(0) as i64;
        w * h
    }

    /// Box width in pixels (zero for degenerate boxes).
    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    /// Box height in pixels (zero for degenerate boxes).
    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    /// The centroid of the box, in floating-point image coordinates.
    pub fn centroid(&self) -> (f32, f32) {
        (
            (self.x1 + self.x2) as f32 / 2.0,
            (self.y1 + self.y2) as f32 / 2.0,
        )
    }

    /// Intersection-over-Union with another box.
    ///
    /// Returns `0.0` when the boxes do not overlap (strict comparison on
    /// either axis) or when the union area is zero. Never fails.
    pub fn iou(&self, other: &BBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        if ix2 <= ix1 || iy2 <= iy1 {
            return 0.0;
        }

        let intersection = (ix2 - ix1) as i64 * (iy2 - iy1) as i64;
        let union = self.area() + other.area() - intersection;
        if union <= 0 {
            return 0.0;
        }
        intersection as f32 / union as f32
    }

    /// Clips the box into `[0, width] x [0, height]`.
    ///
    /// Guarantees a non-degenerate result: when clamping collapses an axis,
    /// the far corner is nudged one unit past the near corner.
    pub fn clamp(&self, width: u32, height: u32) -> Self {
        let w = width as i32;
        let h = height as i32;
        let x1 = self.x1.clamp(0, (w - 1).max(0));
        let y1 = self.y1.clamp(0, (h - 1).max(0));
        let mut x2 = self.x2.clamp(0, w);
        let mut y2 = self.y2.clamp(0, h);
        if x2 <= x1 {
            x2 = (x1 + 1).min(w);
        }
        if y2 <= y1 {
            y2 = (y1 + 1).min(h);
        }
        Self { x1, y1, x2, y2 }
    }

    /// Scales the box by independent horizontal and vertical factors,
    /// rounding to the nearest pixel.
    ///
    /// Used to map boxes between a downscaled working frame and the source
    /// image; callers clamp the result to the target frame.
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self {
            x1: (self.x1 as f32 * sx).round() as i32,
            y1: (self.y1 as f32 * sy).round() as i32,
            x2: (self.x2 as f32 * sx).round() as i32,
            y2: (self.y2 as f32 * sy).round() as i32,
        }
    }

    /// Maps the bbox centroid to a cell of a `grid_size x grid_size` grid
    /// laid over a `width x height` image, clamped to `[0, grid_size - 1]`.
    /// A zero grid size is coerced to one.
    pub fn grid_cell(&self, width: u32, height: u32, grid_size: u32) -> GridCoords {
        let grid_size = grid_size.max(1);
        let (cx, cy) = self.centroid();
        let col = (cx / width.max(1) as f32 * grid_size as f32) as i64;
        let row = (cy / height.max(1) as f32 * grid_size as f32) as i64;
        let max = (grid_size - 1) as i64;
        GridCoords {
            row: row.clamp(0, max) as u32,
            col: col.clamp(0, max) as u32,
        }
    }
}
