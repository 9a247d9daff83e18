//! Binary mask primitives shared by the classical detectors.
//!
//! Masks are 8-bit grayscale images where 255 marks a selected pixel and 0
//! everything else. Color gating uses HSV with hue on the 0-180 half-degree
//! scale so band constants match the conventions of common CV tooling.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::HashMap;

use super::geometry::BBox;

/// A connected region extracted from a binary mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Tight bounding box of the region's pixels.
    pub bbox: BBox,
    /// Number of selected pixels in the region.
    pub area: u32,
}

/// Converts an RGB pixel to HSV with hue in `[0, 180)`, saturation and
/// value in `[0, 255]`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (rf, gf, bf) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (((gf - bf) / delta).rem_euclid(6.0))
    } else if max == gf {
        60.0 * ((bf - rf) / delta + 2.0)
    } else {
        60.0 * ((rf - gf) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    (hue / 2.0, saturation * 255.0, max * 255.0)
}

/// Builds a mask selecting pixels whose HSV falls inside the inclusive
/// `lower..=upper` band (hue on the 0-180 scale).
pub fn hsv_in_range(image: &RgbImage, lower: (f32, f32, f32), upper: (f32, f32, f32)) -> GrayImage {
    let mut mask = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let (h, s, v) = rgb_to_hsv(pixel.0[0], pixel.0[1], pixel.0[2]);
        let selected = h >= lower.0
            && h <= upper.0
            && s >= lower.1
            && s <= upper.1
            && v >= lower.2
            && v <= upper.2;
        if selected {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}

/// Pixel-wise OR of two same-sized masks.
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = a.clone();
    for (x, y, pixel) in b.enumerate_pixels() {
        if pixel.0[0] > 0 {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    out
}

/// Pixel-wise AND of two same-sized masks.
pub fn intersect(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(a.width(), a.height());
    for (x, y, pixel) in a.enumerate_pixels() {
        if pixel.0[0] > 0 && b.get_pixel(x, y).0[0] > 0 {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    out
}

/// Pixel-wise NOT of a mask.
pub fn invert(mask: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(mask.width(), mask.height());
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] == 0 {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    out
}

/// Morphological close followed by open, filling small holes then dropping
/// speckle noise.
pub fn close_then_open(mask: &GrayImage, close_k: u8, open_k: u8) -> GrayImage {
    let closed = close(mask, Norm::LInf, close_k);
    open(&closed, Norm::LInf, open_k)
}

/// Extracts connected regions with at least `min_area` selected pixels.
pub fn extract_regions(mask: &GrayImage, min_area: u32) -> Vec<Region> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    struct Extent {
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        area: u32,
    }
    let mut extents: HashMap<u32, Extent> = HashMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0];
        if id == 0 {
            continue;
        }
        let extent = extents.entry(id).or_insert(Extent {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
        });
        extent.min_x = extent.min_x.min(x);
        extent.min_y = extent.min_y.min(y);
        extent.max_x = extent.max_x.max(x);
        extent.max_y = extent.max_y.max(y);
        extent.area += 1;
    }

    let mut regions: Vec<Region> = extents
        .into_values()
        .filter(|e| e.area >= min_area)
        .map(|e| Region {
            bbox: BBox::new(
                e.min_x as i32,
                e.min_y as i32,
                e.max_x as i32 + 1,
                e.max_y as i32 + 1,
            ),
            area: e.area,
        })
        .collect();
    // Deterministic output order: largest first, position as tiebreaker.
    regions.sort_by(|a, b| {
        b.area
            .cmp(&a.area)
            .then(a.bbox.y1.cmp(&b.bbox.y1))
            .then(a.bbox.x1.cmp(&b.bbox.x1))
    });
    regions
}

/// Mean luma of the grayscale rendition of `image` inside `bbox`.
pub fn mean_brightness(gray: &GrayImage, bbox: &BBox) -> f32 {
    let clamped = bbox.clamp(gray.width(), gray.height());
    let mut sum = 0u64;
    let mut count = 0u64;
    for y in clamped.y1..clamped.y2 {
        for x in clamped.x1..clamped.x2 {
            sum += gray.get_pixel(x as u32, y as u32).0[0] as u64;
            count += 1;
        }
    }
    if count == 0 { 0.0 } else { sum as f32 / count as f32 }
}
