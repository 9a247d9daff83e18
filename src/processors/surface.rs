//! Roof surface estimation from photo color statistics.
//!
//! Produces a coarse binary mask of where the roof surface plausibly lies,
//! used downstream to veto detections that land on sky, lawn, or siding.
//! The estimate is intentionally permissive; when color gating finds no
//! credible surface it falls back to "everything below the sky band".

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use tracing::debug;

use super::geometry::BBox;
use super::mask::{close_then_open, extract_regions, hsv_in_range, intersect, invert, union};
use crate::core::constants::{MIN_SURFACE_COMPONENT_FRACTION, SURFACE_FALLBACK_SKY_FRACTION};

/// A binary roof-surface mask at source-image resolution.
#[derive(Debug, Clone)]
pub struct SurfaceMask {
    mask: GrayImage,
}

impl SurfaceMask {
    /// Wraps an existing binary mask. Non-zero pixels count as surface.
    pub fn new(mask: GrayImage) -> Self {
        Self { mask }
    }

    /// Mask width in pixels.
    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    /// Mask height in pixels.
    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    /// Fraction of the whole image covered by surface pixels.
    pub fn coverage(&self) -> f32 {
        let total = (self.mask.width() * self.mask.height()).max(1);
        let on = self.mask.pixels().filter(|p| p.0[0] > 0).count();
        on as f32 / total as f32
    }

    /// Fraction of `bbox` pixels lying on the surface, in `[0, 1]`.
    ///
    /// A box fully outside the image contributes zero pixels and yields 0.
    pub fn overlap_fraction(&self, bbox: &BBox) -> f32 {
        let x1 = bbox.x1.max(0);
        let y1 = bbox.y1.max(0);
        let x2 = bbox.x2.min(self.mask.width() as i32);
        let y2 = bbox.y2.min(self.mask.height() as i32);
        let mut on = 0u64;
        let mut total = 0u64;
        for y in y1..y2 {
            for x in x1..x2 {
                if self.mask.get_pixel(x as u32, y as u32).0[0] > 0 {
                    on += 1;
                }
                total += 1;
            }
        }
        if total == 0 { 0.0 } else { on as f32 / total as f32 }
    }

    /// Borrow the underlying binary image.
    pub fn as_image(&self) -> &GrayImage {
        &self.mask
    }
}

/// Estimates the roof surface mask for a photo.
///
/// Roof-colored pixels (gray, brown, dark, and red shingle bands) are
/// selected by HSV gating, sky and bright-overcast pixels are subtracted,
/// the result is cleaned morphologically, and only components covering at
/// least 5% of the frame survive. The surviving mask is dilated so boxes
/// hugging a roof edge still overlap it. Never returns an empty mask: when
/// no component survives, everything below the top 15% band is assumed to
/// be surface.
pub fn estimate_surface_mask(image: &RgbImage) -> SurfaceMask {
    let (width, height) = image.dimensions();

    let sky = union(
        &hsv_in_range(image, (90.0, 0.0, 150.0), (130.0, 80.0, 255.0)),
        &hsv_in_range(image, (0.0, 0.0, 200.0), (180.0, 40.0, 255.0)),
    );

    let mut roof = hsv_in_range(image, (0.0, 0.0, 40.0), (180.0, 60.0, 180.0));
    roof = union(&roof, &hsv_in_range(image, (5.0, 30.0, 40.0), (25.0, 180.0, 200.0)));
    roof = union(&roof, &hsv_in_range(image, (0.0, 0.0, 20.0), (180.0, 80.0, 100.0)));
    roof = union(&roof, &hsv_in_range(image, (0.0, 50.0, 50.0), (15.0, 200.0, 200.0)));

    // Sky wins over any roof band it also matched.
    roof = intersect(&roof, &invert(&sky));

    let cleaned = close_then_open(&roof, 7, 5);

    let min_area =
        ((width as f32 * height as f32) * MIN_SURFACE_COMPONENT_FRACTION).max(1.0) as u32;
    let components = extract_regions(&cleaned, min_area);

    if components.is_empty() {
        debug!("no credible roof component found, using sky-band fallback");
        return SurfaceMask::new(fallback_mask(width, height));
    }

    let mut kept = GrayImage::new(width, height);
    for component in &components {
        for y in component.bbox.y1..component.bbox.y2 {
            for x in component.bbox.x1..component.bbox.x2 {
                if cleaned.get_pixel(x as u32, y as u32).0[0] > 0 {
                    kept.put_pixel(x as u32, y as u32, Luma([255]));
                }
            }
        }
    }
    let dilated = dilate(&kept, Norm::LInf, 5);
    debug!(components = components.len(), "estimated roof surface mask");
    SurfaceMask::new(dilated)
}

fn fallback_mask(width: u32, height: u32) -> GrayImage {
    let sky_rows = (height as f32 * SURFACE_FALLBACK_SKY_FRACTION) as u32;
    let mut mask = GrayImage::new(width, height);
    for y in sky_rows..height {
        for x in 0..width {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}
