//! Dark-patch detection against the photo's own brightness.
//!
//! Water saturation, heavy granule loss, and tarps all read as regions
//! markedly darker than the rest of the roof. Two darkness signals are
//! unioned: a cutoff adapted to the photo's global mean, so overcast and
//! sunlit shots behave alike, and a local adaptive threshold that catches
//! regions much darker than their immediate surroundings even when they
//! clear the global cutoff.

use image::{GrayImage, RgbImage};
use imageproc::contrast::{ThresholdType, adaptive_threshold, threshold};
use tracing::debug;

use crate::domain::{DamageType, DetectionCandidate, Source};
use crate::processors::mask::{close_then_open, extract_regions, invert, mean_brightness, union};

const ADAPTIVE_BLOCK_RADIUS: u32 = 25;
const MAX_CONFIDENCE: f32 = 0.88;
const MIN_ASPECT: f32 = 0.15;
const MAX_ASPECT: f32 = 8.0;

/// Finds regions much darker than the photo's overall brightness or their
/// local surroundings.
///
/// Extremely elongated regions are rejected as shadow lines rather than
/// damage.
pub fn detect_dark_patches(
    image: &RgbImage,
    gray: &GrayImage,
    min_area: u32,
) -> Vec<DetectionCandidate> {
    let (width, height) = image.dimensions();
    if width < 8 || height < 8 {
        return Vec::new();
    }

    let global_mean = {
        let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
        sum as f32 / (width as u64 * height as u64) as f32
    };
    // Half the global mean, bounded so near-black or blown-out photos do
    // not select everything or nothing.
    let cutoff = (global_mean * 0.5).clamp(25.0, 110.0) as u8;
    let global_dark = threshold(gray, cutoff, ThresholdType::BinaryInverted);
    // Pixels below their block-local mean: darker than their surroundings,
    // however bright the photo. The union keeps the interior of large
    // uniform dark patches, which the local view alone un-selects.
    let local_dark = invert(&adaptive_threshold(gray, ADAPTIVE_BLOCK_RADIUS));
    let cleaned = close_then_open(&union(&global_dark, &local_dark), 5, 3);

    let image_area = (width as f32) * (height as f32);
    let mut candidates = Vec::new();
    for region in extract_regions(&cleaned, min_area) {
        let aspect = region.bbox.width() as f32 / region.bbox.height().max(1) as f32;
        if !(MIN_ASPECT..=MAX_ASPECT).contains(&aspect) {
            continue;
        }
        let darkness = 1.0 - mean_brightness(gray, &region.bbox) / 255.0;
        let area_frac = region.area as f32 / image_area;
        let confidence = (0.4 + 0.3 * darkness + area_frac * 2.0).min(MAX_CONFIDENCE);
        candidates.push(DetectionCandidate::new(
            region.bbox,
            confidence,
            DamageType::DarkPatch,
            Source::heuristic("dark-patch"),
        ));
    }
    debug!(count = candidates.len(), "dark-patch detector finished");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::DEFAULT_MIN_AREA_DARK_PATCH;
    use crate::processors::BBox;
    use image::Rgb;

    fn to_gray(image: &RgbImage) -> GrayImage {
        image::imageops::grayscale(image)
    }

    #[test]
    fn uniform_bright_image_yields_nothing() {
        let image = RgbImage::from_pixel(100, 100, Rgb([200, 200, 200]));
        let gray = to_gray(&image);
        assert!(detect_dark_patches(&image, &gray, DEFAULT_MIN_AREA_DARK_PATCH).is_empty());
    }

    #[test]
    fn a_dark_square_on_a_bright_roof_is_flagged() {
        let mut image = RgbImage::from_pixel(100, 100, Rgb([200, 200, 200]));
        for y in 30..60 {
            for x in 30..60 {
                image.put_pixel(x, y, Rgb([30, 30, 30]));
            }
        }
        let gray = to_gray(&image);
        let found = detect_dark_patches(&image, &gray, DEFAULT_MIN_AREA_DARK_PATCH);
        assert_eq!(found.len(), 1);
        assert!(found[0].bbox.iou(&BBox::new(30, 30, 60, 60)) > 0.7);
        // Darker regions score higher, but the heuristic cap holds.
        assert!(found[0].confidence > 0.5 && found[0].confidence <= MAX_CONFIDENCE);
    }

    #[test]
    fn a_locally_dark_patch_above_the_global_cutoff_is_flagged() {
        // On a 220-luma field the global cutoff lands near 105, so a
        // 120-luma patch clears it; only the local view sees it as dark.
        let mut image = RgbImage::from_pixel(100, 100, Rgb([220, 220, 220]));
        for y in 35..65 {
            for x in 35..65 {
                image.put_pixel(x, y, Rgb([120, 120, 120]));
            }
        }
        let gray = to_gray(&image);
        let found = detect_dark_patches(&image, &gray, DEFAULT_MIN_AREA_DARK_PATCH);
        assert_eq!(found.len(), 1);
        assert!(found[0].bbox.iou(&BBox::new(35, 35, 65, 65)) > 0.5);
    }

    #[test]
    fn elongated_shadow_lines_are_rejected() {
        let mut image = RgbImage::from_pixel(200, 100, Rgb([200, 200, 200]));
        // A 180x12 strip: aspect ratio 15, past the gate.
        for y in 50..62 {
            for x in 10..190 {
                image.put_pixel(x, y, Rgb([30, 30, 30]));
            }
        }
        let gray = to_gray(&image);
        assert!(detect_dark_patches(&image, &gray, DEFAULT_MIN_AREA_DARK_PATCH).is_empty());
    }
}
