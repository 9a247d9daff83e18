//! Exposed-underlayment detection by color gating.
//!
//! Underlayment and bare decking read as tan, brown, or orange patches
//! that stand out against weathered shingle color. Detection is a union of
//! three HSV bands followed by morphological cleanup.

use image::RgbImage;
use tracing::debug;

use crate::domain::{DamageType, DetectionCandidate, Source};
use crate::processors::mask::{close_then_open, extract_regions, hsv_in_range, union};

const MAX_CONFIDENCE: f32 = 0.92;

/// Finds tan and brown patches consistent with exposed underlayment.
pub fn detect_exposed_underlayment(image: &RgbImage, min_area: u32) -> Vec<DetectionCandidate> {
    let (width, height) = image.dimensions();
    if width < 8 || height < 8 {
        return Vec::new();
    }

    // Tan paper, darker brown decking, saturated orange synthetic wrap.
    let tan = hsv_in_range(image, (10.0, 60.0, 140.0), (22.0, 160.0, 255.0));
    let brown = hsv_in_range(image, (8.0, 80.0, 60.0), (20.0, 220.0, 160.0));
    let orange = hsv_in_range(image, (5.0, 150.0, 150.0), (18.0, 255.0, 255.0));
    let combined = close_then_open(&union(&union(&tan, &brown), &orange), 5, 3);

    let image_area = (width as f32) * (height as f32);
    let candidates: Vec<DetectionCandidate> = extract_regions(&combined, min_area)
        .into_iter()
        .map(|region| {
            let area_frac = region.area as f32 / image_area;
            let confidence = (0.5 + area_frac * 4.0).min(MAX_CONFIDENCE);
            DetectionCandidate::new(
                region.bbox,
                confidence,
                DamageType::ExposedUnderlayment,
                Source::heuristic("exposed-underlayment"),
            )
        })
        .collect();
    debug!(count = candidates.len(), "underlayment detector finished");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::DEFAULT_MIN_AREA_UNDERLAYMENT;
    use crate::processors::BBox;
    use image::Rgb;

    #[test]
    fn uniform_gray_yields_nothing() {
        let image = RgbImage::from_pixel(100, 100, Rgb([120, 120, 120]));
        assert!(detect_exposed_underlayment(&image, DEFAULT_MIN_AREA_UNDERLAYMENT).is_empty());
    }

    #[test]
    fn a_tan_patch_is_flagged() {
        let mut image = RgbImage::from_pixel(100, 100, Rgb([120, 120, 120]));
        for y in 30..70 {
            for x in 30..70 {
                image.put_pixel(x, y, Rgb([200, 160, 110]));
            }
        }
        let found = detect_exposed_underlayment(&image, DEFAULT_MIN_AREA_UNDERLAYMENT);
        assert_eq!(found.len(), 1);
        assert!(found[0].bbox.iou(&BBox::new(30, 30, 70, 70)) > 0.7);
        assert_eq!(found[0].damage_type, DamageType::ExposedUnderlayment);
        assert!(found[0].confidence > 0.5 && found[0].confidence <= MAX_CONFIDENCE);
    }

    #[test]
    fn patches_below_the_area_floor_are_dropped() {
        let mut image = RgbImage::from_pixel(100, 100, Rgb([120, 120, 120]));
        for y in 10..20 {
            for x in 10..20 {
                image.put_pixel(x, y, Rgb([200, 160, 110]));
            }
        }
        // 100 px is well under the default floor.
        assert!(detect_exposed_underlayment(&image, DEFAULT_MIN_AREA_UNDERLAYMENT).is_empty());
    }
}
