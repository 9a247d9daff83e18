//! Missing-material detection from texture discontinuities.
//!
//! Shingle fields have a regular fine texture; a patch of missing material
//! breaks it with a sharp boundary and a flat or differently-textured
//! interior. The detector compares the image against itself at two blur
//! scales and combines the difference with strong edges and a local
//! color-variance mask.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use tracing::debug;

use crate::domain::{DamageType, DetectionCandidate, Source};
use crate::processors::mask::{close_then_open, extract_regions, union};

const BLUR_DIFF_THRESHOLD: i16 = 12;
const CANNY_LOW: f32 = 30.0;
const CANNY_HIGH: f32 = 90.0;
const VARIANCE_RADIUS: u32 = 2;
const VARIANCE_THRESHOLD: f32 = 300.0;
const MAX_CONFIDENCE: f32 = 0.95;

/// Selects pixels whose local color spread varies strongly, marking spots
/// where exposed substrate color meets shingle color.
fn color_variance_mask(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut spread = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let max = pixel.0.iter().copied().max().unwrap_or(0);
        let min = pixel.0.iter().copied().min().unwrap_or(0);
        spread.put_pixel(x, y, Luma([max - min]));
    }

    let r = VARIANCE_RADIUS as i32;
    let mut mask = GrayImage::new(width, height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let mut sum = 0.0f32;
            let mut sum_sq = 0.0f32;
            let mut count = 0.0f32;
            for dy in -r..=r {
                for dx in -r..=r {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx >= 0 && ny >= 0 && nx < width as i32 && ny < height as i32 {
                        let v = spread.get_pixel(nx as u32, ny as u32).0[0] as f32;
                        sum += v;
                        sum_sq += v * v;
                        count += 1.0;
                    }
                }
            }
            let mean = sum / count;
            let variance = sum_sq / count - mean * mean;
            if variance > VARIANCE_THRESHOLD {
                mask.put_pixel(x as u32, y as u32, Luma([255]));
            }
        }
    }
    mask
}

/// Finds regions whose texture departs sharply from the surrounding field.
pub fn detect_missing_material(
    image: &RgbImage,
    gray: &GrayImage,
    min_area: u32,
) -> Vec<DetectionCandidate> {
    let (width, height) = image.dimensions();
    if width < 8 || height < 8 {
        return Vec::new();
    }

    let fine = gaussian_blur_f32(gray, 2.0);
    let coarse = gaussian_blur_f32(gray, 8.0);
    let mut texture = GrayImage::new(width, height);
    for (x, y, pixel) in fine.enumerate_pixels() {
        let diff = pixel.0[0] as i16 - coarse.get_pixel(x, y).0[0] as i16;
        if diff.abs() > BLUR_DIFF_THRESHOLD {
            texture.put_pixel(x, y, Luma([255]));
        }
    }

    let edges = dilate(&canny(gray, CANNY_LOW, CANNY_HIGH), Norm::LInf, 2);
    let variance = color_variance_mask(image);
    let combined = close_then_open(&union(&union(&texture, &edges), &variance), 5, 3);

    let image_area = (width as f32) * (height as f32);
    let candidates: Vec<DetectionCandidate> = extract_regions(&combined, min_area)
        .into_iter()
        .map(|region| {
            let area_frac = region.area as f32 / image_area;
            let confidence = (0.55 + area_frac * 4.0).min(MAX_CONFIDENCE);
            DetectionCandidate::new(
                region.bbox,
                confidence,
                DamageType::MissingMaterial,
                Source::heuristic("missing-material"),
            )
        })
        .collect();
    debug!(count = candidates.len(), "missing-material detector finished");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::DEFAULT_MIN_AREA_MISSING;
    use crate::processors::BBox;
    use image::Rgb;

    fn to_gray(image: &RgbImage) -> GrayImage {
        image::imageops::grayscale(image)
    }

    #[test]
    fn uniform_image_yields_nothing() {
        let image = RgbImage::from_pixel(120, 120, Rgb([120, 120, 120]));
        let gray = to_gray(&image);
        assert!(detect_missing_material(&image, &gray, DEFAULT_MIN_AREA_MISSING).is_empty());
    }

    #[test]
    fn a_high_contrast_patch_is_flagged() {
        let mut image = RgbImage::from_pixel(120, 120, Rgb([40, 40, 40]));
        for y in 40..80 {
            for x in 40..80 {
                image.put_pixel(x, y, Rgb([230, 230, 230]));
            }
        }
        let gray = to_gray(&image);
        let found = detect_missing_material(&image, &gray, DEFAULT_MIN_AREA_MISSING);
        assert!(!found.is_empty());
        // The top region must sit on the patch, with a capped confidence.
        let patch = BBox::new(40, 40, 80, 80);
        assert!(found[0].bbox.iou(&patch) > 0.2);
        assert!(found[0].confidence <= MAX_CONFIDENCE);
        assert_eq!(found[0].source, Source::heuristic("missing-material"));
    }

    #[test]
    fn tiny_images_are_ignored() {
        let image = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let gray = to_gray(&image);
        assert!(detect_missing_material(&image, &gray, 1).is_empty());
    }
}
