//! Discoloration and staining detection.
//!
//! Staining is a mid-contrast defect: darker than its surroundings but far
//! from the near-black of a dark patch. The detector equalizes the photo's
//! histogram to spread that contrast, selects pixels that land in the low
//! band, and adds chroma-edge evidence for color-cast stains a luminance
//! view misses.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::equalize_histogram;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::dilate;
use tracing::debug;

use crate::domain::{DamageType, DetectionCandidate, Source};
use crate::processors::mask::{close_then_open, extract_regions, union};

const EQUALIZED_CUTOFF: u8 = 100;
const CHROMA_CANNY_LOW: f32 = 40.0;
const CHROMA_CANNY_HIGH: f32 = 120.0;
const MAX_CONFIDENCE: f32 = 0.9;

/// Finds stained or discolored regions.
///
/// Each candidate carries a discoloration severity score derived from its
/// confidence, later used to grade severity instead of the generic fallback.
pub fn detect_discoloration(
    image: &RgbImage,
    gray: &GrayImage,
    min_area: u32,
) -> Vec<DetectionCandidate> {
    let (width, height) = image.dimensions();
    if width < 8 || height < 8 {
        return Vec::new();
    }

    let equalized = equalize_histogram(gray);
    let mut low_band = GrayImage::new(width, height);
    for (x, y, pixel) in equalized.enumerate_pixels() {
        if pixel.0[0] < EQUALIZED_CUTOFF {
            low_band.put_pixel(x, y, Luma([255]));
        }
    }

    // Chroma: spread between the strongest and weakest channel. Stains with
    // a color cast form edges here even when luminance barely moves.
    let mut chroma = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let max = pixel.0.iter().copied().max().unwrap_or(0);
        let min = pixel.0.iter().copied().min().unwrap_or(0);
        chroma.put_pixel(x, y, Luma([max - min]));
    }
    let chroma_edges = dilate(&canny(&chroma, CHROMA_CANNY_LOW, CHROMA_CANNY_HIGH), Norm::LInf, 2);

    let combined = close_then_open(&union(&low_band, &chroma_edges), 5, 3);

    let image_area = (width as f32) * (height as f32);
    let candidates: Vec<DetectionCandidate> = extract_regions(&combined, min_area)
        .into_iter()
        .map(|region| {
            let area_frac = region.area as f32 / image_area;
            let confidence = (0.45 + area_frac * 3.0).min(MAX_CONFIDENCE);
            let severity_score = (0.4 + confidence).min(1.0);
            DetectionCandidate::new(
                region.bbox,
                confidence,
                DamageType::Discoloration,
                Source::heuristic("discoloration"),
            )
            .with_discoloration_severity(severity_score)
        })
        .collect();
    debug!(count = candidates.len(), "discoloration detector finished");
    candidates
}
