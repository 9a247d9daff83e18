//! Decoding of raw detector output tensors into candidates.
//!
//! The model emits one row per anchor: four center-form box values
//! (`cx, cy, w, h` in canvas coordinates) followed by one score per class.
//! Decoding thresholds by best class score, maps boxes back through the
//! letterbox into source coordinates, and suppresses duplicates with
//! greedy non-maximum suppression.

use ndarray::{Array2, Array3, ArrayView2, Axis};
use tracing::debug;

use super::letterbox::Letterbox;
use crate::core::config::DecoderConfig;
use crate::domain::{DamageType, DetectionCandidate, Source};

/// Decodes raw model tensors into scored, deduplicated candidates.
#[derive(Debug, Clone)]
pub struct CandidateDecoder {
    conf_threshold: f32,
    iou_threshold: f32,
    class_names: Option<Vec<String>>,
}

impl CandidateDecoder {
    /// Creates a decoder from its configuration section.
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            conf_threshold: config.conf_threshold,
            iou_threshold: config.iou_threshold,
            class_names: config.class_names.clone(),
        }
    }

    /// Decodes a `[anchors, 4 + num_classes]` view into candidates in
    /// source-image coordinates.
    ///
    /// Rows with fewer than five columns, a sub-threshold best score, or a
    /// box that fails validation are skipped silently; a malformed anchor
    /// must never abort the pass.
    pub fn decode(
        &self,
        raw: ArrayView2<'_, f32>,
        letterbox: &Letterbox,
        src_w: u32,
        src_h: u32,
    ) -> Vec<DetectionCandidate> {
        let cols = raw.ncols();
        if cols < 5 {
            debug!(cols, "raw output too narrow to decode");
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for row in raw.axis_iter(Axis(0)) {
            let scores = row.as_slice().map(|s| &s[4..]).unwrap_or(&[]);
            let (class_idx, score) = match best_class(scores) {
                Some(found) => found,
                None => {
                    // Non-contiguous row; fall back to an explicit scan.
                    let mut best = (0usize, f32::NEG_INFINITY);
                    for (i, &s) in row.iter().skip(4).enumerate() {
                        if s > best.1 {
                            best = (i, s);
                        }
                    }
                    best
                }
            };
            let score = score.clamp(0.0, 1.0);
            if score < self.conf_threshold {
                continue;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
                continue;
            }
            let bbox = letterbox.unmap_box(
                cx - w / 2.0,
                cy - h / 2.0,
                cx + w / 2.0,
                cy + h / 2.0,
                src_w,
                src_h,
            );

            let damage_type = self.class_label(class_idx);
            candidates.push(DetectionCandidate::new(
                bbox,
                score,
                damage_type,
                Source::ModelInference,
            ));
        }

        let survivors = non_max_suppression(candidates, self.iou_threshold);
        debug!(count = survivors.len(), "decoded candidates after suppression");
        survivors
    }

    fn class_label(&self, class_idx: usize) -> DamageType {
        match &self.class_names {
            Some(names) => names
                .get(class_idx)
                .map(|name| DamageType::from_label(name))
                .unwrap_or(DamageType::Unknown),
            None => DamageType::Unknown,
        }
    }
}

fn best_class(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best
}

/// Reorders a raw `[1, C, N]` model output into anchor-major `[N, C]` form.
///
/// Runtimes disagree on whether anchors are the channel or the row axis;
/// the wider axis is taken to be the anchor axis.
pub fn anchor_major(raw: &Array3<f32>) -> Array2<f32> {
    let view = raw.index_axis(Axis(0), 0);
    if view.nrows() < view.ncols() {
        view.t().to_owned()
    } else {
        view.to_owned()
    }
}

/// Greedy non-maximum suppression over a single candidate list.
///
/// Candidates are visited in descending confidence order (stable for equal
/// scores); each survivor suppresses every later candidate overlapping it
/// above `iou_threshold`.
pub fn non_max_suppression(
    mut candidates: Vec<DetectionCandidate>,
    iou_threshold: f32,
) -> Vec<DetectionCandidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut suppressed = vec![false; candidates.len()];
    let mut kept = Vec::with_capacity(candidates.len());
    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            if !suppressed[j] && candidates[i].bbox.iou(&candidates[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
        kept.push(candidates[i].clone());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::geometry::BBox;
    use ndarray::{Array2, array};

    fn decoder(conf: f32, iou: f32, names: &[&str]) -> CandidateDecoder {
        CandidateDecoder::new(&DecoderConfig {
            conf_threshold: conf,
            iou_threshold: iou,
            class_names: Some(names.iter().map(|s| s.to_string()).collect()),
        })
    }

    #[test]
    fn decodes_center_form_rows_through_the_letterbox() {
        let lb = Letterbox::fit(64, 64, 64); // identity transform
        // One anchor centered at (32, 32), 20x20, crack score 0.9.
        let raw = array![[32.0, 32.0, 20.0, 20.0, 0.1, 0.9]];
        let out = decoder(0.3, 0.45, &["missing_shingles", "crack"]).decode(
            raw.view(),
            &lb,
            64,
            64,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bbox, BBox::new(22, 22, 42, 42));
        assert_eq!(out[0].damage_type, DamageType::Crack);
        assert!((out[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(out[0].source, Source::ModelInference);
    }

    #[test]
    fn sub_threshold_and_malformed_rows_are_skipped() {
        let lb = Letterbox::fit(64, 64, 64);
        let raw = array![
            [32.0, 32.0, 20.0, 20.0, 0.1, 0.2],       // below threshold
            [32.0, 32.0, -5.0, 20.0, 0.1, 0.9],       // negative width
            [f32::NAN, 32.0, 20.0, 20.0, 0.1, 0.9],   // non-finite center
        ];
        let out = decoder(0.3, 0.45, &["a", "b"]).decode(raw.view(), &lb, 64, 64);
        assert!(out.is_empty());
    }

    #[test]
    fn suppression_keeps_the_higher_scored_duplicate() {
        let lb = Letterbox::fit(64, 64, 64);
        // Two near-identical boxes (IoU well above 0.45) with different scores.
        let raw = array![
            [32.0, 32.0, 20.0, 20.0, 0.80, 0.0],
            [33.0, 32.0, 20.0, 20.0, 0.95, 0.0],
        ];
        let out = decoder(0.3, 0.45, &["stain"]).decode(raw.view(), &lb, 64, 64);
        assert_eq!(out.len(), 1);
        assert!((out[0].confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn empty_input_decodes_to_empty() {
        let lb = Letterbox::fit(64, 64, 64);
        let raw = Array2::<f32>::zeros((0, 6));
        let out = decoder(0.3, 0.45, &["a", "b"]).decode(raw.view(), &lb, 64, 64);
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_class_index_maps_to_unknown() {
        let lb = Letterbox::fit(64, 64, 64);
        let raw = array![[32.0, 32.0, 20.0, 20.0, 0.9]];
        // Single class score but no class names configured.
        let out = CandidateDecoder::new(&DecoderConfig {
            conf_threshold: 0.3,
            iou_threshold: 0.45,
            class_names: None,
        })
        .decode(raw.view(), &lb, 64, 64);
        assert_eq!(out[0].damage_type, DamageType::Unknown);
    }

    #[test]
    fn anchor_major_transposes_channel_first_layouts() {
        let raw = Array3::<f32>::zeros((1, 6, 100));
        assert_eq!(anchor_major(&raw).dim(), (100, 6));
        let already = Array3::<f32>::zeros((1, 100, 6));
        assert_eq!(anchor_major(&already).dim(), (100, 6));
    }
}
