//! Cross-pass reconciliation.
//!
//! When two independent analysis passes run over the same photo, their
//! detections are reconciled pairwise: overlapping pairs fuse into one
//! record that averages both confidences and remembers each side's score,
//! and detections only one pass produced survive unchanged. Unlike list
//! fusion this is a symmetric blend, not a winner-takes-all overwrite.

use tracing::debug;

use crate::domain::{DetectionCandidate, ReconciledDetection, Source};

/// Reconciles two detection passes into a single list.
///
/// Each detection from pass A is matched to the highest-IoU unconsumed
/// detection from pass B above `overlap_threshold`. A matched pair blends
/// half-and-half: confidence is the mean of both, the higher-confidence
/// side supplies the damage type and severity (ties favor pass A), and the
/// record keeps pass A's box and grid cell. Unmatched detections from
/// either pass pass through with a zero overlap score.
pub fn reconcile_passes(
    pass_a: Vec<DetectionCandidate>,
    pass_b: Vec<DetectionCandidate>,
    overlap_threshold: f32,
) -> Vec<ReconciledDetection> {
    let mut consumed = vec![false; pass_b.len()];
    let mut reconciled = Vec::with_capacity(pass_a.len() + pass_b.len());
    let mut merged_count = 0usize;

    for a in pass_a {
        let best = pass_b
            .iter()
            .enumerate()
            .filter(|(j, b)| !consumed[*j] && a.bbox.iou(&b.bbox) > overlap_threshold)
            .max_by(|(_, x), (_, y)| {
                a.bbox
                    .iou(&x.bbox)
                    .partial_cmp(&a.bbox.iou(&y.bbox))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        match best {
            Some((j, b)) => {
                consumed[j] = true;
                merged_count += 1;
                let overlap = a.bbox.iou(&b.bbox);
                let b_wins = b.confidence > a.confidence;
                let mut candidate = DetectionCandidate::new(
                    a.bbox,
                    (a.confidence + b.confidence) / 2.0,
                    if b_wins { b.damage_type.clone() } else { a.damage_type.clone() },
                    Source::Merged,
                );
                candidate.severity = if b_wins { b.severity } else { a.severity };
                candidate.grid_coords = a.grid_coords;
                candidate.discoloration_severity = if b_wins {
                    b.discoloration_severity
                } else {
                    a.discoloration_severity
                };
                reconciled.push(ReconciledDetection {
                    agent1_confidence: a.confidence,
                    agent2_confidence: b.confidence,
                    overlap_score: overlap,
                    candidate,
                });
            }
            None => {
                reconciled.push(ReconciledDetection {
                    agent1_confidence: a.confidence,
                    agent2_confidence: 0.0,
                    overlap_score: 0.0,
                    candidate: a,
                });
            }
        }
    }

    for (j, b) in pass_b.into_iter().enumerate() {
        if !consumed[j] {
            reconciled.push(ReconciledDetection {
                agent1_confidence: 0.0,
                agent2_confidence: b.confidence,
                overlap_score: 0.0,
                candidate: b,
            });
        }
    }

    debug!(merged = merged_count, total = reconciled.len(), "reconciled passes");
    reconciled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::DEFAULT_RECONCILE_OVERLAP_THRESHOLD;
    use crate::domain::{DamageType, Severity};
    use crate::processors::BBox;

    fn candidate(
        bbox: BBox,
        confidence: f32,
        damage_type: DamageType,
        severity: Severity,
    ) -> DetectionCandidate {
        let mut c = DetectionCandidate::new(bbox, confidence, damage_type, Source::ModelInference);
        c.severity = Some(severity);
        c
    }

    #[test]
    fn overlapping_pair_blends_and_higher_side_labels() {
        let a = candidate(BBox::new(10, 10, 50, 50), 0.9, DamageType::Crack, Severity::Severe);
        let b = candidate(BBox::new(12, 12, 48, 48), 0.6, DamageType::Stain, Severity::Minor);

        let out = reconcile_passes(vec![a], vec![b], DEFAULT_RECONCILE_OVERLAP_THRESHOLD);
        assert_eq!(out.len(), 1);
        let merged = &out[0];
        assert!((merged.candidate.confidence - 0.75).abs() < 1e-6);
        assert_eq!(merged.candidate.damage_type, DamageType::Crack);
        assert_eq!(merged.candidate.severity, Some(Severity::Severe));
        assert_eq!(merged.candidate.bbox, BBox::new(10, 10, 50, 50));
        assert_eq!(merged.candidate.source, Source::Merged);
        assert!((merged.agent1_confidence - 0.9).abs() < 1e-6);
        assert!((merged.agent2_confidence - 0.6).abs() < 1e-6);
        // 36x36 inside 40x40: intersection 1296, union 1600.
        assert!((merged.overlap_score - 0.81).abs() < 1e-3);
    }

    #[test]
    fn second_pass_can_win_the_label() {
        let a = candidate(BBox::new(0, 0, 40, 40), 0.5, DamageType::Stain, Severity::Minor);
        let b = candidate(BBox::new(0, 0, 40, 40), 0.8, DamageType::Impact, Severity::Severe);
        let out = reconcile_passes(vec![a], vec![b], DEFAULT_RECONCILE_OVERLAP_THRESHOLD);
        assert_eq!(out[0].candidate.damage_type, DamageType::Impact);
        assert_eq!(out[0].candidate.severity, Some(Severity::Severe));
        // The record still carries pass A's box.
        assert_eq!(out[0].candidate.bbox, BBox::new(0, 0, 40, 40));
    }

    #[test]
    fn ties_favor_the_first_pass() {
        let a = candidate(BBox::new(0, 0, 40, 40), 0.7, DamageType::Crack, Severity::Moderate);
        let b = candidate(BBox::new(0, 0, 40, 40), 0.7, DamageType::Stain, Severity::Severe);
        let out = reconcile_passes(vec![a], vec![b], DEFAULT_RECONCILE_OVERLAP_THRESHOLD);
        assert_eq!(out[0].candidate.damage_type, DamageType::Crack);
        assert_eq!(out[0].candidate.severity, Some(Severity::Moderate));
    }

    #[test]
    fn unmatched_detections_from_both_passes_survive() {
        let a = candidate(BBox::new(0, 0, 20, 20), 0.8, DamageType::Crack, Severity::Moderate);
        let b = candidate(BBox::new(100, 100, 140, 140), 0.6, DamageType::Stain, Severity::Minor);
        let out = reconcile_passes(
            vec![a.clone()],
            vec![b.clone()],
            DEFAULT_RECONCILE_OVERLAP_THRESHOLD,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].candidate, a);
        assert_eq!(out[0].agent2_confidence, 0.0);
        assert_eq!(out[0].overlap_score, 0.0);
        assert_eq!(out[1].candidate, b);
        assert_eq!(out[1].agent1_confidence, 0.0);
    }

    #[test]
    fn each_pass_b_detection_merges_at_most_once() {
        let a1 = candidate(BBox::new(0, 0, 40, 40), 0.9, DamageType::Crack, Severity::Severe);
        let a2 = candidate(BBox::new(2, 2, 42, 42), 0.8, DamageType::Crack, Severity::Severe);
        let b = candidate(BBox::new(1, 1, 41, 41), 0.7, DamageType::Stain, Severity::Minor);
        let out = reconcile_passes(
            vec![a1, a2],
            vec![b],
            DEFAULT_RECONCILE_OVERLAP_THRESHOLD,
        );
        // One merged record, one pass-A-only record.
        assert_eq!(out.len(), 2);
        assert!(out.iter().filter(|r| r.candidate.source == Source::Merged).count() == 1);
    }
}
