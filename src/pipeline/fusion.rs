//! Overlap-based fusion of candidate lists.
//!
//! Fusion folds a secondary candidate list into a primary one: each
//! secondary candidate either replaces an overlapping primary record when
//! it is strictly more confident, is absorbed silently when it is not, or
//! joins the list as a new detection when nothing overlaps it.

use tracing::debug;

use crate::domain::DetectionCandidate;

/// Merges `secondary` candidates into `primary` by IoU.
///
/// For each secondary candidate the primary record with the highest IoU is
/// matched when that IoU clears `iou_threshold`; a strictly higher secondary
/// confidence replaces that whole record. Matching runs against the growing
/// list, so a secondary candidate appended by this call can absorb later
/// ones.
pub fn merge_candidates(
    primary: Vec<DetectionCandidate>,
    secondary: Vec<DetectionCandidate>,
    iou_threshold: f32,
) -> Vec<DetectionCandidate> {
    let mut merged = primary;
    let mut replaced = 0usize;
    let mut appended = 0usize;
    for candidate in secondary {
        let best = merged
            .iter()
            .enumerate()
            .map(|(i, existing)| (i, existing.bbox.iou(&candidate.bbox)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|&(_, iou)| iou >= iou_threshold);
        match best {
            Some((index, _)) => {
                if candidate.confidence > merged[index].confidence {
                    merged[index] = candidate;
                    replaced += 1;
                }
            }
            None => {
                merged.push(candidate);
                appended += 1;
            }
        }
    }
    debug!(replaced, appended, total = merged.len(), "merged candidate lists");
    merged
}
