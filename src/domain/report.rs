//! Derived report payloads: damage counts, summary, and analysis output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::candidate::DetectionCandidate;

/// A damage-type → count index.
///
/// Always recomputed from a detection list, never maintained incrementally;
/// after recomputation the counts sum to the detection count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DamageCounts(pub BTreeMap<String, usize>);

impl DamageCounts {
    /// Recomputes the index from a detection list.
    pub fn from_detections(detections: &[DetectionCandidate]) -> Self {
        let mut counts = BTreeMap::new();
        for det in detections {
            *counts.entry(det.damage_type.as_str().to_string()).or_insert(0) += 1;
        }
        Self(counts)
    }

    /// Total number of counted detections.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Iterates over `(damage_type, count)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Returns true if no detections were counted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Summary statistics for a detection set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageSummary {
    /// Total number of damage regions.
    pub total_damage_areas: usize,
    /// Number of regions with confidence above 0.7.
    pub high_confidence_areas: usize,
    /// Coarse recommendation: "repair" when anything was found, else "none".
    pub recommended_action: String,
}

impl DamageSummary {
    /// Builds the summary from a final detection list.
    pub fn from_detections(detections: &[DetectionCandidate]) -> Self {
        let total = detections.len();
        let high = detections.iter().filter(|d| d.confidence > 0.7).count();
        Self {
            total_damage_areas: total,
            high_confidence_areas: high,
            recommended_action: if total > 0 { "repair" } else { "none" }.to_string(),
        }
    }
}

/// The structured report payload for one analyzed image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageReport {
    /// Width of the source image, the frame every box is expressed in.
    pub image_width: u32,
    /// Height of the source image.
    pub image_height: u32,
    /// Final detections, in pipeline order.
    pub detections: Vec<DetectionCandidate>,
    /// Damage counts by type.
    pub counts: DamageCounts,
    /// Summary statistics.
    pub summary: DamageSummary,
    /// Name of the annotator provider that contributed labels, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotator_provider: Option<String>,
}

/// Everything a single analysis invocation returns to its caller.
pub struct AnalysisOutput {
    /// Final detections, filtered and classified.
    pub detections: Vec<DetectionCandidate>,
    /// Damage counts by type, recomputed from `detections`.
    pub counts: DamageCounts,
    /// The rendered overlay, PNG-encoded with transparency.
    pub overlay_png: Vec<u8>,
    /// The structured report payload.
    pub report: DamageReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DamageType, Source};
    use crate::processors::geometry::BBox;

    fn candidate(damage_type: DamageType, confidence: f32) -> DetectionCandidate {
        DetectionCandidate::new(
            BBox::new(0, 0, 10, 10),
            confidence,
            damage_type,
            Source::ModelInference,
        )
    }

    #[test]
    fn counts_sum_to_detection_count() {
        let detections = vec![
            candidate(DamageType::Crack, 0.9),
            candidate(DamageType::Crack, 0.5),
            candidate(DamageType::Stain, 0.6),
            candidate(DamageType::Unknown, 0.4),
        ];
        let counts = DamageCounts::from_detections(&detections);
        assert_eq!(counts.total(), detections.len());
        assert_eq!(counts.0.get("crack"), Some(&2));
        assert_eq!(counts.0.get("stain"), Some(&1));
        assert_eq!(counts.0.get("unknown"), Some(&1));
    }

    #[test]
    fn summary_counts_high_confidence_regions() {
        let detections = vec![
            candidate(DamageType::Crack, 0.9),
            candidate(DamageType::Stain, 0.6),
        ];
        let summary = DamageSummary::from_detections(&detections);
        assert_eq!(summary.total_damage_areas, 2);
        assert_eq!(summary.high_confidence_areas, 1);
        assert_eq!(summary.recommended_action, "repair");

        let empty = DamageSummary::from_detections(&[]);
        assert_eq!(empty.recommended_action, "none");
    }
}
