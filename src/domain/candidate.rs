//! Detection candidate records and their supporting enums.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::constants::{SEVERITY_MINOR_CUTOFF, SEVERITY_MODERATE_CUTOFF};
use crate::processors::geometry::BBox;

/// The kind of damage a candidate represents.
///
/// This is an open enumeration: candidates from the external annotator may
/// carry labels outside the known set, preserved as [`DamageType::Other`].
/// Unclassified candidates default to [`DamageType::Unknown`] and are
/// resolved by a later pipeline stage before the final report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DamageType {
    /// Surface material is missing entirely (bare patches).
    MissingMaterial,
    /// Structural cracking.
    Crack,
    /// Impact damage (hail, debris strikes).
    Impact,
    /// Staining, typically from water.
    Stain,
    /// Color change from weathering, algae, or degradation.
    Discoloration,
    /// Underlayment visible through the surface material.
    ExposedUnderlayment,
    /// A region markedly darker than its surroundings.
    DarkPatch,
    /// Not yet classified.
    Unknown,
    /// A label outside the known set, kept verbatim.
    Other(String),
}

impl DamageType {
    /// Returns the canonical string form of this damage type.
    pub fn as_str(&self) -> &str {
        match self {
            DamageType::MissingMaterial => "missing-material",
            DamageType::Crack => "crack",
            DamageType::Impact => "impact",
            DamageType::Stain => "stain",
            DamageType::Discoloration => "discoloration",
            DamageType::ExposedUnderlayment => "exposed-underlayment",
            DamageType::DarkPatch => "dark-patch",
            DamageType::Unknown => "unknown",
            DamageType::Other(label) => label,
        }
    }

    /// Parses a label into a damage type, preserving unknown labels.
    pub fn from_label(label: &str) -> Self {
        match label {
            "missing-material" | "missing_shingles" => DamageType::MissingMaterial,
            "crack" | "cracks" => DamageType::Crack,
            "impact" | "hail_impact" => DamageType::Impact,
            "stain" | "water_stains" => DamageType::Stain,
            "discoloration" | "weathering" | "algae" => DamageType::Discoloration,
            "exposed-underlayment" => DamageType::ExposedUnderlayment,
            "dark-patch" => DamageType::DarkPatch,
            "unknown" | "" => DamageType::Unknown,
            other => DamageType::Other(other.to_string()),
        }
    }

    /// Returns true for candidates that still need classification.
    pub fn is_unknown(&self) -> bool {
        matches!(self, DamageType::Unknown)
    }
}

impl std::fmt::Display for DamageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DamageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DamageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(DamageType::from_label(&label))
    }
}

/// Ordinal damage severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic or early-stage damage.
    Minor,
    /// Damage that warrants repair.
    Moderate,
    /// Damage that needs prompt attention.
    Severe,
}

impl Severity {
    /// Derives an ordinal severity from a continuous score in `[0, 1]`
    /// using the fixed 0.33 / 0.67 cut points.
    pub fn from_score(score: f32) -> Self {
        if score < SEVERITY_MINOR_CUTOFF {
            Severity::Minor
        } else if score < SEVERITY_MODERATE_CUTOFF {
            Severity::Moderate
        } else {
            Severity::Severe
        }
    }
}

/// Provenance of a detection candidate.
///
/// Set once by the producer; a merge only ever replaces it to record the
/// dominant contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Decoded from detection-model output.
    ModelInference,
    /// Produced by the named classical detector.
    Heuristic(String),
    /// Produced by the external vision-language annotator.
    ExternalAnnotator,
    /// Result of merging candidates from multiple sources.
    Merged,
}

impl Source {
    /// Creates a heuristic provenance tag.
    pub fn heuristic(name: &str) -> Self {
        Source::Heuristic(name.to_string())
    }
}

/// Coarse grid cell for UI consumption, derived from the bbox centroid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCoords {
    /// Row index in `[0, grid_size - 1]`.
    pub row: u32,
    /// Column index in `[0, grid_size - 1]`.
    pub col: u32,
}

/// A single proposed damage region.
///
/// Created by exactly one producer (decoder, classical detector, or
/// annotator), possibly updated by merge operations, and terminal once it
/// reaches the final detection list of an invocation. Defaulting happens
/// here at construction, not at call sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    /// Axis-aligned region in image pixel space.
    pub bbox: BBox,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// The kind of damage.
    pub damage_type: DamageType,
    /// Ordinal severity, if assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Provenance tag.
    pub source: Source,
    /// Derived grid cell, if computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_coords: Option<GridCoords>,
    /// Continuous discoloration severity score, when the producer measured
    /// one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discoloration_severity: Option<f32>,
}

impl DetectionCandidate {
    /// Creates a candidate with confidence clamped to `[0, 1]` and no
    /// severity or grid assignment yet.
    pub fn new(bbox: BBox, confidence: f32, damage_type: DamageType, source: Source) -> Self {
        Self {
            bbox,
            confidence: confidence.clamp(0.0, 1.0),
            damage_type,
            severity: None,
            source,
            grid_coords: None,
            discoloration_severity: None,
        }
    }

    /// Sets the continuous discoloration severity score.
    pub fn with_discoloration_severity(mut self, score: f32) -> Self {
        self.discoloration_severity = Some(score.clamp(0.0, 1.0));
        self
    }
}

/// A detection after cross-pass reconciliation.
///
/// Carries the merged (or singly attributed) candidate along with both
/// original pass confidences and the match IoU, so downstream consumers can
/// see how much the passes agreed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledDetection {
    /// The merged or retained candidate.
    #[serde(flatten)]
    pub candidate: DetectionCandidate,
    /// Confidence contributed by the first pass (0.0 if unmatched there).
    pub agent1_confidence: f32,
    /// Confidence contributed by the second pass (0.0 if unmatched there).
    pub agent2_confidence: f32,
    /// IoU of the matched pair, 0.0 for singly attributed detections.
    pub overlap_score: f32,
}

/// Read access to the geometry and confidence of any detection record.
///
/// Filters are generic over this so they apply equally to raw candidates
/// and reconciled detections.
pub trait Detection {
    /// The detection's bounding box.
    fn bbox(&self) -> &BBox;
    /// The detection's confidence.
    fn confidence(&self) -> f32;
}

impl Detection for DetectionCandidate {
    fn bbox(&self) -> &BBox {
        &self.bbox
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }
}

impl Detection for ReconciledDetection {
    fn bbox(&self) -> &BBox {
        &self.candidate.bbox
    }

    fn confidence(&self) -> f32 {
        self.candidate.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_cut_points() {
        assert_eq!(Severity::from_score(0.0), Severity::Minor);
        assert_eq!(Severity::from_score(0.32), Severity::Minor);
        assert_eq!(Severity::from_score(0.33), Severity::Moderate);
        assert_eq!(Severity::from_score(0.66), Severity::Moderate);
        assert_eq!(Severity::from_score(0.67), Severity::Severe);
        assert_eq!(Severity::from_score(1.0), Severity::Severe);
    }

    #[test]
    fn damage_type_round_trips_known_and_unknown_labels() {
        assert_eq!(
            DamageType::from_label("missing-material"),
            DamageType::MissingMaterial
        );
        assert_eq!(DamageType::from_label(""), DamageType::Unknown);
        let custom = DamageType::from_label("granule-loss");
        assert_eq!(custom.as_str(), "granule-loss");
        let json = serde_json::to_string(&custom).unwrap();
        let back: DamageType = serde_json::from_str(&json).unwrap();
        assert_eq!(custom, back);
    }

    #[test]
    fn legacy_labels_map_to_canonical_types() {
        assert_eq!(
            DamageType::from_label("missing_shingles"),
            DamageType::MissingMaterial
        );
        assert_eq!(DamageType::from_label("hail_impact"), DamageType::Impact);
        assert_eq!(DamageType::from_label("water_stains"), DamageType::Stain);
    }

    #[test]
    fn candidate_constructor_clamps_confidence() {
        let bbox = BBox::new(0, 0, 10, 10);
        let c = DetectionCandidate::new(bbox, 1.7, DamageType::Unknown, Source::ModelInference);
        assert_eq!(c.confidence, 1.0);
        assert!(c.severity.is_none());
        assert!(c.grid_coords.is_none());
    }
}
