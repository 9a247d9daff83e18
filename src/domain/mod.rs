//! Domain types for damage detection.
//!
//! This module defines the value records that flow through the pipeline:
//! detection candidates, reconciled cross-pass detections, severity and
//! provenance enums, and the derived damage-count index and report payloads.

mod candidate;
mod report;

pub use candidate::{
    DamageType, Detection, DetectionCandidate, GridCoords, ReconciledDetection, Severity, Source,
};
pub use report::{AnalysisOutput, DamageCounts, DamageReport, DamageSummary};
