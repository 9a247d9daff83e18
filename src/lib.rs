//! # roofsight
//!
//! A multi-source damage-detection fusion engine for building exterior
//! photographs. It combines raw object-detection model output, classical
//! image-processing heuristics, and labels from an external vision-language
//! annotator into one consistent set of damage regions, then reconciles the
//! results of independently run detection passes into a single report.
//!
//! ## Components
//!
//! - **Candidate decoding**: raw per-anchor tensors (letterboxed coordinate
//!   frame) into image-space candidates with confidence thresholding and NMS
//! - **Classical detectors**: missing surface material, exposed underlayment,
//!   dark patches, and discoloration, straight from pixel data
//! - **Surface boundary estimation**: a binary surface-vs-sky mask used to
//!   reject implausible candidates
//! - **Fusion**: IoU-based merging of any number of candidate lists with
//!   best-detector-wins conflict resolution
//! - **Cross-pass reconciliation**: merging two independently fused passes
//!   into confidence-blended, provenance-tagged records
//! - **Overlay rendering**: type-colored, confidence-alpha boxes with a
//!   per-type legend on a transparent layer
//!
//! The engine is stateless: every invocation is a pure, synchronous function
//! of one image and its candidate lists. I/O (fetching images, running the
//! detection model, calling the annotator, persisting results) lives behind
//! the [`core::traits`] seams and is supplied by the caller.
//!
//! ## Modules
//!
//! * [`core`] - Errors, constants, configuration, collaborator traits
//! * [`domain`] - Candidate and report value types
//! * [`processors`] - Geometry, letterboxing, tensor decoding, masks
//! * [`detectors`] - Classical pixel-space damage detectors
//! * [`pipeline`] - Fusion, filtering, reconciliation, orchestration
//! * [`utils`] - Image byte handling and overlay rendering
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use roofsight::prelude::*;
//!
//! # fn main() -> Result<(), FusionError> {
//! let analyzer = DamageAnalyzer::new(PipelineConfig::default())?;
//! let image_bytes = std::fs::read("roof.jpg")?;
//! let output = analyzer.analyze(&image_bytes)?;
//! for det in &output.detections {
//!     println!("{} {:.2} at {:?}", det.damage_type, det.confidence, det.bbox);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod detectors;
pub mod domain;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use roofsight::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::config::PipelineConfig;
    pub use crate::core::errors::{FusionError, FusionResult};
    pub use crate::core::traits::{Annotator, InferenceBackend};
    pub use crate::domain::{
        AnalysisOutput, DamageCounts, DamageType, DetectionCandidate, ReconciledDetection,
        Severity, Source,
    };
    pub use crate::pipeline::{DamageAnalyzer, merge_candidates, reconcile_passes};
    pub use crate::processors::geometry::BBox;
}
