//! Trait seams to external collaborators.
//!
//! The engine consumes and produces only in-memory data. The detection-model
//! runtime and the vision-language annotator are opaque collaborators
//! supplied by the caller behind these traits; the engine never performs
//! network or model I/O itself.

use ndarray::{Array3, Array4};

use crate::core::errors::FusionResult;
use crate::domain::{DamageType, Severity};
use crate::processors::geometry::BBox;

/// An opaque detection-model runtime.
///
/// The engine prepares a letterboxed NCHW float tensor and hands it to the
/// backend; the backend returns the raw per-anchor output tensor. All
/// interpretation of that output's shape conventions belongs to the
/// [`CandidateDecoder`](crate::processors::decode::CandidateDecoder).
pub trait InferenceBackend: Send + Sync {
    /// The square input edge the model expects (e.g. 640).
    fn input_size(&self) -> u32;

    /// Runs inference on a preprocessed `[1, 3, H, W]` tensor and returns
    /// the raw output tensor.
    fn run(&self, input: Array4<f32>) -> FusionResult<Array3<f32>>;
}

/// A damage-type label returned by the external annotator for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionLabel {
    /// The region the label applies to. Matched to candidates by exact
    /// bbox equality.
    pub bbox: BBox,
    /// The classified damage type.
    pub damage_type: DamageType,
    /// The classified severity.
    pub severity: Severity,
}

/// An opaque vision-language annotator.
///
/// `None` means "no additional evidence" (provider down, rate limited,
/// unparsable response after retries); it is never treated as an error and
/// the pipeline proceeds with its own classifications.
pub trait Annotator: Send + Sync {
    /// Asks the annotator to classify the given regions of the image.
    ///
    /// `task` is a short free-text description of the damage classes of
    /// interest. On success returns the labels and the provider name that
    /// produced them.
    fn classify_regions(
        &self,
        image_bytes: &[u8],
        regions: &[BBox],
        task: &str,
    ) -> Option<(Vec<RegionLabel>, String)>;
}
