//! Image and tensor processing for the fusion engine.
//!
//! This module provides the algorithmic building blocks shared by the
//! detectors and the pipeline:
//!
//! * `geometry` - Integer bounding-box math: area, IoU, clamping, grid cells
//! * `letterbox` - Aspect-preserving resize-with-padding and its inverse
//! * `decode` - Raw detection-model output to image-space candidates
//! * `mask` - Binary mask helpers: HSV banding, morphology, regions
//! * `surface` - Surface-vs-background segmentation

pub mod decode;
pub mod geometry;
pub mod letterbox;
pub mod mask;
pub mod surface;

pub use decode::{CandidateDecoder, anchor_major};
pub use geometry::BBox;
pub use letterbox::Letterbox;
pub use mask::Region;
pub use surface::{SurfaceMask, estimate_surface_mask};
