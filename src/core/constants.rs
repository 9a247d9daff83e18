//! Constants used throughout the fusion engine.
//!
//! This module defines default values for thresholds, margins, and limits
//! used across the detection, fusion, and filtering stages.

/// The maximum accepted size for an encoded source image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// The maximum side length an image is resized to before analysis.
pub const DEFAULT_MAX_SIDE_LEN: u32 = 2048;

/// The default confidence threshold for decoding model output.
pub const DEFAULT_CONF_THRESHOLD: f32 = 0.3;

/// The default IoU threshold for non-max suppression.
pub const DEFAULT_NMS_IOU_THRESHOLD: f32 = 0.45;

/// The padding value used to fill letterbox borders.
pub const LETTERBOX_FILL: u8 = 114;

/// The fraction of image height treated as sky when filtering by location.
pub const DEFAULT_TOP_MARGIN_PCT: f32 = 0.12;

/// The fraction of the shorter image side treated as an edge margin.
pub const DEFAULT_EDGE_MARGIN_PCT: f32 = 0.03;

/// The minimum fraction of a detection that must lie on the surface mask.
pub const DEFAULT_MIN_SURFACE_OVERLAP_PCT: f32 = 0.3;

/// The image-area fraction above which a detection is considered oversized.
pub const DEFAULT_MAX_REGION_FRACTION: f32 = 0.45;

/// The default grid resolution for mapping detections to coarse cells.
pub const DEFAULT_GRID_SIZE: u32 = 10;

/// Severity score below this is classified as minor.
pub const SEVERITY_MINOR_CUTOFF: f32 = 0.33;

/// Severity score below this (and at or above the minor cutoff) is moderate.
pub const SEVERITY_MODERATE_CUTOFF: f32 = 0.67;

/// The minimum fraction of image area a surface-mask component must cover.
pub const MIN_SURFACE_COMPONENT_FRACTION: f32 = 0.05;

/// The fraction of image height excluded by the surface-mask fallback.
pub const SURFACE_FALLBACK_SKY_FRACTION: f32 = 0.15;

/// Default minimum pixel area for missing-material candidate regions.
pub const DEFAULT_MIN_AREA_MISSING: u32 = 400;

/// Default minimum pixel area for discoloration candidate regions.
pub const DEFAULT_MIN_AREA_DISCOLORATION: u32 = 600;

/// Default minimum pixel area for exposed-underlayment candidate regions.
pub const DEFAULT_MIN_AREA_UNDERLAYMENT: u32 = 300;

/// Default minimum pixel area for dark-patch candidate regions.
pub const DEFAULT_MIN_AREA_DARK_PATCH: u32 = 500;

/// The default IoU threshold when merging model and missing-material lists.
pub const DEFAULT_MERGE_IOU_MISSING: f32 = 0.35;

/// The default IoU threshold when merging in discoloration candidates.
pub const DEFAULT_MERGE_IOU_DISCOLORATION: f32 = 0.3;

/// The default IoU threshold when merging in underlayment candidates.
pub const DEFAULT_MERGE_IOU_UNDERLAYMENT: f32 = 0.3;

/// The default IoU threshold for matching detections across passes.
pub const DEFAULT_RECONCILE_OVERLAP_THRESHOLD: f32 = 0.3;
