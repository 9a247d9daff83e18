//! Configuration for the fusion pipeline.
//!
//! All thresholds used by the decoder, the classical detectors, the fusion
//! chain, and the plausibility filters live here as serde-able structs with
//! sensible defaults. Defaulting happens once, at configuration time; the
//! pipeline stages take their parameters explicitly.

use serde::{Deserialize, Serialize};

use crate::core::constants::*;
use crate::core::errors::{FusionError, FusionResult};

/// Configuration for decoding raw detection-model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Minimum per-anchor confidence to keep a detection.
    pub conf_threshold: f32,
    /// IoU threshold for non-max suppression.
    pub iou_threshold: f32,
    /// Optional class-name list mapping class indices to damage types.
    /// When absent, every model detection is labeled `unknown`.
    pub class_names: Option<Vec<String>>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            conf_threshold: DEFAULT_CONF_THRESHOLD,
            iou_threshold: DEFAULT_NMS_IOU_THRESHOLD,
            class_names: None,
        }
    }
}

/// Minimum connected-region areas for the classical detectors, in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Minimum region area for the missing-material detector.
    pub min_area_missing: u32,
    /// Minimum region area for the discoloration detector.
    pub min_area_discoloration: u32,
    /// Minimum region area for the exposed-underlayment detector.
    pub min_area_underlayment: u32,
    /// Minimum region area for the dark-patch detector.
    pub min_area_dark_patch: u32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            min_area_missing: DEFAULT_MIN_AREA_MISSING,
            min_area_discoloration: DEFAULT_MIN_AREA_DISCOLORATION,
            min_area_underlayment: DEFAULT_MIN_AREA_UNDERLAYMENT,
            min_area_dark_patch: DEFAULT_MIN_AREA_DARK_PATCH,
        }
    }
}

/// IoU thresholds for the fixed-order fusion chain.
///
/// Candidate lists are merged in a fixed, documented order (model output,
/// then missing-material, then discoloration, then underlayment, then
/// dark-patch) so that repeated runs over the same inputs are reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// IoU threshold when merging in missing-material candidates.
    pub missing_iou: f32,
    /// IoU threshold when merging in discoloration candidates.
    pub discoloration_iou: f32,
    /// IoU threshold when merging in underlayment candidates.
    pub underlayment_iou: f32,
    /// IoU threshold when merging in dark-patch candidates.
    pub dark_patch_iou: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            missing_iou: DEFAULT_MERGE_IOU_MISSING,
            discoloration_iou: DEFAULT_MERGE_IOU_DISCOLORATION,
            underlayment_iou: DEFAULT_MERGE_IOU_UNDERLAYMENT,
            dark_patch_iou: DEFAULT_MERGE_IOU_UNDERLAYMENT,
        }
    }
}

/// Configuration for spatial plausibility filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Fraction of image height from the top treated as sky.
    pub top_margin_pct: f32,
    /// Fraction of the shorter image side treated as an edge margin.
    pub edge_margin_pct: f32,
    /// Minimum fraction of a detection's area that must lie on the surface
    /// mask for the detection to be kept.
    pub min_surface_overlap_pct: f32,
    /// Image-area fraction above which a detection is considered an
    /// oversized false positive.
    pub max_region_fraction: f32,
    /// Whether to estimate a surface mask and filter against it.
    pub filter_by_surface: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            top_margin_pct: DEFAULT_TOP_MARGIN_PCT,
            edge_margin_pct: DEFAULT_EDGE_MARGIN_PCT,
            min_surface_overlap_pct: DEFAULT_MIN_SURFACE_OVERLAP_PCT,
            max_region_fraction: DEFAULT_MAX_REGION_FRACTION,
            filter_by_surface: true,
        }
    }
}

/// Configuration for overlay rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Outline thickness for detection rectangles, in pixels.
    pub outline_thickness: i32,
    /// Font scale for detection labels.
    pub font_scale: f32,
    /// Whether to composite a per-type count legend onto the overlay.
    pub legend: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            outline_thickness: 2,
            font_scale: 14.0,
            legend: true,
        }
    }
}

/// Top-level configuration for a [`DamageAnalyzer`](crate::pipeline::DamageAnalyzer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Decoder thresholds.
    pub decoder: DecoderConfig,
    /// Classical detector minimum areas.
    pub heuristics: HeuristicConfig,
    /// Fusion chain thresholds.
    pub fusion: FusionConfig,
    /// Plausibility filter parameters.
    pub filter: FilterConfig,
    /// Overlay rendering parameters.
    pub overlay: OverlayConfig,
    /// Grid resolution for coarse detection cells.
    pub grid_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            heuristics: HeuristicConfig::default(),
            fusion: FusionConfig::default(),
            filter: FilterConfig::default(),
            overlay: OverlayConfig::default(),
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Validates that every threshold is inside its legal range.
    pub fn validate(&self) -> FusionResult<()> {
        check_unit("decoder.conf_threshold", self.decoder.conf_threshold)?;
        check_unit("decoder.iou_threshold", self.decoder.iou_threshold)?;
        check_unit("fusion.missing_iou", self.fusion.missing_iou)?;
        check_unit("fusion.discoloration_iou", self.fusion.discoloration_iou)?;
        check_unit("fusion.underlayment_iou", self.fusion.underlayment_iou)?;
        check_unit("fusion.dark_patch_iou", self.fusion.dark_patch_iou)?;
        check_unit("filter.top_margin_pct", self.filter.top_margin_pct)?;
        check_unit("filter.edge_margin_pct", self.filter.edge_margin_pct)?;
        check_unit(
            "filter.min_surface_overlap_pct",
            self.filter.min_surface_overlap_pct,
        )?;
        check_unit("filter.max_region_fraction", self.filter.max_region_fraction)?;
        if self.grid_size == 0 {
            return Err(FusionError::config_field(
                "grid_size",
                self.grid_size,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn check_unit(field: &str, value: f32) -> FusionResult<()> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(FusionError::config_field(
            field,
            value,
            "must be in [0.0, 1.0]",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = PipelineConfig::default();
        config.decoder.conf_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_grid_size_is_rejected() {
        let mut config = PipelineConfig::default();
        config.grid_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
    }
}
