//! Spatial plausibility filtering.
//!
//! Aerial roof photos put sky at the top and ground clutter at the edges;
//! detections centered there are far more often artifacts than damage. The
//! filter vetoes candidates by centroid position and, when a surface mask
//! is available, by how much of the box actually lies on the roof.

use tracing::debug;

use crate::core::config::FilterConfig;
use crate::domain::Detection;
use crate::processors::SurfaceMask;

/// Position- and surface-based candidate veto.
#[derive(Debug, Clone)]
pub struct LocationFilter {
    top_margin_pct: f32,
    edge_margin_pct: f32,
    min_surface_overlap_pct: f32,
    filter_by_surface: bool,
}

impl LocationFilter {
    /// Builds a filter from its configuration section.
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            top_margin_pct: config.top_margin_pct,
            edge_margin_pct: config.edge_margin_pct,
            min_surface_overlap_pct: config.min_surface_overlap_pct,
            filter_by_surface: config.filter_by_surface,
        }
    }

    /// Keeps candidates whose centroid sits inside the plausible band and,
    /// when surface gating is enabled, whose box overlaps the mask enough.
    pub fn apply<D: Detection>(
        &self,
        candidates: Vec<D>,
        width: u32,
        height: u32,
        surface: Option<&SurfaceMask>,
    ) -> Vec<D> {
        let before = candidates.len();
        let top_cut = height as f32 * self.top_margin_pct;
        let edge_cut = width.min(height) as f32 * self.edge_margin_pct;

        let kept: Vec<D> = candidates
            .into_iter()
            .filter(|candidate| {
                let (cx, cy) = candidate.bbox().centroid();
                if cy < top_cut {
                    return false;
                }
                if cx < edge_cut || cx > width as f32 - edge_cut || cy > height as f32 - edge_cut {
                    return false;
                }
                if self.filter_by_surface
                    && let Some(mask) = surface
                    && mask.overlap_fraction(candidate.bbox()) < self.min_surface_overlap_pct
                {
                    return false;
                }
                true
            })
            .collect();
        debug!(before, after = kept.len(), "location filter applied");
        kept
    }
}

/// Drops detections whose box covers more than `max_fraction` of the image.
///
/// A single detection is never dropped, and the guard backs off entirely
/// rather than return an empty list: an oversized box with no smaller
/// corroboration is still better than silence.
pub fn filter_oversized<D: Detection>(
    detections: Vec<D>,
    width: u32,
    height: u32,
    max_fraction: f32,
) -> Vec<D> {
    if detections.len() <= 1 {
        return detections;
    }
    let image_area = width as i64 * height as i64;
    if image_area == 0 {
        return detections;
    }
    let within: Vec<bool> = detections
        .iter()
        .map(|d| (d.bbox().area() as f32 / image_area as f32) <= max_fraction)
        .collect();
    if !within.iter().any(|&ok| ok) {
        return detections;
    }
    let mut keep = within.iter().copied();
    detections.into_iter().filter(|_| keep.next().unwrap_or(true)).collect()
}
