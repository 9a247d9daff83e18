//! The end-to-end damage analysis pipeline.
//!
//! [`DamageAnalyzer`] wires every stage together: decode and downscale the
//! photo, estimate the roof surface, run the model decode path and the
//! classical detectors, fuse the candidate lists, veto implausible
//! detections, enrich labels through the external annotator, and derive
//! the grid cells, counts, and overlay the caller consumes. The analyzer
//! holds only configuration and collaborator handles; every analysis call
//! is independent and safe to run concurrently.

mod filtering;
mod fusion;
mod reconcile;

pub use filtering::{LocationFilter, filter_oversized};
pub use fusion::merge_candidates;
pub use reconcile::reconcile_passes;

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::core::config::PipelineConfig;
use crate::core::errors::FusionResult;
use crate::core::traits::{Annotator, InferenceBackend};
use crate::detectors::{
    detect_dark_patches, detect_discoloration, detect_exposed_underlayment,
    detect_missing_material,
};
use crate::domain::{
    AnalysisOutput, DamageCounts, DamageReport, DamageSummary, DetectionCandidate, Severity,
};
use crate::processors::{CandidateDecoder, Letterbox, anchor_major, estimate_surface_mask};
use crate::utils::image::{decode_image, encode_png, resize_for_analysis};
use crate::utils::visualization::{OverlayStyle, render_overlay};

const ANNOTATOR_TASK: &str = "roof damage: classify each region by damage type and severity";

/// The multi-source damage detection engine.
pub struct DamageAnalyzer {
    config: PipelineConfig,
    decoder: CandidateDecoder,
    location_filter: LocationFilter,
    overlay_style: OverlayStyle,
    backend: Option<Arc<dyn InferenceBackend>>,
    annotator: Option<Arc<dyn Annotator>>,
}

impl DamageAnalyzer {
    /// Creates an analyzer from a validated configuration.
    ///
    /// Returns a configuration error eagerly rather than on first use.
    pub fn new(config: PipelineConfig) -> FusionResult<Self> {
        config.validate()?;
        let decoder = CandidateDecoder::new(&config.decoder);
        let location_filter = LocationFilter::new(&config.filter);
        let overlay_style = OverlayStyle::from_config(&config.overlay);
        Ok(Self {
            config,
            decoder,
            location_filter,
            overlay_style,
            backend: None,
            annotator: None,
        })
    }

    /// Attaches a detection-model runtime.
    pub fn with_backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attaches an external annotator.
    pub fn with_annotator(mut self, annotator: Arc<dyn Annotator>) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Runs the full analysis over one encoded image.
    ///
    /// Oversized photos are analyzed on a downscaled working copy, but
    /// every output — boxes, grid cells, the overlay — is expressed in the
    /// source image's coordinate frame.
    #[instrument(skip_all, fields(bytes = image_bytes.len()))]
    pub fn analyze(&self, image_bytes: &[u8]) -> FusionResult<AnalysisOutput> {
        let source = decode_image(image_bytes)?;
        let (src_w, src_h) = source.dimensions();
        let image = resize_for_analysis(source);
        let (width, height) = image.dimensions();
        let gray = image::imageops::grayscale(&image);

        let surface = estimate_surface_mask(&image);
        debug!(coverage = surface.coverage(), "surface mask estimated");

        let model_candidates = match &self.backend {
            Some(backend) => {
                let letterbox = Letterbox::fit(width, height, backend.input_size());
                let (_, tensor) = letterbox.apply(&image);
                let raw = backend.run(tensor)?;
                let anchors = anchor_major(&raw);
                self.decoder.decode(anchors.view(), &letterbox, width, height)
            }
            None => Vec::new(),
        };

        let heuristics = &self.config.heuristics;
        let ((missing, discoloration), (underlayment, dark)) = rayon::join(
            || {
                rayon::join(
                    || detect_missing_material(&image, &gray, heuristics.min_area_missing),
                    || detect_discoloration(&image, &gray, heuristics.min_area_discoloration),
                )
            },
            || {
                rayon::join(
                    || detect_exposed_underlayment(&image, heuristics.min_area_underlayment),
                    || detect_dark_patches(&image, &gray, heuristics.min_area_dark_patch),
                )
            },
        );

        let fusion = &self.config.fusion;
        let mut detections = merge_candidates(model_candidates, missing, fusion.missing_iou);
        detections = merge_candidates(detections, discoloration, fusion.discoloration_iou);
        detections = merge_candidates(detections, underlayment, fusion.underlayment_iou);
        detections = merge_candidates(detections, dark, fusion.dark_patch_iou);

        detections = self
            .location_filter
            .apply(detections, width, height, Some(&surface));

        // Everything after here works in source coordinates, so the
        // annotator sees boxes that match the full-resolution bytes.
        if (width, height) != (src_w, src_h) {
            let sx = src_w as f32 / width as f32;
            let sy = src_h as f32 / height as f32;
            for detection in &mut detections {
                detection.bbox = detection.bbox.scale(sx, sy).clamp(src_w, src_h);
            }
        }

        let annotator_provider = self.classify_unknowns(image_bytes, &mut detections);

        for detection in &mut detections {
            if detection.severity.is_none() {
                detection.severity = Some(match detection.discoloration_severity {
                    Some(score) => Severity::from_score(score),
                    None => Severity::Moderate,
                });
            }
        }

        detections = filter_oversized(
            detections,
            src_w,
            src_h,
            self.config.filter.max_region_fraction,
        );

        for detection in &mut detections {
            detection.grid_coords =
                Some(detection.bbox.grid_cell(src_w, src_h, self.config.grid_size));
        }

        let counts = DamageCounts::from_detections(&detections);
        let summary = DamageSummary::from_detections(&detections);
        let overlay = render_overlay(src_w, src_h, &detections, &self.overlay_style);
        let overlay_png = encode_png(&overlay)?;

        info!(
            detections = detections.len(),
            high_confidence = summary.high_confidence_areas,
            "analysis finished"
        );
        let report = DamageReport {
            image_width: src_w,
            image_height: src_h,
            detections: detections.clone(),
            counts: counts.clone(),
            summary,
            annotator_provider,
        };
        Ok(AnalysisOutput {
            detections,
            counts,
            overlay_png,
            report,
        })
    }

    /// Sends unknown-type detections to the annotator and applies any
    /// labels it returns. Annotator silence is not an error.
    fn classify_unknowns(
        &self,
        image_bytes: &[u8],
        detections: &mut [DetectionCandidate],
    ) -> Option<String> {
        let annotator = self.annotator.as_ref()?;
        let unknown_boxes: Vec<_> = detections
            .iter()
            .filter(|d| d.damage_type.is_unknown())
            .map(|d| d.bbox)
            .collect();
        if unknown_boxes.is_empty() {
            return None;
        }

        match annotator.classify_regions(image_bytes, &unknown_boxes, ANNOTATOR_TASK) {
            Some((labels, provider)) => {
                let mut applied = 0usize;
                for label in labels {
                    if let Some(detection) =
                        detections.iter_mut().find(|d| d.bbox == label.bbox)
                    {
                        detection.damage_type = label.damage_type;
                        detection.severity = Some(label.severity);
                        applied += 1;
                    }
                }
                debug!(applied, provider = %provider, "annotator labels applied");
                Some(provider)
            }
            None => {
                warn!("annotator returned no labels, keeping heuristic types");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::RegionLabel;
    use crate::domain::DamageType;
    use crate::processors::BBox;
    use image::{Rgb, RgbImage};
    use ndarray::{Array3, Array4};

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    fn roof_photo() -> RgbImage {
        // A full-frame field of even gray shingles: the surface mask covers
        // everything and no classical detector has anything to find.
        RgbImage::from_pixel(200, 200, Rgb([120, 120, 120]))
    }

    struct OneBoxBackend;

    impl InferenceBackend for OneBoxBackend {
        fn input_size(&self) -> u32 {
            64
        }

        fn run(&self, _input: Array4<f32>) -> FusionResult<Array3<f32>> {
            // Channel-major [1, 5, anchors]: the first anchor is a confident
            // centered box, the rest are zero rows the decoder skips.
            let mut raw = Array3::<f32>::zeros((1, 5, 8));
            raw[[0, 0, 0]] = 32.0;
            raw[[0, 1, 0]] = 36.0;
            raw[[0, 2, 0]] = 12.0;
            raw[[0, 3, 0]] = 12.0;
            raw[[0, 4, 0]] = 0.9;
            Ok(raw)
        }
    }

    struct FixedAnnotator;

    impl Annotator for FixedAnnotator {
        fn classify_regions(
            &self,
            _image_bytes: &[u8],
            regions: &[BBox],
            _task: &str,
        ) -> Option<(Vec<RegionLabel>, String)> {
            let labels = regions
                .iter()
                .map(|&bbox| RegionLabel {
                    bbox,
                    damage_type: DamageType::Impact,
                    severity: Severity::Severe,
                })
                .collect();
            Some((labels, "fixture".to_string()))
        }
    }

    struct SilentAnnotator;

    impl Annotator for SilentAnnotator {
        fn classify_regions(
            &self,
            _image_bytes: &[u8],
            _regions: &[BBox],
            _task: &str,
        ) -> Option<(Vec<RegionLabel>, String)> {
            None
        }
    }

    fn analyzer() -> DamageAnalyzer {
        DamageAnalyzer::new(PipelineConfig::default()).unwrap()
    }

    #[test]
    fn analyzing_a_clean_roof_yields_an_empty_report() {
        let out = analyzer().analyze(&png_bytes(&roof_photo())).unwrap();
        assert!(out.detections.is_empty());
        assert!(out.counts.is_empty());
        assert_eq!(out.report.summary.recommended_action, "none");
        assert!(!out.overlay_png.is_empty());
    }

    #[test]
    fn model_detections_survive_the_pipeline_with_grid_and_severity() {
        let analyzer = analyzer().with_backend(Arc::new(OneBoxBackend));
        let out = analyzer.analyze(&png_bytes(&roof_photo())).unwrap();
        assert_eq!(out.detections.len(), 1);
        let detection = &out.detections[0];
        // No class names configured, so the model class is unknown.
        assert_eq!(detection.damage_type, DamageType::Unknown);
        assert_eq!(detection.severity, Some(Severity::Moderate));
        assert!(detection.grid_coords.is_some());
        assert_eq!(out.counts.total(), 1);
    }

    #[test]
    fn annotator_labels_replace_unknown_types() {
        let analyzer = analyzer()
            .with_backend(Arc::new(OneBoxBackend))
            .with_annotator(Arc::new(FixedAnnotator));
        let out = analyzer.analyze(&png_bytes(&roof_photo())).unwrap();
        assert_eq!(out.detections[0].damage_type, DamageType::Impact);
        assert_eq!(out.detections[0].severity, Some(Severity::Severe));
        assert_eq!(out.report.annotator_provider.as_deref(), Some("fixture"));
    }

    #[test]
    fn annotator_silence_keeps_heuristic_types() {
        let analyzer = analyzer()
            .with_backend(Arc::new(OneBoxBackend))
            .with_annotator(Arc::new(SilentAnnotator));
        let out = analyzer.analyze(&png_bytes(&roof_photo())).unwrap();
        assert_eq!(out.detections[0].damage_type, DamageType::Unknown);
        assert!(out.report.annotator_provider.is_none());
    }

    #[test]
    fn oversized_sources_report_in_source_coordinates() {
        // 4096x1024 is analyzed on a 2048x512 working copy; the outputs
        // must still be in the source frame.
        let photo = RgbImage::from_pixel(4096, 1024, Rgb([120, 120, 120]));
        let analyzer = analyzer().with_backend(Arc::new(OneBoxBackend));
        let out = analyzer.analyze(&png_bytes(&photo)).unwrap();

        assert_eq!(out.detections.len(), 1);
        let bbox = out.detections[0].bbox;
        // A box reaching past the working-frame width proves the mapping.
        assert!(bbox.x2 > 2048);
        assert!(bbox.x2 <= 4096 && bbox.y2 <= 1024);
        assert_eq!(
            (out.report.image_width, out.report.image_height),
            (4096, 1024)
        );

        let overlay = image::load_from_memory(&out.overlay_png).unwrap().to_rgba8();
        assert_eq!(overlay.dimensions(), (4096, 1024));
    }

    #[test]
    fn invalid_configuration_is_rejected_eagerly() {
        let mut config = PipelineConfig::default();
        config.grid_size = 0;
        assert!(DamageAnalyzer::new(config).is_err());
    }
}
