//! Damage overlay rendering.
//!
//! The overlay is a transparent RGBA layer at source-image resolution:
//! semi-opaque fills whose alpha tracks confidence, hollow outlines, a
//! short label per detection, and an optional per-type legend. It is
//! designed to be composited over the original photo by the caller, or by
//! [`composite_overlay`] for convenience.

use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, info};

use crate::core::config::OverlayConfig;
use crate::domain::{DamageType, DetectionCandidate};

const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LEGEND_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 160]);
const BASE_FILL_ALPHA: f32 = 128.0;

/// Rendering configuration plus an optional label font.
///
/// When no font is available the overlay still renders boxes and fills;
/// text is simply skipped.
pub struct OverlayStyle {
    /// The font used for labels and the legend. If `None`, text is skipped.
    pub font: Option<FontVec>,
    /// Label text scale in pixels.
    pub font_scale: f32,
    /// Outline thickness in pixels.
    pub outline_thickness: i32,
    /// Whether to render a per-type legend in the top-left corner.
    pub legend: bool,
}

impl OverlayStyle {
    /// Builds a style from the overlay configuration, attempting to load a
    /// system font from common locations.
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            font: load_system_font(),
            font_scale: config.font_scale,
            outline_thickness: config.outline_thickness.max(1),
            legend: config.legend,
        }
    }
}

fn load_system_font() -> Option<FontVec> {
    let font_paths = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/System/Library/Fonts/Helvetica.ttc",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];
    for path in &font_paths {
        if let Ok(font_data) = std::fs::read(path)
            && let Ok(font) = FontVec::try_from_vec(font_data)
        {
            info!("Loaded system font: {}", path);
            return Some(font);
        }
    }
    debug!("No system font found, overlay text will be skipped");
    None
}

/// The fill/outline color assigned to a damage type.
pub fn damage_color(damage_type: &DamageType) -> Rgba<u8> {
    let rgb = match damage_type {
        DamageType::MissingMaterial => [220, 40, 40],
        DamageType::Crack => [240, 140, 20],
        DamageType::Impact => [235, 220, 40],
        DamageType::Stain => [50, 90, 230],
        DamageType::Discoloration => [40, 200, 210],
        DamageType::ExposedUnderlayment => [180, 110, 40],
        DamageType::DarkPatch => [120, 40, 170],
        DamageType::Unknown | DamageType::Other(_) => [150, 150, 150],
    };
    Rgba([rgb[0], rgb[1], rgb[2], 255])
}

/// Renders the transparent overlay layer for a detection list.
pub fn render_overlay(
    width: u32,
    height: u32,
    detections: &[DetectionCandidate],
    style: &OverlayStyle,
) -> RgbaImage {
    let mut layer = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));

    for detection in detections {
        let bbox = detection.bbox.clamp(width, height);
        let rect_w = bbox.width().max(1) as u32;
        let rect_h = bbox.height().max(1) as u32;
        let rect = Rect::at(bbox.x1, bbox.y1).of_size(rect_w, rect_h);

        let color = damage_color(&detection.damage_type);
        let alpha = (BASE_FILL_ALPHA * detection.confidence).round().clamp(0.0, 255.0) as u8;
        draw_filled_rect_mut(&mut layer, rect, Rgba([color.0[0], color.0[1], color.0[2], alpha]));
        for i in 0..style.outline_thickness {
            let inset_w = rect_w.saturating_sub(2 * i as u32);
            let inset_h = rect_h.saturating_sub(2 * i as u32);
            if inset_w == 0 || inset_h == 0 {
                break;
            }
            let inset = Rect::at(bbox.x1 + i, bbox.y1 + i).of_size(inset_w, inset_h);
            draw_hollow_rect_mut(&mut layer, inset, color);
        }

        if let Some(ref font) = style.font {
            let label = format!(
                "{} {:.2}",
                detection.damage_type.as_str(),
                detection.confidence
            );
            let scale = PxScale::from(style.font_scale);
            let text_y = (bbox.y1 - style.font_scale as i32 - 2).max(0);
            draw_text_mut(&mut layer, TEXT_COLOR, bbox.x1, text_y, scale, font, &label);
        }
    }

    if style.legend && !detections.is_empty() {
        draw_legend(&mut layer, detections, style);
    }

    debug!(count = detections.len(), "rendered damage overlay");
    layer
}

fn draw_legend(layer: &mut RgbaImage, detections: &[DetectionCandidate], style: &OverlayStyle) {
    use itertools::Itertools;

    let entries: Vec<(DamageType, usize)> = detections
        .iter()
        .map(|d| d.damage_type.clone())
        .counts()
        .into_iter()
        .sorted_by(|a, b| a.0.as_str().cmp(b.0.as_str()))
        .collect();

    let row_height = (style.font_scale as i32 + 6).max(14);
    let swatch = row_height - 6;
    let legend_w = 180.min(layer.width() as i32 - 8);
    let legend_h = row_height * entries.len() as i32 + 8;
    if legend_w <= 0 || legend_h as u32 + 8 > layer.height() {
        return;
    }
    draw_filled_rect_mut(
        layer,
        Rect::at(4, 4).of_size(legend_w as u32, legend_h as u32),
        LEGEND_BACKGROUND,
    );

    for (i, (damage_type, count)) in entries.iter().enumerate() {
        let y = 8 + i as i32 * row_height;
        draw_filled_rect_mut(
            layer,
            Rect::at(8, y).of_size(swatch as u32, swatch as u32),
            damage_color(damage_type),
        );
        if let Some(ref font) = style.font {
            let text = format!("{} ({})", damage_type.as_str(), count);
            let scale = PxScale::from(style.font_scale);
            draw_text_mut(layer, TEXT_COLOR, 12 + swatch, y, scale, font, &text);
        }
    }
}

/// Alpha-composites the overlay layer onto a copy of the source image.
pub fn composite_overlay(source: &image::RgbImage, overlay: &RgbaImage) -> RgbaImage {
    let mut out = RgbaImage::from_fn(source.width(), source.height(), |x, y| {
        let p = source.get_pixel(x, y).0;
        Rgba([p[0], p[1], p[2], 255])
    });
    image::imageops::overlay(&mut out, overlay, 0, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Source;
    use crate::processors::BBox;

    fn style(legend: bool) -> OverlayStyle {
        OverlayStyle {
            font: None,
            font_scale: 14.0,
            outline_thickness: 2,
            legend,
        }
    }

    fn candidate(bbox: BBox, confidence: f32, damage_type: DamageType) -> DetectionCandidate {
        DetectionCandidate::new(bbox, confidence, damage_type, Source::ModelInference)
    }

    #[test]
    fn overlay_is_transparent_outside_detections() {
        let detections = [candidate(BBox::new(10, 10, 30, 30), 0.8, DamageType::Crack)];
        let layer = render_overlay(100, 100, &detections, &style(false));
        assert_eq!(layer.get_pixel(60, 60).0[3], 0);
        // Inside the box the fill alpha tracks confidence.
        let inside = layer.get_pixel(20, 20).0;
        assert_eq!(inside[3], (128.0f32 * 0.8).round() as u8);
    }

    #[test]
    fn fill_color_follows_the_damage_type() {
        let detections = [candidate(
            BBox::new(10, 10, 30, 30),
            1.0,
            DamageType::MissingMaterial,
        )];
        let layer = render_overlay(100, 100, &detections, &style(false));
        let inside = layer.get_pixel(20, 20).0;
        let expected = damage_color(&DamageType::MissingMaterial).0;
        assert_eq!(&inside[..3], &expected[..3]);
    }

    #[test]
    fn out_of_bounds_boxes_are_clamped_not_panicking() {
        let detections = [candidate(BBox::new(-20, -20, 300, 300), 0.5, DamageType::Stain)];
        let layer = render_overlay(50, 50, &detections, &style(true));
        assert_eq!(layer.dimensions(), (50, 50));
    }

    #[test]
    fn compositing_keeps_source_pixels_where_transparent() {
        let source = image::RgbImage::from_pixel(40, 40, image::Rgb([9, 8, 7]));
        let detections = [candidate(BBox::new(0, 0, 10, 10), 1.0, DamageType::Crack)];
        let layer = render_overlay(40, 40, &detections, &style(false));
        let out = composite_overlay(&source, &layer);
        assert_eq!(&out.get_pixel(30, 30).0[..3], &[9, 8, 7]);
        assert_ne!(&out.get_pixel(5, 5).0[..3], &[9, 8, 7]);
    }
}
