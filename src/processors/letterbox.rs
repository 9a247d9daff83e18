//! Aspect-preserving resize onto a square model input.
//!
//! The model consumes a fixed square input; source photos rarely are.
//! [`Letterbox`] records the scale and padding used so decoded boxes can be
//! mapped back to source-image coordinates exactly.

use image::{Rgb, RgbImage, imageops};
use ndarray::Array4;

use super::geometry::BBox;
use crate::core::constants::LETTERBOX_FILL;

/// The geometry of a letterbox transform: uniform scale plus the padding
/// that centers the scaled image on the square canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Uniform scale factor applied to the source image.
    pub scale: f32,
    /// Horizontal padding added on the left edge.
    pub pad_x: f32,
    /// Vertical padding added on the top edge.
    pub pad_y: f32,
    /// Side length of the square canvas.
    pub input_edge: u32,
}

impl Letterbox {
    /// Computes the transform that fits a `src_w x src_h` image into a
    /// square of side `input_edge` without distorting its aspect ratio.
    pub fn fit(src_w: u32, src_h: u32, input_edge: u32) -> Self {
        let scale = (input_edge as f32 / src_w.max(1) as f32)
            .min(input_edge as f32 / src_h.max(1) as f32);
        let scaled_w = src_w as f32 * scale;
        let scaled_h = src_h as f32 * scale;
        Self {
            scale,
            pad_x: (input_edge as f32 - scaled_w) / 2.0,
            pad_y: (input_edge as f32 - scaled_h) / 2.0,
            input_edge,
        }
    }

    /// Resizes `image` onto the gray-filled square canvas and packs it into
    /// a `[1, 3, edge, edge]` float tensor normalized to `[0, 1]`.
    pub fn apply(&self, image: &RgbImage) -> (RgbImage, Array4<f32>) {
        let edge = self.input_edge;
        let scaled_w = ((image.width() as f32 * self.scale).round() as u32).max(1);
        let scaled_h = ((image.height() as f32 * self.scale).round() as u32).max(1);
        let scaled = imageops::resize(image, scaled_w, scaled_h, imageops::FilterType::Triangle);

        let mut canvas =
            RgbImage::from_pixel(edge, edge, Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]));
        let ox = self.pad_x.round() as i64;
        let oy = self.pad_y.round() as i64;
        imageops::overlay(&mut canvas, &scaled, ox, oy);

        let mut tensor = Array4::<f32>::zeros((1, 3, edge as usize, edge as usize));
        for (x, y, pixel) in canvas.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel.0[c] as f32 / 255.0;
            }
        }
        (canvas, tensor)
    }

    /// Maps a corner-form box from canvas coordinates back into the source
    /// image, clipping to the source bounds.
    pub fn unmap_box(
        &self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        src_w: u32,
        src_h: u32,
    ) -> BBox {
        let inv = 1.0 / self.scale.max(f32::EPSILON);
        let bx1 = (x1 - self.pad_x) * inv;
        let by1 = (y1 - self.pad_y) * inv;
        let bx2 = (x2 - self.pad_x) * inv;
        let by2 = (y2 - self.pad_y) * inv;
        BBox::new(
            bx1.round() as i32,
            by1.round() as i32,
            bx2.round() as i32,
            by2.round() as i32,
        )
        .clamp(src_w, src_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_computes_scale_and_symmetric_padding() {
        let lb = Letterbox::fit(200, 100, 64);
        assert!((lb.scale - 0.32).abs() < 1e-6);
        assert!((lb.pad_x - 0.0).abs() < 1e-6);
        assert!((lb.pad_y - 16.0).abs() < 1e-6);
    }

    #[test]
    fn apply_fills_padding_with_gray() {
        let image = RgbImage::from_pixel(200, 100, Rgb([10, 20, 30]));
        let lb = Letterbox::fit(200, 100, 64);
        let (canvas, tensor) = lb.apply(&image);
        assert_eq!(canvas.dimensions(), (64, 64));
        // A pixel inside the top pad band is fill-gray.
        assert_eq!(canvas.get_pixel(32, 2).0, [LETTERBOX_FILL; 3]);
        // A pixel in the image band carries the source color.
        assert_eq!(canvas.get_pixel(32, 32).0, [10, 20, 30]);
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert!((tensor[[0, 0, 32, 32]] - 10.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn unmap_inverts_the_forward_transform() {
        let lb = Letterbox::fit(200, 100, 64);
        // Canvas box spanning the full image band maps back to the source.
        let b = lb.unmap_box(0.0, 16.0, 64.0, 48.0, 200, 100);
        assert_eq!(b, BBox::new(0, 0, 200, 100));
    }

    #[test]
    fn unmap_clips_out_of_range_boxes() {
        let lb = Letterbox::fit(200, 100, 64);
        let b = lb.unmap_box(-10.0, 0.0, 80.0, 64.0, 200, 100);
        assert_eq!(b, BBox::new(0, 0, 200, 100));
    }
}
