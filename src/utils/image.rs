//! Image ingestion helpers.

use image::RgbImage;
use tracing::debug;

use crate::core::constants::{DEFAULT_MAX_SIDE_LEN, MAX_IMAGE_BYTES};
use crate::core::errors::{FusionError, FusionResult};

/// Decodes an encoded image, enforcing the payload size cap first.
///
/// Oversized or undecodable payloads are fatal for the whole analysis;
/// there is nothing sensible to fuse without pixels.
pub fn decode_image(bytes: &[u8]) -> FusionResult<RgbImage> {
    if bytes.is_empty() {
        return Err(FusionError::invalid_input("empty image payload"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(FusionError::ImageTooLarge {
            size: bytes.len(),
            limit: MAX_IMAGE_BYTES,
        });
    }
    let decoded = image::load_from_memory(bytes).map_err(FusionError::ImageDecode)?;
    Ok(decoded.to_rgb8())
}

/// Downscales an image whose longer side exceeds `max_side`, preserving
/// aspect ratio. Images already within bounds are returned untouched.
pub fn resize_if_needed(image: RgbImage, max_side: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max_side {
        return image;
    }
    let scale = max_side as f32 / longest as f32;
    let new_w = ((width as f32 * scale).round() as u32).max(1);
    let new_h = ((height as f32 * scale).round() as u32).max(1);
    debug!(from = ?(width, height), to = ?(new_w, new_h), "downscaling oversized image");
    image::imageops::resize(&image, new_w, new_h, image::imageops::FilterType::Triangle)
}

/// Default downscale bound applied before analysis.
pub fn resize_for_analysis(image: RgbImage) -> RgbImage {
    resize_if_needed(image, DEFAULT_MAX_SIDE_LEN)
}

/// Encodes an RGBA image as PNG bytes.
pub fn encode_png(image: &image::RgbaImage) -> FusionResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| {
            FusionError::processing(
                crate::core::errors::ProcessingStage::Rendering,
                "failed to encode overlay PNG",
                e,
            )
        })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_valid_png_payloads() {
        let decoded = decode_image(&png_bytes(8, 6)).unwrap();
        assert_eq!(decoded.dimensions(), (8, 6));
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn rejects_empty_and_garbage_payloads() {
        assert!(matches!(
            decode_image(&[]),
            Err(FusionError::InvalidInput { .. })
        ));
        assert!(matches!(
            decode_image(&[0u8; 64]),
            Err(FusionError::ImageDecode(_))
        ));
    }

    #[test]
    fn rejects_payloads_over_the_size_cap() {
        let oversized = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            decode_image(&oversized),
            Err(FusionError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn resize_preserves_aspect_and_skips_small_images() {
        let small = RgbImage::new(100, 50);
        assert_eq!(resize_if_needed(small, 2048).dimensions(), (100, 50));

        let wide = RgbImage::new(4096, 1024);
        let resized = resize_if_needed(wide, 2048);
        assert_eq!(resized.dimensions(), (2048, 512));
    }
}
