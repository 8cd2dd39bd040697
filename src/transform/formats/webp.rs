use image::DynamicImage;
use tracing::debug;

use crate::transform::TransformError;

/// Lossy WebP at the given quality (0-100).
pub fn encode(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let quality = quality.min(100) as f32;

    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(&rgba, rgba.width(), rgba.height()).encode_simple(false, quality)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(&rgb, rgb.width(), rgb.height()).encode_simple(false, quality)
    }
    .map_err(|e| TransformError::WebPError(format!("{:?}", e)))?;

    debug!("WebP encoded at quality {}: {} bytes", quality, encoded.len());
    Ok(encoded.to_vec())
}
