use std::sync::Arc;
use tracing::debug;

use super::codec;
use super::error::SmartCropError;
use super::saliency::EnergyMap;
use super::types::Rect;

/// Content-aware region finder consulted for `crop_strategy=smart`.
///
/// `locate` receives the original encoded bytes and the unzoomed target box
/// and returns a region with the target's aspect ratio, in the pixel space of
/// the upright (EXIF-oriented) original.
pub trait SmartCrop: Send + Sync {
    fn locate(&self, bytes: &[u8], width: u32, height: u32) -> Result<Rect, SmartCropError>;
    fn name(&self) -> &str;
}

pub type DynSmartCrop = Arc<dyn SmartCrop>;

const SCALE_STEP: f64 = 0.1;

/// Scores windows of the target aspect ratio against a detail and saturation
/// energy map and picks the most interesting one.
pub struct SaliencyCropper {
    min_scale: f64,
}

impl SaliencyCropper {
    /// `min_scale` bounds how far the window may shrink below the largest
    /// one that fits; 1.0 only considers the largest window.
    pub fn new(min_scale: f64) -> Self {
        let min_scale = if min_scale.is_finite() {
            min_scale.clamp(SCALE_STEP, 1.0)
        } else {
            1.0
        };
        Self { min_scale }
    }

    fn scales(&self) -> Vec<f64> {
        let mut scales = vec![1.0];
        let mut scale = 1.0 - SCALE_STEP;
        while scale >= self.min_scale - 1e-9 {
            scales.push(scale);
            scale -= SCALE_STEP;
        }
        scales
    }
}

impl Default for SaliencyCropper {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SmartCrop for SaliencyCropper {
    fn locate(&self, bytes: &[u8], width: u32, height: u32) -> Result<Rect, SmartCropError> {
        if width == 0 || height == 0 {
            return Err(SmartCropError::InvalidTarget(width, height));
        }

        let image = codec::decode(bytes)
            .map_err(|e| SmartCropError::Decode(e.to_string()))?
            .into_oriented();
        let (image_w, image_h) = (image.width(), image.height());
        if image_w == 0 || image_h == 0 {
            return Err(SmartCropError::Analyzer("Image has no pixels".to_string()));
        }

        // Largest window with the target aspect ratio
        let aspect = width as f64 / height as f64;
        let crop_w = ((image_h as f64 * aspect).round() as u32).clamp(1, image_w);
        let crop_h = ((crop_w as f64 / aspect).round() as u32).clamp(1, image_h);

        let map = EnergyMap::compute(&image);
        let mut best: Option<(Rect, f64)> = None;

        for scale in self.scales() {
            let window_w = ((crop_w as f64 * scale).round() as u32).max(1);
            let window_h = ((crop_h as f64 * scale).round() as u32).max(1);

            let map_w = map.to_map(window_w).min(map.width());
            let map_h = map.to_map(window_h).min(map.height());
            let (window, energy) = map.best_window(map_w, map_h);

            // Density, weighted so smaller windows must be clearly better
            let rank = energy / (map_w as f64 * map_h as f64) * scale;

            let candidate = Rect::new(
                map.to_source(window.left).min(image_w - window_w),
                map.to_source(window.top).min(image_h - window_h),
                window_w,
                window_h,
            );

            if best.is_none_or(|(_, best_rank)| rank > best_rank) {
                best = Some((candidate, rank));
            }
        }

        let (region, _) = best.ok_or_else(|| SmartCropError::Analyzer("No window".to_string()))?;
        debug!(
            "Smart crop for {}x{} on {}x{}: {}",
            width, height, image_w, image_h, region
        );
        Ok(region)
    }

    fn name(&self) -> &str {
        "saliency"
    }
}
