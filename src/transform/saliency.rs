use image::{DynamicImage, GenericImageView, imageops::FilterType};
use imageproc::gradients::sobel_gradients;

use super::types::Rect;

/// Longest side of the downsampled copy that gets analysed.
pub const ANALYSIS_SIZE: u32 = 256;

const SATURATION_WEIGHT: f64 = 0.3;

/// Per-pixel "interestingness" of a downsampled image, stored as a summed
/// area table so any window can be scored in constant time.
pub struct EnergyMap {
    width: u32,
    height: u32,
    /// Map pixels per source pixel
    scale: f64,
    integral: Vec<f64>,
}

impl EnergyMap {
    pub fn compute(image: &DynamicImage) -> Self {
        let (src_w, src_h) = image.dimensions();
        let longest = src_w.max(src_h).max(1);

        let small = if longest > ANALYSIS_SIZE {
            image.resize(ANALYSIS_SIZE, ANALYSIS_SIZE, FilterType::Triangle)
        } else {
            image.clone()
        };
        let (width, height) = small.dimensions();
        let scale = width as f64 / src_w.max(1) as f64;

        let gray = small.to_luma8();
        let gradients = sobel_gradients(&gray);
        let rgb = small.to_rgb8();

        let stride = width as usize + 1;
        let mut integral = vec![0.0; stride * (height as usize + 1)];

        for y in 0..height {
            let mut row_sum = 0.0;
            for x in 0..width {
                let detail = gradients.get_pixel(x, y)[0] as f64 / 1020.0;
                let saturation = saturation(rgb.get_pixel(x, y).0);
                row_sum += detail + SATURATION_WEIGHT * saturation;

                let idx = (y as usize + 1) * stride + x as usize + 1;
                integral[idx] = integral[idx - stride] + row_sum;
            }
        }

        Self {
            width,
            height,
            scale,
            integral,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total energy inside `rect`, in map coordinates.
    pub fn sum(&self, rect: Rect) -> f64 {
        let stride = self.width as usize + 1;
        let x0 = rect.left.min(self.width) as usize;
        let y0 = rect.top.min(self.height) as usize;
        let x1 = (rect.right().min(self.width as u64)) as usize;
        let y1 = (rect.bottom().min(self.height as u64)) as usize;

        self.integral[y1 * stride + x1] - self.integral[y0 * stride + x1]
            - self.integral[y1 * stride + x0]
            + self.integral[y0 * stride + x0]
    }

    /// Slide a `width` x `height` window over the map and return the one
    /// holding the most energy. Ties go to the window nearest the centre.
    pub fn best_window(&self, width: u32, height: u32) -> (Rect, f64) {
        let width = width.clamp(1, self.width.max(1));
        let height = height.clamp(1, self.height.max(1));
        let max_left = self.width.saturating_sub(width);
        let max_top = self.height.saturating_sub(height);

        let centre = (max_left as f64 / 2.0, max_top as f64 / 2.0);
        let distance = |left: u32, top: u32| {
            (left as f64 - centre.0).powi(2) + (top as f64 - centre.1).powi(2)
        };

        let mut best = Rect::new(max_left / 2, max_top / 2, width, height);
        let mut best_score = self.sum(best);

        for top in 0..=max_top {
            for left in 0..=max_left {
                let window = Rect::new(left, top, width, height);
                let score = self.sum(window);
                let tie = (score - best_score).abs() <= f64::EPSILON * best_score.abs().max(1.0);
                if (score > best_score && !tie)
                    || (tie && distance(left, top) < distance(best.left, best.top))
                {
                    best = window;
                    best_score = score;
                }
            }
        }

        (best, best_score)
    }

    /// Convert a length in source pixels into map pixels.
    pub fn to_map(&self, value: u32) -> u32 {
        (value as f64 * self.scale).round().max(1.0) as u32
    }

    /// Convert a map coordinate back into source pixels.
    pub fn to_source(&self, value: u32) -> u32 {
        (value as f64 / self.scale).round() as u32
    }
}

fn saturation([r, g, b]: [u8; 3]) -> f64 {
    let max = r.max(g).max(b) as f64;
    let min = r.min(g).min(b) as f64;
    if max == 0.0 { 0.0 } else { (max - min) / max }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    /// Flat grey image with a saturated, noisy square at the given position.
    fn image_with_feature(width: u32, height: u32, feature: Rect) -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            let inside = x >= feature.left
                && (x as u64) < feature.right()
                && y >= feature.top
                && (y as u64) < feature.bottom();
            if inside {
                if (x / 4 + y / 4) % 2 == 0 {
                    Rgb([255, 0, 0])
                } else {
                    Rgb([0, 0, 255])
                }
            } else {
                Rgb([128, 128, 128])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_flat_image_has_no_energy() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(64, 64, Rgb([90, 90, 90])));
        let map = EnergyMap::compute(&image);
        assert_eq!(map.sum(Rect::new(0, 0, 64, 64)), 0.0);
    }

    #[test]
    fn test_best_window_finds_feature() {
        let image = image_with_feature(200, 100, Rect::new(150, 30, 40, 40));
        let map = EnergyMap::compute(&image);
        let (window, score) = map.best_window(60, 60);
        assert!(score > 0.0);
        assert!(window.left >= 120, "{}", window);
    }

    #[test]
    fn test_flat_image_prefers_centre() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(100, 50, Rgb([10, 10, 10])));
        let map = EnergyMap::compute(&image);
        let (window, _) = map.best_window(50, 50);
        assert_eq!(window.left, 25);
    }

    #[test]
    fn test_large_images_are_downsampled() {
        let image = image_with_feature(1024, 512, Rect::new(0, 0, 10, 10));
        let map = EnergyMap::compute(&image);
        assert_eq!((map.width(), map.height()), (256, 128));
        assert_eq!(map.to_map(1024), 256);
        assert_eq!(map.to_source(128), 512);
    }
}
