//! Built-in region strategies used when a cover-scaled image overflows the
//! target box.

use image::{DynamicImage, GrayImage};

use super::saliency::EnergyMap;
use super::types::Rect;

/// Fraction of the remaining overflow trimmed per entropy step.
const ENTROPY_STEP_DIVISOR: u32 = 10;

/// Offset of the `width` x `height` window with the highest saliency.
pub fn attention_offset(image: &DynamicImage, width: u32, height: u32) -> (u32, u32) {
    let max_left = image.width().saturating_sub(width);
    let max_top = image.height().saturating_sub(height);
    if max_left == 0 && max_top == 0 {
        return (0, 0);
    }

    let map = EnergyMap::compute(image);
    let (window, _) = map.best_window(map.to_map(width), map.to_map(height));

    (
        map.to_source(window.left).min(max_left),
        map.to_source(window.top).min(max_top),
    )
}

/// Offset found by repeatedly trimming whichever opposite edge carries less
/// information, until the window matches the target box.
pub fn entropy_offset(image: &DynamicImage, width: u32, height: u32) -> (u32, u32) {
    let gray = image.to_luma8();
    let mut window = Rect::new(0, 0, gray.width(), gray.height());

    while window.width > width {
        let overflow = window.width - width;
        let step = (overflow / ENTROPY_STEP_DIVISOR).max(1).min(overflow);
        let left = Rect::new(window.left, window.top, step, window.height);
        let right = Rect::new(
            window.left + window.width - step,
            window.top,
            step,
            window.height,
        );

        if entropy(&gray, left) < entropy(&gray, right) {
            window.left += step;
        }
        window.width -= step;
    }

    while window.height > height {
        let overflow = window.height - height;
        let step = (overflow / ENTROPY_STEP_DIVISOR).max(1).min(overflow);
        let top = Rect::new(window.left, window.top, window.width, step);
        let bottom = Rect::new(
            window.left,
            window.top + window.height - step,
            window.width,
            step,
        );

        if entropy(&gray, top) < entropy(&gray, bottom) {
            window.top += step;
        }
        window.height -= step;
    }

    (window.left, window.top)
}

/// Shannon entropy of the luma histogram inside `region`.
fn entropy(image: &GrayImage, region: Rect) -> f64 {
    let mut histogram = [0u32; 256];
    let mut total = 0u32;

    for y in region.top..region.top + region.height {
        for x in region.left..region.left + region.width {
            histogram[image.get_pixel(x, y)[0] as usize] += 1;
            total += 1;
        }
    }

    if total == 0 {
        return 0.0;
    }

    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, RgbImage};

    /// Flat left half, noisy right half.
    fn half_textured(width: u32, height: u32) -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            if x < width / 2 {
                Rgb([60, 60, 60])
            } else {
                let v = ((x * 37 + y * 91) % 251) as u8;
                Rgb([v, 255 - v, v / 2])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_entropy_keeps_textured_side() {
        let image = half_textured(200, 100);
        let (left, top) = entropy_offset(&image, 100, 100);
        assert_eq!(top, 0);
        assert_eq!(left, 100);
    }

    #[test]
    fn test_attention_keeps_textured_side() {
        let image = half_textured(200, 100);
        let (left, top) = attention_offset(&image, 100, 100);
        assert_eq!(top, 0);
        assert!(left >= 90, "left = {}", left);
    }

    #[test]
    fn test_no_overflow_means_no_offset() {
        let image = half_textured(100, 100);
        assert_eq!(attention_offset(&image, 100, 100), (0, 0));
        assert_eq!(entropy_offset(&image, 100, 100), (0, 0));
    }

    #[test]
    fn test_entropy_of_flat_region_is_zero() {
        let gray: GrayImage = ImageBuffer::from_pixel(10, 10, Luma([7]));
        assert_eq!(entropy(&gray, Rect::new(0, 0, 10, 10)), 0.0);
    }
}
