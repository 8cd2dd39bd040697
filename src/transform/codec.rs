use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops, imageops::FilterType};
use resvg::{tiny_skia, usvg};
use tracing::debug;

use super::error::TransformError;
use super::formats;
use super::strategy;
use super::types::{FitMode, OriginalImageMetadata, Rect, SourceFormat};

const SVG_SNIFF_LEN: usize = 1024;

/// A decoded original together with what was learned while decoding it.
pub struct DecodedImage {
    pub image: DynamicImage,
    pub metadata: OriginalImageMetadata,
    pub icc_profile: Option<Vec<u8>>,
}

impl DecodedImage {
    /// Consume the decoded image and return its pixels rotated upright.
    pub fn into_oriented(self) -> DynamicImage {
        auto_orient(self.image, self.metadata.orientation)
    }
}

/// Where the crop-to-cover window is placed when the scaled image overflows
/// the target box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Fractional position of the window, 0 is left/top and 1 right/bottom
    Position { x: f64, y: f64 },
    Attention,
    Entropy,
}

impl Anchor {
    pub fn centre() -> Self {
        Anchor::Position { x: 0.5, y: 0.5 }
    }
}

pub fn detect_format(bytes: &[u8]) -> SourceFormat {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => SourceFormat::Jpeg,
        Ok(ImageFormat::Png) => SourceFormat::Png,
        Ok(ImageFormat::Gif) => SourceFormat::Gif,
        Ok(ImageFormat::WebP) => SourceFormat::WebP,
        _ if looks_like_svg(bytes) => SourceFormat::Svg,
        _ => SourceFormat::Other,
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SVG_SNIFF_LEN)];
    String::from_utf8_lossy(head).contains("<svg")
}

/// Decode the first frame of a raster image, or rasterise an SVG at its
/// intrinsic size.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, TransformError> {
    let format = detect_format(bytes);

    let image = match format {
        SourceFormat::Svg => rasterize_svg(bytes)?,
        SourceFormat::Jpeg => image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?,
        SourceFormat::Png => image::load_from_memory_with_format(bytes, ImageFormat::Png)?,
        SourceFormat::Gif => image::load_from_memory_with_format(bytes, ImageFormat::Gif)?,
        SourceFormat::WebP => image::load_from_memory_with_format(bytes, ImageFormat::WebP)?,
        SourceFormat::Other => return Err(TransformError::UnsupportedFormat),
    };

    let orientation = match format {
        SourceFormat::Jpeg => read_orientation(bytes),
        _ => 1,
    };
    let icc_profile = formats::extract_icc_profile(bytes, format);

    let metadata = OriginalImageMetadata {
        width: image.width(),
        height: image.height(),
        format,
        orientation,
        size: bytes.len(),
        has_icc_profile: icc_profile.is_some(),
    };

    debug!(
        "Decoded {} image {}x{} (orientation {})",
        format.as_str(),
        metadata.width,
        metadata.height,
        orientation
    );

    Ok(DecodedImage {
        image,
        metadata,
        icc_profile,
    })
}

fn rasterize_svg(bytes: &[u8]) -> Result<DynamicImage, TransformError> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| TransformError::SvgError(format!("Failed to parse SVG: {}", e)))?;

    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| TransformError::SvgError("Failed to create pixmap".to_string()))?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha
    let raw: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();

    RgbaImage::from_raw(size.width(), size.height(), raw)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| TransformError::SvgError("Pixel buffer size mismatch".to_string()))
}

/// EXIF orientation tag of a JPEG, 1 when absent or unreadable.
pub fn read_orientation(bytes: &[u8]) -> u8 {
    let Ok(exif) = rexif::parse_buffer(bytes) else {
        return 1;
    };

    exif.entries
        .iter()
        .find(|entry| entry.tag == rexif::ExifTag::Orientation)
        .and_then(|entry| match &entry.value {
            rexif::TagValue::U16(values) => values.first().copied(),
            _ => None,
        })
        .filter(|value| (1..=8).contains(value))
        .map(|value| value as u8)
        .unwrap_or(1)
}

pub fn auto_orient(image: DynamicImage, orientation: u8) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

pub fn extract(image: &DynamicImage, region: Rect) -> Result<DynamicImage, TransformError> {
    if !region.fits_within(image.width(), image.height()) {
        return Err(TransformError::InvalidRegion {
            region,
            width: image.width(),
            height: image.height(),
        });
    }

    Ok(image.crop_imm(region.left, region.top, region.width, region.height))
}

fn scaled(value: u32, scale: f64) -> u32 {
    (value as f64 * scale).round().max(1.0) as u32
}

/// Size of the largest buffer `resize` allocates for a `src_w`x`src_h`
/// source: the derived axis for single-axis targets, the cover image before
/// its overflow is cropped for `Fill`.
pub fn working_size(
    src_w: u32,
    src_h: u32,
    width: Option<u32>,
    height: Option<u32>,
    fit: FitMode,
) -> (u32, u32) {
    let (src_w, src_h) = (src_w.max(1), src_h.max(1));

    match (width, height) {
        (Some(width), Some(height)) => {
            let scale_x = width as f64 / src_w as f64;
            let scale_y = height as f64 / src_h as f64;
            match fit {
                FitMode::Inside => {
                    let scale = scale_x.min(scale_y);
                    (scaled(src_w, scale), scaled(src_h, scale))
                }
                FitMode::Contain => (width, height),
                FitMode::Fill => {
                    let scale = scale_x.max(scale_y);
                    (
                        scaled(src_w, scale).max(width),
                        scaled(src_h, scale).max(height),
                    )
                }
            }
        }
        (Some(width), None) => (width, scaled(src_h, width as f64 / src_w as f64)),
        (None, Some(height)) => (scaled(src_w, height as f64 / src_h as f64), height),
        (None, None) => (src_w, src_h),
    }
}

/// Scale `image` towards the target box. A missing axis follows the aspect
/// ratio of the other one.
pub fn resize(
    image: &DynamicImage,
    width: Option<u32>,
    height: Option<u32>,
    fit: FitMode,
    anchor: Anchor,
    background: Rgba<u8>,
) -> DynamicImage {
    let (src_w, src_h) = (image.width(), image.height());

    let (width, height) = match (width, height) {
        (Some(width), Some(height)) => (width, height),
        (Some(width), None) => {
            let scale = width as f64 / src_w as f64;
            return image.resize_exact(width, scaled(src_h, scale), FilterType::Lanczos3);
        }
        (None, Some(height)) => {
            let scale = height as f64 / src_h as f64;
            return image.resize_exact(scaled(src_w, scale), height, FilterType::Lanczos3);
        }
        (None, None) => return image.clone(),
    };

    let scale_x = width as f64 / src_w as f64;
    let scale_y = height as f64 / src_h as f64;

    match fit {
        FitMode::Inside => {
            let scale = scale_x.min(scale_y);
            image.resize_exact(
                scaled(src_w, scale),
                scaled(src_h, scale),
                FilterType::Lanczos3,
            )
        }
        FitMode::Contain => {
            let scale = scale_x.min(scale_y);
            let inner = image.resize_exact(
                scaled(src_w, scale).min(width),
                scaled(src_h, scale).min(height),
                FilterType::Lanczos3,
            );

            let mut canvas = RgbaImage::from_pixel(width, height, background);
            let left = (width - inner.width()) / 2;
            let top = (height - inner.height()) / 2;
            imageops::overlay(&mut canvas, &inner.to_rgba8(), left as i64, top as i64);
            DynamicImage::ImageRgba8(canvas)
        }
        FitMode::Fill => {
            let scale = scale_x.max(scale_y);
            let cover = image.resize_exact(
                scaled(src_w, scale).max(width),
                scaled(src_h, scale).max(height),
                FilterType::Lanczos3,
            );

            let (left, top) = match anchor {
                Anchor::Position { x, y } => (
                    ((cover.width() - width) as f64 * x).round() as u32,
                    ((cover.height() - height) as f64 * y).round() as u32,
                ),
                Anchor::Attention => strategy::attention_offset(&cover, width, height),
                Anchor::Entropy => strategy::entropy_offset(&cover, width, height),
            };

            cover.crop_imm(left, top, width, height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_working_size_matches_resize() {
        let image = gradient(20, 60);
        for fit in [FitMode::Fill, FitMode::Inside, FitMode::Contain] {
            let resized = resize(
                &image,
                Some(30),
                Some(30),
                fit,
                Anchor::centre(),
                Rgba([0, 0, 0, 255]),
            );
            let (work_w, work_h) = working_size(20, 60, Some(30), Some(30), fit);
            assert!(work_w >= resized.width() && work_h >= resized.height());
        }

        assert_eq!(working_size(20, 60, Some(30), Some(30), FitMode::Fill), (30, 90));
        assert_eq!(working_size(20, 60, Some(40), None, FitMode::Fill), (40, 120));
        assert_eq!(working_size(20, 60, None, Some(30), FitMode::Fill), (10, 30));
        assert_eq!(working_size(20, 60, None, None, FitMode::Fill), (20, 60));
    }

    #[test]
    fn test_single_axis_keeps_aspect_ratio() {
        let image = gradient(1000, 800);
        let out = resize(&image, Some(100), None, FitMode::Inside, Anchor::centre(), Rgba([0; 4]));
        assert_eq!((out.width(), out.height()), (100, 80));

        let out = resize(&image, None, Some(40), FitMode::Fill, Anchor::centre(), Rgba([0; 4]));
        assert_eq!((out.width(), out.height()), (50, 40));
    }

    #[test]
    fn test_fit_modes() {
        let image = gradient(1000, 800);
        let black = Rgba([0, 0, 0, 255]);

        let inside = resize(&image, Some(100), Some(100), FitMode::Inside, Anchor::centre(), black);
        assert_eq!((inside.width(), inside.height()), (100, 80));

        let fill = resize(&image, Some(100), Some(100), FitMode::Fill, Anchor::centre(), black);
        assert_eq!((fill.width(), fill.height()), (100, 100));

        let contain = resize(&image, Some(300), Some(300), FitMode::Contain, Anchor::centre(), black);
        assert_eq!((contain.width(), contain.height()), (300, 300));
        let rgba = contain.to_rgba8();
        assert_eq!(rgba.get_pixel(150, 2), &black);
        assert_ne!(rgba.get_pixel(150, 150), &black);
    }

    #[test]
    fn test_fill_anchor_positions() {
        let image = gradient(200, 100);
        let left = resize(
            &image,
            Some(50),
            Some(50),
            FitMode::Fill,
            Anchor::Position { x: 0.0, y: 0.5 },
            Rgba([0; 4]),
        );
        let right = resize(
            &image,
            Some(50),
            Some(50),
            FitMode::Fill,
            Anchor::Position { x: 1.0, y: 0.5 },
            Rgba([0; 4]),
        );
        let left_red = left.to_rgb8().get_pixel(25, 25)[0];
        let right_red = right.to_rgb8().get_pixel(25, 25)[0];
        assert!(left_red < right_red);
    }

    #[test]
    fn test_extract_rejects_out_of_bounds() {
        let image = gradient(100, 100);
        assert!(extract(&image, Rect::new(10, 10, 50, 50)).is_ok());
        assert!(matches!(
            extract(&image, Rect::new(60, 0, 50, 50)),
            Err(TransformError::InvalidRegion { .. })
        ));
        assert!(extract(&image, Rect::new(0, 0, 0, 10)).is_err());
    }

    #[test]
    fn test_auto_orient_swaps_dimensions() {
        let image = gradient(30, 20);
        assert_eq!(auto_orient(image.clone(), 1).width(), 30);
        assert_eq!(auto_orient(image.clone(), 3).width(), 30);
        for orientation in 5..=8 {
            let oriented = auto_orient(image.clone(), orientation);
            assert_eq!((oriented.width(), oriented.height()), (20, 30));
        }
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"\xFF\xD8\xFF\xE0rest"), SourceFormat::Jpeg);
        assert_eq!(detect_format(b"GIF89a......"), SourceFormat::Gif);
        assert_eq!(
            detect_format(b"<?xml version=\"1.0\"?><svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            SourceFormat::Svg
        );
        assert_eq!(detect_format(b"%PDF-1.4"), SourceFormat::Other);
    }

    #[test]
    fn test_decode_svg_at_intrinsic_size() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><rect width="40" height="20" fill="#ff0000"/></svg>"##;
        let decoded = decode(svg).unwrap();
        assert_eq!(decoded.metadata.format, SourceFormat::Svg);
        assert_eq!((decoded.image.width(), decoded.image.height()), (40, 20));
        assert_eq!(decoded.image.to_rgba8().get_pixel(5, 5), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_decode_rejects_unknown_bytes() {
        assert!(matches!(
            decode(b"not an image"),
            Err(TransformError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_missing_exif_orientation_is_upright() {
        assert_eq!(read_orientation(b"\xFF\xD8\xFF\xD9"), 1);
    }
}
