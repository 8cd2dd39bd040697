pub mod jpeg;
pub mod png;
pub mod webp;

use image::DynamicImage;

use super::TransformError;
use super::types::{OutputFormat, SourceFormat};

/// ICC profile embedded in the original, for the formats that carry one.
pub fn extract_icc_profile(bytes: &[u8], format: SourceFormat) -> Option<Vec<u8>> {
    match format {
        SourceFormat::Jpeg => jpeg::extract_icc_profile(bytes),
        SourceFormat::Png => png::extract_icc_profile(bytes),
        _ => None,
    }
}

pub fn encode(
    image: &DynamicImage,
    format: OutputFormat,
    quality: u8,
    icc_profile: Option<&[u8]>,
) -> Result<Vec<u8>, TransformError> {
    match format {
        OutputFormat::Jpeg => jpeg::encode(image, quality, icc_profile),
        OutputFormat::Png => png::encode(image, icc_profile),
        OutputFormat::WebP => webp::encode(image, quality),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

    fn sample_rgb() -> DynamicImage {
        let img: RgbImage =
            ImageBuffer::from_fn(32, 24, |x, y| Rgb([(x * 8) as u8, (y * 10) as u8, 100]));
        DynamicImage::ImageRgb8(img)
    }

    fn fake_profile() -> Vec<u8> {
        (0..300u32).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_encoded_output_matches_format() {
        let image = sample_rgb();
        for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP] {
            let bytes = encode(&image, format, 80, None).unwrap();
            assert_eq!(
                image::guess_format(&bytes).unwrap(),
                format.image_format(),
                "{}",
                format.as_str()
            );
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (32, 24));
        }
    }

    #[test]
    fn test_jpeg_quality_changes_size() {
        let image = sample_rgb();
        let low = encode(&image, OutputFormat::Jpeg, 10, None).unwrap();
        let high = encode(&image, OutputFormat::Jpeg, 95, None).unwrap();
        assert!(low.len() < high.len());
        // 0 is clamped rather than rejected
        assert!(encode(&image, OutputFormat::Jpeg, 0, None).is_ok());
    }

    #[test]
    fn test_png_keeps_alpha() {
        let img: RgbaImage = ImageBuffer::from_pixel(4, 4, Rgba([10, 20, 30, 40]));
        let bytes = encode(&DynamicImage::ImageRgba8(img), OutputFormat::Png, 0, None).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0), &Rgba([10, 20, 30, 40]));
    }

    #[test]
    fn test_icc_profile_round_trip_jpeg() {
        let profile = fake_profile();
        let bytes = encode(&sample_rgb(), OutputFormat::Jpeg, 80, Some(&profile)).unwrap();
        assert_eq!(
            extract_icc_profile(&bytes, SourceFormat::Jpeg).as_deref(),
            Some(profile.as_slice())
        );
    }

    #[test]
    fn test_icc_profile_round_trip_png() {
        let profile = fake_profile();
        let bytes = encode(&sample_rgb(), OutputFormat::Png, 0, Some(&profile)).unwrap();
        assert_eq!(
            extract_icc_profile(&bytes, SourceFormat::Png).as_deref(),
            Some(profile.as_slice())
        );
    }

    #[test]
    fn test_no_profile_in_plain_files() {
        let image = sample_rgb();
        let mut plain = Vec::new();
        image::codecs::png::PngEncoder::new(&mut plain)
            .write_image(image.as_bytes(), 32, 24, image::ExtendedColorType::Rgb8)
            .unwrap();
        assert_eq!(extract_icc_profile(&plain, SourceFormat::Png), None);
        assert_eq!(extract_icc_profile(b"", SourceFormat::Jpeg), None);
        assert_eq!(extract_icc_profile(b"\xFF\xD8", SourceFormat::Jpeg), None);
        assert_eq!(extract_icc_profile(&plain, SourceFormat::Gif), None);
    }
}
