use image::{DynamicImage, ExtendedColorType, ImageEncoder, codecs::jpeg::JpegEncoder};
use tracing::debug;

use crate::transform::TransformError;

const ICC_MARKER: &[u8] = b"ICC_PROFILE\0";

/// Extract the ICC profile from the APP2 segments of a JPEG. Profiles split
/// over several segments are joined in stream order.
pub fn extract_icc_profile(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }

    let mut profile = Vec::new();
    let mut pos = 2;

    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            break;
        }
        let marker = bytes[pos + 1];
        // Start of scan or end of image: no more metadata segments
        if marker == 0xDA || marker == 0xD9 {
            break;
        }

        let segment_length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        let segment_end = pos + 2 + segment_length;
        if segment_length < 2 || segment_end > bytes.len() {
            break;
        }

        let segment_data = &bytes[pos + 4..segment_end];
        // Identifier, then sequence number and chunk count
        if marker == 0xE2 && segment_data.len() > 14 && segment_data.starts_with(ICC_MARKER) {
            profile.extend_from_slice(&segment_data[14..]);
        }

        pos = segment_end;
    }

    if profile.is_empty() {
        None
    } else {
        debug!("Found ICC profile in JPEG: {} bytes", profile.len());
        Some(profile)
    }
}

/// Encode as baseline JPEG, embedding `icc_profile` when given.
pub fn encode(
    image: &DynamicImage,
    quality: u8,
    icc_profile: Option<&[u8]>,
) -> Result<Vec<u8>, TransformError> {
    // JPEG has no alpha channel
    let rgb_image = image.to_rgb8();
    let quality = quality.clamp(1, 100);
    let mut output = Vec::new();

    let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
    if let Some(profile_data) = icc_profile {
        match encoder.set_icc_profile(profile_data.to_vec()) {
            Ok(()) => debug!("JPEG ICC profile set: {} bytes", profile_data.len()),
            Err(e) => debug!(
                "Failed to set ICC profile on JPEG encoder ({}), writing without it",
                e
            ),
        }
    }

    encoder.write_image(
        &rgb_image,
        rgb_image.width(),
        rgb_image.height(),
        ExtendedColorType::Rgb8,
    )?;

    Ok(output)
}
