use flate2::read::ZlibDecoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};
use std::io::Read;
use tracing::debug;

use crate::transform::TransformError;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Extract and inflate the ICC profile stored in a PNG `iCCP` chunk.
pub fn extract_icc_profile(bytes: &[u8]) -> Option<Vec<u8>> {
    if !bytes.starts_with(PNG_SIGNATURE) {
        return None;
    }

    let mut pos = PNG_SIGNATURE.len();

    while pos + 12 <= bytes.len() {
        let chunk_length = u32::from_be_bytes([
            bytes[pos],
            bytes[pos + 1],
            bytes[pos + 2],
            bytes[pos + 3],
        ]) as usize;
        let chunk_type = &bytes[pos + 4..pos + 8];
        let data_start = pos + 8;
        let data_end = data_start.checked_add(chunk_length)?;

        if chunk_type == b"iCCP" {
            let chunk_data = bytes.get(data_start..data_end)?;

            // Profile name, NUL, compression method (0 = deflate), profile
            let null_pos = chunk_data.iter().position(|&b| b == 0)?;
            if null_pos + 2 >= chunk_data.len() || chunk_data[null_pos + 1] != 0 {
                return None;
            }

            let mut decoder = ZlibDecoder::new(&chunk_data[null_pos + 2..]);
            let mut profile = Vec::new();
            decoder.read_to_end(&mut profile).ok()?;
            debug!("Found ICC profile in PNG: {} bytes", profile.len());
            return Some(profile);
        }

        // The profile must precede the image data
        if chunk_type == b"IDAT" || chunk_type == b"IEND" {
            break;
        }

        // length + type + data + CRC
        pos = data_end + 4;
    }

    None
}

/// Encode as PNG, keeping the alpha channel only when the image has one.
pub fn encode(image: &DynamicImage, icc_profile: Option<&[u8]>) -> Result<Vec<u8>, TransformError> {
    let mut output = Vec::new();
    let mut encoder = PngEncoder::new(&mut output);

    if let Some(profile_data) = icc_profile
        && let Err(e) = encoder.set_icc_profile(profile_data.to_vec())
    {
        debug!("Failed to set ICC profile on PNG encoder ({}), writing without it", e);
    }

    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        encoder.write_image(&rgba, rgba.width(), rgba.height(), ExtendedColorType::Rgba8)?;
    } else {
        let rgb = image.to_rgb8();
        encoder.write_image(&rgb, rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
    }

    Ok(output)
}
