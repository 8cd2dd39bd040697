use std::path::Path;
use tracing::debug;

const PROCESSABLE_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/svg+xml",
    "image/webp",
];

const GIF_TYPE: &str = "image/gif";

/// Pick the content type of a stored object: the declared value when present,
/// otherwise a lookup by the key's extension.
pub fn resolve_content_type(declared: Option<&str>, key: &str) -> Option<String> {
    if let Some(declared) = declared.map(normalize_content_type)
        && !declared.is_empty()
    {
        return Some(declared);
    }

    let extension = Path::new(key).extension()?.to_str()?;
    mime_guess::from_ext(extension)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Decides whether a fetched object may be decoded and re-encoded, or has to
/// be passed through untouched.
#[derive(Debug, Clone)]
pub struct EligibilityGate {
    allowed: Vec<&'static str>,
}

impl Default for EligibilityGate {
    fn default() -> Self {
        Self::new()
    }
}

impl EligibilityGate {
    pub fn new() -> Self {
        Self {
            allowed: PROCESSABLE_TYPES.to_vec(),
        }
    }

    pub fn can_process(&self, bytes: &[u8], content_type: Option<&str>) -> bool {
        let Some(content_type) = content_type.map(normalize_content_type) else {
            return false;
        };

        if !self.allowed.contains(&content_type.as_str()) {
            debug!("Content type {} is not processable", content_type);
            return false;
        }

        if content_type == GIF_TYPE && is_animated_gif(bytes) {
            debug!("Animated GIF detected, passing through");
            return false;
        }

        true
    }
}

/// Returns true when the GIF stream holds more than one image frame.
pub fn is_animated_gif(bytes: &[u8]) -> bool {
    match count_gif_frames(bytes) {
        Some(frames) => frames > 1,
        None => scan_for_frames(bytes) > 1,
    }
}

/// Walk the GIF block structure and count image descriptors. Returns `None`
/// when the stream is not a well-formed GIF up to the point it could be read.
fn count_gif_frames(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < 13 || !(bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
        return None;
    }

    let packed = bytes[10];
    let mut pos = 13;
    if packed & 0x80 != 0 {
        pos += 3 * (1usize << ((packed & 0x07) + 1));
    }

    let mut frames = 0;
    loop {
        match *bytes.get(pos)? {
            // Extension: introducer, label, then data sub-blocks
            0x21 => {
                pos = skip_sub_blocks(bytes, pos + 2)?;
            }
            // Image descriptor
            0x2C => {
                frames += 1;
                if frames > 1 {
                    return Some(frames);
                }
                let flags = *bytes.get(pos + 9)?;
                pos += 10;
                if flags & 0x80 != 0 {
                    pos += 3 * (1usize << ((flags & 0x07) + 1));
                }
                // LZW minimum code size precedes the image data
                pos = skip_sub_blocks(bytes, pos + 1)?;
            }
            0x3B => return Some(frames),
            _ => return None,
        }
    }
}

fn skip_sub_blocks(bytes: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let size = *bytes.get(pos)? as usize;
        pos += 1;
        if size == 0 {
            return Some(pos);
        }
        pos += size;
    }
}

/// Fallback for truncated streams: count graphic control extensions that are
/// followed by an image descriptor.
fn scan_for_frames(bytes: &[u8]) -> usize {
    bytes
        .windows(9)
        .filter(|w| w[0] == 0x21 && w[1] == 0xF9 && w[2] == 0x04 && w[7] == 0x00 && w[8] == 0x2C)
        .count()
}
