use image::ImageFormat;
use std::fmt;

use crate::query::Gravity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    WebP,
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::WebP => "webp",
            OutputFormat::Png => "png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
            OutputFormat::Png => "png",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Png => ImageFormat::Png,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Png => "image/png",
        }
    }
}

/// Format of the stored original, as detected from its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Svg,
    Other,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Png => "png",
            SourceFormat::Gif => "gif",
            SourceFormat::WebP => "webp",
            SourceFormat::Svg => "svg",
            SourceFormat::Other => "other",
        }
    }
}

/// Facts about the original image, read once per request.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginalImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: SourceFormat,
    /// EXIF orientation, 1 (upright) to 8
    pub orientation: u8,
    pub size: usize,
    pub has_icc_profile: bool,
}

impl OriginalImageMetadata {
    /// Dimensions after EXIF auto-rotation.
    pub fn oriented_size(&self) -> (u32, u32) {
        if (5..=8).contains(&self.orientation) {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Pixel-space rectangle used for every extract operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.right() <= width as u64
            && self.bottom() <= height as u64
    }

    /// Express this rect relative to `frame`, keeping only the overlapping part.
    pub fn relative_to(&self, frame: &Rect) -> Option<Rect> {
        let left = self.left.max(frame.left);
        let top = self.top.max(frame.top);
        let right = self.right().min(frame.right());
        let bottom = self.bottom().min(frame.bottom());

        if right <= left as u64 || bottom <= top as u64 {
            return None;
        }

        Some(Rect::new(
            left - frame.left,
            top - frame.top,
            (right - left as u64) as u32,
            (bottom - top as u64) as u32,
        ))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.left, self.top
        )
    }
}

/// How the image is scaled into the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// Cover the box and crop the overflow
    Fill,
    /// Fit inside the box, may underfill one axis
    Inside,
    /// Fit inside the box and pad the remainder with the background
    Contain,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Fill => "fill",
            FitMode::Inside => "inside",
            FitMode::Contain => "contain",
        }
    }
}

/// Region-finding algorithms provided by the codec itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStrategy {
    Attention,
    Entropy,
}

/// Where the crop-to-cover window of a `Fill` step comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSource {
    Default,
    Gravity(Gravity),
    Strategy(BuiltinStrategy),
    /// Delegated to the smart crop analyzer with the unzoomed box
    Smart { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleStep {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
    pub anchor: RegionSource,
    pub background: Option<String>,
}

/// Declarative list of operations for one request, independent of any codec.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformPlan {
    pub extract: Option<Rect>,
    pub scale: Option<ScaleStep>,
    pub format: OutputFormat,
    pub quality: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputInfo {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub bytes: Vec<u8>,
    pub info: OutputInfo,
    pub original: OriginalImageMetadata,
}
