use thiserror::Error;

use super::types::Rect;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("SVG error: {0}")]
    SvgError(String),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Extract region {region} is outside the {width}x{height} image")]
    InvalidRegion {
        region: Rect,
        width: u32,
        height: u32,
    },

    #[error("Invalid background color: {0}")]
    InvalidBackground(String),

    #[error("Target size {width}x{height} exceeds the limit of {limit} pixels per side")]
    TooLarge { width: u32, height: u32, limit: u32 },

    #[error("Smart crop failed: {0}")]
    SmartCrop(#[from] SmartCropError),

    #[error("WebP encoding failed: {0}")]
    WebPError(String),
}

#[derive(Debug, Error)]
pub enum SmartCropError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid target size {0}x{1}")]
    InvalidTarget(u32, u32),

    #[error("Analyzer error: {0}")]
    Analyzer(String),
}
