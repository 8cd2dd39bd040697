pub mod codec;
pub mod color;
pub mod engine;
pub mod error;
pub mod formats;
pub mod geometry;
pub mod saliency;
pub mod smart_crop;
pub mod strategy;
pub mod types;

pub use engine::TransformEngine;
pub use error::{SmartCropError, TransformError};
pub use smart_crop::{DynSmartCrop, SaliencyCropper, SmartCrop};
pub use types::*;

#[cfg(test)]
mod tests {
    mod engine_tests;
    mod smart_crop_tests;
}
