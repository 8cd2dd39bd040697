use image::{DynamicImage, Rgba};
use std::sync::Arc;
use tracing::debug;

use crate::TransformConfig;
use crate::query::TransformSpec;

use super::codec::{self, Anchor};
use super::color::parse_color;
use super::error::TransformError;
use super::formats;
use super::geometry;
use super::smart_crop::{DynSmartCrop, SaliencyCropper};
use super::types::{
    BuiltinStrategy, OriginalImageMetadata, OutputFormat, OutputInfo, Rect, RegionSource,
    ScaleStep, TransformOutput, TransformPlan,
};

const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Applies a `TransformSpec` to encoded image bytes. Stateless apart from its
/// configuration, so one instance is shared by every request.
pub struct TransformEngine {
    config: TransformConfig,
    smart_crop: DynSmartCrop,
}

impl TransformEngine {
    pub fn new(config: TransformConfig, smart_crop: DynSmartCrop) -> Self {
        Self { config, smart_crop }
    }

    pub fn with_default_analyzer(config: TransformConfig) -> Self {
        let analyzer = SaliencyCropper::new(config.smart_crop_min_scale);
        Self::new(config, Arc::new(analyzer))
    }

    pub fn plan(&self, original: &OriginalImageMetadata, spec: &TransformSpec) -> TransformPlan {
        geometry::resolve(original, spec, &self.config)
    }

    /// Decode, orient, crop, scale and re-encode `bytes` according to `spec`.
    pub fn transform(
        &self,
        bytes: &[u8],
        spec: &TransformSpec,
    ) -> Result<TransformOutput, TransformError> {
        let decoded = codec::decode(bytes)?;
        let original = decoded.metadata.clone();
        let plan = self.plan(&original, spec);
        debug!("Transform plan for {}: {:?}", original.format.as_str(), plan);

        self.check_limits(&plan)?;

        let icc_profile = match plan.format {
            OutputFormat::Jpeg | OutputFormat::Png => decoded.icc_profile.clone(),
            OutputFormat::WebP => None,
        };

        let mut image = decoded.into_oriented();
        let mut frame = Rect::new(0, 0, image.width(), image.height());

        if let Some(region) = plan.extract {
            image = codec::extract(&image, region)?;
            frame = region;
        }

        if let Some(step) = &plan.scale {
            image = self.apply_scale(bytes, image, &frame, step)?;
        }

        let encoded = formats::encode(&image, plan.format, plan.quality, icc_profile.as_deref())?;
        let info = OutputInfo {
            format: plan.format,
            width: image.width(),
            height: image.height(),
            size: encoded.len(),
        };

        debug!(
            "Transformed {}x{} {} into {}x{} {} ({} bytes)",
            original.width,
            original.height,
            original.format.as_str(),
            info.width,
            info.height,
            info.format.as_str(),
            info.size
        );

        Ok(TransformOutput {
            bytes: encoded,
            info,
            original,
        })
    }

    fn check_limits(&self, plan: &TransformPlan) -> Result<(), TransformError> {
        let Some(step) = &plan.scale else {
            return Ok(());
        };

        self.ensure_within_limit(step.width.unwrap_or(0), step.height.unwrap_or(0))
    }

    fn ensure_within_limit(&self, width: u32, height: u32) -> Result<(), TransformError> {
        let limit = self.config.max_dimension;
        if width > limit || height > limit {
            return Err(TransformError::TooLarge {
                width,
                height,
                limit,
            });
        }

        Ok(())
    }

    fn apply_scale(
        &self,
        bytes: &[u8],
        mut image: DynamicImage,
        frame: &Rect,
        step: &ScaleStep,
    ) -> Result<DynamicImage, TransformError> {
        let background = match &step.background {
            Some(color) => parse_color(color)?,
            None => OPAQUE_BLACK,
        };

        let anchor = match step.anchor {
            RegionSource::Default => Anchor::centre(),
            RegionSource::Gravity(gravity) => {
                let (x, y) = gravity.weights();
                Anchor::Position { x, y }
            }
            RegionSource::Strategy(BuiltinStrategy::Attention) => Anchor::Attention,
            RegionSource::Strategy(BuiltinStrategy::Entropy) => Anchor::Entropy,
            RegionSource::Smart { width, height } => {
                let region = self.smart_crop.locate(bytes, width, height)?;
                debug!("{} smart crop region {}", self.smart_crop.name(), region);

                // The analyzer sees the whole original; keep the part that
                // survived the explicit crop
                match region.relative_to(frame) {
                    Some(relative) => image = codec::extract(&image, relative)?,
                    None => debug!("Smart crop region {} is outside {}, ignored", region, frame),
                }
                Anchor::centre()
            }
        };

        // A thin source can blow up along the axis the target leaves open
        let (work_w, work_h) = codec::working_size(
            image.width(),
            image.height(),
            step.width,
            step.height,
            step.fit,
        );
        debug!(
            "Scaling {}x{} ({}) through a {}x{} buffer",
            image.width(),
            image.height(),
            step.fit.as_str(),
            work_w,
            work_h
        );
        self.ensure_within_limit(work_w, work_h)?;

        Ok(codec::resize(
            &image,
            step.width,
            step.height,
            step.fit,
            anchor,
            background,
        ))
    }
}
