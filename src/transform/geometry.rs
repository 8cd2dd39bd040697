use crate::TransformConfig;
use crate::query::{CropRect, CropStrategy, CropUnit, Dimensions, TransformSpec};

use super::types::{
    BuiltinStrategy, FitMode, OriginalImageMetadata, OutputFormat, Rect, RegionSource, ScaleStep,
    SourceFormat, TransformPlan,
};

/// Turn a spec into the concrete operations for an image of the given size.
pub fn resolve(
    original: &OriginalImageMetadata,
    spec: &TransformSpec,
    config: &TransformConfig,
) -> TransformPlan {
    let (width, height) = original.oriented_size();

    TransformPlan {
        extract: spec
            .crop_region()
            .map(|crop| resolve_crop_rect(crop, width, height)),
        scale: resolve_scale(spec, config),
        format: resolve_format(original.format, spec),
        quality: resolve_quality(spec, config.default_quality),
    }
}

/// Absolute pixel rect for a crop region; percentages are taken of the
/// original width (x, w) and height (y, h).
pub fn resolve_crop_rect(crop: &CropRect, width: u32, height: u32) -> Rect {
    match crop.unit {
        CropUnit::Pixel => Rect::new(crop.x, crop.y, crop.w, crop.h),
        CropUnit::Percent => {
            let of = |total: u32, percent: u32| -> u32 {
                (total as f64 * (percent as f64 / 100.0)).round() as u32
            };
            Rect::new(
                of(width, crop.x),
                of(height, crop.y),
                of(width, crop.w),
                of(height, crop.h),
            )
        }
    }
}

/// Multiply a dimension by the zoom factor, never collapsing to zero.
pub fn zoomed(value: u32, zoom: f64) -> u32 {
    (value as f64 * zoom).round().clamp(1.0, u32::MAX as f64) as u32
}

fn zoomed_box(dims: Dimensions, zoom: f64) -> (u32, u32) {
    (zoomed(dims.w, zoom), zoomed(dims.h, zoom))
}

fn resolve_scale(spec: &TransformSpec, config: &TransformConfig) -> Option<ScaleStep> {
    let zoom = spec.zoom();

    if let Some(resize) = spec.resize {
        let (width, height) = zoomed_box(resize, zoom);
        let anchor = match (spec.gravity, spec.crop_strategy) {
            (Some(gravity), _) => RegionSource::Gravity(gravity),
            (None, Some(CropStrategy::Attention)) => {
                RegionSource::Strategy(BuiltinStrategy::Attention)
            }
            (None, Some(CropStrategy::Entropy)) => RegionSource::Strategy(BuiltinStrategy::Entropy),
            (None, Some(CropStrategy::Smart)) => RegionSource::Smart {
                width: resize.w,
                height: resize.h,
            },
            (None, None) => RegionSource::Default,
        };

        return Some(ScaleStep {
            width: Some(width),
            height: Some(height),
            fit: FitMode::Fill,
            anchor,
            background: None,
        });
    }

    if let Some(fit) = spec.fit {
        let (width, height) = zoomed_box(fit, zoom);
        return Some(ScaleStep {
            width: Some(width),
            height: Some(height),
            fit: FitMode::Inside,
            anchor: RegionSource::Default,
            background: None,
        });
    }

    if let Some(lb) = spec.lb {
        let (width, height) = zoomed_box(lb, zoom);
        let background = spec
            .background
            .clone()
            .unwrap_or_else(|| config.default_background.clone());
        return Some(ScaleStep {
            width: Some(width),
            height: Some(height),
            fit: FitMode::Contain,
            anchor: RegionSource::Default,
            background: Some(background),
        });
    }

    if spec.w.is_some() || spec.h.is_some() {
        // crop only switches this branch between cover and inside
        let fit = if spec.crop_enabled() {
            FitMode::Fill
        } else {
            FitMode::Inside
        };
        return Some(ScaleStep {
            width: spec.w.map(|w| zoomed(w, zoom)),
            height: spec.h.map(|h| zoomed(h, zoom)),
            fit,
            anchor: RegionSource::Default,
            background: None,
        });
    }

    None
}

/// Default quality attenuated on a logarithmic scale as zoom grows, bounded
/// to `[round(base / zoom), base]`.
pub fn zoom_compression(base: f64, zoom: f64) -> f64 {
    let attenuated = (base - (zoom.ln() / (base / zoom).ln()) * (base * zoom)).round();
    // max-then-min, the bounds cross for zoom < 1
    attenuated.max((base / zoom).round()).min(base)
}

pub fn resolve_quality(spec: &TransformSpec, base: u8) -> u8 {
    let quality = match spec.quality {
        Some(quality) => quality as f64,
        None => zoom_compression(base as f64, spec.zoom()),
    };
    quality.round().clamp(0.0, 100.0) as u8
}

/// WebP when requested or already WebP, JPEG stays JPEG, everything else
/// becomes PNG.
pub fn resolve_format(source: SourceFormat, spec: &TransformSpec) -> OutputFormat {
    if spec.webp == Some(true) || source == SourceFormat::WebP {
        OutputFormat::WebP
    } else if source == SourceFormat::Jpeg {
        OutputFormat::Jpeg
    } else {
        OutputFormat::Png
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Crop, Gravity};

    fn jpeg(width: u32, height: u32) -> OriginalImageMetadata {
        OriginalImageMetadata {
            width,
            height,
            format: SourceFormat::Jpeg,
            orientation: 1,
            size: 0,
            has_icc_profile: false,
        }
    }

    fn plan(spec: &TransformSpec) -> TransformPlan {
        resolve(&jpeg(1000, 800), spec, &TransformConfig::default())
    }

    #[test]
    fn test_resize_target_is_zoomed() {
        let spec = TransformSpec {
            resize: Some(Dimensions::new(100, 100)),
            zoom: Some(2.0),
            ..Default::default()
        };
        let scale = plan(&spec).scale.unwrap();
        assert_eq!((scale.width, scale.height), (Some(200), Some(200)));
        assert_eq!(scale.fit, FitMode::Fill);
        assert_eq!(scale.anchor, RegionSource::Default);
    }

    #[test]
    fn test_precedence_resize_fit_lb_wh() {
        let mut spec = TransformSpec {
            w: Some(10),
            h: Some(10),
            resize: Some(Dimensions::new(1, 1)),
            fit: Some(Dimensions::new(2, 2)),
            lb: Some(Dimensions::new(3, 3)),
            ..Default::default()
        };
        assert_eq!(plan(&spec).scale.unwrap().width, Some(1));

        spec.resize = None;
        let scale = plan(&spec).scale.unwrap();
        assert_eq!((scale.width, scale.fit), (Some(2), FitMode::Inside));

        spec.fit = None;
        let scale = plan(&spec).scale.unwrap();
        assert_eq!((scale.width, scale.fit), (Some(3), FitMode::Contain));
        assert_eq!(scale.background.as_deref(), Some("black"));

        spec.lb = None;
        let scale = plan(&spec).scale.unwrap();
        assert_eq!((scale.width, scale.fit), (Some(10), FitMode::Inside));
        assert_eq!(scale.fit.as_str(), "inside");
    }

    #[test]
    fn test_region_source_priority() {
        let mut spec = TransformSpec {
            resize: Some(Dimensions::new(100, 50)),
            zoom: Some(3.0),
            crop_strategy: Some(CropStrategy::Smart),
            gravity: Some(Gravity::SouthEast),
            ..Default::default()
        };
        assert_eq!(
            plan(&spec).scale.unwrap().anchor,
            RegionSource::Gravity(Gravity::SouthEast)
        );

        spec.gravity = None;
        let scale = plan(&spec).scale.unwrap();
        assert_eq!(
            scale.anchor,
            RegionSource::Smart {
                width: 100,
                height: 50
            }
        );
        assert_eq!((scale.width, scale.height), (Some(300), Some(150)));

        spec.crop_strategy = Some(CropStrategy::Entropy);
        assert_eq!(
            plan(&spec).scale.unwrap().anchor,
            RegionSource::Strategy(BuiltinStrategy::Entropy)
        );

        spec.crop_strategy = Some(CropStrategy::Attention);
        assert_eq!(
            plan(&spec).scale.unwrap().anchor,
            RegionSource::Strategy(BuiltinStrategy::Attention)
        );
    }

    #[test]
    fn test_gravity_and_strategy_ignored_outside_resize() {
        let spec = TransformSpec {
            w: Some(100),
            h: Some(100),
            crop: Some(Crop::Flag(true)),
            gravity: Some(Gravity::North),
            crop_strategy: Some(CropStrategy::Smart),
            ..Default::default()
        };
        let scale = plan(&spec).scale.unwrap();
        assert_eq!(scale.fit, FitMode::Fill);
        assert_eq!(scale.anchor, RegionSource::Default);
    }

    #[test]
    fn test_crop_flag_toggles_width_height_branch() {
        let mut spec = TransformSpec {
            w: Some(100),
            h: Some(100),
            ..Default::default()
        };
        assert_eq!(plan(&spec).scale.unwrap().fit, FitMode::Inside);

        spec.crop = Some(Crop::Flag(false));
        assert_eq!(plan(&spec).scale.unwrap().fit, FitMode::Inside);

        spec.crop = Some(Crop::Flag(true));
        assert_eq!(plan(&spec).scale.unwrap().fit, FitMode::Fill);
    }

    #[test]
    fn test_single_axis_keeps_other_axis_open() {
        let spec = TransformSpec {
            h: Some(40),
            zoom: Some(1.5),
            ..Default::default()
        };
        let scale = plan(&spec).scale.unwrap();
        assert_eq!((scale.width, scale.height), (None, Some(60)));
    }

    #[test]
    fn test_no_scaling_without_target() {
        let spec = TransformSpec {
            quality: Some(10),
            ..Default::default()
        };
        let plan = plan(&spec);
        assert!(plan.scale.is_none());
        assert!(plan.extract.is_none());
    }

    #[test]
    fn test_percent_crop_rect() {
        let crop = CropRect {
            x: 10,
            y: 10,
            w: 50,
            h: 25,
            unit: CropUnit::Percent,
        };
        assert_eq!(resolve_crop_rect(&crop, 1000, 800), Rect::new(100, 80, 500, 200));
    }

    #[test]
    fn test_crop_rect_runs_before_any_scaling() {
        let spec = TransformSpec {
            crop: Some(Crop::Region(CropRect {
                x: 5,
                y: 6,
                w: 70,
                h: 80,
                unit: CropUnit::Pixel,
            })),
            fit: Some(Dimensions::new(10, 10)),
            ..Default::default()
        };
        let plan = plan(&spec);
        assert_eq!(plan.extract, Some(Rect::new(5, 6, 70, 80)));
        assert_eq!(plan.scale.unwrap().fit, FitMode::Inside);
    }

    #[test]
    fn test_percent_crop_uses_oriented_dimensions() {
        let mut original = jpeg(1000, 500);
        original.orientation = 6;
        let spec = TransformSpec {
            crop: Some(Crop::Region(CropRect {
                x: 0,
                y: 0,
                w: 100,
                h: 50,
                unit: CropUnit::Percent,
            })),
            ..Default::default()
        };
        let plan = resolve(&original, &spec, &TransformConfig::default());
        assert_eq!(plan.extract, Some(Rect::new(0, 0, 500, 500)));
    }

    #[test]
    fn test_quality_resolution() {
        let mut spec = TransformSpec::default();
        assert_eq!(resolve_quality(&spec, 82), 82);

        spec.zoom = Some(2.0);
        let derived = resolve_quality(&spec, 82);
        assert!(derived < 82);
        assert!(derived >= 41);
        assert_eq!(derived, 51);

        spec.quality = Some(90);
        assert_eq!(resolve_quality(&spec, 82), 90);

        spec.quality = Some(150);
        assert_eq!(resolve_quality(&spec, 82), 100);

        spec.quality = Some(-4);
        assert_eq!(resolve_quality(&spec, 82), 0);
    }

    #[test]
    fn test_zoom_below_one_keeps_base_quality() {
        assert_eq!(zoom_compression(82.0, 0.5), 82.0);
    }

    #[test]
    fn test_format_resolution() {
        let spec = TransformSpec::default();
        let webp = TransformSpec {
            webp: Some(true),
            ..Default::default()
        };

        assert_eq!(resolve_format(SourceFormat::Jpeg, &spec), OutputFormat::Jpeg);
        assert_eq!(resolve_format(SourceFormat::WebP, &spec), OutputFormat::WebP);
        assert_eq!(resolve_format(SourceFormat::Png, &spec), OutputFormat::Png);
        assert_eq!(resolve_format(SourceFormat::Gif, &spec), OutputFormat::Png);
        assert_eq!(resolve_format(SourceFormat::Svg, &spec), OutputFormat::Png);
        assert_eq!(resolve_format(SourceFormat::Png, &webp), OutputFormat::WebP);
    }
}
