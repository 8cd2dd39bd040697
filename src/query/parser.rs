use std::collections::HashMap;

use super::error::ValidationError;
use super::types::{Crop, CropRect, CropStrategy, CropUnit, Dimensions, Gravity, TransformSpec};

/// Query parameters understood by the parser, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    W,
    H,
    Quality,
    Zoom,
    Resize,
    Fit,
    Lb,
    Crop,
    Webp,
    CropStrategy,
    Gravity,
    Background,
}

impl Field {
    const ALL: [Field; 12] = [
        Field::W,
        Field::H,
        Field::Quality,
        Field::Zoom,
        Field::Resize,
        Field::Fit,
        Field::Lb,
        Field::Crop,
        Field::Webp,
        Field::CropStrategy,
        Field::Gravity,
        Field::Background,
    ];

    fn key(&self) -> &'static str {
        match self {
            Field::W => "w",
            Field::H => "h",
            Field::Quality => "quality",
            Field::Zoom => "zoom",
            Field::Resize => "resize",
            Field::Fit => "fit",
            Field::Lb => "lb",
            Field::Crop => "crop",
            Field::Webp => "webp",
            Field::CropStrategy => "crop_strategy",
            Field::Gravity => "gravity",
            Field::Background => "background",
        }
    }

    fn apply(&self, spec: &mut TransformSpec, value: &str) -> Result<(), String> {
        match self {
            Field::W => spec.w = Some(parse_positive(value)?),
            Field::H => spec.h = Some(parse_positive(value)?),
            Field::Quality => spec.quality = Some(parse_number(value)?),
            Field::Zoom => spec.zoom = Some(parse_zoom(value)?),
            Field::Resize => spec.resize = Some(parse_list(value)?),
            Field::Fit => spec.fit = Some(parse_list(value)?),
            Field::Lb => spec.lb = Some(parse_list(value)?),
            Field::Crop => spec.crop = Some(parse_crop(value)?),
            Field::Webp => spec.webp = Some(parse_boolean(value)?),
            Field::CropStrategy => {
                spec.crop_strategy = Some(parse_enum(value, &CropStrategy::ALL, |s| s.as_str())?)
            }
            Field::Gravity => spec.gravity = Some(parse_enum(value, &Gravity::ALL, |g| g.as_str())?),
            Field::Background => spec.background = Some(value.to_string()),
        }
        Ok(())
    }
}

/// Parse raw query parameters into a [`TransformSpec`].
///
/// Unknown keys are ignored and empty values count as absent. The first
/// invalid field aborts parsing.
pub fn parse_query(query: &HashMap<String, String>) -> Result<TransformSpec, ValidationError> {
    let mut spec = TransformSpec::default();

    for field in Field::ALL {
        let Some(value) = query.get(field.key()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        field
            .apply(&mut spec, value)
            .map_err(|reason| ValidationError::new(field.key(), reason))?;
    }

    Ok(spec)
}

/// Leading base-10 integer of `val`, ignoring anything after the digits.
fn leading_int(val: &str) -> Option<i64> {
    let trimmed = val.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_number(val: &str) -> Result<i64, String> {
    leading_int(val).ok_or_else(|| format!("\"{}\" is not a number", val))
}

fn parse_positive(val: &str) -> Result<u32, String> {
    let num = parse_number(val)?;
    u32::try_from(num)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("\"{}\" must be a positive integer", val))
}

fn parse_zoom(val: &str) -> Result<f64, String> {
    let zoom: f64 = val
        .trim()
        .parse()
        .map_err(|_| format!("\"{}\" is not a number", val))?;

    if !zoom.is_finite() || zoom <= 0.0 {
        return Err(format!("\"{}\" must be greater than zero", val));
    }

    Ok(zoom)
}

fn parse_list(val: &str) -> Result<Dimensions, String> {
    let invalid = || format!("\"{}\" must be a comma separated list (<width>,<height>)", val);

    let parts: Vec<&str> = val.split(',').collect();
    let [w, h] = parts.as_slice() else {
        return Err(invalid());
    };

    let w = leading_int(w).ok_or_else(invalid)?;
    let h = leading_int(h).ok_or_else(invalid)?;

    match (u32::try_from(w), u32::try_from(h)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok(Dimensions::new(w, h)),
        _ => Err(format!("\"{}\" must contain positive integers", val)),
    }
}

fn parse_boolean(val: &str) -> Result<bool, String> {
    match val {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!(
            "\"{}\" is not valid as a boolean value. Must be either true (or 1) or false (or 0)",
            val
        )),
    }
}

fn parse_crop(val: &str) -> Result<Crop, String> {
    if let Ok(flag) = parse_boolean(val) {
        return Ok(Crop::Flag(flag));
    }

    let invalid = || {
        format!(
            "\"{}\" must be a comma separated list (<x>,<y>,<width>,<height>)",
            val
        )
    };

    let parts: Vec<&str> = val.split(',').collect();
    let [x, y, w, h, ..] = parts.as_slice() else {
        return Err(invalid());
    };

    let mut values = [0u32; 4];
    for (slot, part) in values.iter_mut().zip([x, y, w, h]) {
        let num = leading_int(part).ok_or_else(invalid)?;
        *slot = u32::try_from(num)
            .map_err(|_| format!("\"{}\" must not contain negative values", val))?;
    }

    let unit = if val.contains("px") {
        CropUnit::Pixel
    } else {
        CropUnit::Percent
    };

    let [x, y, w, h] = values;
    Ok(Crop::Region(CropRect { x, y, w, h, unit }))
}

fn parse_enum<T: Copy>(val: &str, valid: &[T], name: impl Fn(&T) -> &'static str) -> Result<T, String> {
    valid.iter().find(|entry| name(entry) == val).copied().ok_or_else(|| {
        let names: Vec<&str> = valid.iter().map(&name).collect();
        format!("\"{}\" must be one of {}.", val, names.join(", "))
    })
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn leading_int_follows_lenient_rules() {
        assert_eq!(leading_int("100"), Some(100));
        assert_eq!(leading_int("  42px"), Some(42));
        assert_eq!(leading_int("-7"), Some(-7));
        assert_eq!(leading_int("+3"), Some(3));
        assert_eq!(leading_int("px10"), None);
        assert_eq!(leading_int(""), None);
        assert_eq!(leading_int("-"), None);
    }

    #[test]
    fn zoom_rejects_non_positive_values() {
        assert!(parse_zoom("0").is_err());
        assert!(parse_zoom("-1.5").is_err());
        assert!(parse_zoom("NaN").is_err());
        assert!(parse_zoom("inf").is_err());
        assert_eq!(parse_zoom("1.5"), Ok(1.5));
    }
}
