use image::Rgba;

use super::error::TransformError;

const NAMED_COLORS: [(&str, [u8; 4]); 16] = [
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 128, 0, 255]),
    ("lime", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("gray", [128, 128, 128, 255]),
    ("grey", [128, 128, 128, 255]),
    ("silver", [192, 192, 192, 255]),
    ("maroon", [128, 0, 0, 255]),
    ("navy", [0, 0, 128, 255]),
    ("orange", [255, 165, 0, 255]),
    ("transparent", [0, 0, 0, 0]),
];

/// Parse a letterbox background colour: a CSS colour name or a hex literal
/// in `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa` form.
pub fn parse_color(value: &str) -> Result<Rgba<u8>, TransformError> {
    let value = value.trim();
    let invalid = || TransformError::InvalidBackground(value.to_string());

    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).map(Rgba).ok_or_else(invalid);
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, rgba)| Rgba(*rgba))
        .ok_or_else(invalid)
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let short = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let long = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some([short(0)?, short(1)?, short(2)?, 255]),
        4 => Some([short(0)?, short(1)?, short(2)?, short(3)?]),
        6 => Some([long(0)?, long(2)?, long(4)?, 255]),
        8 => Some([long(0)?, long(2)?, long(4)?, long(6)?]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors() {
        assert_eq!(parse_color("black").unwrap(), Rgba([0, 0, 0, 255]));
        assert_eq!(parse_color("White").unwrap(), Rgba([255, 255, 255, 255]));
        assert_eq!(parse_color("transparent").unwrap(), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_color("#f00").unwrap(), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("#0f08").unwrap(), Rgba([0, 255, 0, 136]));
        assert_eq!(parse_color("#336699").unwrap(), Rgba([0x33, 0x66, 0x99, 255]));
        assert_eq!(parse_color("#33669980").unwrap(), Rgba([0x33, 0x66, 0x99, 0x80]));
    }

    #[test]
    fn test_invalid_colors() {
        for value in ["", "#", "#12", "#12345", "#gggggg", "notacolor", "rgb(0,0,0)"] {
            assert!(
                matches!(parse_color(value), Err(TransformError::InvalidBackground(_))),
                "{}",
                value
            );
        }
    }
}
