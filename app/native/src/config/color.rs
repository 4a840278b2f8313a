//! Color parsing for overlay configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self { Self { r, g, b, a } }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let to_byte = |value: f64| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            to_byte(self.r),
            to_byte(self.g),
            to_byte(self.b),
            to_byte(self.a)
        )
    }
}

/// Parses `#RRGGBB` or `#RRGGBBAA` into an [`Rgba`].
///
/// # Errors
///
/// Returns an error if the string is not a hex color of either length.
pub fn parse_hex_color(value: &str) -> Result<Rgba, String> {
    let hex = value.trim().strip_prefix('#').unwrap_or_else(|| value.trim());
    if !matches!(hex.len(), 6 | 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Invalid hex color: {value}"));
    }

    let component = |index: usize| -> Result<f64, String> {
        u8::from_str_radix(&hex[index..index + 2], 16)
            .map(|byte| f64::from(byte) / 255.0)
            .map_err(|err| format!("Invalid hex color {value}: {err}"))
    };

    let alpha = if hex.len() == 8 { component(6)? } else { 1.0 };
    Ok(Rgba::new(component(0)?, component(2)?, component(4)?, alpha))
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rrggbb() {
        let color = parse_hex_color("#ff0000").unwrap();
        assert_eq!(color, Rgba::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_parse_rrggbbaa() {
        let color = parse_hex_color("#00000033").unwrap();
        assert_eq!(color.r, 0.0);
        assert_eq!(color.a, f64::from(0x33_u8) / 255.0);
    }

    #[test]
    fn test_parse_without_hash() {
        assert!(parse_hex_color("00ff00").is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
        assert!(parse_hex_color("").is_err());
    }

    #[test]
    fn test_display_round_trips_hex() {
        let color = parse_hex_color("#12345678").unwrap();
        assert_eq!(color.to_string(), "#12345678");
    }
}
