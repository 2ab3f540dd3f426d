use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque RGB fill color, serialized as a `#rrggbb` CSS hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `rrggbb` (case-insensitive).
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Normalized RGB for canvas/GPU consumers (0.0..1.0).
    pub fn to_f32(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidColor(pub String);

impl fmt::Display for InvalidColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hex color: {:?}", self.0)
    }
}

impl std::error::Error for InvalidColor {}

impl FromStr for Color {
    type Err = InvalidColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s).ok_or_else(|| InvalidColor(s.to_string()))
    }
}

impl TryFrom<String> for Color {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Parse a comma-separated list of hex colors, skipping blanks. `None` if any entry is invalid.
pub fn parse_palette(raw: &str) -> Option<Vec<Color>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Color::parse_hex)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Color, parse_palette};

    #[test]
    fn parse_hex_accepts_with_and_without_hash() {
        assert_eq!(Color::parse_hex("#fef0d9"), Some(Color::rgb(0xfe, 0xf0, 0xd9)));
        assert_eq!(Color::parse_hex("D7301F"), Some(Color::rgb(0xd7, 0x30, 0x1f)));
    }

    #[test]
    fn parse_hex_rejects_malformed_input() {
        assert_eq!(Color::parse_hex(""), None);
        assert_eq!(Color::parse_hex("#fff"), None);
        assert_eq!(Color::parse_hex("#gg0000"), None);
        assert_eq!(Color::parse_hex("#éé0000"), None);
    }

    #[test]
    fn hex_roundtrip_is_lowercase() {
        let color = Color::parse_hex("#09192A").expect("valid color");
        assert_eq!(color.to_hex(), "#09192a");
        assert_eq!(color.to_string(), "#09192a");
    }

    #[test]
    fn serde_uses_hex_strings() {
        let json = serde_json::to_string(&Color::rgb(29, 63, 97)).expect("serialize");
        assert_eq!(json, "\"#1d3f61\"");
        let back: Color = serde_json::from_str("\"#737780\"").expect("deserialize");
        assert_eq!(back, Color::rgb(0x73, 0x77, 0x80));
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }

    #[test]
    fn parse_palette_skips_blanks_and_rejects_bad_entries() {
        let palette = parse_palette(" #fef0d9, ,#fdcc8a ").expect("palette should parse");
        assert_eq!(palette.len(), 2);
        assert!(parse_palette("#fef0d9,red").is_none());
    }
}
