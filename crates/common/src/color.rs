use glam::Vec4;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Linear RGBA color with components in `[0, 1]`.
///
/// Serialized as a `#RRGGBB` / `#RRGGBBAA` hex string so catalog files stay
/// readable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub Vec4);

/// Error returned when a hex color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex color: {0:?}")]
pub struct ColorParseError(pub String);

impl Color {
    pub const TRANSPARENT: Self = Self(Vec4::ZERO);
    pub const WHITE: Self = Self(Vec4::ONE);
    pub const BLACK: Self = Self(Vec4::new(0.0, 0.0, 0.0, 1.0));

    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self(Vec4::new(r, g, b, a))
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub fn r(&self) -> f32 {
        self.0.x
    }

    pub fn g(&self) -> f32 {
        self.0.y
    }

    pub fn b(&self) -> f32 {
        self.0.z
    }

    pub fn a(&self) -> f32 {
        self.0.w
    }

    /// Linear interpolation from `a` toward `b` by `t`, alpha included.
    pub fn interpolate_between(a: Self, b: Self, t: f32) -> Self {
        Self(a.0.lerp(b.0, t))
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let err = || ColorParseError(hex.to_string());
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return Err(err());
        }
        let mut channels = [255u8; 4];
        for (i, channel) in channels.iter_mut().enumerate().take(digits.len() / 2) {
            *channel = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).map_err(|_| err())?;
        }
        let [r, g, b, a] = channels.map(|c| c as f32 / 255.0);
        Ok(Self::rgba(r, g, b, a))
    }

    /// Hex form `#RRGGBBAA`. Components are clamped to `[0, 1]`.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self
            .0
            .clamp(Vec4::ZERO, Vec4::ONE)
            .to_array()
            .map(|c| (c * 255.0).round() as u8);
        format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_is_default() {
        assert_eq!(Color::default(), Color::TRANSPARENT);
        assert_eq!(Color::TRANSPARENT.a(), 0.0);
    }

    #[test]
    fn hex_roundtrip() {
        let c = Color::from_hex("#FF8000").unwrap();
        assert_eq!(c.r(), 1.0);
        assert_eq!(c.b(), 0.0);
        assert_eq!(c.a(), 1.0);
        assert_eq!(c.to_hex(), "#FF8000FF");

        let c = Color::from_hex("0000FF80").unwrap();
        assert_eq!(c.to_hex(), "#0000FF80");
    }

    #[test]
    fn hex_rejects_garbage() {
        assert!(Color::from_hex("#FFF").is_err());
        assert!(Color::from_hex("#GG0000").is_err());
        assert!(Color::from_hex("").is_err());
    }

    #[test]
    fn interpolation_is_linear() {
        let mid = Color::interpolate_between(Color::BLACK, Color::WHITE, 0.5);
        assert_eq!(mid, Color::rgba(0.5, 0.5, 0.5, 1.0));
        let same = Color::interpolate_between(Color::BLACK, Color::WHITE, 0.0);
        assert_eq!(same, Color::BLACK);
    }

    #[test]
    fn serde_uses_hex_string() {
        let json = serde_json::to_string(&Color::WHITE).unwrap();
        assert_eq!(json, "\"#FFFFFFFF\"");
        let back: Color = serde_json::from_str("\"#000000\"").unwrap();
        assert_eq!(back, Color::BLACK);
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }
}
