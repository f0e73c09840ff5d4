//! RGB colors for the indicator and their config representations.
//!
//! In configuration a color is either an `[r, g, b]` array, a hex string
//! (`"#RRGGBB"`), or one of a few names. Serialized form is always the array.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A color with three 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const OFF: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Build a color from arbitrary integers, rejecting any channel outside `0..=255`.
    pub fn try_from_channels(channels: [i64; 3]) -> crate::error::Result<Self> {
        let mut out = [0u8; 3];
        for (slot, (name, value)) in out
            .iter_mut()
            .zip(["red", "green", "blue"].into_iter().zip(channels))
        {
            *slot = u8::try_from(value).map_err(|_| {
                crate::ElasticblinkError::Color(format!(
                    "{name} channel {value} is out of range (0-255)"
                ))
            })?;
        }
        Ok(Color::rgb(out[0], out[1], out[2]))
    }

    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.r, self.g, self.b)
    }
}

/// Parse a color string.
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#ff0000"`
/// - Named: `"red"`, `"green"`, `"blue"`, `"white"`, `"orange"`, `"yellow"`, `"purple"`, `"cyan"`, `"off"`
pub fn parse_color(s: &str) -> crate::error::Result<Color> {
    let s = s.trim();

    match s.to_lowercase().as_str() {
        "red" => return Ok(Color::RED),
        "green" => return Ok(Color::GREEN),
        "blue" => return Ok(Color::BLUE),
        "white" => return Ok(Color::WHITE),
        "orange" => return Ok(Color::rgb(255, 128, 0)),
        "yellow" => return Ok(Color::YELLOW),
        "purple" => return Ok(Color::rgb(128, 0, 255)),
        "cyan" => return Ok(Color::rgb(0, 255, 255)),
        "off" | "black" => return Ok(Color::OFF),
        _ => {}
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(crate::ElasticblinkError::Color(format!(
            "Invalid color: {s} (use [r, g, b], #RRGGBB or a color name)"
        )));
    }
    let val = u32::from_str_radix(hex, 16)
        .map_err(|_| crate::ElasticblinkError::Color(format!("Invalid hex color: {s}")))?;
    Ok(Color::rgb(
        ((val >> 16) & 0xFF) as u8,
        ((val >> 8) & 0xFF) as u8,
        (val & 0xFF) as u8,
    ))
}

/// Format a color as `#RRGGBB`.
pub fn format_color(color: Color) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Channels(Vec<i64>),
    Text(String),
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match ColorRepr::deserialize(deserializer)? {
            ColorRepr::Channels(values) => {
                let channels: [i64; 3] = values.as_slice().try_into().map_err(|_| {
                    D::Error::custom(format!(
                        "color must have exactly 3 channels, got {}",
                        values.len()
                    ))
                })?;
                Color::try_from_channels(channels).map_err(D::Error::custom)
            }
            ColorRepr::Text(s) => parse_color(&s).map_err(D::Error::custom),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.channels().serialize(serializer)
    }
}
