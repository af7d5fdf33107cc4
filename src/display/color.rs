use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ColorParseError;

/// 24-bit backlight color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const RED: RgbColor = RgbColor::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Same color with the red channel driven to full
    pub fn with_red_maxed(self) -> Self {
        Self { r: 255, ..self }
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Accepts `#RRGGBB` or `RRGGBB`; digits are always hex.
impl FromStr for RgbColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let packed = parse_hex(hex).ok_or_else(|| ColorParseError(s.to_string()))?;

        Ok(RgbColor::new(
            (packed >> 16) as u8,
            (packed >> 8) as u8,
            packed as u8,
        ))
    }
}

fn parse_hex(hex: &str) -> Option<u32> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// What a single key backlight shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonColor {
    Off,
    Rgb(RgbColor),
}

impl From<RgbColor> for ButtonColor {
    fn from(color: RgbColor) -> Self {
        ButtonColor::Rgb(color)
    }
}

impl From<Option<RgbColor>> for ButtonColor {
    fn from(color: Option<RgbColor>) -> Self {
        color.map_or(ButtonColor::Off, ButtonColor::Rgb)
    }
}
