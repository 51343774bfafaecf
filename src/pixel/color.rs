//! Color input
//!
//! `Color` is what callers hand in (an RGB triple, a hex string or a named
//! constant); `Rgb` is what the palette stores.

use crate::error::EncodingError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 24-bit color as stored in a palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb`
    pub fn from_hex(input: &str) -> Result<Self, EncodingError> {
        let invalid = || EncodingError::InvalidColor {
            input: input.to_string(),
        };
        let digits = input.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return Err(invalid());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match digits.len() {
            6 => Ok(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                // #abc expands to #aabbcc
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                Ok(Self::new(r * 17, g * 17, b * 17))
            }
            _ => Err(invalid()),
        }
    }

    /// Wire order: red, green, blue
    pub fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl FromStr for Rgb {
    type Err = EncodingError;

    /// Accepts a named color or a hex string
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match NamedColor::from_name(s) {
            Some(named) => Ok(named.rgb()),
            None => Self::from_hex(s),
        }
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Named color constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Black,
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    Orange,
    Purple,
}

impl NamedColor {
    pub fn rgb(self) -> Rgb {
        match self {
            Self::Black => Rgb::BLACK,
            Self::White => Rgb::WHITE,
            Self::Red => Rgb::new(255, 0, 0),
            Self::Green => Rgb::new(0, 255, 0),
            Self::Blue => Rgb::new(0, 0, 255),
            Self::Yellow => Rgb::new(255, 255, 0),
            Self::Cyan => Rgb::new(0, 255, 255),
            Self::Magenta => Rgb::new(255, 0, 255),
            Self::Orange => Rgb::new(255, 165, 0),
            Self::Purple => Rgb::new(128, 0, 128),
        }
    }

    /// Case-insensitive lookup by English name
    pub fn from_name(name: &str) -> Option<Self> {
        let named = match name.trim().to_ascii_lowercase().as_str() {
            "black" => Self::Black,
            "white" => Self::White,
            "red" => Self::Red,
            "green" => Self::Green,
            "blue" => Self::Blue,
            "yellow" => Self::Yellow,
            "cyan" => Self::Cyan,
            "magenta" => Self::Magenta,
            "orange" => Self::Orange,
            "purple" => Self::Purple,
            _ => return None,
        };
        Some(named)
    }
}

/// Color as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Color {
    Rgb(Rgb),
    Hex(String),
    Named(NamedColor),
}

impl Color {
    /// Resolve to the RGB value stored in a palette
    pub fn resolve(&self) -> Result<Rgb, EncodingError> {
        match self {
            Self::Rgb(rgb) => Ok(*rgb),
            Self::Hex(s) => Rgb::from_hex(s),
            Self::Named(named) => Ok(named.rgb()),
        }
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Self::Rgb(rgb)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from(triple: (u8, u8, u8)) -> Self {
        Self::Rgb(triple.into())
    }
}

impl From<NamedColor> for Color {
    fn from(named: NamedColor) -> Self {
        Self::Named(named)
    }
}
