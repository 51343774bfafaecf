//! Pixel and animation codec
//!
//! Turns RGB rasters into the device's palette-indexed frame format:
//! - **Palette**: distinct colors in first-appearance order (max 256)
//! - **Bits**: indices packed at the minimal bit width
//! - **Frame**: static or animated payloads, split into frame parts
//!
//! Palette and index buffers live only for one encode call.

pub mod bits;
pub mod color;
pub mod frame;
pub mod palette;

pub use color::{Color, NamedColor, Rgb};
pub use frame::{
    animation_parts, encode_animation, encode_animation_frame, encode_static, static_part,
    FramePart,
};
pub use palette::Palette;

use crate::error::EncodingError;

/// Row-major RGB raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Raster {
    /// Raster filled with a single color
    pub fn filled(width: usize, height: usize, color: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }

    /// Black raster
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, Rgb::BLACK)
    }

    /// Raster from row-major pixels
    pub fn from_pixels(
        width: usize,
        height: usize,
        pixels: Vec<Rgb>,
    ) -> Result<Self, EncodingError> {
        if pixels.len() != width * height {
            return Err(EncodingError::PixelCountMismatch {
                expected: width * height,
                found: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Set one pixel; out-of-bounds writes are ignored
    pub fn set(&mut self, x: usize, y: usize, color: Rgb) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Fail unless the raster is `side` × `side`
    pub fn ensure_square(&self, side: usize) -> Result<(), EncodingError> {
        if self.width != side || self.height != side {
            return Err(EncodingError::DimensionMismatch {
                expected: (side, side),
                found: (self.width, self.height),
            });
        }
        Ok(())
    }
}

/// One animation frame and how long it stays on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFrame {
    pub raster: Raster,
    /// Display duration in milliseconds
    pub delay_ms: u16,
}

/// Ordered, finite sequence of frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Animation {
    frames: Vec<AnimationFrame>,
}

impl Animation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raster: Raster, delay_ms: u16) {
        self.frames.push(AnimationFrame { raster, delay_ms });
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
