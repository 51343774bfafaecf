//! Per-frame color palette
//!
//! Colors are indexed in order of first appearance in a row-major scan.

use super::color::Rgb;
use crate::constants::MAX_PALETTE_COLORS;
use crate::error::EncodingError;
use std::collections::HashMap;

/// Ordered table of up to 256 distinct colors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Build a palette from `pixels` and map every pixel to its index
    ///
    /// Fails with `PaletteOverflow` as soon as a 257th color is seen.
    pub fn build(pixels: &[Rgb]) -> Result<(Self, Vec<u8>), EncodingError> {
        let mut colors = Vec::new();
        let mut lookup: HashMap<Rgb, u8> = HashMap::new();
        let mut indices = Vec::with_capacity(pixels.len());

        for &pixel in pixels {
            let index = match lookup.get(&pixel) {
                Some(&index) => index,
                None => {
                    if colors.len() == MAX_PALETTE_COLORS {
                        return Err(EncodingError::PaletteOverflow {
                            colors: count_distinct(pixels),
                        });
                    }
                    let index = colors.len() as u8;
                    colors.push(pixel);
                    lookup.insert(pixel, index);
                    index
                }
            };
            indices.push(index);
        }

        Ok((Self { colors }, indices))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Color count as written on the wire (a full palette wraps to 0)
    pub fn count_byte(&self) -> u8 {
        (self.colors.len() % MAX_PALETTE_COLORS) as u8
    }

    /// Bit width of one pixel index for this palette
    pub fn bits_per_pixel(&self) -> u8 {
        super::bits::bits_per_pixel(self.colors.len())
    }

    /// Append the color table (3 bytes per color, index order)
    pub fn write_table(&self, output: &mut Vec<u8>) {
        output.reserve(self.colors.len() * 3);
        for color in &self.colors {
            output.extend_from_slice(&color.to_bytes());
        }
    }
}

fn count_distinct(pixels: &[Rgb]) -> usize {
    let mut seen: Vec<Rgb> = pixels.to_vec();
    seen.sort_unstable_by_key(|c| c.to_bytes());
    seen.dedup();
    seen.len()
}
