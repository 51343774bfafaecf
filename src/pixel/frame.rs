//! Static and animated frame payloads
//!
//! Static image:
//! ```text
//! AA | size (LE16) | 00 00 00 | count | palette (3 × count) | pixels
//! ```
//!
//! Animation frame:
//! ```text
//! AA | size (LE16) | delay (LE16) | reset | count | palette (3 × count) | pixels
//! ```
//!
//! Payloads travel to the device as frame parts:
//! ```text
//! total (LE16) | frame index (i8) | part length (LE16) | part bytes
//! ```

use super::bits::pack_indices;
use super::palette::Palette;
use super::{Animation, Raster};
use crate::constants::{
    ANIMATION_SIZE_OFFSET, FRAME_MARKER, STATIC_FRAME_INDEX, STATIC_SIZE_OFFSET,
};
use crate::error::EncodingError;

const MAX_FIELD: usize = u16::MAX as usize;

/// Reset flag written into every animation frame (each carries its own palette)
const PALETTE_RESET: u8 = 0x00;

/// Largest number of parts an i8 frame index can address
const MAX_ANIMATION_PARTS: usize = i8::MAX as usize + 1;

/// Append `count ‖ palette ‖ pixels` for one raster
fn write_indexed(raster: &Raster, output: &mut Vec<u8>) -> Result<(), EncodingError> {
    let (palette, indices) = Palette::build(raster.pixels())?;
    output.push(palette.count_byte());
    palette.write_table(output);
    output.extend_from_slice(&pack_indices(&indices, palette.bits_per_pixel()));
    Ok(())
}

fn size_field(size: usize) -> Result<u16, EncodingError> {
    u16::try_from(size).map_err(|_| EncodingError::FrameTooLarge {
        size,
        max: MAX_FIELD,
    })
}

/// Encode a standalone static image
pub fn encode_static(raster: &Raster) -> Result<Vec<u8>, EncodingError> {
    let mut body = Vec::new();
    write_indexed(raster, &mut body)?;
    let size = size_field(STATIC_SIZE_OFFSET + body.len())?;

    let mut output = Vec::with_capacity(6 + body.len());
    output.push(FRAME_MARKER);
    output.extend_from_slice(&size.to_le_bytes());
    output.extend_from_slice(&[0x00, 0x00, 0x00]);
    output.extend_from_slice(&body);
    Ok(output)
}

/// Encode one animation frame with its own palette
pub fn encode_animation_frame(raster: &Raster, delay_ms: u16) -> Result<Vec<u8>, EncodingError> {
    let mut body = Vec::new();
    body.extend_from_slice(&delay_ms.to_le_bytes());
    body.push(PALETTE_RESET);
    write_indexed(raster, &mut body)?;
    let size = size_field(ANIMATION_SIZE_OFFSET + body.len())?;

    let mut output = Vec::with_capacity(3 + body.len());
    output.push(FRAME_MARKER);
    output.extend_from_slice(&size.to_le_bytes());
    output.extend_from_slice(&body);
    Ok(output)
}

/// Encode every frame of an animation, in order
pub fn encode_animation(animation: &Animation) -> Result<Vec<Vec<u8>>, EncodingError> {
    if animation.is_empty() {
        return Err(EncodingError::EmptyAnimation);
    }
    animation
        .frames()
        .iter()
        .map(|f| encode_animation_frame(&f.raster, f.delay_ms))
        .collect()
}

/// Slice of a payload tagged for device-side reassembly
///
/// Built only by [`static_part`] and [`animation_parts`], so the data always
/// fits the 16-bit part length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePart {
    total_size: u16,
    frame_index: i8,
    data: Vec<u8>,
}

impl FramePart {
    /// Size of the whole payload this part belongs to
    pub fn total_size(&self) -> u16 {
        self.total_size
    }

    /// Part index: -1 for a static image, else the position of this slice in
    /// the concatenated animation stream (not the animation frame number)
    pub fn frame_index(&self) -> i8 {
        self.frame_index
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Header followed by the part bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        // data.len() <= u16::MAX, checked at construction
        let part_len = self.data.len() as u16;
        let mut output = Vec::with_capacity(5 + self.data.len());
        output.extend_from_slice(&self.total_size.to_le_bytes());
        output.push(self.frame_index as u8);
        output.extend_from_slice(&part_len.to_le_bytes());
        output.extend_from_slice(&self.data);
        output
    }
}

/// Wrap a static payload as its single frame part
pub fn static_part(payload: &[u8]) -> Result<FramePart, EncodingError> {
    Ok(FramePart {
        total_size: size_field(payload.len())?,
        frame_index: STATIC_FRAME_INDEX,
        data: payload.to_vec(),
    })
}

/// Concatenate animation payloads and split them into indexed parts
///
/// Every part except the last holds exactly `part_size` bytes. Indices count
/// parts, so one part may carry several frames or a fraction of one.
pub fn animation_parts(
    frames: &[Vec<u8>],
    part_size: usize,
) -> Result<Vec<FramePart>, EncodingError> {
    if frames.is_empty() {
        return Err(EncodingError::EmptyAnimation);
    }
    let stream = frames.concat();
    let total_size = size_field(stream.len())?;
    let part_size = part_size.clamp(1, MAX_FIELD);

    let count = stream.len().div_ceil(part_size);
    if count > MAX_ANIMATION_PARTS {
        return Err(EncodingError::FrameTooLarge {
            size: stream.len(),
            max: MAX_ANIMATION_PARTS * part_size,
        });
    }

    Ok(stream
        .chunks(part_size)
        .enumerate()
        .map(|(i, data)| FramePart {
            total_size,
            frame_index: i as i8,
            data: data.to_vec(),
        })
        .collect())
}
