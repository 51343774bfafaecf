//! Variable-width packing of palette indices
//!
//! Indices are written as fixed-width fields, least significant bit first,
//! filling each byte from bit 0 upward. The last byte is zero-padded.

/// Bits needed to index a palette of `palette_len` colors (at least 1)
pub fn bits_per_pixel(palette_len: usize) -> u8 {
    let mut bits = 1u8;
    while bits < 8 && (1usize << bits) < palette_len {
        bits += 1;
    }
    bits
}

/// Pack `indices` into a bit stream of `bits`-wide fields
pub fn pack_indices(indices: &[u8], bits: u8) -> Vec<u8> {
    debug_assert!((1..=8).contains(&bits));
    let total_bits = indices.len() * bits as usize;
    let mut output = vec![0u8; total_bits.div_ceil(8)];
    let mask = ((1u16 << bits) - 1) as u8;

    let mut bit_pos = 0usize;
    for &index in indices {
        let value = u16::from(index & mask) << (bit_pos % 8);
        let byte = bit_pos / 8;
        output[byte] |= value as u8;
        if value > 0xFF {
            output[byte + 1] |= (value >> 8) as u8;
        }
        bit_pos += bits as usize;
    }

    output
}
