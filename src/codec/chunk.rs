//! Transport-sized chunking of encoded frames
//!
//! Frames are split at byte boundaries only. The far end reassembles by
//! concatenation, so chunks carry no header of their own.

/// Split `frame` into ordered slices of at most `max_chunk_size` bytes
///
/// A `max_chunk_size` of zero yields the frame as a single chunk.
pub fn chunks(frame: &[u8], max_chunk_size: usize) -> Vec<&[u8]> {
    if max_chunk_size == 0 || frame.len() <= max_chunk_size {
        return vec![frame];
    }
    frame.chunks(max_chunk_size).collect()
}
