//! Extended magic-header framing
//!
//! ```text
//! FE EF AA 55 | len_lo len_hi | opcode | packet (LE32) | args... | sum_lo sum_hi
//! ```
//!
//! `len` counts the opcode, the packet number, the arguments and the checksum.
//! There is no trailing marker.

use super::{checksum, le16, length_field, Codec, Notification};
use crate::constants::{CHECKSUM_LEN, EXTENDED_MAGIC, EXTENDED_MIN_NOTIFICATION_LEN};
use crate::error::{EncodingError, ParseError};
use bytes::Bytes;

const PACKET_NUMBER_LEN: usize = 4;

/// Codec for the Extended variant
pub struct ExtendedCodec;

impl Codec for ExtendedCodec {
    fn encode(
        &self,
        opcode: u8,
        args: &[u8],
        packet_number: u32,
        output: &mut Vec<u8>,
    ) -> Result<(), EncodingError> {
        encode_extended_into(opcode, args, packet_number, output)
    }

    fn decode(&self, raw: &[u8]) -> Result<Notification, ParseError> {
        decode_extended(raw)
    }
}

/// Encode a command as an Extended frame
pub fn encode_extended(
    opcode: u8,
    args: &[u8],
    packet_number: u32,
) -> Result<Vec<u8>, EncodingError> {
    let mut output = Vec::with_capacity(args.len() + EXTENDED_MIN_NOTIFICATION_LEN);
    encode_extended_into(opcode, args, packet_number, &mut output)?;
    Ok(output)
}

/// Encode a command as an Extended frame, appending to `output`
pub fn encode_extended_into(
    opcode: u8,
    args: &[u8],
    packet_number: u32,
    output: &mut Vec<u8>,
) -> Result<(), EncodingError> {
    let len = length_field(1 + PACKET_NUMBER_LEN + args.len() + CHECKSUM_LEN)?;

    output.reserve(args.len() + EXTENDED_MIN_NOTIFICATION_LEN);
    output.extend_from_slice(&EXTENDED_MAGIC);
    let body_start = output.len();
    output.extend_from_slice(&len.to_le_bytes());
    output.push(opcode);
    output.extend_from_slice(&packet_number.to_le_bytes());
    output.extend_from_slice(args);
    let sum = checksum(&output[body_start..]);
    output.extend_from_slice(&sum.to_le_bytes());
    Ok(())
}

/// Parse an Extended notification
pub fn decode_extended(raw: &[u8]) -> Result<Notification, ParseError> {
    if raw.len() < EXTENDED_MIN_NOTIFICATION_LEN {
        return Err(ParseError::TooShort {
            len: raw.len(),
            min: EXTENDED_MIN_NOTIFICATION_LEN,
        });
    }
    if raw[..EXTENDED_MAGIC.len()] != EXTENDED_MAGIC {
        return Err(ParseError::BadHeader);
    }

    let checksum_at = raw.len() - CHECKSUM_LEN;
    let packet_number = u32::from_le_bytes([raw[7], raw[8], raw[9], raw[10]]);

    Ok(Notification {
        declared_len: le16(raw, 4),
        opcode: raw[6],
        packet_number: Some(packet_number),
        payload: Bytes::copy_from_slice(&raw[11..checksum_at]),
        checksum: le16(raw, checksum_at),
        computed_checksum: checksum(&raw[4..checksum_at]),
    })
}
