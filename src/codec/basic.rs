//! Basic `01 … 02` framing
//!
//! ```text
//! 01 | len_lo len_hi | opcode | args... | sum_lo sum_hi | 02
//! ```
//!
//! `len` counts the opcode, the arguments and the checksum.

use super::{checksum, le16, length_field, Codec, Notification};
use crate::constants::{BASIC_END, BASIC_MIN_NOTIFICATION_LEN, BASIC_START, CHECKSUM_LEN};
use crate::error::{EncodingError, ParseError};
use bytes::Bytes;

/// Codec for the Basic variant
pub struct BasicCodec;

impl Codec for BasicCodec {
    fn encode(
        &self,
        opcode: u8,
        args: &[u8],
        _packet_number: u32,
        output: &mut Vec<u8>,
    ) -> Result<(), EncodingError> {
        encode_basic_into(opcode, args, output)
    }

    fn decode(&self, raw: &[u8]) -> Result<Notification, ParseError> {
        decode_basic(raw)
    }
}

/// Encode a command as a Basic frame
pub fn encode_basic(opcode: u8, args: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let mut output = Vec::with_capacity(args.len() + 7);
    encode_basic_into(opcode, args, &mut output)?;
    Ok(output)
}

/// Encode a command as a Basic frame, appending to `output`
pub fn encode_basic_into(
    opcode: u8,
    args: &[u8],
    output: &mut Vec<u8>,
) -> Result<(), EncodingError> {
    let len = length_field(1 + args.len() + CHECKSUM_LEN)?;

    output.reserve(args.len() + 7);
    output.push(BASIC_START);
    let body_start = output.len();
    output.extend_from_slice(&len.to_le_bytes());
    output.push(opcode);
    output.extend_from_slice(args);
    let sum = checksum(&output[body_start..]);
    output.extend_from_slice(&sum.to_le_bytes());
    output.push(BASIC_END);
    Ok(())
}

/// Parse a Basic notification
///
/// The payload is everything between the opcode and the checksum.
pub fn decode_basic(raw: &[u8]) -> Result<Notification, ParseError> {
    if raw.len() < BASIC_MIN_NOTIFICATION_LEN {
        return Err(ParseError::TooShort {
            len: raw.len(),
            min: BASIC_MIN_NOTIFICATION_LEN,
        });
    }
    if raw[0] != BASIC_START {
        return Err(ParseError::BadHeader);
    }
    if raw[raw.len() - 1] != BASIC_END {
        return Err(ParseError::BadTrailer);
    }

    let checksum_at = raw.len() - 1 - CHECKSUM_LEN;
    let payload = raw.get(4..checksum_at).unwrap_or_default();

    Ok(Notification {
        declared_len: le16(raw, 1),
        opcode: raw[3],
        packet_number: None,
        payload: Bytes::copy_from_slice(payload),
        checksum: le16(raw, checksum_at),
        computed_checksum: checksum(&raw[1..checksum_at]),
    })
}
