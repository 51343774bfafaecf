//! Wire codec for the device command protocol
//!
//! Separates framing concerns from the session:
//! - **Codec**: how a command becomes wire bytes, and how a notification is parsed
//! - **Chunking**: how an encoded frame is split for the transport
//!
//! Two framing variants exist:
//! - **Basic**: `01 ‖ LE16(len) ‖ opcode ‖ args ‖ LE16(checksum) ‖ 02`
//! - **Extended**: `FE EF AA 55 ‖ LE16(len) ‖ opcode ‖ LE32(packet) ‖ args ‖ LE16(checksum)`
//!
//! Both checksums are the 16-bit wrapping sum of every byte from the length
//! field up to (not including) the checksum itself.

pub mod basic;
pub mod chunk;
pub mod extended;

pub use basic::{decode_basic, encode_basic, BasicCodec};
pub use chunk::chunks;
pub use extended::{decode_extended, encode_extended, ExtendedCodec};

use crate::error::{EncodingError, ParseError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Framing variant spoken by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// `01 … 02` framing
    #[default]
    Basic,
    /// Magic-header framing with packet numbers
    Extended,
}

impl ProtocolVariant {
    /// Codec implementing this variant
    pub fn codec(self) -> &'static dyn Codec {
        match self {
            Self::Basic => &BasicCodec,
            Self::Extended => &ExtendedCodec,
        }
    }
}

impl std::fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// Parsed inbound notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Length field as declared by the device
    pub declared_len: u16,
    /// Opcode the notification answers
    pub opcode: u8,
    /// Packet number (Extended only)
    pub packet_number: Option<u32>,
    /// Bytes between the header fields and the checksum
    pub payload: Bytes,
    /// Checksum as transmitted
    pub checksum: u16,
    /// Checksum recomputed over the received bytes
    computed_checksum: u16,
}

impl Notification {
    /// True when the transmitted checksum matches the received bytes
    pub fn checksum_valid(&self) -> bool {
        self.checksum == self.computed_checksum
    }
}

/// Codec trait for one framing variant
///
/// A codec turns an opcode and its arguments into a frame (encode)
/// and raw notification bytes into a `Notification` (decode).
pub trait Codec: Send + Sync {
    /// Encode a command, appending the frame to `output`
    ///
    /// `packet_number` is ignored by variants that do not carry one.
    fn encode(
        &self,
        opcode: u8,
        args: &[u8],
        packet_number: u32,
        output: &mut Vec<u8>,
    ) -> Result<(), EncodingError>;

    /// Parse one complete notification
    fn decode(&self, raw: &[u8]) -> Result<Notification, ParseError>;
}

/// 16-bit wrapping sum of `bytes`
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Space-separated lowercase hex, e.g. `01 03 00`
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex bytes separated by whitespace, commas or nothing
///
/// Accepts an optional `0x` prefix per byte group.
pub fn parse_hex(input: &str) -> Option<Vec<u8>> {
    let mut digits = String::with_capacity(input.len());
    for group in input.split(|c: char| c.is_whitespace() || c == ',') {
        let group = group
            .strip_prefix("0x")
            .or_else(|| group.strip_prefix("0X"))
            .unwrap_or(group);
        if group.len() % 2 != 0 || !group.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        digits.push_str(group);
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

/// Read a little-endian u16 at `offset` (caller checks bounds)
#[inline]
fn le16(raw: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([raw[offset], raw[offset + 1]])
}

/// Checked conversion of a length into the 16-bit length field
fn length_field(len: usize) -> Result<u16, EncodingError> {
    u16::try_from(len).map_err(|_| EncodingError::TooLarge {
        size: len,
        max: u16::MAX as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_wraps() {
        let data = vec![0xFF; 300];
        let expected = (0xFFu32 * 300 % 65536) as u16;
        assert_eq!(checksum(&data), expected);
    }

    #[test]
    fn test_hex_roundtrip() {
        assert_eq!(to_hex(&[0x01, 0x03, 0xAB]), "01 03 ab");
        assert_eq!(parse_hex("01 03 ab"), Some(vec![0x01, 0x03, 0xAB]));
        assert_eq!(parse_hex("0x010c,02"), Some(vec![0x01, 0x0C, 0x02]));
        assert_eq!(parse_hex(""), Some(vec![]));
        assert_eq!(parse_hex("123"), None);
        assert_eq!(parse_hex("zz"), None);
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_variant_dispatch() {
        let mut basic = Vec::new();
        ProtocolVariant::Basic
            .codec()
            .encode(0x09, &[], 7, &mut basic)
            .unwrap();
        assert_eq!(basic, encode_basic(0x09, &[]).unwrap());

        let mut extended = Vec::new();
        ProtocolVariant::Extended
            .codec()
            .encode(0x09, &[], 7, &mut extended)
            .unwrap();
        assert_eq!(extended, encode_extended(0x09, &[], 7).unwrap());
    }

    #[test]
    fn test_variant_toml_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            protocol: ProtocolVariant,
        }

        let basic: Wrapper = toml::from_str("protocol = \"basic\"").unwrap();
        let extended: Wrapper = toml::from_str("protocol = \"extended\"").unwrap();
        assert_eq!(basic.protocol, ProtocolVariant::Basic);
        assert_eq!(extended.protocol, ProtocolVariant::Extended);
        assert_eq!(ProtocolVariant::default(), ProtocolVariant::Basic);
    }
}
