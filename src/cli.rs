//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use crate::codec::{parse_hex, ProtocolVariant};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Command protocol and pixel codec for BLE color-matrix displays
#[derive(Parser, Debug)]
#[command(name = "dm-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: dm-bridge.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Framing variant (overrides config)
    #[arg(long, value_name = "VARIANT", value_parser = parse_protocol, global = true)]
    pub protocol: Option<ProtocolVariant>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one command frame and print it as hex
    Encode {
        /// Opcode, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_byte)]
        opcode: u8,

        /// Argument bytes as hex
        #[arg(value_parser = parse_bytes, default_value = "")]
        args: HexBytes,

        /// Packet number for Extended frames
        #[arg(long, default_value_t = 0)]
        packet: u32,

        /// Also print the frame split into chunks of this size
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<usize>,
    },

    /// Parse a notification given as hex
    Decode {
        /// Notification bytes as hex
        #[arg(value_parser = parse_bytes)]
        frame: HexBytes,
    },

    /// Encode a sprite file into frame-part commands
    Sprite {
        /// Sprite file (TOML)
        file: PathBuf,

        /// Maximum bytes per animation part (overrides config)
        #[arg(long, value_name = "BYTES")]
        part_size: Option<usize>,
    },

    /// Send a command to a simulated device and show the traffic
    Send {
        /// Opcode, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_byte)]
        opcode: u8,

        /// Argument bytes as hex
        #[arg(value_parser = parse_bytes, default_value = "")]
        args: HexBytes,

        /// Wait for the response notification
        #[arg(long)]
        wait: bool,

        /// Notification the simulated device answers with (hex)
        #[arg(long, value_parser = parse_bytes, requires = "wait")]
        reply: Option<HexBytes>,

        /// Response timeout (overrides config)
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Device id used for the characteristic cache
        #[arg(long, value_name = "ID")]
        device: Option<String>,
    },
}

/// Byte string given on the command line as hex
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

/// Byte value written as `70` or `0x46`
pub fn parse_byte(input: &str) -> Result<u8, String> {
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("'{}' is not a byte value", input))
}

/// Hex byte string such as `01 03 00` or `010300`
pub fn parse_bytes(input: &str) -> Result<HexBytes, String> {
    parse_hex(input).map(HexBytes).ok_or_else(|| format!("'{}' is not a hex byte string", input))
}

pub fn parse_protocol(input: &str) -> Result<ProtocolVariant, String> {
    match input.to_ascii_lowercase().as_str() {
        "basic" => Ok(ProtocolVariant::Basic),
        "extended" => Ok(ProtocolVariant::Extended),
        _ => Err(format!("unknown protocol '{}' (basic or extended)", input)),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["dm-bridge", "-v", "decode", "01"]);
        assert!(cli.verbose);

        let cli = Cli::parse_from(["dm-bridge", "decode", "01", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_encode() {
        let cli = Cli::parse_from(["dm-bridge", "encode", "0x09"]);
        match cli.command {
            Command::Encode {
                opcode,
                args,
                packet,
                chunk_size,
            } => {
                assert_eq!(opcode, 0x09);
                assert!(args.0.is_empty());
                assert_eq!(packet, 0);
                assert_eq!(chunk_size, None);
            }
            _ => panic!("Expected Encode command"),
        }
        assert_eq!(cli.protocol, None);
    }

    #[test]
    fn test_cli_parse_encode_extended() {
        let cli = Cli::parse_from([
            "dm-bridge",
            "--protocol",
            "extended",
            "encode",
            "116",
            "50",
            "--packet",
            "7",
        ]);
        assert_eq!(cli.protocol, Some(ProtocolVariant::Extended));
        match cli.command {
            Command::Encode {
                opcode,
                args,
                packet,
                ..
            } => {
                assert_eq!(opcode, 0x74);
                assert_eq!(args.0, vec![0x50]);
                assert_eq!(packet, 7);
            }
            _ => panic!("Expected Encode command"),
        }
    }

    #[test]
    fn test_cli_parse_send_with_reply() {
        let cli = Cli::parse_from([
            "dm-bridge",
            "--config",
            "my.toml",
            "send",
            "0x46",
            "--wait",
            "--reply",
            "01 05 00 46 00 00 00 02",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        match cli.command {
            Command::Send {
                opcode,
                wait,
                reply,
                ..
            } => {
                assert_eq!(opcode, 0x46);
                assert!(wait);
                assert_eq!(reply.map(|r| r.0.len()), Some(8));
            }
            _ => panic!("Expected Send command"),
        }
    }

    #[test]
    fn test_reply_requires_wait() {
        let result = Cli::try_parse_from(["dm-bridge", "send", "9", "--reply", "01"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Cli::try_parse_from(["dm-bridge", "encode", "300"]).is_err());
        assert!(Cli::try_parse_from(["dm-bridge", "decode", "0g"]).is_err());
        assert!(Cli::try_parse_from(["dm-bridge", "--protocol", "x", "decode", "01"]).is_err());
    }

    #[test]
    fn test_parse_byte() {
        assert_eq!(parse_byte("0x46"), Ok(0x46));
        assert_eq!(parse_byte("0XFF"), Ok(0xFF));
        assert_eq!(parse_byte("9"), Ok(9));
        assert!(parse_byte("256").is_err());
    }
}
