//! Centralized error types
//!
//! All crate errors are represented by the `Error` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, Error>`.
//!
//! Encoding and parse failures carry their own enums so that the codec
//! layers can return them without depending on the session.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Failure to turn a command or image into wire bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// A length field would not fit its 16-bit encoding
    TooLarge { size: usize, max: usize },
    /// More distinct colors than one palette can index
    PaletteOverflow { colors: usize },
    /// Encoded frame exceeds the protocol size field
    FrameTooLarge { size: usize, max: usize },
    /// Color input could not be resolved to RGB
    InvalidColor { input: String },
    /// Raster does not match the panel dimensions
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// Pixel buffer length does not equal width × height
    PixelCountMismatch { expected: usize, found: usize },
    /// Animation without any frame
    EmptyAnimation,
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { size, max } => {
                write!(f, "Encoding too large: {} bytes (max {})", size, max)
            }
            Self::PaletteOverflow { colors } => {
                write!(f, "Palette overflow: {} colors (max 256)", colors)
            }
            Self::FrameTooLarge { size, max } => {
                write!(f, "Frame too large: {} bytes (max {})", size, max)
            }
            Self::InvalidColor { input } => write!(f, "Invalid color: {:?}", input),
            Self::DimensionMismatch { expected, found } => write!(
                f,
                "Raster is {}x{}, panel expects {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            Self::PixelCountMismatch { expected, found } => {
                write!(f, "Raster needs {} pixels, got {}", expected, found)
            }
            Self::EmptyAnimation => write!(f, "Animation has no frames"),
        }
    }
}

impl std::error::Error for EncodingError {}

/// Malformed or unrecognized notification bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer bytes than the smallest valid frame
    TooShort { len: usize, min: usize },
    /// Leading marker or magic header missing
    BadHeader,
    /// Trailing marker missing (Basic only)
    BadTrailer,
    /// Payload shorter than the response layout of its opcode
    ShortPayload { opcode: u8, len: usize, min: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len, min } => {
                write!(f, "Notification too short: {} bytes (min {})", len, min)
            }
            Self::BadHeader => write!(f, "Notification header not recognized"),
            Self::BadTrailer => write!(f, "Notification trailer not recognized"),
            Self::ShortPayload { opcode, len, min } => write!(
                f,
                "Response to {:#04x} too short: {} bytes (min {})",
                opcode, len, min
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// All crate errors
#[derive(Debug)]
pub enum Error {
    // === Transport ===
    /// Connection, write, read or subscribe failure
    Transport {
        operation: &'static str,
        message: String,
    },
    /// No characteristic offers the required capability
    NoCharacteristic { capability: &'static str },

    // === Protocol ===
    /// No matching notification before the deadline
    Timeout { opcode: u8, after: Duration },
    /// Command or image could not be encoded
    Encoding(EncodingError),
    /// Notification bytes could not be parsed
    Parse(ParseError),

    // === IO ===
    /// File system operation failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file is not valid TOML for the schema
    ConfigParse { path: PathBuf, message: String },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },
    /// Cache file is not valid JSON for the schema
    CacheFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Sprite file is malformed
    Sprite { path: PathBuf, message: String },
}

impl Error {
    /// Shorthand for a transport failure
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            message: message.into(),
        }
    }

    /// True for the timeout outcome of a correlated request
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::CacheFormat { source, .. } => Some(source),
            Self::Encoding(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { operation, message } => {
                write!(f, "Transport {} failed: {}", operation, message)
            }
            Self::NoCharacteristic { capability } => {
                write!(f, "No {} characteristic available", capability)
            }
            Self::Timeout { opcode, after } => write!(
                f,
                "No response to opcode {:#04x} within {} ms",
                opcode,
                after.as_millis()
            ),
            Self::Encoding(e) => write!(f, "{}", e),
            Self::Parse(e) => write!(f, "{}", e),
            Self::Io { path, .. } => write!(f, "IO error: {}", path.display()),
            Self::ConfigParse { path, message } => {
                write!(f, "Config parse error in {}: {}", path.display(), message)
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::CacheFormat { path, .. } => {
                write!(f, "Invalid cache file: {}", path.display())
            }
            Self::Sprite { path, message } => {
                write!(f, "Invalid sprite {}: {}", path.display(), message)
            }
        }
    }
}

impl From<EncodingError> for Error {
    fn from(e: EncodingError) -> Self {
        Self::Encoding(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

/// Alias for Result with Error
pub type Result<T> = std::result::Result<T, Error>;
