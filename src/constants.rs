//! Protocol and application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Basic framing (01 ... 02)
// =============================================================================

/// Leading marker of a Basic frame
pub const BASIC_START: u8 = 0x01;

/// Trailing marker of a Basic frame
pub const BASIC_END: u8 = 0x02;

/// Shortest notification accepted as a Basic frame
pub const BASIC_MIN_NOTIFICATION_LEN: usize = 6;

// =============================================================================
// Extended framing (FE EF AA 55 ...)
// =============================================================================

/// Magic header of an Extended frame
pub const EXTENDED_MAGIC: [u8; 4] = [0xFE, 0xEF, 0xAA, 0x55];

/// Shortest notification accepted as an Extended frame
/// (magic + length + opcode + packet number + checksum)
pub const EXTENDED_MIN_NOTIFICATION_LEN: usize = 13;

/// Width of the checksum field in both variants
pub const CHECKSUM_LEN: usize = 2;

// =============================================================================
// Pixel frames
// =============================================================================

/// Marker byte that opens every static or animated frame payload
pub const FRAME_MARKER: u8 = 0xAA;

/// Added to the static body length to form the size field
pub const STATIC_SIZE_OFFSET: usize = 6;

/// Added to the animated body length to form the size field
pub const ANIMATION_SIZE_OFFSET: usize = 6;

/// Maximum distinct colors in one frame
pub const MAX_PALETTE_COLORS: usize = 256;

/// Frame index carried by the part header of a standalone static image
pub const STATIC_FRAME_INDEX: i8 = -1;

/// Side length of the panel in pixels
pub const DEFAULT_PANEL_SIZE: usize = 16;

// =============================================================================
// Session defaults
// =============================================================================

/// Default maximum bytes per transport write
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Default maximum bytes per frame part
pub const DEFAULT_FRAME_PART_SIZE: usize = 200;

/// Pause between consecutive chunk writes (milliseconds)
pub const DEFAULT_WRITE_PAUSE_MS: u64 = 10;

/// Deadline for a correlated response (milliseconds)
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 2000;

// =============================================================================
// Buffers
// =============================================================================

/// Channel capacity for notification delivery
pub const CHANNEL_CAPACITY: usize = 256;

/// Default file name of the characteristic cache
pub const DEFAULT_CACHE_FILE: &str = "dm-bridge-cache.json";

/// Default file name of the configuration
pub const DEFAULT_CONFIG_FILE: &str = "dm-bridge.toml";
