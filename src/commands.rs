//! Opcode table and command builders
//!
//! Builders are pure: they turn options into a `Command` and never touch
//! the transport. Apply a command with `CommandSession::send` or
//! `CommandSession::send_and_wait`.

use crate::pixel::FramePart;
use chrono::{Datelike, NaiveDateTime, Timelike};

/// One-byte opcodes understood by the device
pub mod opcode {
    pub const SET_RADIO: u8 = 0x05;
    pub const SET_VOLUME: u8 = 0x08;
    pub const GET_VOLUME: u8 = 0x09;
    pub const SET_PLAY_STATE: u8 = 0x0A;
    pub const GET_PLAY_STATE: u8 = 0x0B;
    pub const SET_DATE_TIME: u8 = 0x18;
    pub const SET_SLEEP_TIME: u8 = 0x40;
    pub const GET_ALARM: u8 = 0x42;
    pub const SET_ALARM: u8 = 0x43;
    pub const SET_IMAGE: u8 = 0x44;
    pub const SET_VIEW: u8 = 0x45;
    /// Get current channel and brightness
    pub const GET_VIEW: u8 = 0x46;
    pub const SET_ANIMATION_FRAME: u8 = 0x49;
    pub const GET_TOOL: u8 = 0x71;
    pub const SET_TOOL: u8 = 0x72;
    pub const SET_BRIGHTNESS: u8 = 0x74;
    pub const SET_GAME: u8 = 0xA0;
}

/// Highest volume step the device accepts
pub const MAX_VOLUME: u8 = 15;

/// Highest brightness percentage
pub const MAX_BRIGHTNESS: u8 = 100;

/// Opcode plus ordered argument bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub opcode: u8,
    pub args: Vec<u8>,
}

impl Command {
    pub fn new(opcode: u8, args: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            args: args.into(),
        }
    }

    /// Command without arguments
    pub fn bare(opcode: u8) -> Self {
        Self::new(opcode, Vec::new())
    }
}

pub fn get_volume() -> Command {
    Command::bare(opcode::GET_VOLUME)
}

/// Volume step, clamped to `0..=MAX_VOLUME`
pub fn set_volume(level: u8) -> Command {
    Command::new(opcode::SET_VOLUME, [level.min(MAX_VOLUME)])
}

/// Brightness percentage, clamped to `0..=MAX_BRIGHTNESS`
pub fn set_brightness(percent: u8) -> Command {
    Command::new(opcode::SET_BRIGHTNESS, [percent.min(MAX_BRIGHTNESS)])
}

/// Ask for the active channel and brightness
pub fn get_view() -> Command {
    Command::bare(opcode::GET_VIEW)
}

pub fn set_view(channel: u8) -> Command {
    Command::new(opcode::SET_VIEW, [channel])
}

/// Device clock: year split in two bytes, then month through seconds
pub fn set_date_time(at: NaiveDateTime) -> Command {
    let year = at.year().clamp(0, 9999) as u16;
    Command::new(
        opcode::SET_DATE_TIME,
        [
            (year % 100) as u8,
            (year / 100) as u8,
            at.month() as u8,
            at.day() as u8,
            at.hour() as u8,
            at.minute() as u8,
            at.second() as u8,
            0x00,
        ],
    )
}

/// Sleep timer in minutes; the mode byte is always the plain timer (0)
pub fn set_sleep_time(minutes: u8, enabled: bool) -> Command {
    Command::new(opcode::SET_SLEEP_TIME, [minutes, 0x00, u8::from(enabled)])
}

/// Upload one frame part of a static image
pub fn show_image(part: &FramePart) -> Command {
    Command::new(opcode::SET_IMAGE, part.to_bytes())
}

/// Upload one frame part of an animation
pub fn animation_part(part: &FramePart) -> Command {
    Command::new(opcode::SET_ANIMATION_FRAME, part.to_bytes())
}
