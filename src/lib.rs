//! dm-bridge - command protocol and pixel codec for BLE color-matrix displays
//!
//! Layers, leaves first:
//! - [`codec`]: Basic and Extended framing, checksum, chunking
//! - [`pixel`]: palette-indexed static and animated frame payloads
//! - [`session`]: command session with single-slot response correlation
//! - [`transport`]: characteristic I/O seam plus an in-memory device
//!
//! Supporting modules: [`commands`] (opcodes and builders), [`config`],
//! [`cache`], [`sprite`], [`logging`], [`error`].

pub mod cache;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pixel;
pub mod session;
pub mod sprite;
pub mod transport;

pub use error::{Error, Result};
