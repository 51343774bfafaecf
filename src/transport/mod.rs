//! Transport abstraction for characteristic-based I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: how bytes reach the device (BLE GATT, test doubles...)
//! - **Codec**: how commands are framed (handled separately)
//!
//! A transport exposes the device as a set of characteristics, each
//! advertising what it supports (read, write, notify). Notifications are
//! delivered through a channel in arrival order.
//!
//! A transport does NOT handle:
//! - Framing or chunking (that's the codec's job)
//! - Matching responses to requests (that's the session's job)
//! - Retries (callers decide)

pub mod memory;

pub use memory::MemoryTransport;

use crate::error::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::mpsc;

/// Capabilities advertised by a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub write_without_response: bool,
    pub notify: bool,
}

impl Properties {
    /// Accepts writes of either kind
    pub fn can_write(&self) -> bool {
        self.write || self.write_without_response
    }
}

/// One characteristic of the connected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Characteristic {
    pub uuid: String,
    pub properties: Properties,
}

impl Characteristic {
    pub fn new(uuid: impl Into<String>, properties: Properties) -> Self {
        Self {
            uuid: uuid.into(),
            properties,
        }
    }
}

/// Connection to one device
///
/// # Lifecycle
///
/// 1. `connect()`
/// 2. `characteristics()` to pick write/notify endpoints
/// 3. `subscribe()` to receive notifications
/// 4. `write()` / `read()` while connected
/// 5. `disconnect()`
///
/// Every method maps failures to `Error::Transport`.
pub trait Transport: Send + Sync + 'static {
    /// Open the connection
    fn connect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection; closes notification channels
    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Characteristics discovered on the device
    fn characteristics(&self) -> Vec<Characteristic>;

    /// Write one chunk to a characteristic
    fn write(&self, uuid: &str, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read the current value of a characteristic
    fn read(&self, uuid: &str) -> impl Future<Output = Result<Bytes>> + Send;

    /// Subscribe to notifications of a characteristic
    ///
    /// Returns `None` from `recv()` once the transport stops.
    fn subscribe(&self, uuid: &str) -> impl Future<Output = Result<mpsc::Receiver<Bytes>>> + Send;
}
