//! Command session - one logical session per device connection
//!
//! The session handles:
//! - Framing commands in the device's protocol variant
//! - Chunking frames and writing them in order
//! - Correlating one outstanding request with its notification
//! - Image and animation upload as frame parts
//!
//! The session does NOT handle:
//! - Device discovery (the transport's job)
//! - Retries (the caller decides)
//! - More than one correlated request at a time (callers must serialize)

pub mod correlator;
pub mod stats;

pub use correlator::{CorrelatorState, Expectation, NotificationOutcome};
pub use stats::{Stats, StatsSnapshot};

use self::correlator::Correlator;
use crate::codec::{chunks, to_hex, ProtocolVariant};
use crate::commands::{self, Command};
use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_FRAME_PART_SIZE, DEFAULT_PANEL_SIZE,
    DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_WRITE_PAUSE_MS,
};
use crate::error::{Error, Result};
use crate::pixel::{self, Animation, Raster};
use crate::transport::{Characteristic, Transport};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Session parameters fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Framing variant spoken by the device
    pub protocol: ProtocolVariant,
    /// Maximum bytes per transport write
    pub chunk_size: usize,
    /// Minimum spacing between consecutive transport writes
    pub write_pause: Duration,
    /// Deadline used by `request()`
    pub response_timeout: Duration,
    /// Maximum bytes per animation frame part
    pub frame_part_size: usize,
    /// Panel side length in pixels
    pub panel_size: usize,
    /// Write characteristic (None = first writable)
    pub write_characteristic: Option<String>,
    /// Notify characteristic (None = first notifying)
    pub notify_characteristic: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolVariant::Basic,
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_pause: Duration::from_millis(DEFAULT_WRITE_PAUSE_MS),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            frame_part_size: DEFAULT_FRAME_PART_SIZE,
            panel_size: DEFAULT_PANEL_SIZE,
            write_characteristic: None,
            notify_characteristic: None,
        }
    }
}

/// Characteristics a session talks through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub write: String,
    pub notify: String,
}

impl Endpoints {
    /// Pick endpoints from explicit config, else by capability
    pub fn resolve(characteristics: &[Characteristic], config: &SessionConfig) -> Result<Self> {
        let write = match &config.write_characteristic {
            Some(uuid) => uuid.clone(),
            None => characteristics
                .iter()
                .find(|c| c.properties.can_write())
                .map(|c| c.uuid.clone())
                .ok_or(Error::NoCharacteristic { capability: "write" })?,
        };
        let notify = match &config.notify_characteristic {
            Some(uuid) => uuid.clone(),
            None => characteristics
                .iter()
                .find(|c| c.properties.notify)
                .map(|c| c.uuid.clone())
                .ok_or(Error::NoCharacteristic {
                    capability: "notify",
                })?,
        };

        for uuid in [&write, &notify] {
            if !characteristics.iter().any(|c| &c.uuid == uuid) {
                warn!("Configured characteristic {} was not discovered", uuid);
            }
        }
        Ok(Self { write, notify })
    }
}

/// Command session over one transport
///
/// # Example
///
/// ```ignore
/// let session = CommandSession::open(transport, SessionConfig::default()).await?;
/// session.send(&commands::set_brightness(80)).await?;
/// let volume = session.request(&commands::get_volume()).await?;
/// ```
pub struct CommandSession<T: Transport> {
    transport: T,
    config: SessionConfig,
    endpoints: Endpoints,
    correlator: Arc<Correlator>,
    packet_number: AtomicU32,
    /// When the last transport write completed
    last_write: Mutex<Option<Instant>>,
    stats: Arc<Stats>,
    pump: JoinHandle<()>,
}

impl<T: Transport> CommandSession<T> {
    /// Connect, pick endpoints, subscribe and start the notification pump
    pub async fn open(transport: T, config: SessionConfig) -> Result<Self> {
        transport.connect().await?;

        let endpoints = Endpoints::resolve(&transport.characteristics(), &config)?;
        let mut notifications = transport.subscribe(&endpoints.notify).await?;

        let stats = Arc::new(Stats::new());
        let correlator = Arc::new(Correlator::new(config.protocol, stats.clone()));

        let pump_correlator = correlator.clone();
        let pump = tokio::spawn(async move {
            while let Some(raw) = notifications.recv().await {
                pump_correlator.on_notification(&raw);
            }
            debug!("Notification channel closed");
        });

        info!(
            "Session open: {} protocol, write {}, notify {}",
            config.protocol, endpoints.write, endpoints.notify
        );

        Ok(Self {
            transport,
            config,
            endpoints,
            correlator,
            packet_number: AtomicU32::new(0),
            last_write: Mutex::new(None),
            stats,
            pump,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn state(&self) -> CorrelatorState {
        self.correlator.state()
    }

    /// UUIDs of every readable characteristic
    pub fn readable_characteristics(&self) -> Vec<String> {
        self.transport
            .characteristics()
            .into_iter()
            .filter(|c| c.properties.read)
            .map(|c| c.uuid)
            .collect()
    }

    /// Frame `command` in the session's variant
    ///
    /// Extended frames consume the next packet number.
    pub fn encode(&self, command: &Command) -> Result<Vec<u8>> {
        let packet_number = match self.config.protocol {
            ProtocolVariant::Basic => 0,
            ProtocolVariant::Extended => self.packet_number.fetch_add(1, Ordering::Relaxed),
        };
        let mut frame = Vec::with_capacity(command.args.len() + 16);
        self.config.protocol.codec().encode(
            command.opcode,
            &command.args,
            packet_number,
            &mut frame,
        )?;
        Ok(frame)
    }

    /// Encode and write a command without waiting for a response
    pub async fn send(&self, command: &Command) -> Result<()> {
        let frame = self.encode(command)?;
        self.write_frame(command.opcode, &frame).await
    }

    /// Send a command and wait for the notification answering it
    ///
    /// On timeout every readable characteristic is read once and logged.
    /// The result stays `Error::Timeout`.
    pub async fn send_and_wait(&self, command: &Command, timeout: Duration) -> Result<Bytes> {
        let frame = self.encode(command)?;
        let expectation = self.correlator.begin_await(command.opcode, timeout);

        if let Err(e) = self.write_frame(command.opcode, &frame).await {
            expectation.cancel();
            return Err(e);
        }

        match expectation.wait().await {
            Err(e) if e.is_timeout() => {
                self.stats.add_timeout();
                warn!("{}", e);
                self.diagnostic_read().await;
                Err(e)
            }
            other => other,
        }
    }

    /// `send_and_wait` with the configured response timeout
    pub async fn request(&self, command: &Command) -> Result<Bytes> {
        self.send_and_wait(command, self.config.response_timeout)
            .await
    }

    /// Upload and display a static image
    pub async fn show_image(&self, raster: &Raster) -> Result<()> {
        raster.ensure_square(self.config.panel_size)?;
        let payload = pixel::encode_static(raster)?;
        let part = pixel::static_part(&payload)?;
        self.send(&commands::show_image(&part)).await
    }

    /// Upload and play an animation
    pub async fn show_animation(&self, animation: &Animation) -> Result<()> {
        for frame in animation.frames() {
            frame.raster.ensure_square(self.config.panel_size)?;
        }
        let frames = pixel::encode_animation(animation)?;
        let parts = pixel::animation_parts(&frames, self.config.frame_part_size)?;

        debug!(
            "Animation: {} frames in {} parts",
            animation.len(),
            parts.len()
        );
        for part in &parts {
            self.send(&commands::animation_part(part)).await?;
        }
        Ok(())
    }

    /// Stop the notification pump and disconnect
    pub async fn close(self) -> Result<()> {
        self.pump.abort();
        self.transport.disconnect().await?;
        info!("Session closed");
        Ok(())
    }

    async fn write_frame(&self, opcode: u8, frame: &[u8]) -> Result<()> {
        let parts = chunks(frame, self.config.chunk_size);
        debug!(
            "Sending {:#04x}: {} bytes in {} chunks",
            opcode,
            frame.len(),
            parts.len()
        );

        for chunk in &parts {
            self.pace().await;
            self.transport.write(&self.endpoints.write, chunk).await?;
            *self.last_write.lock() = Some(Instant::now());
            self.stats.add_tx(chunk.len());
        }
        self.stats.add_frame();
        Ok(())
    }

    /// Hold the next write until `write_pause` has passed since the last one,
    /// whichever command or part that write belonged to
    async fn pace(&self) {
        if self.config.write_pause.is_zero() {
            return;
        }
        let last = *self.last_write.lock();
        if let Some(at) = last {
            tokio::time::sleep_until(at + self.config.write_pause).await;
        }
    }

    /// Best-effort read of every readable characteristic, for the log only
    async fn diagnostic_read(&self) {
        for uuid in self.readable_characteristics() {
            match self.transport.read(&uuid).await {
                Ok(value) => info!("Diagnostic read {}: {}", uuid, to_hex(&value)),
                Err(e) => warn!("Diagnostic read {} failed: {}", uuid, e),
            }
        }
    }
}

impl<T: Transport> Drop for CommandSession<T> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
