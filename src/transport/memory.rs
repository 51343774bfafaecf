//! In-memory transport
//!
//! Records every write and read, serves fixed characteristic values and lets
//! the owner push notifications. Clones share the same device, so one clone
//! can be handed to a session while another drives it.
//!
//! Used by the CLI dry run and by tests.

use super::{Characteristic, Properties, Transport};
use crate::constants::CHANNEL_CAPACITY;
use crate::error::{Error, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Standard write characteristic of the simulated device
pub const WRITE_UUID: &str = "49535343-8841-43f4-a8d4-ecbe34729bb3";
/// Standard notify characteristic of the simulated device
pub const NOTIFY_UUID: &str = "49535343-1e4d-4bd9-ba61-23c647249616";
/// Readable device-name characteristic of the simulated device
pub const NAME_UUID: &str = "00002a00-0000-1000-8000-00805f9b34fb";

type Responder = Box<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

#[derive(Default)]
struct State {
    connected: bool,
    fail_writes: bool,
    writes: Vec<(String, Bytes)>,
    reads: Vec<String>,
    values: HashMap<String, Bytes>,
    subscribers: HashMap<String, mpsc::Sender<Bytes>>,
}

struct Inner {
    characteristics: Vec<Characteristic>,
    state: Mutex<State>,
    responder: Mutex<Option<Responder>>,
}

/// Simulated device held entirely in memory
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl MemoryTransport {
    /// Device with the given characteristics
    pub fn new(characteristics: Vec<Characteristic>) -> Self {
        Self {
            inner: Arc::new(Inner {
                characteristics,
                state: Mutex::new(State::default()),
                responder: Mutex::new(None),
            }),
        }
    }

    /// Device with one write, one notify and one readable characteristic
    pub fn standard() -> Self {
        let transport = Self::new(vec![
            Characteristic::new(
                WRITE_UUID,
                Properties {
                    write: true,
                    write_without_response: true,
                    ..Default::default()
                },
            ),
            Characteristic::new(
                NOTIFY_UUID,
                Properties {
                    notify: true,
                    ..Default::default()
                },
            ),
            Characteristic::new(
                NAME_UUID,
                Properties {
                    read: true,
                    ..Default::default()
                },
            ),
        ]);
        transport.set_value(NAME_UUID, Bytes::from_static(b"Matrix-16"));
        transport
    }

    /// Value returned by `read()` for `uuid`
    pub fn set_value(&self, uuid: &str, value: Bytes) {
        self.inner.state.lock().values.insert(uuid.to_string(), value);
    }

    /// Make every following write fail
    pub fn fail_writes(&self, fail: bool) {
        self.inner.state.lock().fail_writes = fail;
    }

    /// Reply to each write with the notification `responder` returns
    ///
    /// Replies go to every subscribed characteristic.
    pub fn set_responder(
        &self,
        responder: impl Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    ) {
        *self.inner.responder.lock() = Some(Box::new(responder));
    }

    /// Push a notification to subscribers of `uuid`
    ///
    /// Returns false if nobody is subscribed or the channel is full.
    pub fn notify(&self, uuid: &str, data: impl Into<Bytes>) -> bool {
        let state = self.inner.state.lock();
        match state.subscribers.get(uuid) {
            Some(tx) => tx.try_send(data.into()).is_ok(),
            None => false,
        }
    }

    /// Every successful write so far, in order
    pub fn writes(&self) -> Vec<(String, Bytes)> {
        self.inner.state.lock().writes.clone()
    }

    /// Concatenation of all bytes written to `uuid`
    pub fn written_bytes(&self, uuid: &str) -> Vec<u8> {
        self.inner
            .state
            .lock()
            .writes
            .iter()
            .filter(|(u, _)| u == uuid)
            .flat_map(|(_, data)| data.iter().copied())
            .collect()
    }

    /// Characteristics read so far, in order
    pub fn reads(&self) -> Vec<String> {
        self.inner.state.lock().reads.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().connected
    }

    fn broadcast(&self, data: Vec<u8>) {
        let data = Bytes::from(data);
        let state = self.inner.state.lock();
        for tx in state.subscribers.values() {
            let _ = tx.try_send(data.clone());
        }
    }
}

impl Transport for MemoryTransport {
    async fn connect(&self) -> Result<()> {
        self.inner.state.lock().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.connected = false;
        // Dropping the senders closes every notification channel
        state.subscribers.clear();
        Ok(())
    }

    fn characteristics(&self) -> Vec<Characteristic> {
        self.inner.characteristics.clone()
    }

    async fn write(&self, uuid: &str, data: &[u8]) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if !state.connected {
                return Err(Error::transport("write", "not connected"));
            }
            if state.fail_writes {
                return Err(Error::transport("write", "simulated write failure"));
            }
            state
                .writes
                .push((uuid.to_string(), Bytes::copy_from_slice(data)));
        }

        let reply = self
            .inner
            .responder
            .lock()
            .as_ref()
            .and_then(|respond| respond(data));
        if let Some(reply) = reply {
            self.broadcast(reply);
        }
        Ok(())
    }

    async fn read(&self, uuid: &str) -> Result<Bytes> {
        let mut state = self.inner.state.lock();
        if !state.connected {
            return Err(Error::transport("read", "not connected"));
        }
        state.reads.push(uuid.to_string());
        state
            .values
            .get(uuid)
            .cloned()
            .ok_or_else(|| Error::transport("read", format!("{} has no value", uuid)))
    }

    async fn subscribe(&self, uuid: &str) -> Result<mpsc::Receiver<Bytes>> {
        let mut state = self.inner.state.lock();
        if !state.connected {
            return Err(Error::transport("subscribe", "not connected"));
        }
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        state.subscribers.insert(uuid.to_string(), tx);
        Ok(rx)
    }
}
