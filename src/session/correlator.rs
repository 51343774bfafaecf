//! Response correlator
//!
//! Tracks at most one outstanding expected opcode and matches inbound
//! notifications against it:
//!
//! ```text
//! Idle ──begin_await──▶ Awaiting(opcode, deadline)
//!                         │               │
//!                  matching notif      deadline
//!                         ▼               ▼
//!                      Matched         TimedOut
//!                         └──────┬────────┘
//!                                ▼
//!                              Idle
//! ```
//!
//! The pending slot is the only state shared between the notification pump
//! and the waiting caller. Both the match path and the timeout path take the
//! slot under the same lock, so exactly one of them wins.

use super::stats::Stats;
use crate::codec::{to_hex, Notification, ProtocolVariant};
use crate::commands::opcode;
use crate::error::{Error, ParseError, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Slice of a GET_VIEW payload holding channel and brightness
const VIEW_RESPONSE: Range<usize> = 3..5;

/// Observable correlator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelatorState {
    Idle,
    Awaiting { opcode: u8, deadline: Instant },
}

/// What `on_notification` did with one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Resolved the pending expectation
    Matched { opcode: u8 },
    /// Parsed, but a different opcode is awaited
    Mismatched { expected: u8, received: u8 },
    /// Parsed while nothing was awaited
    Unsolicited { opcode: u8 },
    /// Could not be parsed; dropped
    Dropped(ParseError),
}

struct Pending {
    ticket: u64,
    opcode: u8,
    deadline: Instant,
    tx: oneshot::Sender<Bytes>,
}

/// Single-slot request/response matcher
pub struct Correlator {
    variant: ProtocolVariant,
    pending: Mutex<Option<Pending>>,
    next_ticket: AtomicU64,
    stats: Arc<Stats>,
}

impl Correlator {
    pub fn new(variant: ProtocolVariant, stats: Arc<Stats>) -> Self {
        Self {
            variant,
            pending: Mutex::new(None),
            next_ticket: AtomicU64::new(1),
            stats,
        }
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    pub fn state(&self) -> CorrelatorState {
        match self.pending.lock().as_ref() {
            Some(p) => CorrelatorState::Awaiting {
                opcode: p.opcode,
                deadline: p.deadline,
            },
            None => CorrelatorState::Idle,
        }
    }

    /// Start waiting for a notification carrying `opcode`
    ///
    /// Replaces any expectation already in flight; its waiter then
    /// resolves as a timeout. Concurrent callers must serialize.
    pub fn begin_await(self: &Arc<Self>, opcode: u8, timeout: Duration) -> Expectation {
        let (tx, rx) = oneshot::channel();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + timeout;

        let previous = self.pending.lock().replace(Pending {
            ticket,
            opcode,
            deadline,
            tx,
        });
        if let Some(previous) = previous {
            warn!(
                "Expectation for {:#04x} replaced by {:#04x}",
                previous.opcode, opcode
            );
        }

        Expectation {
            correlator: self.clone(),
            ticket,
            opcode,
            deadline,
            timeout,
            rx,
        }
    }

    /// Feed one raw notification, in arrival order
    pub fn on_notification(&self, raw: &[u8]) -> NotificationOutcome {
        self.stats.add_notification(raw.len());

        let notification = match self.variant.codec().decode(raw) {
            Ok(n) => n,
            Err(e) => return self.drop_notification(raw, e),
        };
        if !notification.checksum_valid() {
            debug!(
                "Checksum mismatch on {:#04x} notification: {}",
                notification.opcode,
                to_hex(raw)
            );
        }

        let mut slot = self.pending.lock();
        let expected = match slot.as_ref() {
            Some(p) => p.opcode,
            None => {
                debug!("Unsolicited notification {:#04x}", notification.opcode);
                return NotificationOutcome::Unsolicited {
                    opcode: notification.opcode,
                };
            }
        };

        if notification.opcode != expected {
            warn!(
                "Awaiting {:#04x}, received {:#04x}; still waiting",
                expected, notification.opcode
            );
            return NotificationOutcome::Mismatched {
                expected,
                received: notification.opcode,
            };
        }

        let payload = match response_payload(&notification) {
            Ok(payload) => payload,
            Err(e) => {
                drop(slot);
                return self.drop_notification(raw, e);
            }
        };

        if let Some(pending) = slot.take() {
            // The waiter may already be gone; the slot is cleared either way
            let _ = pending.tx.send(payload);
        }
        self.stats.add_matched();
        debug!("Matched notification {:#04x}", expected);
        NotificationOutcome::Matched { opcode: expected }
    }

    /// Clear the slot if it still holds `ticket`
    fn expire(&self, ticket: u64) -> bool {
        let mut slot = self.pending.lock();
        match slot.as_ref() {
            Some(p) if p.ticket == ticket => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    fn drop_notification(&self, raw: &[u8], error: ParseError) -> NotificationOutcome {
        self.stats.add_dropped();
        warn!("Dropping notification ({}): {}", error, to_hex(raw));
        NotificationOutcome::Dropped(error)
    }
}

/// Payload delivered to the waiter for a matched notification
fn response_payload(notification: &Notification) -> std::result::Result<Bytes, ParseError> {
    if notification.opcode != opcode::GET_VIEW {
        return Ok(notification.payload.clone());
    }
    if notification.payload.len() < VIEW_RESPONSE.end {
        return Err(ParseError::ShortPayload {
            opcode: notification.opcode,
            len: notification.payload.len(),
            min: VIEW_RESPONSE.end,
        });
    }
    Ok(notification.payload.slice(VIEW_RESPONSE))
}

/// Handle on one pending expectation
///
/// Dropping the handle clears the expectation if it is still pending.
pub struct Expectation {
    correlator: Arc<Correlator>,
    ticket: u64,
    opcode: u8,
    deadline: Instant,
    timeout: Duration,
    rx: oneshot::Receiver<Bytes>,
}

impl Expectation {
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait for the matching payload or the deadline
    pub async fn wait(mut self) -> Result<Bytes> {
        match tokio::time::timeout_at(self.deadline, &mut self.rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => {
                // Sender dropped: replaced by a newer expectation
                Err(self.timeout_error())
            }
            Err(_) => {
                if self.correlator.expire(self.ticket) {
                    return Err(self.timeout_error());
                }
                // A notification took the slot before the deadline fired
                self.rx.try_recv().map_err(|_| self.timeout_error())
            }
        }
    }

    /// Abandon the expectation without waiting
    pub fn cancel(self) {
        self.correlator.expire(self.ticket);
    }

    fn timeout_error(&self) -> Error {
        Error::Timeout {
            opcode: self.opcode,
            after: self.timeout,
        }
    }
}

impl Drop for Expectation {
    fn drop(&mut self) {
        self.correlator.expire(self.ticket);
    }
}
