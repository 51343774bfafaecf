//! Traffic statistics for a command session
//!
//! Thread-safe counters shared by the caller path and the notification
//! pump. Uses lock-free atomics for all operations.

use std::sync::atomic::{AtomicU64, Ordering};

/// Session counters (fully lock-free)
#[derive(Debug, Default)]
pub struct Stats {
    /// Total bytes written to the device
    tx_bytes: AtomicU64,
    /// Total bytes received in notifications
    rx_bytes: AtomicU64,
    /// Frames sent (before chunking)
    frames_sent: AtomicU64,
    /// Notifications received, parsed or not
    notifications: AtomicU64,
    /// Notifications that resolved a pending request
    matched: AtomicU64,
    /// Notifications that failed to parse
    dropped: AtomicU64,
    /// Correlated requests that hit their deadline
    timeouts: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub frames_sent: u64,
    pub notifications: u64,
    pub matched: u64,
    pub dropped: u64,
    pub timeouts: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_tx(&self, bytes: usize) {
        self.tx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_frame(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one inbound notification of `bytes` length
    #[inline]
    pub fn add_notification(&self, bytes: usize) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
        self.rx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_matched(&self) {
        self.matched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = Stats::new();
        stats.add_tx(10);
        stats.add_tx(5);
        stats.add_frame();
        stats.add_notification(7);
        stats.add_matched();
        stats.add_dropped();
        stats.add_timeout();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                tx_bytes: 15,
                rx_bytes: 7,
                frames_sent: 1,
                notifications: 1,
                matched: 1,
                dropped: 1,
                timeouts: 1,
            }
        );
    }

    #[test]
    fn test_shared_across_threads() {
        let stats = std::sync::Arc::new(Stats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.add_tx(1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.snapshot().tx_bytes, 400);
    }
}
