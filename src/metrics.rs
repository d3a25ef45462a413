use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of channel metrics.
///
/// All counters are zero unless the channel was created with
/// [`Config::enable_metrics`](crate::Config) set.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    /// Items accepted by `send`.
    pub messages_sent: u64,
    /// Items returned by `recv`.
    pub messages_received: u64,
    /// Times a sender parked because the buffer was full (backpressure).
    pub send_waits: u64,
    /// Times a receiver parked because the buffer was empty.
    pub recv_waits: u64,
    /// Sends rejected because no receivers were registered.
    pub rejected_sends: u64,
    /// Leftover items handed out by `drain_with`.
    pub drained: u64,
}

/// Thread-safe counters.
///
/// Writers bump these while holding the channel lock, but snapshots are
/// taken without it, so the counters must be atomic. The hot send/receive
/// counters are cache-padded because producer and consumer threads hammer
/// different counters.
pub(crate) struct Metrics {
    messages_sent: CachePadded<AtomicU64>,
    messages_received: CachePadded<AtomicU64>,
    send_waits: AtomicU64,
    recv_waits: AtomicU64,
    rejected_sends: AtomicU64,
    drained: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self {
            messages_sent: CachePadded::new(AtomicU64::new(0)),
            messages_received: CachePadded::new(AtomicU64::new(0)),
            send_waits: AtomicU64::new(0),
            recv_waits: AtomicU64::new(0),
            rejected_sends: AtomicU64::new(0),
            drained: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn add_messages_sent(&self, n: u64) {
        self.messages_sent.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_messages_received(&self, n: u64) {
        self.messages_received.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_send_wait(&self) {
        self.send_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_recv_wait(&self) {
        self.recv_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_rejected_send(&self) {
        self.rejected_sends.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_drained(&self, n: u64) {
        self.drained.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            send_waits: self.send_waits.load(Ordering::Relaxed),
            recv_waits: self.recv_waits.load(Ordering::Relaxed),
            rejected_sends: self.rejected_sends.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
        }
    }
}
