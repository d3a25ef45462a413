/// Configuration for a [`Channel`](crate::Channel).
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Ring buffer capacity in items (default: 16). Must be non-zero;
    /// a full buffer blocks senders rather than growing.
    pub capacity: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, enable_metrics: bool) -> Self {
        Self {
            capacity,
            enable_metrics,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 16,
            enable_metrics: false,
        }
    }
}
