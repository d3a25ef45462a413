//! RingMPMC - Blocking Bounded Multi-Producer Multi-Consumer Channel
//!
//! A fixed-capacity ring buffer guarded by a single mutex and two condition
//! variables (`space_available` and `data_available`). Producers and
//! consumers register explicitly; the registration counts are the
//! termination oracle, so termination is detected in both directions
//! without busy-waiting:
//!
//! - A consumer blocked on an empty buffer wakes and stops once the last
//!   sender deregisters ("no more data is coming").
//! - A sender observing zero registered receivers fails fast instead of
//!   blocking forever ("no one will ever receive").
//!
//! # Key Features
//!
//! - Backpressure: a full buffer blocks senders; it never drops or grows
//! - Registration-counted shutdown, supporting any M-producer N-consumer topology
//! - Defensive departure broadcasts to rule out missed wakeups
//! - Global FIFO extraction order
//! - Optional `finish()` broadcast shutdown and metrics collection
//!
//! # Example
//!
//! ```
//! use ringmpmc::Channel;
//!
//! let channel = Channel::<u64>::with_capacity(16);
//! let tx = channel.register_sender();
//! let rx = channel.register_receiver();
//!
//! tx.send(1).unwrap();
//! tx.send(2).unwrap();
//! drop(tx); // deregisters: receivers will observe "no more data"
//!
//! let mut sum = 0;
//! while let Some(v) = rx.recv() {
//!     sum += v;
//! }
//! assert_eq!(sum, 3);
//! ```
//!
//! The channel transfers ownership of items from sender to receiver. Items
//! still buffered when every participant has deregistered are dropped with
//! the channel, or can be handed to a caller-supplied closure via
//! [`Channel::drain_with`].

mod channel;
mod config;
mod invariants;
mod metrics;
mod ring;
mod sync;

pub use channel::{Channel, Receiver, SendError, Sender};
pub use config::Config;
pub use metrics::MetricsSnapshot;
