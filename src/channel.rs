use crate::metrics::Metrics;
use crate::ring::Ring;
use crate::sync::{Arc, Condvar, Mutex, MutexGuard};
use crate::{Config, MetricsSnapshot};
use thiserror::Error;

/// Error returned by [`Sender::send`] when no receivers are registered.
///
/// Carries the rejected item back to the caller, which decides what to do
/// with it (drop it, stash it, log it). This is an expected termination
/// signal, not a fault: the receiver count is the termination oracle, and
/// a sender that observes zero registered receivers must treat the channel
/// as undeliverable and stop, not retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sending on a channel with no receivers")]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    /// Consumes the error, yielding the item that could not be delivered.
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Everything the mutex guards. No field is ever touched outside the
/// critical section.
struct State<T> {
    ring: Ring<T>,
    senders: usize,
    receivers: usize,
    /// Latched on the first sender registration, never cleared. The live
    /// count alone cannot tell "no producer yet" from "producers came and
    /// went": a waiter woken by the 0->1 broadcast may reacquire the lock
    /// after the sender already deregistered, see a zero count again, and
    /// re-sleep with no wakeup ever coming.
    had_sender: bool,
    /// Same latch for the receiver side.
    had_receiver: bool,
    finished: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    /// Waited on by senders: signaled when a slot frees up or the receiver
    /// side changes.
    space_available: Condvar,
    /// Waited on by receivers: signaled when an item arrives or the sender
    /// side changes.
    data_available: Condvar,
    metrics: Metrics,
    config: Config,
}

impl<T> Shared<T> {
    /// A poisoned mutex means a participant panicked inside a critical
    /// section, which is the fatal error class here; propagate the panic.
    fn lock_state(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().expect("channel lock poisoned")
    }

    /// Like `lock_state`, but recovers the guard from a poisoned lock.
    /// Only for the `Drop` impls: a panic there during unwinding would
    /// abort the process, and deregistration must still happen so that
    /// surviving participants can observe the departure.
    fn lock_state_ignore_poison(&self) -> MutexGuard<'_, State<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Blocking bounded MPMC channel over a mutex-guarded ring buffer.
///
/// `Channel` is a cheaply cloneable shared handle. Producer and consumer
/// threads register through [`register_sender`](Channel::register_sender)
/// and [`register_receiver`](Channel::register_receiver); the returned
/// handles are the registrations, and dropping them deregisters. The
/// registration counts, not a single open/closed flag, decide termination,
/// which is what lets threads join and leave independently in many-to-many
/// topologies.
///
/// Items are extracted in global FIFO order. Which receiver gets a given
/// item when several are blocked is unspecified (first waiter scheduled
/// after the wakeup).
pub struct Channel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Channel<T> {
    /// Creates a new channel with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.capacity` is zero; zero-capacity channels are not
    /// supported.
    pub fn new(config: Config) -> Self {
        assert!(config.capacity > 0, "channel capacity must be non-zero");

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    ring: Ring::new(config.capacity),
                    senders: 0,
                    receivers: 0,
                    had_sender: false,
                    had_receiver: false,
                    finished: false,
                }),
                space_available: Condvar::new(),
                data_available: Condvar::new(),
                metrics: Metrics::new(),
                config,
            }),
        }
    }

    /// Creates a channel with the given capacity and default settings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(Config {
            capacity,
            ..Config::default()
        })
    }

    /// Register a new producer.
    ///
    /// The returned [`Sender`] is the registration; dropping it
    /// deregisters. The first registration wakes receivers parked in
    /// [`Receiver::wait_ready`], whose blocking condition was "no senders
    /// yet".
    pub fn register_sender(&self) -> Sender<T> {
        let mut state = self.shared.lock_state();
        state.senders += 1;
        state.had_sender = true;
        if state.senders == 1 {
            self.shared.data_available.notify_all();
        }
        drop(state);

        Sender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Register a new consumer.
    ///
    /// Symmetric to [`register_sender`](Channel::register_sender): the
    /// first registration wakes senders parked in [`Sender::wait_ready`].
    pub fn register_receiver(&self) -> Receiver<T> {
        let mut state = self.shared.lock_state();
        state.receivers += 1;
        state.had_receiver = true;
        if state.receivers == 1 {
            self.shared.space_available.notify_all();
        }
        drop(state);

        Receiver {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Broadcast shutdown: mark the channel finished and wake everyone.
    ///
    /// This is an optional extension on top of registration counting. Once
    /// finished, [`Receiver::wait_ready`] returns immediately and
    /// [`Receiver::recv`] returns `None` as soon as the buffer is empty,
    /// even while senders remain registered. Items already buffered are
    /// still delivered first.
    pub fn finish(&self) {
        let mut state = self.shared.lock_state();
        state.finished = true;
        self.shared.data_available.notify_all();
        self.shared.space_available.notify_all();
    }

    /// Drain every leftover buffered item into `f`, oldest first, and
    /// return how many were handed out.
    ///
    /// This is the cleanup hook for items that were sent but never
    /// received. Without it, leftovers are simply dropped with the channel.
    ///
    /// # Panics
    ///
    /// Panics if senders or receivers are still registered; draining a
    /// channel with active participants is a programming error.
    pub fn drain_with<F: FnMut(T)>(&self, mut f: F) -> usize {
        let mut state = self.shared.lock_state();
        assert!(
            state.senders == 0 && state.receivers == 0,
            "drain_with called with registered participants"
        );

        let drained = state.ring.drain_with(&mut f);
        if self.shared.config.enable_metrics {
            self.shared.metrics.add_drained(drained as u64);
        }
        drained
    }

    /// Returns the fixed buffer capacity.
    pub fn capacity(&self) -> usize {
        self.shared.config.capacity
    }

    /// Returns the number of items currently buffered.
    pub fn len(&self) -> usize {
        self.shared.lock_state().ring.len()
    }

    /// Returns true if no items are currently buffered.
    pub fn is_empty(&self) -> bool {
        self.shared.lock_state().ring.is_empty()
    }

    /// Returns the number of registered senders.
    pub fn sender_count(&self) -> usize {
        self.shared.lock_state().senders
    }

    /// Returns the number of registered receivers.
    pub fn receiver_count(&self) -> usize {
        self.shared.lock_state().receivers
    }

    /// Returns true if [`finish`](Channel::finish) has been called.
    pub fn is_finished(&self) -> bool {
        self.shared.lock_state().finished
    }

    /// Get a metrics snapshot. All zeros unless metrics were enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// A registered producer handle.
///
/// Holding a `Sender` *is* the registration: creation incremented the
/// channel's sender count and `Drop` decrements it, so "deregister exactly
/// once" holds by construction.
///
/// `Sender` is intentionally not `Clone`: one handle is one registration.
/// Call [`Channel::register_sender`] again for another producer thread.
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Block until a receiver has registered.
    ///
    /// Lets a producer wait out the startup race instead of having its
    /// first `send` fail because no receiver has arrived yet. Classic
    /// guarded wait: the predicate is re-checked on every wake. The
    /// arrival is latched, so a receiver that registers and departs before
    /// this thread reacquires the lock still releases the wait; the
    /// subsequent `send` then fails promptly instead of this call
    /// sleeping forever on a wakeup that already happened.
    pub fn wait_ready(&self) {
        let mut state = self.shared.lock_state();
        while !state.had_receiver {
            state = self
                .shared
                .space_available
                .wait(state)
                .expect("channel lock poisoned");
        }
    }

    /// Blocking send.
    ///
    /// Waits while the buffer is full and receivers exist; this is the
    /// backpressure mechanism, not an error. Fails only when no receivers
    /// remain registered, handing the item back in the error so the caller
    /// decides its fate. Treat the failure as "stop", not "retry".
    pub fn send(&self, item: T) -> Result<(), SendError<T>> {
        let shared = &*self.shared;
        let mut state = shared.lock_state();

        while state.ring.is_full() && state.receivers > 0 {
            if shared.config.enable_metrics {
                shared.metrics.add_send_wait();
            }
            state = shared
                .space_available
                .wait(state)
                .expect("channel lock poisoned");
        }

        if state.receivers == 0 {
            if shared.config.enable_metrics {
                shared.metrics.add_rejected_send();
            }
            return Err(SendError(item));
        }

        state.ring.push(item);
        if state.ring.len() == 1 {
            // Exactly one item became available; waking one receiver is
            // enough.
            shared.data_available.notify_one();
        }
        if shared.config.enable_metrics {
            shared.metrics.add_messages_sent(1);
        }
        Ok(())
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut state = self.shared.lock_state_ignore_poison();
        debug_assert!(state.senders > 0, "sender count underflow");
        state.senders -= 1;

        if state.senders == 0 {
            // Last sender out: receivers parked on an empty buffer must
            // wake and observe that no more data is coming.
            self.shared.data_available.notify_all();
        } else {
            // Wake the other side too: a parked sender may have been
            // waiting specifically on this departing one to be notified.
            self.shared.space_available.notify_all();
        }
    }
}

/// A registered consumer handle.
///
/// Same RAII contract as [`Sender`]: creation registered the consumer and
/// `Drop` deregisters it. Not `Clone`; register once per consumer thread.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Block until a sender has registered, data is buffered, or the
    /// channel is finished.
    ///
    /// Distinguishes "nothing yet" from "nothing ever": a consumer that
    /// starts before any producer has registered would otherwise see an
    /// empty channel with zero senders and conclude it is exhausted. The
    /// sender's arrival is latched: a producer that registers and
    /// deregisters before this thread reacquires the lock still releases
    /// the wait, and the subsequent `recv` reports exhaustion. Waiting on
    /// the live count instead would re-sleep on a wakeup that already
    /// happened and never get another one.
    pub fn wait_ready(&self) {
        let mut state = self.shared.lock_state();
        while !state.had_sender && state.ring.is_empty() && !state.finished {
            state = self
                .shared
                .data_available
                .wait(state)
                .expect("channel lock poisoned");
        }
    }

    /// Blocking receive.
    ///
    /// Waits while the buffer is empty and senders remain registered (and
    /// the channel is not finished). Returns `None` once the channel is
    /// exhausted: empty with no senders left, or empty after
    /// [`Channel::finish`]. `None` means "stop receiving"; subsequent
    /// calls keep returning `None`.
    pub fn recv(&self) -> Option<T> {
        let shared = &*self.shared;
        let mut state = shared.lock_state();

        while state.ring.is_empty() && state.senders > 0 && !state.finished {
            if shared.config.enable_metrics {
                shared.metrics.add_recv_wait();
            }
            state = shared
                .data_available
                .wait(state)
                .expect("channel lock poisoned");
        }

        let was_full = state.ring.is_full();
        let item = state.ring.pop()?;

        if was_full {
            // Exactly one slot was freed; waking one sender is enough.
            shared.space_available.notify_one();
        }
        if shared.config.enable_metrics {
            shared.metrics.add_messages_received(1);
        }
        Some(item)
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        let mut state = self.shared.lock_state_ignore_poison();
        debug_assert!(state.receivers > 0, "receiver count underflow");
        state.receivers -= 1;

        if state.receivers == 0 {
            // Last receiver out: parked senders must wake and observe that
            // delivery has become impossible.
            self.shared.space_available.notify_all();
        } else {
            // Wake the other side too, mirroring the sender departure
            // path.
            self.shared.data_available.notify_all();
        }
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    #[test]
    fn test_send_recv_roundtrip() {
        let channel = Channel::<u64>::with_capacity(16);
        let tx = channel.register_sender();
        let rx = channel.register_receiver();

        tx.send(1).unwrap();
        tx.send(2).unwrap();
        tx.send(3).unwrap();
        drop(tx);

        assert_eq!(rx.recv(), Some(1));
        assert_eq!(rx.recv(), Some(2));
        assert_eq!(rx.recv(), Some(3));
        assert_eq!(rx.recv(), None);
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_send_without_receivers_fails() {
        let channel = Channel::<u64>::with_capacity(16);
        let tx = channel.register_sender();

        let err = tx.send(42).unwrap_err();
        assert_eq!(err.into_inner(), 42);
    }

    #[test]
    fn test_send_after_receivers_left_fails() {
        let channel = Channel::<u64>::with_capacity(16);
        let tx = channel.register_sender();
        let rx = channel.register_receiver();

        tx.send(1).unwrap();
        drop(rx);

        assert_eq!(tx.send(2), Err(SendError(2)));
    }

    #[test]
    fn test_registration_counts() {
        let channel = Channel::<u64>::with_capacity(16);
        assert_eq!(channel.sender_count(), 0);
        assert_eq!(channel.receiver_count(), 0);

        let tx = channel.register_sender();
        let rx1 = channel.register_receiver();
        let rx2 = channel.register_receiver();
        assert_eq!(channel.sender_count(), 1);
        assert_eq!(channel.receiver_count(), 2);

        drop(tx);
        drop(rx1);
        drop(rx2);
        assert_eq!(channel.sender_count(), 0);
        assert_eq!(channel.receiver_count(), 0);
    }

    #[test]
    fn test_len_tracks_occupancy() {
        let channel = Channel::<u64>::with_capacity(4);
        let tx = channel.register_sender();
        let rx = channel.register_receiver();

        assert!(channel.is_empty());
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        assert_eq!(channel.len(), 2);

        assert_eq!(rx.recv(), Some(1));
        assert_eq!(channel.len(), 1);
        drop(tx);
    }

    #[test]
    fn test_finish_delivers_buffered_then_stops() {
        let channel = Channel::<u64>::with_capacity(16);
        let tx = channel.register_sender();
        let rx = channel.register_receiver();

        tx.send(1).unwrap();
        tx.send(2).unwrap();
        channel.finish();

        // Sender is still registered, but finished plus an empty buffer
        // means exhausted.
        assert_eq!(rx.recv(), Some(1));
        assert_eq!(rx.recv(), Some(2));
        assert_eq!(rx.recv(), None);
        drop(tx);
    }

    #[test]
    fn test_drain_with_hands_out_leftovers() {
        let channel = Channel::<u64>::with_capacity(16);
        let tx = channel.register_sender();
        let rx = channel.register_receiver();

        for i in 0..5 {
            tx.send(i).unwrap();
        }
        drop(tx);
        drop(rx);

        let mut seen = Vec::new();
        let drained = channel.drain_with(|v| seen.push(v));
        assert_eq!(drained, 5);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(channel.drain_with(|_| {}), 0);
    }

    #[test]
    fn test_wait_ready_after_sender_came_and_went() {
        let channel = Channel::<u64>::with_capacity(16);
        let rx = channel.register_receiver();

        let tx = channel.register_sender();
        drop(tx); // sends nothing

        // The sender's arrival is latched: wait_ready must return even
        // though the live count is back to zero, and recv must report
        // exhaustion rather than park forever.
        rx.wait_ready();
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_sender_wait_ready_after_receiver_came_and_went() {
        let channel = Channel::<u64>::with_capacity(16);
        let tx = channel.register_sender();

        let rx = channel.register_receiver();
        drop(rx); // receives nothing

        tx.wait_ready();
        assert_eq!(tx.send(1), Err(SendError(1)));
    }

    #[test]
    fn test_handle_drop_survives_poisoned_lock() {
        let channel = Channel::<u64>::with_capacity(16);
        let tx = channel.register_sender();

        // Poison the lock: drain_with asserts (and unwinds) while holding
        // the guard because a participant is still registered.
        let ch = channel.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            ch.drain_with(|_| {});
        }));
        assert!(result.is_err());

        // Deregistration must recover the poisoned guard instead of
        // panicking again, which inside a destructor would abort the
        // process.
        drop(tx);
    }

    #[test]
    #[should_panic(expected = "drain_with called with registered participants")]
    fn test_drain_with_active_participants_panics() {
        let channel = Channel::<u64>::with_capacity(16);
        let _tx = channel.register_sender();
        channel.drain_with(|_| {});
    }

    #[test]
    #[should_panic(expected = "channel capacity must be non-zero")]
    fn test_zero_capacity_rejected() {
        let _channel = Channel::<u64>::new(Config::new(0, false));
    }
}
