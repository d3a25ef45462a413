use crate::invariants::{
    debug_assert_bounded_count, debug_assert_count_consistent, debug_assert_head_not_past_tail,
    debug_assert_monotonic,
};

/// Fixed-capacity ring buffer of owned items.
///
/// Plain data: every access happens under the channel's mutex, so nothing
/// here is atomic. `head` and `tail` are monotonically increasing sequence
/// numbers (never wrapped until indexing); the slot index of a sequence
/// number is `sequence % capacity`. Occupancy is materialized in `count`
/// and cross-checked against `tail - head` in debug builds.
///
/// Uses `Box<[Option<T>]>` instead of `Vec<T>` because the buffer size is
/// fixed at construction and never grows or shrinks. Leftover items are
/// dropped with the ring (the `Option` slots own them).
pub(crate) struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: u64,
    tail: u64,
    count: usize,
}

impl<T> Ring<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Append an item at the tail. The caller must have checked
    /// `!is_full()` under the lock.
    pub(crate) fn push(&mut self, item: T) {
        debug_assert!(!self.is_full(), "push into a full ring");

        let idx = (self.tail % self.capacity() as u64) as usize;
        debug_assert!(self.slots[idx].is_none(), "overwriting an occupied slot");
        self.slots[idx] = Some(item);

        let new_tail = self.tail + 1;
        debug_assert_monotonic!("tail", self.tail, new_tail);
        self.tail = new_tail;
        self.count += 1;

        debug_assert_bounded_count!(self.count, self.capacity());
        debug_assert_count_consistent!(self.head, self.tail, self.count);
    }

    /// Remove the oldest item, if any.
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }

        let idx = (self.head % self.capacity() as u64) as usize;
        let item = self.slots[idx].take();
        debug_assert!(item.is_some(), "empty slot inside the occupied window");

        let new_head = self.head + 1;
        debug_assert_monotonic!("head", self.head, new_head);
        self.head = new_head;
        self.count -= 1;

        debug_assert_head_not_past_tail!(self.head, self.tail);
        debug_assert_count_consistent!(self.head, self.tail, self.count);

        item
    }

    /// Hand every buffered item to `f`, oldest first. Returns how many
    /// items were handed out.
    pub(crate) fn drain_with<F: FnMut(T)>(&mut self, f: &mut F) -> usize {
        let mut drained = 0;
        while let Some(item) = self.pop() {
            f(item);
            drained += 1;
        }
        drained
    }
}
