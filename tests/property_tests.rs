//! Property-based tests for the channel's observable guarantees.
//!
//! Coverage:
//! - Conservation: every item sent by any producer is received exactly once,
//!   for arbitrary M-producer N-consumer topologies.
//! - FIFO: a single producer's items arrive in send order.
//! - Bounded occupancy: the buffer never holds more than its capacity.

#![cfg(not(feature = "loom"))]

use proptest::prelude::*;
use ringmpmc::{Channel, Config};
use std::thread;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Sum of counts received across all consumers equals producers * items.
    #[test]
    fn prop_conservation(
        producers in 1usize..=4,
        consumers in 1usize..=4,
        items in 0u64..200,
    ) {
        let channel = Channel::<u64>::new(Config::new(8, false));

        // Register on this thread before spawning so no participant can
        // observe a transient zero count and quit or fail early.
        let producer_handles: Vec<_> = (0..producers)
            .map(|_| {
                let tx = channel.register_sender();
                thread::spawn(move || {
                    for _ in 0..items {
                        tx.send(1).unwrap();
                    }
                })
            })
            .collect();

        let consumer_handles: Vec<_> = (0..consumers)
            .map(|_| {
                let rx = channel.register_receiver();
                thread::spawn(move || {
                    let mut received = 0u64;
                    while let Some(v) = rx.recv() {
                        received += v;
                    }
                    received
                })
            })
            .collect();

        for handle in producer_handles {
            handle.join().unwrap();
        }
        let total: u64 = consumer_handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .sum();

        prop_assert_eq!(total, producers as u64 * items);
    }

    /// A single consumer observes a single producer's items in send order.
    #[test]
    fn prop_fifo_single_producer(
        items in 0u64..500,
        capacity in 1usize..32,
    ) {
        let channel = Channel::<u64>::with_capacity(capacity);
        let tx = channel.register_sender();
        let rx = channel.register_receiver();

        let producer = thread::spawn(move || {
            for i in 0..items {
                tx.send(i).unwrap();
            }
        });

        let mut collected = Vec::new();
        while let Some(v) = rx.recv() {
            collected.push(v);
        }
        producer.join().unwrap();

        let expected: Vec<u64> = (0..items).collect();
        prop_assert_eq!(collected, expected);
    }

    /// Occupancy as observed from outside a critical section never exceeds
    /// the configured capacity.
    #[test]
    fn prop_bounded_occupancy(
        items in 0u64..200,
        capacity in 1usize..8,
    ) {
        let channel = Channel::<u64>::with_capacity(capacity);
        let tx = channel.register_sender();
        let rx = channel.register_receiver();

        let producer = thread::spawn(move || {
            for i in 0..items {
                tx.send(i).unwrap();
            }
        });

        let mut received = 0u64;
        loop {
            prop_assert!(channel.len() <= capacity,
                "occupancy {} exceeds capacity {}", channel.len(), capacity);
            match rx.recv() {
                Some(_) => received += 1,
                None => break,
            }
        }
        producer.join().unwrap();

        prop_assert_eq!(received, items);
    }
}
