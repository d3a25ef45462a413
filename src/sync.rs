//! Synchronization primitive selection.
//!
//! Under the `loom` feature the channel is built on loom's
//! permutation-testing mutex and condition variable so the models in
//! `tests/loom_tests.rs` can explore thread interleavings. Everything else
//! uses `std::sync` with identical semantics.

#[cfg(feature = "loom")]
pub(crate) use loom::sync::{Arc, Condvar, Mutex, MutexGuard};

#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::{Arc, Condvar, Mutex, MutexGuard};
