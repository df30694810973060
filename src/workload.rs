//! Synthetic CPU workload used to give transitions a processing cost.
//!
//! The workload is stateless: one instance may be shared by every atomic in
//! a hierarchy without introducing shared mutable state between siblings.

use std::hint::black_box;

/// A deterministic function that consumes a fixed amount of CPU work.
pub trait Workload: Send + Sync + std::fmt::Debug {
    /// Burns `cycles` units of work. Must not touch any model state.
    fn burn(&self, cycles: u64);
}

/// Integer busy loop. The default workload for built hierarchies.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpinWorkload;

impl Workload for SpinWorkload {
    fn burn(&self, cycles: u64) {
        let mut acc: u64 = 0x9E37_79B9_7F4A_7C15;
        for i in 0..cycles {
            acc = black_box(acc.rotate_left(5) ^ i.wrapping_mul(0x100_0000_01B3));
        }
        black_box(acc);
    }
}

/// A workload that costs nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoWorkload;

impl Workload for NoWorkload {
    fn burn(&self, _cycles: u64) {}
}
