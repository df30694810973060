//! Built-in atomic model implementations.
//!
//! # Available Nodes
//!
//! - [`StoneAtomic`] - The DEVStone leaf: a queued-work counter with a
//!   configurable processing cost per transition

pub mod stone;

pub use stone::{StoneAtomic, StoneConfig};
