//! Core type definitions for the benchmark topologies.
//!
//! This module defines the fundamental types shared by the atomic models,
//! the coupled containers and the event source.

use serde::{Deserialize, Serialize};

/// Simulation time.
///
/// Periods, trace timestamps and elapsed times all use the same `SimTime`
/// representation, so a kernel can compare them directly. Values produced
/// by this crate are always finite and non-negative.
pub type SimTime = f64;

/// Opaque unique identifier for a model in a built hierarchy.
///
/// Identifiers are handed out in construction order, so two builds with the
/// same parameters assign the same ids to the same positions.
pub type NodeId = u64;

/// The integer message carried by every port.
pub type Message = i64;

/// The value returned by a model's time-advance function.
///
/// `Infinity` means the model is passive and will not be scheduled again
/// until it receives new input. Every finite value orders before `Infinity`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum TimeAdvance {
    /// The model fires after the given duration.
    Finite(SimTime),
    /// The model is passive.
    Infinity,
}

impl TimeAdvance {
    /// Returns true if the model is passive.
    pub fn is_infinite(&self) -> bool {
        matches!(self, TimeAdvance::Infinity)
    }

    /// Returns true if the model has a scheduled internal event.
    pub fn is_finite(&self) -> bool {
        !self.is_infinite()
    }

    /// Returns the duration if finite.
    pub fn as_finite(&self) -> Option<SimTime> {
        match self {
            TimeAdvance::Finite(t) => Some(*t),
            TimeAdvance::Infinity => None,
        }
    }
}

impl std::fmt::Display for TimeAdvance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeAdvance::Finite(t) => write!(f, "{}", t),
            TimeAdvance::Infinity => write!(f, "inf"),
        }
    }
}
