//! # DEVStone
//!
//! Parametric synthetic benchmark topologies for DEVS simulation engines.
//!
//! A DEVStone model is a recursive hierarchy of coupled models whose leaves
//! are identical "stone" atomics that burn a configurable number of cycles on
//! every transition. Four coupling patterns stress an engine differently:
//!
//! - **LI**: every leaf of a level receives the container input; no internal
//!   couplings.
//! - **HI**: like LI, plus a chain of internal couplings through the leaves.
//! - **HO**: same shape as HI.
//! - **HOmod**: two inputs per container and a triangular matrix of leaves
//!   per level whose outputs loop back into the wrapped container.
//!
//! The crate only builds and describes topologies. Scheduling and running
//! them is the job of an external kernel, which receives a [`Benchmark`]:
//! the root container and an [`EventSource`] over an exogenous trace.
//!
//! ## Quick Start
//!
//! ```rust
//! use devstone::topology::{build, BenchmarkKind};
//! use devstone::event::EventSource;
//! use devstone::Benchmark;
//!
//! let root = build(BenchmarkKind::HOmod, 3, 3, 0, 0, 1.0).unwrap();
//! assert_eq!(root.atomic_count(), 11);
//!
//! let source = EventSource::from_text("0 1\n5 2").unwrap();
//! let bench = Benchmark::new(root, source);
//! let top = bench.top_tree();
//! assert_eq!(top.models.len(), 2);
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use devstone::config::BenchConfig;
//!
//! let config = BenchConfig::from_file("bench.yaml")?;
//! devstone::init_logging(&config.settings.log_level);
//! let bench = config.assemble()?;
//! ```

pub mod types;
pub mod error;
pub mod node;
pub mod workload;
pub mod nodes;
pub mod coupling;
pub mod topology;
pub mod event;
pub mod export;
pub mod config;
pub mod stats;

// Re-export commonly used types
pub use types::{Message, NodeId, SimTime, TimeAdvance};
pub use error::{TopologyError, TopologyResult};
pub use node::{Address, AtomicModel, Port, PortDirection, PortName};
pub use workload::{NoWorkload, SpinWorkload, Workload};
pub use nodes::{StoneAtomic, StoneConfig};
pub use coupling::{ChildIndex, Component, CoupledModel, Eic, Eoc, Ic};
pub use topology::{build, Benchmark, BenchmarkKind, TopologyBuilder, TopologyParams, Wiring};
pub use event::{EventBatch, EventSource};
pub use export::ModelTree;
pub use config::{BenchConfig, BenchConfigBuilder, ConfigError};
pub use stats::{expected_atomic_count, TopologyStats, Timer};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging.
///
/// # Example
///
/// ```rust,ignore
/// devstone::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
