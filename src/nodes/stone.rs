//! The DEVStone atomic model.
//!
//! Every leaf of every benchmark topology is a `StoneAtomic`. Its only state
//! is a counter of stimuli received but not yet processed internally; the
//! configured cycle counts give each transition a CPU cost so the benchmark
//! can scale processing load independently of topology shape.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::node::{Address, AtomicModel, Port, PortDirection, PortName};
use crate::types::{Message, NodeId, SimTime, TimeAdvance};
use crate::workload::{SpinWorkload, Workload};

/// Fixed configuration shared by all atomics of a hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoneConfig {
    /// Work units burnt on each internal transition
    pub internal_cycles: u64,
    /// Work units burnt on each external transition
    pub external_cycles: u64,
    /// Time advance while work is queued
    pub period: SimTime,
}

impl StoneConfig {
    pub fn new(internal_cycles: u64, external_cycles: u64, period: SimTime) -> Self {
        Self {
            internal_cycles,
            external_cycles,
            period,
        }
    }
}

impl Default for StoneConfig {
    fn default() -> Self {
        Self::new(0, 0, 1.0)
    }
}

/// A DEVStone leaf.
///
/// # Example
///
/// ```rust
/// use devstone::nodes::stone::{StoneAtomic, StoneConfig};
/// use devstone::node::{Address, AtomicModel};
/// use devstone::TimeAdvance;
///
/// let mut stone = StoneAtomic::new(1, "stone", Address::default(), StoneConfig::new(0, 0, 3.0));
/// assert_eq!(stone.time_advance(), TimeAdvance::Infinity);
///
/// stone.external_step(0.0, &[7, 8]);
/// assert_eq!(stone.queued(), 2);
/// assert_eq!(stone.time_advance(), TimeAdvance::Finite(3.0));
/// assert_eq!(stone.output(), &[1]);
/// ```
#[derive(Clone, Debug)]
pub struct StoneAtomic {
    id: NodeId,
    name: String,
    address: Address,
    config: StoneConfig,
    queued: u64,
    outbag: Vec<Message>,
    workload: Arc<dyn Workload>,
}

const STONE_INPUTS: [Port; 1] = [Port {
    name: PortName::In,
    direction: PortDirection::Input,
}];

const STONE_OUTPUTS: [Port; 1] = [Port {
    name: PortName::Out,
    direction: PortDirection::Output,
}];

impl StoneAtomic {
    /// Creates an idle atomic using the default spin workload.
    pub fn new(id: NodeId, name: impl Into<String>, address: Address, config: StoneConfig) -> Self {
        Self::with_workload(id, name, address, config, Arc::new(SpinWorkload))
    }

    /// Creates an idle atomic that burns cycles through `workload`.
    pub fn with_workload(
        id: NodeId,
        name: impl Into<String>,
        address: Address,
        config: StoneConfig,
        workload: Arc<dyn Workload>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address,
            config,
            queued: 0,
            // The output never changes, so it is built once here.
            outbag: vec![1],
            workload,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &StoneConfig {
        &self.config
    }

    /// Number of stimuli received and not yet processed.
    pub fn queued(&self) -> u64 {
        self.queued
    }

    /// Snapshot of the node's state for diagnostics.
    pub fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "queued": self.queued,
            "period": self.config.period,
            "internal_cycles": self.config.internal_cycles,
            "external_cycles": self.config.external_cycles,
        })
    }
}

impl AtomicModel for StoneAtomic {
    fn input_ports(&self) -> &[Port] {
        &STONE_INPUTS
    }

    fn output_ports(&self) -> &[Port] {
        &STONE_OUTPUTS
    }

    fn internal_step(&mut self) {
        assert!(
            self.queued > 0,
            "precondition violated: internal transition on passive atomic {}",
            self.name
        );
        self.workload.burn(self.config.internal_cycles);
        self.queued -= 1;
    }

    fn external_step(&mut self, _elapsed: SimTime, inputs: &[Message]) {
        assert!(
            !inputs.is_empty(),
            "precondition violated: external transition on {} without inputs",
            self.name
        );
        self.workload.burn(self.config.external_cycles);
        self.queued += inputs.len() as u64;
    }

    fn time_advance(&self) -> TimeAdvance {
        if self.queued != 0 {
            TimeAdvance::Finite(self.config.period)
        } else {
            TimeAdvance::Infinity
        }
    }

    fn output(&self) -> &[Message] {
        &self.outbag
    }
}
