//! Ports, structural addresses and the `AtomicModel` trait.
//!
//! Atomic models are the leaves of a benchmark hierarchy. Each one is a
//! local state machine that the external kernel drives through internal,
//! external and confluent transitions, and queries for its time advance
//! and output.

use serde::{Deserialize, Serialize};

use crate::types::{Message, SimTime, TimeAdvance};

/// Direction of a port relative to the model that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    /// Short label used in exported trees (`in` / `out`).
    pub fn label(&self) -> &'static str {
        match self {
            PortDirection::Input => "in",
            PortDirection::Output => "out",
        }
    }
}

/// Name of a port.
///
/// The set of port names is closed: every model in a benchmark hierarchy
/// exposes some subset of these, so a coupling that names a port the
/// target cannot have is rejected when it is added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PortName {
    /// Single input of atomics and of single-input containers.
    #[serde(rename = "in")]
    In,
    /// Broadcast input of two-input containers.
    #[serde(rename = "in1")]
    Broadcast,
    /// Feedback input of two-input containers.
    #[serde(rename = "in2")]
    Feedback,
    /// Single output of every model.
    #[serde(rename = "out")]
    Out,
}

impl PortName {
    /// The direction implied by this name.
    pub fn direction(&self) -> PortDirection {
        match self {
            PortName::In | PortName::Broadcast | PortName::Feedback => PortDirection::Input,
            PortName::Out => PortDirection::Output,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PortName::In => "in",
            PortName::Broadcast => "in1",
            PortName::Feedback => "in2",
            PortName::Out => "out",
        }
    }
}

impl std::fmt::Display for PortName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes an input or output port of a model.
///
/// Ports are declared when the model is constructed and never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    /// Name of the port, unique within its model
    pub name: PortName,
    /// Whether the port receives or emits messages
    pub direction: PortDirection,
}

impl Port {
    /// Creates a port whose direction follows from its name.
    pub fn new(name: PortName) -> Self {
        Self {
            name,
            direction: name.direction(),
        }
    }

    /// Type descriptor of the messages this port carries.
    pub fn ty(&self) -> &'static str {
        "int"
    }
}

/// Structural position of a model inside a hierarchy.
///
/// Containers use `column == row == 0`. Leaves of flat and chained levels
/// all sit on row 0; triangular levels use both coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    pub level: u32,
    pub column: u32,
    pub row: u32,
}

impl Address {
    pub fn new(level: u32, column: u32, row: u32) -> Self {
        Self { level, column, row }
    }

    /// Address of the container at `level`.
    pub fn container(level: u32) -> Self {
        Self::new(level, 0, 0)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}[{},{}]", self.level, self.column, self.row)
    }
}

/// The trait every leaf of a benchmark hierarchy implements.
///
/// The kernel decides when each method is called. Implementations only
/// declare behavior; they never schedule themselves.
pub trait AtomicModel: Send {
    /// Input ports of this model, in declaration order.
    fn input_ports(&self) -> &[Port];

    /// Output ports of this model, in declaration order.
    fn output_ports(&self) -> &[Port];

    /// Called when the model's time advance elapses.
    fn internal_step(&mut self);

    /// Called when one or more messages arrive on the model's inputs.
    ///
    /// # Arguments
    /// * `elapsed` - Time since the last transition of this model
    /// * `inputs` - The messages received, in delivery order
    fn external_step(&mut self, elapsed: SimTime, inputs: &[Message]);

    /// Called when an internal event and external input coincide.
    ///
    /// The internal transition is applied first, then the inputs are
    /// processed as an external transition with zero elapsed time.
    fn confluent_step(&mut self, _elapsed: SimTime, inputs: &[Message]) {
        self.internal_step();
        self.external_step(0.0, inputs);
    }

    /// Time until the next internal transition.
    fn time_advance(&self) -> TimeAdvance;

    /// Messages emitted right before the next internal transition.
    fn output(&self) -> &[Message];

    /// Returns true if the model declares an input port with this name.
    fn has_input(&self, name: PortName) -> bool {
        self.input_ports().iter().any(|p| p.name == name)
    }

    /// Returns true if the model declares an output port with this name.
    fn has_output(&self, name: PortName) -> bool {
        self.output_ports().iter().any(|p| p.name == name)
    }
}
