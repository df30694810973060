//! Structural export of model hierarchies.
//!
//! A [`ModelTree`] is a plain, serializable mirror of a hierarchy: ids,
//! ports with their direction, children, and the three coupling lists with
//! child references resolved to names. It exists so topology shape can be
//! asserted on and diffed; nothing in the crate reads it back.
//!
//! The JSON layout follows the usual DEVS diagram export:
//!
//! ```json
//! {
//!   "id": "L1_coupled",
//!   "type": "coupled",
//!   "ports": { "in": [{ "name": "in", "port_kind": "in", "message_type": "int" }], "out": [...] },
//!   "models": [...],
//!   "eic": [{ "from_port": "in", "to_model": "stone_L0_0_0", "to_port": "in" }],
//!   "eoc": [...],
//!   "ic": [...]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::coupling::{ChildIndex, Component, CoupledModel};
use crate::node::{AtomicModel, Port, PortName};
use crate::nodes::stone::StoneAtomic;
use crate::types::NodeId;

/// Whether a tree node is a leaf or a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Atomic,
    Coupled,
}

/// One exported port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEntry {
    pub name: String,
    pub port_kind: String,
    pub message_type: String,
}

impl From<&Port> for PortEntry {
    fn from(port: &Port) -> Self {
        Self {
            name: port.name.to_string(),
            port_kind: port.direction.label().to_string(),
            message_type: port.ty().to_string(),
        }
    }
}

/// Exported input and output ports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortsEntry {
    #[serde(rename = "in")]
    pub inputs: Vec<PortEntry>,
    #[serde(rename = "out")]
    pub outputs: Vec<PortEntry>,
}

impl PortsEntry {
    fn from_ports(inputs: &[Port], outputs: &[Port]) -> Self {
        Self {
            inputs: inputs.iter().map(PortEntry::from).collect(),
            outputs: outputs.iter().map(PortEntry::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EicEntry {
    pub from_port: String,
    pub to_model: String,
    pub to_port: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EocEntry {
    pub from_model: String,
    pub from_port: String,
    pub to_port: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcEntry {
    pub from_model: String,
    pub from_port: String,
    pub to_model: String,
    pub to_port: String,
}

/// Serializable mirror of a model hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTree {
    pub id: String,
    pub uid: Option<NodeId>,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    pub ports: PortsEntry,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelTree>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eic: Vec<EicEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eoc: Vec<EocEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ic: Vec<IcEntry>,
}

impl ModelTree {
    /// Exports an atomic.
    pub fn from_atomic(atomic: &StoneAtomic) -> Self {
        Self::leaf(
            atomic.name(),
            Some(atomic.id()),
            PortsEntry::from_ports(atomic.input_ports(), atomic.output_ports()),
        )
    }

    fn leaf(id: &str, uid: Option<NodeId>, ports: PortsEntry) -> Self {
        Self {
            id: id.to_string(),
            uid,
            model_type: ModelType::Atomic,
            ports,
            models: Vec::new(),
            eic: Vec::new(),
            eoc: Vec::new(),
            ic: Vec::new(),
        }
    }

    /// Exports a coupled model and everything below it.
    pub fn from_coupled(model: &CoupledModel) -> Self {
        // Indices were checked by `add_*` and children are never removed.
        let name_of = |idx: ChildIndex| -> String { model.children()[idx.0].name().to_string() };

        Self {
            id: model.name().to_string(),
            uid: Some(model.id()),
            model_type: ModelType::Coupled,
            ports: PortsEntry::from_ports(model.inputs(), model.outputs()),
            models: model.children().iter().map(ModelTree::from_component).collect(),
            eic: model
                .eic()
                .iter()
                .map(|c| EicEntry {
                    from_port: c.from_port.to_string(),
                    to_model: name_of(c.to),
                    to_port: c.to_port.to_string(),
                })
                .collect(),
            eoc: model
                .eoc()
                .iter()
                .map(|c| EocEntry {
                    from_model: name_of(c.from),
                    from_port: c.from_port.to_string(),
                    to_port: c.to_port.to_string(),
                })
                .collect(),
            ic: model
                .ic()
                .iter()
                .map(|c| IcEntry {
                    from_model: name_of(c.from),
                    from_port: c.from_port.to_string(),
                    to_model: name_of(c.to),
                    to_port: c.to_port.to_string(),
                })
                .collect(),
        }
    }

    pub fn from_component(component: &Component) -> Self {
        match component {
            Component::Atomic(a) => Self::from_atomic(a),
            Component::Coupled(c) => Self::from_coupled(c),
        }
    }

    /// Builds the outermost view of a benchmark: a port-less container
    /// holding an event reader and `root`, with the reader's output coupled
    /// to each input of `root`.
    pub fn top(id: &str, reader: &str, root: &CoupledModel) -> Self {
        let reader_ports = PortsEntry::from_ports(&[], &[Port::new(PortName::Out)]);
        let ic = root
            .inputs()
            .iter()
            .map(|port| IcEntry {
                from_model: reader.to_string(),
                from_port: PortName::Out.to_string(),
                to_model: root.name().to_string(),
                to_port: port.name.to_string(),
            })
            .collect();

        Self {
            id: id.to_string(),
            uid: None,
            model_type: ModelType::Coupled,
            ports: PortsEntry::default(),
            models: vec![Self::leaf(reader, None, reader_ports), Self::from_coupled(root)],
            eic: Vec::new(),
            eoc: Vec::new(),
            ic,
        }
    }

    pub fn is_coupled(&self) -> bool {
        self.model_type == ModelType::Coupled
    }

    /// Finds a model by name in this subtree.
    pub fn find(&self, id: &str) -> Option<&ModelTree> {
        if self.id == id {
            return Some(self);
        }
        self.models.iter().find_map(|m| m.find(id))
    }

    /// Number of atomic models in this subtree.
    pub fn atomic_count(&self) -> usize {
        match self.model_type {
            ModelType::Atomic => 1,
            ModelType::Coupled => self.models.iter().map(ModelTree::atomic_count).sum(),
        }
    }

    /// The unique coupled child, if there is exactly one.
    pub fn coupled_child(&self) -> Option<&ModelTree> {
        let mut coupled = self.models.iter().filter(|m| m.is_coupled());
        match (coupled.next(), coupled.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl CoupledModel {
    /// Exports this hierarchy as a [`ModelTree`].
    pub fn to_tree(&self) -> ModelTree {
        ModelTree::from_coupled(self)
    }
}
