//! Coupled models: containers of child models wired through ports.
//!
//! A `CoupledModel` owns its children exclusively and records three
//! coupling relations:
//!
//! - **EIC**: own input port → (child, child input port)
//! - **EOC**: (child, child output port) → own output port
//! - **IC**: (child A, output port) → (child B, input port)
//!
//! Couplings reference children by [`ChildIndex`] rather than by name, and
//! every coupling is checked against the declared ports when it is added.
//! All relations keep insertion order.

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};
use crate::node::{Address, AtomicModel, Port, PortDirection, PortName};
use crate::nodes::stone::StoneAtomic;
use crate::types::NodeId;

/// Position of a child inside its parent's child list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChildIndex(pub usize);

/// External-input coupling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eic {
    pub from_port: PortName,
    pub to: ChildIndex,
    pub to_port: PortName,
}

/// External-output coupling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eoc {
    pub from: ChildIndex,
    pub from_port: PortName,
    pub to_port: PortName,
}

/// Internal coupling between two siblings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ic {
    pub from: ChildIndex,
    pub from_port: PortName,
    pub to: ChildIndex,
    pub to_port: PortName,
}

/// A child of a coupled model.
#[derive(Clone, Debug)]
pub enum Component {
    Atomic(StoneAtomic),
    Coupled(CoupledModel),
}

impl Component {
    pub fn id(&self) -> NodeId {
        match self {
            Component::Atomic(a) => a.id(),
            Component::Coupled(c) => c.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Component::Atomic(a) => a.name(),
            Component::Coupled(c) => c.name(),
        }
    }

    pub fn address(&self) -> Address {
        match self {
            Component::Atomic(a) => a.address(),
            Component::Coupled(c) => c.address(),
        }
    }

    pub fn input_ports(&self) -> &[Port] {
        match self {
            Component::Atomic(a) => a.input_ports(),
            Component::Coupled(c) => c.inputs(),
        }
    }

    pub fn output_ports(&self) -> &[Port] {
        match self {
            Component::Atomic(a) => a.output_ports(),
            Component::Coupled(c) => c.outputs(),
        }
    }

    pub fn has_input(&self, name: PortName) -> bool {
        self.input_ports().iter().any(|p| p.name == name)
    }

    pub fn has_output(&self, name: PortName) -> bool {
        self.output_ports().iter().any(|p| p.name == name)
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Component::Atomic(_))
    }

    pub fn is_coupled(&self) -> bool {
        matches!(self, Component::Coupled(_))
    }

    pub fn as_atomic(&self) -> Option<&StoneAtomic> {
        match self {
            Component::Atomic(a) => Some(a),
            Component::Coupled(_) => None,
        }
    }

    pub fn as_atomic_mut(&mut self) -> Option<&mut StoneAtomic> {
        match self {
            Component::Atomic(a) => Some(a),
            Component::Coupled(_) => None,
        }
    }

    pub fn as_coupled(&self) -> Option<&CoupledModel> {
        match self {
            Component::Atomic(_) => None,
            Component::Coupled(c) => Some(c),
        }
    }

    /// Number of atomics in this subtree.
    pub fn atomic_count(&self) -> usize {
        match self {
            Component::Atomic(_) => 1,
            Component::Coupled(c) => c.atomic_count(),
        }
    }
}

impl From<StoneAtomic> for Component {
    fn from(atomic: StoneAtomic) -> Self {
        Component::Atomic(atomic)
    }
}

impl From<CoupledModel> for Component {
    fn from(coupled: CoupledModel) -> Self {
        Component::Coupled(coupled)
    }
}

/// A container model.
#[derive(Clone, Debug)]
pub struct CoupledModel {
    id: NodeId,
    name: String,
    address: Address,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    children: Vec<Component>,
    eic: Vec<Eic>,
    eoc: Vec<Eoc>,
    ic: Vec<Ic>,
}

impl CoupledModel {
    /// Creates an empty container with the given ports.
    ///
    /// Port names are deduplicated and their directions are taken from the
    /// names, so an output name passed as an input is rejected.
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        address: Address,
        inputs: &[PortName],
        outputs: &[PortName],
    ) -> TopologyResult<Self> {
        let name = name.into();
        let inputs = Self::declare_ports(&name, inputs, PortDirection::Input)?;
        let outputs = Self::declare_ports(&name, outputs, PortDirection::Output)?;
        Ok(Self {
            id,
            name,
            address,
            inputs,
            outputs,
            children: Vec::new(),
            eic: Vec::new(),
            eoc: Vec::new(),
            ic: Vec::new(),
        })
    }

    fn declare_ports(
        model: &str,
        names: &[PortName],
        direction: PortDirection,
    ) -> TopologyResult<Vec<Port>> {
        let mut ports: Vec<Port> = Vec::with_capacity(names.len());
        for &name in names {
            if name.direction() != direction {
                return Err(TopologyError::coupling(
                    model,
                    format!("port {} cannot be declared as {}", name, direction.label()),
                ));
            }
            if ports.iter().any(|p| p.name == name) {
                return Err(TopologyError::coupling(
                    model,
                    format!("port {} declared twice", name),
                ));
            }
            ports.push(Port::new(name));
        }
        Ok(ports)
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

    pub fn level(&self) -> u32 {
        self.address.level
    }

    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    pub fn children(&self) -> &[Component] {
        &self.children
    }

    pub fn child(&self, index: ChildIndex) -> Option<&Component> {
        self.children.get(index.0)
    }

    pub fn eic(&self) -> &[Eic] {
        &self.eic
    }

    pub fn eoc(&self) -> &[Eoc] {
        &self.eoc
    }

    pub fn ic(&self) -> &[Ic] {
        &self.ic
    }

    pub fn has_input(&self, name: PortName) -> bool {
        self.inputs.iter().any(|p| p.name == name)
    }

    pub fn has_output(&self, name: PortName) -> bool {
        self.outputs.iter().any(|p| p.name == name)
    }

    /// Adds a child and returns its index.
    pub fn add_child(&mut self, child: impl Into<Component>) -> ChildIndex {
        self.children.push(child.into());
        ChildIndex(self.children.len() - 1)
    }

    /// Adds an external-input coupling.
    pub fn add_eic(
        &mut self,
        from_port: PortName,
        to: ChildIndex,
        to_port: PortName,
    ) -> TopologyResult<()> {
        if !self.has_input(from_port) {
            return Err(self.coupling_error(format!("EIC from unknown input port {}", from_port)));
        }
        let child = self.child_checked(to)?;
        if !child.has_input(to_port) {
            return Err(self.coupling_error(format!(
                "EIC to {} which has no input port {}",
                child.name(),
                to_port
            )));
        }
        self.eic.push(Eic {
            from_port,
            to,
            to_port,
        });
        Ok(())
    }

    /// Adds an external-output coupling.
    pub fn add_eoc(
        &mut self,
        from: ChildIndex,
        from_port: PortName,
        to_port: PortName,
    ) -> TopologyResult<()> {
        let child = self.child_checked(from)?;
        if !child.has_output(from_port) {
            return Err(self.coupling_error(format!(
                "EOC from {} which has no output port {}",
                child.name(),
                from_port
            )));
        }
        if !self.has_output(to_port) {
            return Err(self.coupling_error(format!("EOC to unknown output port {}", to_port)));
        }
        self.eoc.push(Eoc {
            from,
            from_port,
            to_port,
        });
        Ok(())
    }

    /// Adds an internal coupling between two distinct children.
    pub fn add_ic(
        &mut self,
        from: ChildIndex,
        from_port: PortName,
        to: ChildIndex,
        to_port: PortName,
    ) -> TopologyResult<()> {
        if from == to {
            return Err(self.coupling_error(format!("IC couples child {} to itself", from.0)));
        }
        let source = self.child_checked(from)?;
        if !source.has_output(from_port) {
            return Err(self.coupling_error(format!(
                "IC from {} which has no output port {}",
                source.name(),
                from_port
            )));
        }
        let target = self.child_checked(to)?;
        if !target.has_input(to_port) {
            return Err(self.coupling_error(format!(
                "IC to {} which has no input port {}",
                target.name(),
                to_port
            )));
        }
        self.ic.push(Ic {
            from,
            from_port,
            to,
            to_port,
        });
        Ok(())
    }

    fn child_checked(&self, index: ChildIndex) -> TopologyResult<&Component> {
        self.children
            .get(index.0)
            .ok_or_else(|| self.coupling_error(format!("no child at index {}", index.0)))
    }

    fn coupling_error(&self, reason: String) -> TopologyError {
        TopologyError::coupling(&self.name, reason)
    }

    /// The unique coupled child, if there is exactly one.
    pub fn wrapped(&self) -> Option<&CoupledModel> {
        let mut coupled = self.children.iter().filter_map(Component::as_coupled);
        match (coupled.next(), coupled.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// Number of atomics in this subtree.
    pub fn atomic_count(&self) -> usize {
        self.children.iter().map(Component::atomic_count).sum()
    }

    /// Number of coupled models in this subtree, this one included.
    pub fn coupled_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .filter_map(Component::as_coupled)
            .map(CoupledModel::coupled_count)
            .sum::<usize>()
    }

    /// Atomics that are direct children of this model.
    pub fn direct_atomics(&self) -> impl Iterator<Item = &StoneAtomic> {
        self.children.iter().filter_map(Component::as_atomic)
    }

    /// All atomics in this subtree, depth first in child order.
    pub fn atomics(&self) -> Vec<&StoneAtomic> {
        let mut out = Vec::new();
        self.collect_atomics(&mut out);
        out
    }

    fn collect_atomics<'a>(&'a self, out: &mut Vec<&'a StoneAtomic>) {
        for child in &self.children {
            match child {
                Component::Atomic(a) => out.push(a),
                Component::Coupled(c) => c.collect_atomics(out),
            }
        }
    }

    /// This model followed by every container reached through the wrapped chain.
    pub fn levels(&self) -> Vec<&CoupledModel> {
        let mut out = vec![self];
        let mut current = self;
        while let Some(next) = current.wrapped() {
            out.push(next);
            current = next;
        }
        out
    }

    /// Index of the child with the given id.
    pub fn position(&self, id: NodeId) -> Option<ChildIndex> {
        self.children.iter().position(|c| c.id() == id).map(ChildIndex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::stone::StoneConfig;

    fn leaf(id: NodeId) -> StoneAtomic {
        StoneAtomic::new(id, format!("leaf{}", id), Address::new(0, id as u32, 0), StoneConfig::default())
    }

    fn container() -> CoupledModel {
        CoupledModel::new(
            100,
            "box",
            Address::container(1),
            &[PortName::In],
            &[PortName::Out],
        )
        .unwrap()
    }

    #[test]
    fn test_ports_declared_in_order() {
        let model = CoupledModel::new(
            1,
            "two_inputs",
            Address::container(2),
            &[PortName::Broadcast, PortName::Feedback],
            &[PortName::Out],
        )
        .unwrap();

        let names: Vec<_> = model.inputs().iter().map(|p| p.name).collect();
        assert_eq!(names, vec![PortName::Broadcast, PortName::Feedback]);
        assert!(model.outputs().iter().all(|p| p.direction == PortDirection::Output));
    }

    #[test]
    fn test_port_declaration_errors() {
        let wrong_direction =
            CoupledModel::new(1, "bad", Address::default(), &[PortName::Out], &[]);
        assert!(wrong_direction.is_err());

        let duplicate =
            CoupledModel::new(1, "bad", Address::default(), &[PortName::In, PortName::In], &[]);
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_valid_couplings_keep_order() {
        let mut model = container();
        let a = model.add_child(leaf(1));
        let b = model.add_child(leaf(2));

        model.add_eic(PortName::In, b, PortName::In).unwrap();
        model.add_eic(PortName::In, a, PortName::In).unwrap();
        model.add_ic(a, PortName::Out, b, PortName::In).unwrap();
        model.add_eoc(b, PortName::Out, PortName::Out).unwrap();

        assert_eq!(model.eic()[0].to, b);
        assert_eq!(model.eic()[1].to, a);
        assert_eq!(model.ic().len(), 1);
        assert_eq!(model.eoc()[0].from, b);
        assert_eq!(model.atomic_count(), 2);
        assert_eq!(model.coupled_count(), 1);
    }

    #[test]
    fn test_invalid_couplings_rejected() {
        let mut model = container();
        let a = model.add_child(leaf(1));

        assert!(model.add_eic(PortName::Feedback, a, PortName::In).is_err());
        assert!(model.add_eic(PortName::In, a, PortName::Feedback).is_err());
        assert!(model.add_eic(PortName::In, ChildIndex(5), PortName::In).is_err());
        assert!(model.add_eoc(a, PortName::In, PortName::Out).is_err());
        assert!(model.add_ic(a, PortName::Out, a, PortName::In).is_err());

        assert!(model.eic().is_empty());
        assert!(model.eoc().is_empty());
        assert!(model.ic().is_empty());
    }

    #[test]
    fn test_wrapped_and_levels() {
        let mut inner = container();
        inner.add_child(leaf(1));

        let mut outer = CoupledModel::new(
            200,
            "outer",
            Address::container(2),
            &[PortName::In],
            &[PortName::Out],
        )
        .unwrap();
        let sub = outer.add_child(inner);
        outer.add_child(leaf(2));
        outer.add_eic(PortName::In, sub, PortName::In).unwrap();

        assert_eq!(outer.wrapped().map(|c| c.id()), Some(100));
        assert_eq!(outer.levels().len(), 2);
        assert_eq!(outer.atomic_count(), 2);
        assert_eq!(outer.coupled_count(), 2);
        assert_eq!(outer.position(2), Some(ChildIndex(1)));

        let names: Vec<_> = outer.atomics().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["leaf1", "leaf2"]);
    }
}
