//! DEVStone topology construction.
//!
//! All four benchmark kinds share one algorithm. Level 0 is a single
//! atomic. Level 1 wraps it. Every later level `L` wraps the container of
//! level `L-1` together with the leaves created at level `L-1`, and wires
//! those leaves according to the kind's [`Wiring`] policy. Level `D` creates
//! no leaves and is the root.
//!
//! The build is a fold over [`LevelSnapshot`]s: each level consumes the
//! previous snapshot by value and produces the next one, so no lookup table
//! outlives a single step.
//!
//! # Example
//!
//! ```rust
//! use devstone::topology::{build, BenchmarkKind};
//!
//! let root = build(BenchmarkKind::LI, 3, 3, 100, 100, 1.0).unwrap();
//! assert_eq!(root.name(), "L3_coupled");
//! assert_eq!(root.atomic_count(), 5);
//! assert_eq!(root.children().len(), 3);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::coupling::{ChildIndex, CoupledModel};
use crate::error::{TopologyError, TopologyResult};
use crate::event::EventSource;
use crate::export::ModelTree;
use crate::node::{Address, PortName};
use crate::nodes::stone::{StoneAtomic, StoneConfig};
use crate::types::{NodeId, SimTime};
use crate::workload::{SpinWorkload, Workload};

/// The four DEVStone coupling patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BenchmarkKind {
    /// Flat fan-out, no internal couplings
    LI,
    /// Fan-out plus a chain through the leaves of each level
    HI,
    /// Like HI; the chain never reaches the container output
    HO,
    /// Two inputs and a triangular matrix of chained leaves per level
    HOmod,
}

impl BenchmarkKind {
    pub const ALL: [BenchmarkKind; 4] = [
        BenchmarkKind::LI,
        BenchmarkKind::HI,
        BenchmarkKind::HO,
        BenchmarkKind::HOmod,
    ];

    /// The intra-level wiring this kind applies.
    pub fn wiring(&self) -> Wiring {
        match self {
            BenchmarkKind::LI => Wiring::Flat,
            BenchmarkKind::HI | BenchmarkKind::HO => Wiring::Chain,
            BenchmarkKind::HOmod => Wiring::Triangular,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkKind::LI => "LI",
            BenchmarkKind::HI => "HI",
            BenchmarkKind::HO => "HO",
            BenchmarkKind::HOmod => "HOmod",
        }
    }
}

impl fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenchmarkKind {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BenchmarkKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                TopologyError::invalid_parameter(format!(
                    "kind must be LI, HI, HO or HOmod, got {:?}",
                    s
                ))
            })
    }
}

/// How the leaves handed up from the previous level are wired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Wiring {
    /// Every leaf gets the container input, nothing else.
    Flat,
    /// Every leaf gets the container input; leaf `i` feeds leaf `i+1`.
    Chain,
    /// Column `c` holds `c+2` rows. The first and last row of each column
    /// get the feedback input; row 0 feeds the wrapped container's feedback
    /// input and every other row feeds the row before it.
    Triangular,
}

impl Wiring {
    /// Number of leaves in column `column`.
    pub fn column_height(&self, column: u32) -> u32 {
        match self {
            Wiring::Flat | Wiring::Chain => 1,
            Wiring::Triangular => column + 2,
        }
    }

    /// Input ports of every container built with this wiring.
    pub fn input_ports(&self) -> &'static [PortName] {
        match self {
            Wiring::Flat | Wiring::Chain => &[PortName::In],
            Wiring::Triangular => &[PortName::Broadcast, PortName::Feedback],
        }
    }

    /// The input that carries external events down the recursion.
    pub fn primary_input(&self) -> PortName {
        self.input_ports()[0]
    }

    /// Number of leaves created per level for the given width.
    pub fn leaves_per_level(&self, width: u32) -> u64 {
        let columns = u64::from(width.saturating_sub(1));
        match self {
            Wiring::Flat | Wiring::Chain => columns,
            // 2 + 3 + ... + (columns + 1); fits in u64 for any u32 width
            Wiring::Triangular => columns * (columns + 3) / 2,
        }
    }
}

/// Parameters of a benchmark topology.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopologyParams {
    pub kind: BenchmarkKind,
    pub width: u32,
    pub depth: u32,
    pub stone: StoneConfig,
}

impl TopologyParams {
    pub fn new(kind: BenchmarkKind, width: u32, depth: u32, stone: StoneConfig) -> Self {
        Self {
            kind,
            width,
            depth,
            stone,
        }
    }

    /// Checks width, depth and period.
    pub fn validate(&self) -> TopologyResult<()> {
        if self.width < 1 {
            return Err(TopologyError::invalid_parameter(format!(
                "width must be at least 1, got {}",
                self.width
            )));
        }
        if self.depth < 1 {
            return Err(TopologyError::invalid_parameter(format!(
                "depth must be at least 1, got {}",
                self.depth
            )));
        }
        if !(self.stone.period.is_finite() && self.stone.period > 0.0) {
            return Err(TopologyError::invalid_parameter(format!(
                "period must be positive and finite, got {}",
                self.stone.period
            )));
        }
        if self.checked_atomic_count().is_none() {
            return Err(TopologyError::invalid_parameter(format!(
                "{} topology of width {} and depth {} has too many atomics to count",
                self.kind, self.width, self.depth
            )));
        }
        Ok(())
    }

    /// Atomic count a correct build of these parameters yields, or `None`
    /// if it does not fit in a `u64`.
    pub fn checked_atomic_count(&self) -> Option<u64> {
        self.kind
            .wiring()
            .leaves_per_level(self.width)
            .checked_mul(u64::from(self.depth.saturating_sub(1)))?
            .checked_add(1)
    }

    /// Atomic count a correct build of these parameters yields, saturating
    /// at `u64::MAX`.
    pub fn expected_atomic_count(&self) -> u64 {
        self.checked_atomic_count().unwrap_or(u64::MAX)
    }
}

/// Builds a topology with the default spin workload.
pub fn build(
    kind: BenchmarkKind,
    width: u32,
    depth: u32,
    external_cycles: u64,
    internal_cycles: u64,
    period: SimTime,
) -> TopologyResult<CoupledModel> {
    let stone = StoneConfig::new(internal_cycles, external_cycles, period);
    TopologyBuilder::new(TopologyParams::new(kind, width, depth, stone)).build()
}

/// The state handed from one level to the next.
struct LevelSnapshot {
    /// Container of this level
    container: CoupledModel,
    /// Leaves created at this level, by column then row
    leaves: Vec<Vec<StoneAtomic>>,
}

/// Builds DEVStone hierarchies.
#[derive(Debug)]
pub struct TopologyBuilder {
    params: TopologyParams,
    workload: Arc<dyn Workload>,
    next_id: NodeId,
}

impl TopologyBuilder {
    pub fn new(params: TopologyParams) -> Self {
        Self {
            params,
            workload: Arc::new(SpinWorkload),
            next_id: 0,
        }
    }

    /// Sets the workload every atomic burns cycles with.
    pub fn with_workload(mut self, workload: Arc<dyn Workload>) -> Self {
        self.workload = workload;
        self
    }

    pub fn params(&self) -> &TopologyParams {
        &self.params
    }

    /// Builds the hierarchy and returns its root (the level `depth` container).
    pub fn build(mut self) -> TopologyResult<CoupledModel> {
        self.params.validate()?;
        let TopologyParams {
            kind, width, depth, ..
        } = self.params;

        let seed = self.atomic(Address::new(0, 0, 0));
        let first = self.first_level(seed)?;
        let last = (2..=depth).try_fold(first, |prev, level| self.next_level(prev, level))?;
        debug_assert!(last.leaves.is_empty());

        let root = last.container;
        tracing::info!(
            kind = %kind,
            width,
            depth,
            atomics = root.atomic_count(),
            coupled = root.coupled_count(),
            "built DEVStone topology"
        );
        Ok(root)
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn atomic(&mut self, address: Address) -> StoneAtomic {
        let id = self.fresh_id();
        StoneAtomic::with_workload(
            id,
            format!("stone_L{}_{}_{}", address.level, address.column, address.row),
            address,
            self.params.stone,
            Arc::clone(&self.workload),
        )
    }

    fn container(&mut self, level: u32) -> TopologyResult<CoupledModel> {
        let id = self.fresh_id();
        CoupledModel::new(
            id,
            format!("L{}_coupled", level),
            Address::container(level),
            self.params.kind.wiring().input_ports(),
            &[PortName::Out],
        )
    }

    /// Creates the leaves level `level` hands to the next one.
    fn leaves(&mut self, level: u32) -> Vec<Vec<StoneAtomic>> {
        if level >= self.params.depth {
            return Vec::new();
        }
        let wiring = self.params.kind.wiring();
        let mut columns = Vec::with_capacity(self.params.width as usize - 1);
        for column in 0..self.params.width - 1 {
            let mut rows = Vec::with_capacity(wiring.column_height(column) as usize);
            for row in 0..wiring.column_height(column) {
                rows.push(self.atomic(Address::new(level, column, row)));
            }
            columns.push(rows);
        }
        columns
    }

    fn first_level(&mut self, seed: StoneAtomic) -> TopologyResult<LevelSnapshot> {
        let primary = self.params.kind.wiring().primary_input();
        let mut container = self.container(1)?;
        let leaf = container.add_child(seed);
        container.add_eic(primary, leaf, PortName::In)?;
        container.add_eoc(leaf, PortName::Out, PortName::Out)?;

        tracing::debug!(level = 1, children = 1, "built level");
        let leaves = self.leaves(1);
        Ok(LevelSnapshot { container, leaves })
    }

    fn next_level(&mut self, prev: LevelSnapshot, level: u32) -> TopologyResult<LevelSnapshot> {
        let wiring = self.params.kind.wiring();
        let primary = wiring.primary_input();
        let mut container = self.container(level)?;

        let sub = container.add_child(prev.container);
        container.add_eic(primary, sub, primary)?;
        container.add_eoc(sub, PortName::Out, PortName::Out)?;

        match wiring {
            Wiring::Flat => {
                for leaf in prev.leaves.into_iter().flatten() {
                    let idx = container.add_child(leaf);
                    container.add_eic(PortName::In, idx, PortName::In)?;
                }
            }
            Wiring::Chain => {
                let mut previous: Option<ChildIndex> = None;
                for leaf in prev.leaves.into_iter().flatten() {
                    let idx = container.add_child(leaf);
                    container.add_eic(PortName::In, idx, PortName::In)?;
                    if let Some(before) = previous {
                        container.add_ic(before, PortName::Out, idx, PortName::In)?;
                    }
                    previous = Some(idx);
                }
            }
            Wiring::Triangular => {
                for column in prev.leaves {
                    let last_row = column.len().saturating_sub(1);
                    let mut above: Option<ChildIndex> = None;
                    for (row, leaf) in column.into_iter().enumerate() {
                        let idx = container.add_child(leaf);
                        if row == 0 || row == last_row {
                            container.add_eic(PortName::Feedback, idx, PortName::In)?;
                        }
                        match above {
                            None => container.add_ic(idx, PortName::Out, sub, PortName::Feedback)?,
                            Some(up) => container.add_ic(idx, PortName::Out, up, PortName::In)?,
                        }
                        above = Some(idx);
                    }
                }
            }
        }

        tracing::debug!(
            level,
            children = container.children().len(),
            eic = container.eic().len(),
            ic = container.ic().len(),
            "built level"
        );
        let leaves = self.leaves(level);
        Ok(LevelSnapshot { container, leaves })
    }
}

/// Name of the event reader in the handoff view.
pub const EVENT_READER_NAME: &str = "event_reader";

/// The pair handed to an execution kernel: the root container and the
/// event source feeding it.
#[derive(Debug)]
pub struct Benchmark<R> {
    pub root: CoupledModel,
    pub source: EventSource<R>,
}

impl<R> Benchmark<R> {
    pub fn new(root: CoupledModel, source: EventSource<R>) -> Self {
        Self { root, source }
    }

    pub fn into_parts(self) -> (CoupledModel, EventSource<R>) {
        (self.root, self.source)
    }

    /// Outermost view of the benchmark: the event reader and the root as
    /// siblings, with the reader's output coupled to every root input.
    pub fn top_tree(&self) -> ModelTree {
        ModelTree::top("top_coupled", EVENT_READER_NAME, &self.root)
    }
}
