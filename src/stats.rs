//! Statistics about built topologies.
//!
//! This module summarizes the shape of a hierarchy (model and coupling
//! counts, overall and per level) next to the counts the parameters
//! predict, with JSON, CSV and text export.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::coupling::CoupledModel;
use crate::nodes::stone::StoneConfig;
use crate::topology::{BenchmarkKind, TopologyParams};

/// Aggregate statistics for one built topology.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopologyStats {
    /// Parameters the topology was built from
    pub kind: BenchmarkKind,
    pub width: u32,
    pub depth: u32,

    /// Atomic count predicted from the parameters
    pub expected_atomics: u64,

    /// Atomic count found in the hierarchy
    pub atomics: u64,

    /// Coupled models found in the hierarchy
    pub coupled: u64,

    /// Coupling totals across all levels
    pub eic: u64,
    pub eoc: u64,
    pub ic: u64,

    /// Per-level breakdown, root first
    pub levels: Vec<LevelStats>,

    /// Wall time spent building, if measured
    pub build_time_ms: Option<f64>,
}

/// Statistics for a single level's container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub level: u32,
    pub children: usize,
    pub atomics: usize,
    pub eic: usize,
    pub eoc: usize,
    pub ic: usize,
}

impl TopologyStats {
    /// Walks `root` and records its shape.
    pub fn collect(params: &TopologyParams, root: &CoupledModel) -> Self {
        let levels: Vec<LevelStats> = root
            .levels()
            .into_iter()
            .map(|level| LevelStats {
                level: level.level(),
                children: level.children().len(),
                atomics: level.direct_atomics().count(),
                eic: level.eic().len(),
                eoc: level.eoc().len(),
                ic: level.ic().len(),
            })
            .collect();

        Self {
            kind: params.kind,
            width: params.width,
            depth: params.depth,
            expected_atomics: params.expected_atomic_count(),
            atomics: root.atomic_count() as u64,
            coupled: root.coupled_count() as u64,
            eic: levels.iter().map(|l| l.eic as u64).sum(),
            eoc: levels.iter().map(|l| l.eoc as u64).sum(),
            ic: levels.iter().map(|l| l.ic as u64).sum(),
            levels,
            build_time_ms: None,
        }
    }

    /// Records how long the build took.
    pub fn with_build_time(mut self, ms: f64) -> Self {
        self.build_time_ms = Some(ms);
        self
    }

    /// Returns true if the hierarchy holds as many atomics as predicted.
    pub fn is_consistent(&self) -> bool {
        self.atomics == self.expected_atomics && self.coupled == u64::from(self.depth)
    }

    /// Exports statistics to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports statistics to JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Exports summary statistics to CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("metric,value\n");
        csv.push_str(&format!("kind,{}\n", self.kind));
        csv.push_str(&format!("width,{}\n", self.width));
        csv.push_str(&format!("depth,{}\n", self.depth));
        csv.push_str(&format!("expected_atomics,{}\n", self.expected_atomics));
        csv.push_str(&format!("atomics,{}\n", self.atomics));
        csv.push_str(&format!("coupled,{}\n", self.coupled));
        csv.push_str(&format!("eic,{}\n", self.eic));
        csv.push_str(&format!("eoc,{}\n", self.eoc));
        csv.push_str(&format!("ic,{}\n", self.ic));
        if let Some(ms) = self.build_time_ms {
            csv.push_str(&format!("build_time_ms,{:.3}\n", ms));
        }

        csv
    }

    /// Exports per-level statistics to CSV.
    pub fn levels_to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("level,children,atomics,eic,eoc,ic\n");
        for l in &self.levels {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                l.level, l.children, l.atomics, l.eic, l.eoc, l.ic
            ));
        }

        csv
    }

    /// Exports summary statistics to CSV file.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "=== DEVStone Topology ===")?;
        writeln!(
            w,
            "Kind: {}  Width: {}  Depth: {}",
            self.kind, self.width, self.depth
        )?;
        writeln!(w, "Expected atomic models: {}", self.expected_atomics)?;
        writeln!(w, "Atomic models: {}", self.atomics)?;
        writeln!(w, "Coupled models: {}", self.coupled)?;
        writeln!(w, "Total models: {}", self.atomics + self.coupled)?;
        writeln!(w, "Couplings: EIC {}, EOC {}, IC {}", self.eic, self.eoc, self.ic)?;
        if let Some(ms) = self.build_time_ms {
            writeln!(w, "Build time: {:.3} ms", ms)?;
        }
        Ok(())
    }

    /// Returns a summary string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Atomic count a DEVStone build of the given shape contains, saturating
/// at `u64::MAX`.
pub fn expected_atomic_count(kind: BenchmarkKind, width: u32, depth: u32) -> u64 {
    TopologyParams::new(kind, width, depth, StoneConfig::default()).expected_atomic_count()
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}
