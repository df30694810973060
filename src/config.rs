//! Configuration for benchmark construction.
//!
//! A benchmark can be described declaratively in YAML or JSON and turned
//! into a topology and an event source.
//!
//! # Configuration File Structure
//!
//! ```yaml
//! benchmark:
//!   kind: HOmod
//!   width: 10
//!   depth: 5
//!   int_cycles: 100
//!   ext_cycles: 100
//!   period: 1
//!
//! events:
//!   trace: events.txt
//!
//! settings:
//!   log_level: debug
//!   collect_stats: true
//!   output_dir: reports
//! ```
//!
//! With `collect_stats` set, every build is timed and summarized as
//! [`TopologyStats`]. With `output_dir` also set, the statistics are written
//! there as `topology_stats.json`, `topology_stats.csv` and
//! `topology_levels.csv`.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::coupling::CoupledModel;
use crate::error::TopologyError;
use crate::event::EventSource;
use crate::nodes::stone::StoneConfig;
use crate::stats::{Timer, TopologyStats};
use crate::topology::{Benchmark, BenchmarkKind, TopologyBuilder, TopologyParams};
use crate::types::SimTime;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Shape and cost parameters of the benchmark.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSection {
    /// Topology pattern (LI, HI, HO, HOmod)
    pub kind: BenchmarkKind,

    /// Width of every level
    pub width: u32,

    /// Number of levels
    pub depth: u32,

    /// Cycles burned per internal transition
    #[serde(default)]
    pub int_cycles: u64,

    /// Cycles burned per external transition
    #[serde(default)]
    pub ext_cycles: u64,

    /// Time advance of an active atomic
    #[serde(default = "default_period")]
    pub period: SimTime,
}

fn default_period() -> SimTime {
    1.0
}

impl Default for BenchmarkSection {
    fn default() -> Self {
        Self {
            kind: BenchmarkKind::LI,
            width: 1,
            depth: 1,
            int_cycles: 0,
            ext_cycles: 0,
            period: default_period(),
        }
    }
}

/// Where exogenous events come from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsSection {
    /// Trace file; relative paths resolve against the config file
    #[serde(default)]
    pub trace: Option<PathBuf>,
}

/// Process-level settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to time builds and collect topology statistics
    #[serde(default)]
    pub collect_stats: bool,

    /// Directory statistics reports are written to; relative paths resolve
    /// against the config file
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            collect_stats: false,
            output_dir: None,
        }
    }
}

/// Complete benchmark configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub benchmark: BenchmarkSection,

    #[serde(default)]
    pub events: EventsSection,

    #[serde(default)]
    pub settings: Settings,
}

impl BenchConfig {
    /// Creates a configuration for the smallest LI benchmark.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_yaml(&content)?.relative_to(path.as_ref()))
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: BenchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json(&content)?.relative_to(path.as_ref()))
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: BenchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    fn relative_to(mut self, config_path: &Path) -> Self {
        if let Some(dir) = config_path.parent() {
            for path in [&mut self.events.trace, &mut self.settings.output_dir] {
                if let Some(p) = path.as_mut() {
                    if p.is_relative() {
                        *p = dir.join(&*p);
                    }
                }
            }
        }
        self
    }

    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.topology_params()
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let b = &self.benchmark;
        if b.kind == BenchmarkKind::HOmod && b.width > 1 && b.depth > 1 {
            let atomics = self.topology_params().expected_atomic_count();
            if atomics > 1_000_000 {
                tracing::warn!(
                    atomics,
                    width = b.width,
                    depth = b.depth,
                    "HOmod topology grows quadratically with width"
                );
            }
        }
        if b.width == 1 && b.depth > 1 {
            tracing::warn!(
                depth = b.depth,
                "width 1 yields a single atomic regardless of depth"
            );
        }

        if self.settings.output_dir.is_some() && !self.settings.collect_stats {
            tracing::warn!("output_dir is set but collect_stats is off; no reports will be written");
        }

        if self.settings.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Unknown log level: {}",
                self.settings.log_level
            )));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Topology parameters described by the `benchmark` section.
    pub fn topology_params(&self) -> TopologyParams {
        let b = &self.benchmark;
        TopologyParams::new(
            b.kind,
            b.width,
            b.depth,
            StoneConfig::new(b.int_cycles, b.ext_cycles, b.period),
        )
    }

    /// Builds the topology described by this configuration.
    ///
    /// Statistics are collected and written as configured in `settings`.
    pub fn build_topology(&self) -> ConfigResult<CoupledModel> {
        Ok(self.build_with_stats()?.0)
    }

    /// Builds the topology and, if `collect_stats` is set, times the build
    /// and returns its statistics.
    pub fn build_with_stats(&self) -> ConfigResult<(CoupledModel, Option<TopologyStats>)> {
        let params = self.topology_params();
        let timer = Timer::start();
        let root = TopologyBuilder::new(params).build()?;
        let elapsed = timer.elapsed_ms();

        if !self.settings.collect_stats {
            return Ok((root, None));
        }

        let stats = TopologyStats::collect(&params, &root).with_build_time(elapsed);
        tracing::info!(
            kind = %stats.kind,
            expected = stats.expected_atomics,
            atomics = stats.atomics,
            build_time_ms = elapsed,
            "collected topology statistics"
        );
        if let Some(dir) = &self.settings.output_dir {
            self.write_reports(&stats, dir)?;
        }
        Ok((root, Some(stats)))
    }

    fn write_reports(&self, stats: &TopologyStats, dir: &Path) -> ConfigResult<()> {
        std::fs::create_dir_all(dir)?;
        stats.to_json_file(dir.join("topology_stats.json"))?;
        stats.to_csv_file(dir.join("topology_stats.csv"))?;
        std::fs::write(dir.join("topology_levels.csv"), stats.levels_to_csv())?;
        tracing::debug!(dir = %dir.display(), "wrote topology statistics");
        Ok(())
    }

    /// Opens the configured event trace.
    pub fn open_event_source(&self) -> ConfigResult<EventSource<BufReader<File>>> {
        let path = self
            .events
            .trace
            .as_ref()
            .ok_or_else(|| ConfigError::Validation("No event trace configured".to_string()))?;
        Ok(EventSource::open(path)?)
    }

    /// Builds the topology and opens its event trace.
    pub fn assemble(&self) -> ConfigResult<Benchmark<BufReader<File>>> {
        let source = self.open_event_source()?;
        let root = self.build_topology()?;
        Ok(Benchmark::new(root, source))
    }
}

/// Builder for creating BenchConfig programmatically.
#[derive(Default)]
pub struct BenchConfigBuilder {
    config: BenchConfig,
}

impl BenchConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the topology kind.
    pub fn kind(mut self, kind: BenchmarkKind) -> Self {
        self.config.benchmark.kind = kind;
        self
    }

    /// Sets width and depth.
    pub fn shape(mut self, width: u32, depth: u32) -> Self {
        self.config.benchmark.width = width;
        self.config.benchmark.depth = depth;
        self
    }

    /// Sets the cycles burned per internal and external transition.
    pub fn cycles(mut self, int_cycles: u64, ext_cycles: u64) -> Self {
        self.config.benchmark.int_cycles = int_cycles;
        self.config.benchmark.ext_cycles = ext_cycles;
        self
    }

    /// Sets the time advance of active atomics.
    pub fn period(mut self, period: SimTime) -> Self {
        self.config.benchmark.period = period;
        self
    }

    /// Sets the event trace file.
    pub fn trace(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.events.trace = Some(path.into());
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.settings.log_level = level.into();
        self
    }

    /// Enables statistics collection.
    pub fn collect_stats(mut self, enable: bool) -> Self {
        self.config.settings.collect_stats = enable;
        self
    }

    /// Sets the directory statistics reports are written to.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.settings.output_dir = Some(dir.into());
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<BenchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::new();
        assert_eq!(config.benchmark.kind, BenchmarkKind::LI);
        assert_eq!(config.benchmark.period, 1.0);
        assert_eq!(config.settings.log_level, "info");
        assert!(config.events.trace.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
benchmark:
  kind: HOmod
  width: 4
  depth: 3
  int_cycles: 10
  ext_cycles: 20

events:
  trace: events.txt

settings:
  log_level: debug
  collect_stats: true
"#;

        let config = BenchConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.benchmark.kind, BenchmarkKind::HOmod);
        assert_eq!(config.benchmark.width, 4);
        assert_eq!(config.benchmark.int_cycles, 10);
        assert_eq!(config.benchmark.period, 1.0);
        assert_eq!(config.events.trace, Some(PathBuf::from("events.txt")));
        assert!(config.settings.collect_stats);

        let params = config.topology_params();
        assert_eq!(params.stone.internal_cycles, 10);
        assert_eq!(params.stone.external_cycles, 20);
    }

    #[test]
    fn test_json_parsing() {
        let json = r#"{
            "benchmark": {"kind": "HI", "width": 5, "depth": 2, "period": 0.25}
        }"#;

        let config = BenchConfig::from_json(json).unwrap();
        assert_eq!(config.benchmark.kind, BenchmarkKind::HI);
        assert_eq!(config.benchmark.period, 0.25);
        assert_eq!(config.settings.log_level, "info");
    }

    #[test]
    fn test_builder() {
        let config = BenchConfigBuilder::new()
            .kind(BenchmarkKind::HO)
            .shape(3, 4)
            .cycles(5, 6)
            .period(2.0)
            .collect_stats(true)
            .build()
            .unwrap();

        let root = config.build_topology().unwrap();
        assert_eq!(root.name(), "L4_coupled");
        assert_eq!(root.atomic_count(), 7);
    }

    #[test]
    fn test_validation_rejects_bad_shape() {
        assert!(matches!(
            BenchConfigBuilder::new().shape(0, 3).build(),
            Err(ConfigError::Validation(_))
        ));
        assert!(BenchConfigBuilder::new().shape(3, 0).build().is_err());
        assert!(BenchConfigBuilder::new().period(0.0).build().is_err());
        assert!(BenchConfigBuilder::new().log_level("loud").build().is_err());
    }

    #[test]
    fn test_huge_shape_rejected_without_panic() {
        let result = BenchConfigBuilder::new()
            .kind(BenchmarkKind::HOmod)
            .shape(10_000_000, u32::MAX)
            .build();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_stats_only_when_enabled() {
        let config = BenchConfigBuilder::new().shape(3, 3).build().unwrap();
        let (root, stats) = config.build_with_stats().unwrap();
        assert_eq!(root.atomic_count(), 5);
        assert!(stats.is_none());

        let config = BenchConfigBuilder::new()
            .shape(3, 3)
            .collect_stats(true)
            .build()
            .unwrap();
        let (_, stats) = config.build_with_stats().unwrap();
        let stats = stats.unwrap();
        assert!(stats.is_consistent());
        assert!(stats.build_time_ms.is_some());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let yaml = "benchmark:\n  kind: XX\n  width: 2\n  depth: 2\n";
        assert!(matches!(BenchConfig::from_yaml(yaml), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_missing_trace() {
        let config = BenchConfig::new();
        assert!(matches!(
            config.open_event_source(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!(
            BenchConfig::from_file("bench.toml"),
            Err(ConfigError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = BenchConfigBuilder::new()
            .kind(BenchmarkKind::HOmod)
            .shape(6, 6)
            .trace("trace.txt")
            .build()
            .unwrap();

        let yaml = config.to_yaml().unwrap();
        assert_eq!(BenchConfig::from_yaml(&yaml).unwrap(), config);
        let json = config.to_json().unwrap();
        assert_eq!(BenchConfig::from_json(&json).unwrap(), config);
    }
}
