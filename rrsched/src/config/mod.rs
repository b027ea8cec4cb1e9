//! Simulation configuration loading and validation.
//!
//! The expected YAML structure is:
//! ```yaml
//! simulation:
//!   num_tasks: 10
//!   min_time: 3
//!   max_time: 10
//!   time_quantum: 2
//!   num_workers: 4
//!   worker_memory_capacity: 100
//!   seed: 42
//! ```
//!
//! Every field is optional; missing values fall back to [`SimConfig::default`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scheduler::SimError;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default number of workers in the pool.
pub const DEFAULT_NUM_WORKERS: usize = 4;

/// Default per-worker memory capacity, in MB.
pub const DEFAULT_WORKER_MEMORY: u64 = 100;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimConfigFile {
    simulation: SimConfig,
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Parameters for one simulation run.
///
/// A `SimConfig` is only trusted after [`validate`](Self::validate) succeeds;
/// [`initialize`](crate::scheduler::initialize) calls it before building any
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Number of tasks to generate.
    pub num_tasks: usize,

    /// Lower bound (inclusive) on a task's CPU demand, in ticks.
    pub min_time: u64,

    /// Upper bound (inclusive) on a task's CPU demand, in ticks.
    pub max_time: u64,

    /// Maximum consecutive ticks a task may run before preemption.
    pub time_quantum: u64,

    /// Size of the worker pool.
    pub num_workers: usize,

    /// Memory capacity of every worker, in MB.
    pub worker_memory_capacity: u64,

    /// RNG seed for task generation.  `None` draws a fresh seed per run.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_tasks: 10,
            min_time: 3,
            max_time: 10,
            time_quantum: 2,
            num_workers: DEFAULT_NUM_WORKERS,
            worker_memory_capacity: DEFAULT_WORKER_MEMORY,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Check every bound.
    ///
    /// # Errors
    /// [`SimError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.num_tasks < 1 {
            return Err(SimError::invalid("num_tasks", "must be at least 1"));
        }
        if u32::try_from(self.num_tasks).is_err() {
            return Err(SimError::invalid(
                "num_tasks",
                format!("must not exceed {}", u32::MAX),
            ));
        }
        if self.min_time < 1 {
            return Err(SimError::invalid("min_time", "must be at least 1"));
        }
        if self.max_time < self.min_time {
            return Err(SimError::invalid(
                "max_time",
                format!(
                    "({}) must not be less than min_time ({})",
                    self.max_time, self.min_time
                ),
            ));
        }
        if self.time_quantum < 1 {
            return Err(SimError::invalid("time_quantum", "must be at least 1"));
        }
        if self.num_workers < 1 {
            return Err(SimError::invalid("num_workers", "must be at least 1"));
        }
        if self.worker_memory_capacity < 1 {
            return Err(SimError::invalid(
                "worker_memory_capacity",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parse `path` as YAML and validate the result.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is structurally
    /// invalid, or a bound is violated.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading simulation configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: SimConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let cfg = file.simulation;
        cfg.validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        debug!(
            num_tasks = cfg.num_tasks,
            min_time = cfg.min_time,
            max_time = cfg.max_time,
            time_quantum = cfg.time_quantum,
            num_workers = cfg.num_workers,
            worker_memory_capacity = cfg.worker_memory_capacity,
            seed = ?cfg.seed,
            "configuration loaded"
        );

        Ok(cfg)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── validate ──────────────────────────────────────────────────────────────

    #[test]
    fn default_config_is_valid() {
        let cfg = SimConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.num_workers, 4);
        assert_eq!(cfg.worker_memory_capacity, 100);
    }

    #[test]
    fn zero_tasks_is_rejected() {
        let cfg = SimConfig {
            num_tasks: 0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConfig {
                field: "num_tasks",
                ..
            }
        ));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn task_count_beyond_id_range_is_rejected() {
        let cfg = SimConfig {
            num_tasks: u32::MAX as usize + 1,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConfig {
                field: "num_tasks",
                ..
            }
        ));
    }

    #[test]
    fn inverted_time_bounds_are_rejected() {
        let cfg = SimConfig {
            min_time: 8,
            max_time: 3,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConfig {
                field: "max_time",
                ..
            }
        ));
    }

    #[test]
    fn zero_bounds_are_rejected() {
        for cfg in [
            SimConfig {
                min_time: 0,
                ..Default::default()
            },
            SimConfig {
                time_quantum: 0,
                ..Default::default()
            },
            SimConfig {
                num_workers: 0,
                ..Default::default()
            },
            SimConfig {
                worker_memory_capacity: 0,
                ..Default::default()
            },
        ] {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
simulation:
  num_tasks: 6
  min_time: 2
  max_time: 5
  time_quantum: 3
  num_workers: 2
  worker_memory_capacity: 64
  seed: 7
"#;
        let f = yaml_tempfile(yaml);
        let cfg = SimConfig::load_from_file(f.path()).unwrap();
        assert_eq!(
            cfg,
            SimConfig {
                num_tasks: 6,
                min_time: 2,
                max_time: 5,
                time_quantum: 3,
                num_workers: 2,
                worker_memory_capacity: 64,
                seed: Some(7),
            }
        );
    }

    #[test]
    fn load_shipped_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/simulation.yaml");
        let cfg = SimConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.num_workers, DEFAULT_NUM_WORKERS);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let f = yaml_tempfile("simulation:\n  num_tasks: 3\n");
        let cfg = SimConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg.num_tasks, 3);
        assert_eq!(cfg.time_quantum, 2);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn invalid_bounds_in_file_return_error() {
        let f = yaml_tempfile("simulation:\n  min_time: 9\n  max_time: 2\n");
        assert!(SimConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn unknown_field_returns_error() {
        let f = yaml_tempfile("simulation:\n  quantum: 2\n");
        assert!(SimConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = SimConfig::load_from_file(Path::new("/nonexistent/path/sim.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(SimConfig::load_from_file(f.path()).is_err());
    }
}
