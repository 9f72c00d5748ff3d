//! Sweep configuration, loadable from TOML.

use crate::error::{Error, Result};
use crate::memory::MIB;
use crate::metrics::ASSUMED_FLOATING_POINT_OPERATIONS;
use crate::workload::Workload;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Clock and memory layout shared by every sweep point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub clock_hz: u64,
    pub mem_size_bytes: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            clock_hz: 1_000_000_000,
            mem_size_bytes: 512 * MIB,
        }
    }
}

/// Settings of the built-in cycle engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Loop iterations of the synthetic program each core executes.
    pub elements_per_core: usize,
    /// Requests the crossbar forwards to memory per cycle.
    pub crossbar_width: usize,
    /// Stop the run once this many ticks have elapsed.
    pub max_ticks: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            elements_per_core: 256,
            crossbar_width: 1,
            max_ticks: None,
        }
    }
}

/// Everything a sweep needs: the shared core count, the ordered latency pairs, and the fixed
/// system, workload and engine settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub core_count: u32,
    /// Ordered `(op_latency, issue_latency)` pairs.
    pub configurations: Vec<(u32, u32)>,
    /// Placeholder operation count used for throughput.
    pub assumed_fp_operations: u64,
    pub system: SystemConfig,
    pub workload: Workload,
    pub engine: EngineConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            core_count: 4,
            configurations: vec![(1, 6), (2, 5), (3, 4)],
            assumed_fp_operations: ASSUMED_FLOATING_POINT_OPERATIONS,
            system: SystemConfig::default(),
            workload: Workload::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl SweepConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }
}
