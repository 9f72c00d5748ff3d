//! Error taxonomy shared by the topology builder, the driver and the sweep harness.

use std::path::PathBuf;

/// Errors raised while configuring, building or running a sweep point.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Non-positive latency, core count, worker count or malformed range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Workload unresolvable or topology internally inconsistent.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Failure surfaced by the timing engine during instantiate or simulate.
    #[error("engine fault: {0}")]
    EngineFault(String),

    /// Partitioner inputs have different lengths.
    #[error("dimension mismatch: x has {x_len} elements, y has {y_len}")]
    DimensionMismatch { x_len: usize, y_len: usize },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
