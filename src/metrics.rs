//! Per-point run results and the throughput metric derived from elapsed ticks.

use crate::core::Tick;
use crate::error::{Error, Result};
use crate::sweep::LatencyParameters;
use serde::Serialize;
use std::fmt;

/// Floating-point operations assumed for every run when deriving throughput.
///
/// Placeholder: the engine does not report how many operations actually executed.
pub const ASSUMED_FLOATING_POINT_OPERATIONS: u64 = 600_000;

/// Operations per tick. Fails if no time elapsed.
pub fn throughput(operations: u64, elapsed_ticks: Tick) -> Result<f64> {
    if elapsed_ticks == 0 {
        return Err(Error::EngineFault(
            "run finished after 0 ticks; throughput is undefined".to_string(),
        ));
    }
    Ok(operations as f64 / elapsed_ticks as f64)
}

/// Outcome of one sweep point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    pub params: LatencyParameters,
    pub elapsed_ticks: Tick,
    pub exit_cause: String,
    pub assumed_operations: u64,
    pub throughput: f64,
}

impl RunResult {
    pub fn new(
        params: LatencyParameters,
        elapsed_ticks: Tick,
        exit_cause: String,
        assumed_operations: u64,
    ) -> Result<Self> {
        Ok(Self {
            params,
            elapsed_ticks,
            exit_cause,
            assumed_operations,
            throughput: throughput(assumed_operations, elapsed_ticks)?,
        })
    }
}

/// Result with the highest throughput; the earliest wins a tie.
pub fn best(results: &[RunResult]) -> Option<&RunResult> {
    results.iter().fold(None, |best: Option<&RunResult>, r| match best {
        Some(b) if b.throughput >= r.throughput => Some(b),
        _ => Some(r),
    })
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Configuration: opLat = {}, issueLat = {}",
            self.params.op_latency, self.params.issue_latency
        )?;
        writeln!(f, "Total Ticks: {} ticks", self.elapsed_ticks)?;
        writeln!(
            f,
            "Floating-point Operations: {} operations",
            self.assumed_operations
        )?;
        write!(f, "Throughput: {:.3} operations per tick", self.throughput)
    }
}
