//! Sweep harness: runs one topology per latency configuration, strictly in order, and derives
//! throughput for each.
//!
//! The first failing point aborts the whole sweep. The error names the point and stage and
//! carries the results collected before it.

use crate::driver::{run_to_completion, Engine};
use crate::error::{Error, Result};
use crate::fu_pool::build_latency_table;
use crate::metrics::{RunResult, ASSUMED_FLOATING_POINT_OPERATIONS};
use crate::topology::TopologyBuilder;
use crate::workload::{Workload, WorkloadResolver};
use serde::Serialize;
use std::fmt;

/// Tunable inputs of one run. All fields are at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LatencyParameters {
    pub op_latency: u32,
    pub issue_latency: u32,
    pub core_count: u32,
}

impl LatencyParameters {
    pub fn new(op_latency: u32, issue_latency: u32, core_count: u32) -> Result<Self> {
        for (name, value) in [
            ("op latency", op_latency),
            ("issue latency", issue_latency),
            ("core count", core_count),
        ] {
            if value < 1 {
                return Err(Error::InvalidConfiguration(format!(
                    "{name} must be at least 1, got {value}"
                )));
            }
        }
        Ok(Self {
            op_latency,
            issue_latency,
            core_count,
        })
    }
}

/// Step of a sweep point that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Configure,
    Build,
    Simulate,
    Measure,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Configure => write!(f, "configure"),
            Stage::Build => write!(f, "build"),
            Stage::Simulate => write!(f, "simulate"),
            Stage::Measure => write!(f, "measure"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error(
    "sweep point {index} (opLat = {}, issueLat = {}) failed during {stage}: {source}",
    .configuration.0,
    .configuration.1
)]
pub struct SweepError {
    pub index: usize,
    /// The failing `(op_latency, issue_latency)` pair.
    pub configuration: (u32, u32),
    pub stage: Stage,
    pub source: Error,
    /// Results of the points that finished before the failure.
    pub completed: Vec<RunResult>,
}

pub struct SweepHarness<E, R> {
    engine: E,
    builder: TopologyBuilder<R>,
    workload: Workload,
    assumed_operations: u64,
}

impl<E, R> SweepHarness<E, R>
where
    E: Engine,
    R: WorkloadResolver,
{
    pub fn new(engine: E, builder: TopologyBuilder<R>, workload: Workload) -> Self {
        Self {
            engine,
            builder,
            workload,
            assumed_operations: ASSUMED_FLOATING_POINT_OPERATIONS,
        }
    }

    /// Overrides the placeholder operation count used for throughput.
    pub fn with_assumed_operations(mut self, operations: u64) -> Self {
        self.assumed_operations = operations;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs every configuration in order. Returns one result per configuration, in input order.
    pub fn run_sweep(
        &mut self,
        core_count: u32,
        configurations: &[(u32, u32)],
    ) -> std::result::Result<Vec<RunResult>, SweepError> {
        let mut results = Vec::with_capacity(configurations.len());
        for (index, &(op_latency, issue_latency)) in configurations.iter().enumerate() {
            log::info!(
                "[{}/{}] Running simulation with opLat = {op_latency}, issueLat = {issue_latency}...",
                index + 1,
                configurations.len()
            );
            match self.run_point(op_latency, issue_latency, core_count) {
                Ok(result) => {
                    log::info!(
                        "opLat = {op_latency}, issueLat = {issue_latency}: {} ticks, throughput {:.3}",
                        result.elapsed_ticks,
                        result.throughput
                    );
                    results.push(result);
                }
                Err((stage, source)) => {
                    log::error!(
                        "configuration {index} (opLat = {op_latency}, issueLat = {issue_latency}) failed during {stage}: {source}"
                    );
                    return Err(SweepError {
                        index,
                        configuration: (op_latency, issue_latency),
                        stage,
                        source,
                        completed: results,
                    });
                }
            }
        }
        Ok(results)
    }

    fn run_point(
        &mut self,
        op_latency: u32,
        issue_latency: u32,
        core_count: u32,
    ) -> std::result::Result<RunResult, (Stage, Error)> {
        let params = LatencyParameters::new(op_latency, issue_latency, core_count)
            .map_err(|err| (Stage::Configure, err))?;
        let fu_table = build_latency_table(params.op_latency, params.issue_latency)
            .map_err(|err| (Stage::Configure, err))?;
        let topology = self
            .builder
            .build(params.core_count, fu_table, &self.workload)
            .map_err(|err| (Stage::Build, err))?;
        let exit = run_to_completion(&mut self.engine, &topology)
            .map_err(|err| (Stage::Simulate, err))?;
        RunResult::new(
            params,
            exit.elapsed_ticks,
            exit.cause,
            self.assumed_operations,
        )
        .map_err(|err| (Stage::Measure, err))
    }
}
