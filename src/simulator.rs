//! Cycle-stepped reference engine.
//!
//! Every core runs the same DAXPY-shaped program (load x, load y, multiply, add, store y per
//! element) in order, one instruction at a time. Instruction fetches and data accesses both
//! cross the shared crossbar, which forwards `crossbar_width` requests per cycle to the memory
//! controller in arrival order. Floating-point ops occupy the core's functional unit for the
//! class latency, and the unit accepts the next op no sooner than `issue_latency` cycles after
//! the previous issue.

use crate::config::EngineConfig;
use crate::core::{CoreId, Cycle, Tick};
use crate::driver::{Engine, ExitEvent};
use crate::error::{Error, Result};
use crate::fu_pool::{FunctionalUnitTable, OperationClass};
use crate::memory::AddrRange;
use crate::topology::TopologyDescription;
use std::collections::VecDeque;
use std::sync::Arc;

pub const EXIT_CAUSE_DONE: &str = "exiting with last active thread context";
pub const EXIT_CAUSE_LIMIT: &str = "simulate() limit reached";

/// Instructions delivered by one fetch request.
const FETCH_BLOCK_INSTRUCTIONS: usize = 16;

const ELEMENT_BYTES: u64 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Instruction {
    Float { class: OperationClass, latency: u32 },
    Load { address: u64 },
    Store { address: u64 },
}

/// Builds the per-core program, resolving op latencies from the pool.
fn daxpy_program(
    elements: usize,
    mem_range: AddrRange,
    fu_pool: &FunctionalUnitTable,
) -> Result<Vec<Instruction>> {
    let array_bytes = elements as u64 * ELEMENT_BYTES;
    if 2 * array_bytes > mem_range.size {
        return Err(Error::EngineFault(format!(
            "working set of {} bytes exceeds the {} byte memory range",
            2 * array_bytes,
            mem_range.size
        )));
    }
    let float_op = |class: OperationClass| {
        fu_pool
            .latency(class)
            .map(|latency| Instruction::Float { class, latency })
            .ok_or_else(|| {
                Error::EngineFault(format!(
                    "functional unit pool does not support {}",
                    class.as_ref()
                ))
            })
    };
    let mult = float_op(OperationClass::FloatMult)?;
    let add = float_op(OperationClass::FloatAdd)?;

    let x_base = mem_range.start;
    let y_base = x_base + array_bytes;
    let mut program = Vec::with_capacity(elements * 5);
    for i in 0..elements as u64 {
        let offset = i * ELEMENT_BYTES;
        program.extend([
            Instruction::Load {
                address: x_base + offset,
            },
            Instruction::Load {
                address: y_base + offset,
            },
            mult,
            add,
            Instruction::Store {
                address: y_base + offset,
            },
        ]);
    }
    Ok(program)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Request {
    Fetch,
    Data,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CoreStatus {
    Ready,
    WaitingForBus(Request),
    WaitingForMemory { request: Request, done_at: Cycle },
    Executing { done_at: Cycle },
    Halted,
}

struct CoreState {
    id: CoreId,
    status: CoreStatus,
    pc: usize,
    /// Instructions before this index are in the fetch buffer.
    fetched_until: usize,
    fu_free_at: Cycle,
    issue_latency: Cycle,
    retired: u64,
}

impl CoreState {
    fn decode(
        &mut self,
        idx: usize,
        program: &[Instruction],
        crossbar: &mut VecDeque<usize>,
        cycle: Cycle,
    ) {
        match program[self.pc] {
            Instruction::Float { class, latency } => {
                let start = cycle.max(self.fu_free_at);
                log::trace!("{} issues {} at cycle {start}", self.id, class.as_ref());
                self.status = CoreStatus::Executing {
                    done_at: start + latency as Cycle,
                };
                self.fu_free_at = start + self.issue_latency;
            }
            Instruction::Load { address } | Instruction::Store { address } => {
                log::trace!("{} requests {address:#x} at cycle {cycle}", self.id);
                self.status = CoreStatus::WaitingForBus(Request::Data);
                crossbar.push_back(idx);
            }
        }
    }

    fn retire(&mut self) {
        self.pc += 1;
        self.retired += 1;
        self.status = CoreStatus::Ready;
    }
}

/// Counters collected over one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub cycles: Cycle,
    pub instructions: u64,
    pub memory_requests: u64,
    /// Sum over cycles of requests left waiting at the crossbar.
    pub crossbar_wait_cycles: u64,
}

/// An instantiated topology, ready to simulate.
pub struct System {
    program: Arc<[Instruction]>,
    cores: Vec<CoreState>,
    crossbar: VecDeque<usize>,
    crossbar_width: usize,
    memory_latency: Cycle,
    period: Tick,
    max_ticks: Option<Tick>,
    stats: EngineStats,
}

impl System {
    fn step(&mut self, cycle: Cycle) {
        let program = &self.program;
        let crossbar = &mut self.crossbar;

        // 1) Memory responses and finished ops.
        for (idx, core) in self.cores.iter_mut().enumerate() {
            match core.status {
                CoreStatus::WaitingForMemory {
                    request: Request::Fetch,
                    done_at,
                } if done_at <= cycle => {
                    let block_start = core.pc - core.pc % FETCH_BLOCK_INSTRUCTIONS;
                    core.fetched_until =
                        (block_start + FETCH_BLOCK_INSTRUCTIONS).min(program.len());
                    core.decode(idx, program, crossbar, cycle);
                }
                CoreStatus::WaitingForMemory {
                    request: Request::Data,
                    done_at,
                } if done_at <= cycle => core.retire(),
                CoreStatus::Executing { done_at } if done_at <= cycle => core.retire(),
                _ => {}
            }
        }

        // 2) Ready cores decode from the fetch buffer or request the next block.
        for (idx, core) in self.cores.iter_mut().enumerate() {
            if core.status != CoreStatus::Ready {
                continue;
            }
            if core.pc >= program.len() {
                core.status = CoreStatus::Halted;
                log::trace!("{} halted at cycle {cycle}", core.id);
            } else if core.pc < core.fetched_until {
                core.decode(idx, program, crossbar, cycle);
            } else {
                core.status = CoreStatus::WaitingForBus(Request::Fetch);
                crossbar.push_back(idx);
            }
        }

        // 3) Crossbar arbitration, oldest request first.
        for _ in 0..self.crossbar_width {
            let Some(idx) = crossbar.pop_front() else {
                break;
            };
            let core = &mut self.cores[idx];
            if let CoreStatus::WaitingForBus(request) = core.status {
                core.status = CoreStatus::WaitingForMemory {
                    request,
                    done_at: cycle + self.memory_latency,
                };
                self.stats.memory_requests += 1;
            }
        }
        self.stats.crossbar_wait_cycles += crossbar.len() as u64;
    }

    fn run(&mut self) -> ExitEvent {
        let mut cycle: Cycle = 0;
        let cause = loop {
            if self.cores.iter().all(|c| c.status == CoreStatus::Halted) {
                break EXIT_CAUSE_DONE;
            }
            if let Some(max_ticks) = self.max_ticks {
                if cycle * self.period >= max_ticks {
                    break EXIT_CAUSE_LIMIT;
                }
            }
            self.step(cycle);
            cycle += 1;
        };
        self.stats.cycles = cycle;
        self.stats.instructions = self.cores.iter().map(|c| c.retired).sum();
        ExitEvent {
            elapsed_ticks: cycle * self.period,
            cause: cause.to_string(),
        }
    }
}

/// Reference [`Engine`] used by the command line sweep.
#[derive(Debug, Default)]
pub struct CycleEngine {
    config: EngineConfig,
    last_stats: Option<EngineStats>,
}

impl CycleEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            last_stats: None,
        }
    }

    /// Counters of the most recent completed run.
    pub fn last_stats(&self) -> Option<&EngineStats> {
        self.last_stats.as_ref()
    }
}

impl Engine for CycleEngine {
    type Handle = System;

    fn instantiate(&mut self, topology: &TopologyDescription) -> Result<System> {
        let period = topology.clock.period();
        if period == 0 {
            return Err(Error::EngineFault(format!(
                "clock of {} Hz is below tick resolution",
                topology.clock.frequency_hz
            )));
        }
        if self.config.crossbar_width == 0 {
            return Err(Error::EngineFault(
                "crossbar must forward at least one request per cycle".to_string(),
            ));
        }
        let program: Arc<[Instruction]> =
            daxpy_program(self.config.elements_per_core, topology.mem_range, &topology.fu_pool)?
                .into();
        let memory_latency = topology.mem_ctrl.access_latency().div_ceil(period).max(1);
        let cores = topology
            .cores
            .iter()
            .map(|core| CoreState {
                id: core.id,
                status: CoreStatus::Ready,
                pc: 0,
                fetched_until: 0,
                fu_free_at: 0,
                issue_latency: core.fu_pool.issue_latency() as Cycle,
                retired: 0,
            })
            .collect();
        log::debug!(
            "instantiated {} cores running {:?}: {} instructions each, memory latency {} cycles",
            topology.core_count(),
            topology.workload.cmd,
            program.len(),
            memory_latency
        );
        Ok(System {
            program,
            cores,
            crossbar: VecDeque::new(),
            crossbar_width: self.config.crossbar_width,
            memory_latency,
            period,
            max_ticks: self.config.max_ticks,
            stats: EngineStats::default(),
        })
    }

    fn simulate(&mut self, mut system: System) -> Result<ExitEvent> {
        let exit = system.run();
        log::debug!("{:?}", system.stats);
        self.last_stats = Some(system.stats);
        Ok(exit)
    }
}
