//! Physical address range and the DRAM memory controller behind the crossbar.

use crate::core::{PortBinding, Tick};

pub const MIB: u64 = 1024 * 1024;

/// One contiguous physical address range `[start, start + size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddrRange {
    pub start: u64,
    pub size: u64,
}

impl AddrRange {
    /// Range starting at address 0.
    pub fn with_size(size: u64) -> Self {
        Self { start: 0, size }
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end()
    }
}

/// DRAM device model attached to the memory controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DramKind {
    /// DDR3-1600, x8 devices, 8 devices per rank.
    #[default]
    Ddr3_1600_8x8,
}

impl DramKind {
    /// Closed-page access latency (tRCD + tCL) in ticks.
    pub fn access_latency(&self) -> Tick {
        match self {
            // tRCD = tCL = 13.75 ns
            DramKind::Ddr3_1600_8x8 => 13_750 + 13_750,
        }
    }
}

/// Memory controller serving the whole address range.
#[derive(Clone, Debug)]
pub struct MemoryController {
    pub kind: DramKind,
    pub range: AddrRange,
    pub port: PortBinding,
}

impl MemoryController {
    pub fn new(kind: DramKind, range: AddrRange, port: PortBinding) -> Self {
        Self { kind, range, port }
    }

    pub fn access_latency(&self) -> Tick {
        self.kind.access_latency()
    }
}
