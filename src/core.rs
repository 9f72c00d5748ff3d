//! Core descriptors: simulated time units, core ids, and port bindings to the crossbar.

use crate::fu_pool::FunctionalUnitTable;
use crate::workload::ProcessImage;
use std::fmt;
use std::sync::Arc;

/// Engine time unit. One tick is one picosecond.
pub type Tick = u64;

/// Clock cycle of a simulated core.
pub type Cycle = u64;

pub const TICKS_PER_SECOND: Tick = 1_000_000_000_000;

/// Identifies a core (0..N).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoreId(pub usize);

/// Processor model instantiated for every core.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CpuModel {
    /// In-order, one instruction at a time, blocking on every memory request.
    #[default]
    TimingSimple,
}

/// Which side of the crossbar a port attaches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortSide {
    /// Requestors: core instruction/data ports and the system port.
    CpuSide,
    /// Responders: memory controllers.
    MemSide,
}

/// A port bound to one slot of the shared crossbar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortBinding {
    pub side: PortSide,
    pub slot: usize,
}

impl PortBinding {
    pub fn cpu_side(slot: usize) -> Self {
        Self {
            side: PortSide::CpuSide,
            slot,
        }
    }

    pub fn mem_side(slot: usize) -> Self {
        Self {
            side: PortSide::MemSide,
            slot,
        }
    }
}

/// One simulated core. The functional-unit table and the process image are
/// shared by every core of a topology.
#[derive(Clone, Debug)]
pub struct Core {
    pub id: CoreId,
    pub model: CpuModel,
    /// Instruction fetch port. No caches are modeled, so it binds straight to the crossbar.
    pub icache_port: PortBinding,
    /// Data port, bound like the instruction port.
    pub dcache_port: PortBinding,
    pub fu_pool: Arc<FunctionalUnitTable>,
    pub workload: Arc<ProcessImage>,
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            PortSide::CpuSide => write!(f, "membus.cpu_side_ports[{}]", self.slot),
            PortSide::MemSide => write!(f, "membus.mem_side_ports[{}]", self.slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_binding_display() {
        assert_eq!(PortBinding::cpu_side(3).to_string(), "membus.cpu_side_ports[3]");
        assert_eq!(PortBinding::mem_side(0).to_string(), "membus.mem_side_ports[0]");
    }

    #[test]
    fn core_id_display() {
        assert_eq!(CoreId(2).to_string(), "cpu2");
    }
}
