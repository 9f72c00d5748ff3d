//! Topology builder: composes clock, memory layout, cores, crossbar, memory controller,
//! functional-unit pool and workload into one system description per sweep point.

use crate::config::SystemConfig;
use crate::core::{Core, CoreId, CpuModel, PortBinding, Tick, TICKS_PER_SECOND};
use crate::error::{Error, Result};
use crate::fu_pool::FunctionalUnitTable;
use crate::memory::{AddrRange, DramKind, MemoryController};
use crate::workload::{ProcessImage, Workload, WorkloadResolver};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoltageDomain {
    pub voltage: f64,
}

impl Default for VoltageDomain {
    fn default() -> Self {
        Self { voltage: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockDomain {
    pub frequency_hz: u64,
    pub voltage_domain: VoltageDomain,
}

impl ClockDomain {
    /// Ticks per clock cycle; 0 if the clock is faster than the tick resolution.
    pub fn period(&self) -> Tick {
        TICKS_PER_SECOND / self.frequency_hz
    }
}

/// How the engine services memory requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MemMode {
    #[default]
    Timing,
}

/// Owner of a crossbar port slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortOwner {
    InstructionPort(CoreId),
    DataPort(CoreId),
    SystemPort,
    MemoryController,
}

/// Single-hub crossbar. Every requestor and responder port attaches here.
#[derive(Clone, Debug, Default)]
pub struct Interconnect {
    pub cpu_side_ports: Vec<PortOwner>,
    pub mem_side_ports: Vec<PortOwner>,
}

impl Interconnect {
    fn attach_cpu_side(&mut self, owner: PortOwner) -> PortBinding {
        self.cpu_side_ports.push(owner);
        PortBinding::cpu_side(self.cpu_side_ports.len() - 1)
    }

    fn attach_mem_side(&mut self, owner: PortOwner) -> PortBinding {
        self.mem_side_ports.push(owner);
        PortBinding::mem_side(self.mem_side_ports.len() - 1)
    }
}

/// Complete system description for one run. Not mutated once handed to the engine.
#[derive(Clone, Debug)]
pub struct TopologyDescription {
    pub clock: ClockDomain,
    pub mem_mode: MemMode,
    pub mem_range: AddrRange,
    pub cores: Vec<Core>,
    pub membus: Interconnect,
    pub system_port: PortBinding,
    pub mem_ctrl: MemoryController,
    pub fu_pool: Arc<FunctionalUnitTable>,
    pub workload: Arc<ProcessImage>,
}

impl TopologyDescription {
    pub fn core_count(&self) -> usize {
        self.cores.len()
    }
}

/// Builds [`TopologyDescription`]s for a fixed system layout.
#[derive(Clone, Debug)]
pub struct TopologyBuilder<R> {
    system: SystemConfig,
    resolver: R,
}

impl<R: WorkloadResolver> TopologyBuilder<R> {
    pub fn new(system: SystemConfig, resolver: R) -> Self {
        Self { system, resolver }
    }

    pub fn system(&self) -> &SystemConfig {
        &self.system
    }

    /// Builds a topology with `core_count` cores sharing one crossbar, one memory controller,
    /// the given functional-unit table and the resolved workload.
    pub fn build(
        &self,
        core_count: u32,
        fu_table: FunctionalUnitTable,
        workload: &Workload,
    ) -> Result<TopologyDescription> {
        if core_count < 1 {
            return Err(Error::InvalidTopology(
                "a topology needs at least one core".to_string(),
            ));
        }
        if self.system.mem_size_bytes == 0 {
            return Err(Error::InvalidTopology(
                "memory range must have a positive size".to_string(),
            ));
        }
        if self.system.clock_hz == 0 {
            return Err(Error::InvalidTopology(
                "clock frequency must be positive".to_string(),
            ));
        }

        let image = self
            .resolver
            .resolve(&workload.path, &workload.args)
            .map_err(|err| match err {
                Error::InvalidTopology(_) => err,
                other => Error::InvalidTopology(format!(
                    "cannot resolve workload {}: {other}",
                    workload.path.display()
                )),
            })?;
        let workload = Arc::new(image);
        let fu_pool = Arc::new(fu_table);

        let mut membus = Interconnect::default();
        let cores: Vec<Core> = (0..core_count as usize)
            .map(|i| {
                let id = CoreId(i);
                Core {
                    id,
                    model: CpuModel::TimingSimple,
                    icache_port: membus.attach_cpu_side(PortOwner::InstructionPort(id)),
                    dcache_port: membus.attach_cpu_side(PortOwner::DataPort(id)),
                    fu_pool: Arc::clone(&fu_pool),
                    workload: Arc::clone(&workload),
                }
            })
            .collect();

        let mem_range = AddrRange::with_size(self.system.mem_size_bytes);
        let mem_ctrl = MemoryController::new(
            DramKind::Ddr3_1600_8x8,
            mem_range,
            membus.attach_mem_side(PortOwner::MemoryController),
        );
        let system_port = membus.attach_cpu_side(PortOwner::SystemPort);

        log::debug!(
            "built topology: {} cores, {} MiB at {} Hz, {} cpu-side ports",
            cores.len(),
            mem_range.size / crate::memory::MIB,
            self.system.clock_hz,
            membus.cpu_side_ports.len()
        );

        Ok(TopologyDescription {
            clock: ClockDomain {
                frequency_hz: self.system.clock_hz,
                voltage_domain: VoltageDomain::default(),
            },
            mem_mode: MemMode::Timing,
            mem_range,
            cores,
            membus,
            system_port,
            mem_ctrl,
            fu_pool,
            workload,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::PortSide;
    use crate::fu_pool::build_latency_table;
    use std::cell::Cell;
    use std::path::{Path, PathBuf};

    /// Resolves any path without touching the filesystem.
    #[derive(Default)]
    pub(crate) struct StaticResolver {
        pub calls: Cell<usize>,
    }

    impl WorkloadResolver for StaticResolver {
        fn resolve(&self, path: &Path, args: &[String]) -> Result<ProcessImage> {
            self.calls.set(self.calls.get() + 1);
            let mut cmd = vec![path.display().to_string()];
            cmd.extend(args.iter().cloned());
            Ok(ProcessImage {
                path: path.to_path_buf(),
                cmd,
                size_bytes: 0,
            })
        }
    }

    struct FailingResolver;

    impl WorkloadResolver for FailingResolver {
        fn resolve(&self, path: &Path, _args: &[String]) -> Result<ProcessImage> {
            Err(Error::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    fn builder() -> TopologyBuilder<StaticResolver> {
        TopologyBuilder::new(SystemConfig::default(), StaticResolver::default())
    }

    #[test]
    fn cores_have_sequential_ids() {
        for core_count in [1, 2, 4, 7] {
            let topo = builder()
                .build(core_count, build_latency_table(1, 6).unwrap(), &Workload::default())
                .unwrap();
            assert_eq!(topo.core_count(), core_count as usize);
            let ids: Vec<usize> = topo.cores.iter().map(|c| c.id.0).collect();
            assert_eq!(ids, (0..core_count as usize).collect::<Vec<_>>());
        }
    }

    #[test]
    fn cores_share_one_crossbar_and_memory_controller() {
        let topo = builder()
            .build(4, build_latency_table(2, 5).unwrap(), &Workload::default())
            .unwrap();
        // two ports per core plus the system port
        assert_eq!(topo.membus.cpu_side_ports.len(), 9);
        assert_eq!(topo.membus.mem_side_ports, vec![PortOwner::MemoryController]);
        for core in &topo.cores {
            assert_eq!(core.icache_port.side, PortSide::CpuSide);
            assert_eq!(core.dcache_port.side, PortSide::CpuSide);
            assert_eq!(
                topo.membus.cpu_side_ports[core.icache_port.slot],
                PortOwner::InstructionPort(core.id)
            );
            assert_eq!(
                topo.membus.cpu_side_ports[core.dcache_port.slot],
                PortOwner::DataPort(core.id)
            );
        }
        assert_eq!(
            topo.membus.cpu_side_ports[topo.system_port.slot],
            PortOwner::SystemPort
        );
        assert_eq!(topo.mem_ctrl.port, PortBinding::mem_side(0));
        assert_eq!(topo.mem_ctrl.range, topo.mem_range);
        assert_eq!(topo.mem_range.size, SystemConfig::default().mem_size_bytes);
    }

    #[test]
    fn fu_pool_and_workload_are_shared() {
        let resolver = StaticResolver::default();
        let builder = TopologyBuilder::new(SystemConfig::default(), resolver);
        let workload = Workload::new("bin/app", vec!["--size".into(), "64".into()]);
        let topo = builder
            .build(3, build_latency_table(3, 4).unwrap(), &workload)
            .unwrap();
        assert_eq!(builder.resolver.calls.get(), 1);
        for core in &topo.cores {
            assert!(Arc::ptr_eq(&core.fu_pool, &topo.fu_pool));
            assert!(Arc::ptr_eq(&core.workload, &topo.workload));
        }
        assert_eq!(topo.workload.path, PathBuf::from("bin/app"));
        assert_eq!(topo.workload.cmd, vec!["bin/app", "--size", "64"]);
        assert_eq!(topo.clock.period(), 1000);
    }

    #[test]
    fn zero_cores_is_invalid_topology() {
        let err = builder()
            .build(0, build_latency_table(1, 1).unwrap(), &Workload::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTopology(_)));
    }

    #[test]
    fn empty_memory_range_is_invalid_topology() {
        let system = SystemConfig {
            mem_size_bytes: 0,
            ..SystemConfig::default()
        };
        let err = TopologyBuilder::new(system, StaticResolver::default())
            .build(1, build_latency_table(1, 1).unwrap(), &Workload::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTopology(_)));
    }

    #[test]
    fn unresolvable_workload_is_invalid_topology() {
        let err = TopologyBuilder::new(SystemConfig::default(), FailingResolver)
            .build(2, build_latency_table(1, 1).unwrap(), &Workload::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTopology(_)));
    }
}
