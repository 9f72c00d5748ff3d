//! Simulation driver: hands a topology to a timing engine and runs it to completion.

use crate::core::Tick;
use crate::error::{Error, Result};
use crate::topology::TopologyDescription;

/// Why and when a simulated run stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitEvent {
    pub elapsed_ticks: Tick,
    pub cause: String,
}

/// A timing engine. Implementations own whatever process-wide simulated state they need;
/// callers pass the engine explicitly rather than reaching for a global.
pub trait Engine {
    type Handle;

    /// Elaborates a topology into a runnable system.
    fn instantiate(&mut self, topology: &TopologyDescription) -> Result<Self::Handle>;

    /// Runs until a terminal exit condition. Blocks until then.
    fn simulate(&mut self, handle: Self::Handle) -> Result<ExitEvent>;
}

fn engine_fault(err: Error) -> Error {
    match err {
        Error::EngineFault(_) => err,
        other => Error::EngineFault(other.to_string()),
    }
}

/// Instantiates and simulates `topology`. Faults are not recovered here.
pub fn run_to_completion<E>(engine: &mut E, topology: &TopologyDescription) -> Result<ExitEvent>
where
    E: Engine + ?Sized,
{
    let handle = engine.instantiate(topology).map_err(engine_fault)?;
    log::info!("Beginning simulation!");
    let exit = engine.simulate(handle).map_err(engine_fault)?;
    log::info!("Exiting @ tick {} because {}", exit.elapsed_ticks, exit.cause);
    Ok(exit)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use crate::fu_pool::build_latency_table;
    use crate::topology::tests::StaticResolver;
    use crate::topology::TopologyBuilder;
    use crate::workload::Workload;

    /// Engine whose elapsed time is a pure function of the topology.
    #[derive(Default)]
    pub(crate) struct FixedEngine {
        pub runs: usize,
    }

    impl FixedEngine {
        pub fn ticks_for(op_latency: u32, issue_latency: u32, cores: usize) -> Tick {
            1_000 * (op_latency.max(issue_latency) as u64) * 1_000 + cores as u64 * 10_000
        }
    }

    impl Engine for FixedEngine {
        type Handle = Tick;

        fn instantiate(&mut self, topology: &TopologyDescription) -> Result<Tick> {
            Ok(Self::ticks_for(
                topology.fu_pool.op_latency(),
                topology.fu_pool.issue_latency(),
                topology.core_count(),
            ))
        }

        fn simulate(&mut self, ticks: Tick) -> Result<ExitEvent> {
            self.runs += 1;
            Ok(ExitEvent {
                elapsed_ticks: ticks,
                cause: "exiting with last active thread context".to_string(),
            })
        }
    }

    /// Engine that faults on its `fail_at`-th simulate call (0-based).
    pub(crate) struct FailingEngine {
        pub fail_at: usize,
        pub runs: usize,
    }

    impl Engine for FailingEngine {
        type Handle = ();

        fn instantiate(&mut self, _topology: &TopologyDescription) -> Result<()> {
            Ok(())
        }

        fn simulate(&mut self, _handle: ()) -> Result<ExitEvent> {
            let run = self.runs;
            self.runs += 1;
            if run == self.fail_at {
                return Err(Error::EngineFault("panic: bus error".to_string()));
            }
            Ok(ExitEvent {
                elapsed_ticks: 1_000_000,
                cause: "exiting with last active thread context".to_string(),
            })
        }
    }

    struct BrokenInstantiate;

    impl Engine for BrokenInstantiate {
        type Handle = ();

        fn instantiate(&mut self, _topology: &TopologyDescription) -> Result<()> {
            Err(Error::InvalidConfiguration("unknown cpu model".to_string()))
        }

        fn simulate(&mut self, _handle: ()) -> Result<ExitEvent> {
            unreachable!("instantiate always fails")
        }
    }

    fn topology() -> TopologyDescription {
        TopologyBuilder::new(SystemConfig::default(), StaticResolver::default())
            .build(2, build_latency_table(2, 5).unwrap(), &Workload::default())
            .unwrap()
    }

    #[test]
    fn returns_engine_exit_event() {
        let mut engine = FixedEngine::default();
        let exit = run_to_completion(&mut engine, &topology()).unwrap();
        assert_eq!(exit.elapsed_ticks, FixedEngine::ticks_for(2, 5, 2));
        assert_eq!(exit.cause, "exiting with last active thread context");
        assert_eq!(engine.runs, 1);
    }

    #[test]
    fn simulate_fault_propagates() {
        let mut engine = FailingEngine { fail_at: 0, runs: 0 };
        let err = run_to_completion(&mut engine, &topology()).unwrap_err();
        assert!(matches!(err, Error::EngineFault(_)));
    }

    #[test]
    fn instantiate_failure_becomes_engine_fault() {
        let err = run_to_completion(&mut BrokenInstantiate, &topology()).unwrap_err();
        match err {
            Error::EngineFault(msg) => assert!(msg.contains("unknown cpu model")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
