//! Task placement policies.
//!
//! A placement pass receives the ordered eligible tasks and grants machine
//! cores through an [`Allocator`]. A task may be split over several machines;
//! its runtime is the maximum of its slices and its energy is their sum.
//!
//! Policies only place a task when its residual demand fits in the free
//! capacity of the whole environment; other tasks are deferred to the next
//! pass. Deferral is not an error.
//!
//! # Policies
//!
//! | Policy | Machine order | Notes |
//! |--------|---------------|-------|
//! | [`BestFit`] | Ascending free cores | Tightest machine that fits the remainder |
//! | [`FastestMachine`] | Descending speed | Round-robin cursor over one snapshot |
//! | [`LookAhead`] | Ascending energy efficiency | Slack-aware, uses DVFS |
//!
//! # References
//! - Versluis et al. (2020), "The Workflow Trace Archive"
//! - Kim, Buyya, Kim (2007), "Power Aware Scheduling of Bag-of-Tasks
//!   Applications with Deadline Constraints on DVS-enabled Clusters"

mod best_fit;
mod fastest_machine;
mod look_ahead;

pub use best_fit::BestFit;
pub use fastest_machine::FastestMachine;
pub use look_ahead::LookAhead;

use serde::{Deserialize, Serialize};

use crate::config::PlacementPolicyKind;
use crate::engine::{ClusterManager, PendingTask};
use crate::error::{Result, SimError};
use crate::models::{Environment, Machine, MachineId, TaskId, Tick};
use crate::power::task_energy_wh;

/// One (task, machine, cores) grant decided by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Task receiving the cores.
    pub task: TaskId,
    /// Host machine.
    pub machine: MachineId,
    /// Number of cores.
    pub cores: u32,
    /// Runtime of this slice on the machine (ticks).
    pub runtime: Tick,
    /// Energy of this slice (Wh).
    pub energy_wh: f64,
    /// Fraction of nominal busy power drawn while running.
    pub power_factor: f64,
}

/// Capacity views and the commit hook handed to a placement pass.
///
/// Views always reflect every assignment committed earlier in the pass.
pub trait Allocator {
    /// Current free-capacity bookkeeping.
    fn cluster(&self) -> &ClusterManager;

    /// Commits one assignment.
    ///
    /// # Errors
    /// Propagates capacity or bookkeeping failures; these are fatal.
    fn assign(&mut self, assignment: Assignment) -> Result<()>;
}

/// Read-only inputs of a placement pass.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    /// Machine catalogue (speeds, TDP, DVFS tables).
    pub environment: &'a Environment,
    /// Current tick.
    pub now: Tick,
    /// Ticks per simulated second.
    pub ticks_per_second: f64,
}

impl<'a> PlacementContext<'a> {
    /// Creates a context.
    pub fn new(environment: &'a Environment, now: Tick, ticks_per_second: f64) -> Self {
        Self {
            environment,
            now,
            ticks_per_second,
        }
    }

    /// Looks up a machine.
    pub fn machine(&self, id: MachineId) -> Result<&'a Machine> {
        self.environment
            .machine(id)
            .ok_or(SimError::MachineNotFound(id))
    }
}

/// Runtime of `original` ticks of work on a machine of the given speed,
/// before rounding.
pub fn runtime_on(original: Tick, speed: f64) -> f64 {
    if speed <= 0.0 || !speed.is_finite() {
        return original as f64;
    }
    original as f64 / speed
}

/// Rounds a fractional runtime up to whole ticks.
pub fn whole_ticks(runtime: f64) -> Tick {
    runtime.ceil().max(0.0) as Tick
}

/// Builds a nominal-frequency assignment of `cores` cores of `machine`.
pub(crate) fn nominal_assignment(
    task: &PendingTask,
    machine: &Machine,
    cores: u32,
    ticks_per_second: f64,
) -> Assignment {
    let runtime = runtime_on(task.runtime, machine.normalized_speed);
    Assignment {
        task: task.id,
        machine: machine.id,
        cores,
        runtime: whole_ticks(runtime),
        energy_wh: task_energy_wh(machine, cores, runtime, ticks_per_second),
        power_factor: 1.0,
    }
}

/// The closed set of placement policies.
#[derive(Debug, Clone)]
pub enum PlacementPolicy {
    /// Tightest-fit packing.
    BestFit(BestFit),
    /// Slack- and energy-aware placement with DVFS.
    LookAhead(LookAhead),
    /// Fastest machines first, round robin.
    FastestMachine(FastestMachine),
}

impl PlacementPolicy {
    /// Instantiates the policy for a configured kind.
    pub fn from_kind(kind: PlacementPolicyKind) -> Self {
        match kind {
            PlacementPolicyKind::BestFit => Self::BestFit(BestFit),
            PlacementPolicyKind::LookAhead => Self::LookAhead(LookAhead),
            PlacementPolicyKind::FastestMachine => Self::FastestMachine(FastestMachine),
        }
    }

    /// Policy kind.
    pub fn kind(&self) -> PlacementPolicyKind {
        match self {
            Self::BestFit(_) => PlacementPolicyKind::BestFit,
            Self::LookAhead(_) => PlacementPolicyKind::LookAhead,
            Self::FastestMachine(_) => PlacementPolicyKind::FastestMachine,
        }
    }

    /// Runs one placement pass over `tasks` in the given order.
    ///
    /// Returns the number of tasks fully placed.
    pub fn place(
        &mut self,
        tasks: &[PendingTask],
        allocator: &mut dyn Allocator,
        context: &PlacementContext<'_>,
    ) -> Result<usize> {
        match self {
            Self::BestFit(p) => p.place(tasks, allocator, context),
            Self::LookAhead(p) => p.place(tasks, allocator, context),
            Self::FastestMachine(p) => p.place(tasks, allocator, context),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Allocator backed by a bare cluster manager.

    use super::*;
    use crate::engine::EventQueue;

    #[derive(Debug)]
    pub struct RecordingAllocator {
        pub cluster: ClusterManager,
        pub events: EventQueue,
        pub assignments: Vec<Assignment>,
        pub now: Tick,
    }

    impl RecordingAllocator {
        pub fn new(environment: &Environment) -> Self {
            Self {
                cluster: ClusterManager::new(environment),
                events: EventQueue::new(),
                assignments: Vec::new(),
                now: 0,
            }
        }

        pub fn for_task(&self, task: TaskId) -> Vec<Assignment> {
            self.assignments
                .iter()
                .filter(|a| a.task == task)
                .copied()
                .collect()
        }
    }

    impl Allocator for RecordingAllocator {
        fn cluster(&self) -> &ClusterManager {
            &self.cluster
        }

        fn assign(&mut self, assignment: Assignment) -> Result<()> {
            self.cluster.assign(
                assignment.task,
                assignment.machine,
                assignment.cores,
                self.now,
                &mut self.events,
            )?;
            self.assignments.push(assignment);
            Ok(())
        }
    }

    pub fn pending(id: TaskId, cores: u32, runtime: Tick) -> PendingTask {
        PendingTask {
            id,
            workflow: None,
            submission_tick: 0,
            runtime,
            cores,
            slack: 0,
            earliest_start: 0,
        }
    }
}
