//! Authoritative simulation state: live task and machine records plus the
//! clock.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::models::{Environment, MachineId, Task, TaskId, Tick, Trace};
use crate::power::PowerMeter;

/// Lifecycle of a task inside the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not yet submitted.
    Pending,
    /// Submitted, waiting for dependencies or capacity.
    Queued,
    /// At least one placement is active.
    Running,
    /// All placements finished.
    Completed,
}

/// One (machine, cores) slice of a task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Host machine.
    pub machine: MachineId,
    /// Cores held on that machine.
    pub cores: u32,
    /// Fraction of nominal busy power drawn (DVFS).
    pub power_factor: f64,
    /// Tick the placement started.
    pub started: Tick,
}

/// Live record of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    /// Immutable trace data.
    pub task: Task,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Machine-adjusted runtime (max over placements, ticks).
    pub runtime: Tick,
    /// Energy consumed over all placements (Wh).
    pub energy_wh: f64,
    /// Attempt number carried by completion events.
    pub attempt: u32,
    /// Active placements.
    pub placements: Vec<Placement>,
    /// Cores assigned over the lifetime of the current attempt.
    pub assigned_cores: u32,
    /// Machines that hosted a placement, in assignment order.
    pub machines_used: Vec<MachineId>,
    /// Tick of the first placement.
    pub start_tick: Option<Tick>,
    /// Tick at which the last placement finished.
    pub completion_tick: Option<Tick>,
}

impl TaskState {
    fn new(task: Task) -> Self {
        Self {
            task,
            status: TaskStatus::Pending,
            runtime: 0,
            energy_wh: 0.0,
            attempt: 0,
            placements: Vec::new(),
            assigned_cores: 0,
            machines_used: Vec::new(),
            start_tick: None,
            completion_tick: None,
        }
    }

    /// Cores still to be assigned.
    pub fn residual_demand(&self) -> u32 {
        self.task.cpu_demand.saturating_sub(self.assigned_cores)
    }

    /// Whether every demanded core has been assigned.
    pub fn is_fully_scheduled(&self) -> bool {
        self.assigned_cores == self.task.cpu_demand
    }

    /// Whether the task has finished.
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Records a new placement, raising the runtime to `runtime` if larger
    /// and adding `energy_wh`.
    pub fn record_placement(
        &mut self,
        placement: Placement,
        runtime: Tick,
        energy_wh: f64,
    ) -> Result<()> {
        let assigned = self.assigned_cores + placement.cores;
        if assigned > self.task.cpu_demand {
            return Err(SimError::OverAssignment {
                task: self.task.id,
                demand: self.task.cpu_demand,
                assigned,
            });
        }
        self.assigned_cores = assigned;
        self.runtime = self.runtime.max(runtime);
        self.energy_wh += energy_wh;
        self.start_tick.get_or_insert(placement.started);
        if !self.machines_used.contains(&placement.machine) {
            self.machines_used.push(placement.machine);
        }
        self.placements.push(placement);
        self.status = TaskStatus::Running;
        Ok(())
    }

    /// Removes the first active placement matching (machine, cores).
    pub fn finish_placement(&mut self, machine: MachineId, cores: u32) -> Option<Placement> {
        let idx = self
            .placements
            .iter()
            .position(|p| p.machine == machine && p.cores == cores)?;
        Some(self.placements.remove(idx))
    }

    /// Whether all placements are done and nothing is left to assign.
    pub fn is_finished(&self) -> bool {
        self.is_fully_scheduled() && self.placements.is_empty()
    }
}

/// Live record of a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    /// Machine id.
    pub id: MachineId,
    /// Power bookkeeping.
    pub meter: PowerMeter,
}

/// Task and machine records plus the current tick.
///
/// Only [`SimulationState::advance_to`] moves the clock.
#[derive(Debug, Clone)]
pub struct SimulationState {
    now: Tick,
    tasks: BTreeMap<TaskId, TaskState>,
    machines: BTreeMap<MachineId, MachineState>,
}

impl SimulationState {
    /// Builds the initial state with the clock at `start`.
    pub fn new(trace: &Trace, environment: &Environment, start: Tick) -> Self {
        let tasks = trace
            .tasks
            .iter()
            .map(|t| (t.id, TaskState::new(t.clone())))
            .collect();
        let machines = environment
            .machines
            .iter()
            .map(|m| {
                (
                    m.id,
                    MachineState {
                        id: m.id,
                        meter: PowerMeter::for_machine(m, start),
                    },
                )
            })
            .collect();
        Self {
            now: start,
            tasks,
            machines,
        }
    }

    /// Current tick.
    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Moves the clock forward to `tick`.
    ///
    /// # Errors
    /// [`SimError::TickRegression`] if `tick` lies in the past.
    pub fn advance_to(&mut self, tick: Tick) -> Result<()> {
        if tick < self.now {
            return Err(SimError::TickRegression {
                current: self.now,
                event: tick,
            });
        }
        self.now = tick;
        Ok(())
    }

    /// Looks up a task.
    pub fn task(&self, id: TaskId) -> Result<&TaskState> {
        self.tasks.get(&id).ok_or(SimError::TaskNotFound(id))
    }

    /// Looks up a task for mutation.
    pub fn task_mut(&mut self, id: TaskId) -> Result<&mut TaskState> {
        self.tasks.get_mut(&id).ok_or(SimError::TaskNotFound(id))
    }

    /// Looks up a machine.
    pub fn machine(&self, id: MachineId) -> Result<&MachineState> {
        self.machines.get(&id).ok_or(SimError::MachineNotFound(id))
    }

    /// Looks up a machine for mutation.
    pub fn machine_mut(&mut self, id: MachineId) -> Result<&mut MachineState> {
        self.machines
            .get_mut(&id)
            .ok_or(SimError::MachineNotFound(id))
    }

    /// All task records, by id.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskState> {
        self.tasks.values()
    }

    /// All machine records, by id.
    pub fn machines(&self) -> impl Iterator<Item = &MachineState> {
        self.machines.values()
    }

    /// All machine records for mutation, by id.
    pub fn machines_mut(&mut self) -> impl Iterator<Item = &mut MachineState> {
        self.machines.values_mut()
    }

    /// Number of completed tasks.
    pub fn completed_count(&self) -> usize {
        self.tasks.values().filter(|t| t.is_completed()).count()
    }

    /// Number of tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}
