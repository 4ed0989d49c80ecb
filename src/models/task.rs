//! Task model.
//!
//! A task is one unit of work from the trace: a CPU demand held for a
//! runtime, released at a submission tick, gated by dependencies.

use serde::{Deserialize, Serialize};

use super::{TaskId, Tick, WorkflowId};

/// A task as read from the trace.
///
/// Identity and demand never change after construction. The machine-adjusted
/// runtime, energy and placements are tracked by the simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Owning workflow, if any.
    pub workflow: Option<WorkflowId>,
    /// Tick at which the task enters the system.
    pub submission_tick: Tick,
    /// Runtime on a machine of normalized speed 1.0 (ticks).
    pub runtime: Tick,
    /// Number of cores requested.
    pub cpu_demand: u32,
    /// Tasks that must complete before this one can start.
    pub dependencies: Vec<TaskId>,
    /// Schedule-slip budget (ticks).
    pub slack: Tick,
    /// Earliest tick at which the task could start if never delayed.
    pub earliest_start: Tick,
}

impl Task {
    /// Creates a single-core, zero-runtime task submitted at tick 0.
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            workflow: None,
            submission_tick: 0,
            runtime: 0,
            cpu_demand: 1,
            dependencies: Vec::new(),
            slack: 0,
            earliest_start: 0,
        }
    }

    /// Sets the owning workflow.
    pub fn with_workflow(mut self, workflow: WorkflowId) -> Self {
        self.workflow = Some(workflow);
        self
    }

    /// Sets the submission tick. Also moves `earliest_start` if it would
    /// otherwise precede the submission.
    pub fn with_submission(mut self, tick: Tick) -> Self {
        self.submission_tick = tick;
        self.earliest_start = self.earliest_start.max(tick);
        self
    }

    /// Sets the original runtime (ticks).
    pub fn with_runtime(mut self, runtime: Tick) -> Self {
        self.runtime = runtime;
        self
    }

    /// Sets the core demand.
    pub fn with_cpu_demand(mut self, cores: u32) -> Self {
        self.cpu_demand = cores;
        self
    }

    /// Adds a dependency.
    pub fn with_dependency(mut self, task: TaskId) -> Self {
        self.dependencies.push(task);
        self
    }

    /// Sets the slack budget (ticks).
    pub fn with_slack(mut self, slack: Tick) -> Self {
        self.slack = slack;
        self
    }

    /// Sets the earliest feasible start tick.
    pub fn with_earliest_start(mut self, tick: Tick) -> Self {
        self.earliest_start = tick;
        self
    }

    /// Whether the task has dependencies.
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Core-ticks consumed on a speed-1.0 machine.
    pub fn work(&self) -> i128 {
        self.runtime as i128 * self.cpu_demand as i128
    }
}
