//! Tasks awaiting placement.
//!
//! A task is eligible once it is submitted and every dependency has
//! completed. Eligible tasks stay queued until all of their cores are
//! assigned; partially placed tasks are re-offered with their residual
//! demand.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::state::SimulationState;
use crate::error::Result;
use crate::models::{TaskId, Tick, Trace, WorkflowId};

/// Placement-relevant view of an eligible task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    /// Task id.
    pub id: TaskId,
    /// Owning workflow.
    pub workflow: Option<WorkflowId>,
    /// Submission tick.
    pub submission_tick: Tick,
    /// Original runtime (ticks, speed 1.0).
    pub runtime: Tick,
    /// Cores still to be assigned.
    pub cores: u32,
    /// Slack budget (ticks).
    pub slack: Tick,
    /// Earliest feasible start tick.
    pub earliest_start: Tick,
}

/// Queue of submitted, not yet fully placed tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    pending_deps: HashMap<TaskId, usize>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
    submitted: HashSet<TaskId>,
    eligible: BTreeSet<TaskId>,
}

impl TaskQueue {
    /// Builds dependency bookkeeping for every task of the trace.
    pub fn new(trace: &Trace) -> Self {
        let mut pending_deps = HashMap::with_capacity(trace.tasks.len());
        let mut dependents: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for task in &trace.tasks {
            pending_deps.insert(task.id, task.dependencies.len());
            for &dep in &task.dependencies {
                dependents.entry(dep).or_default().push(task.id);
            }
        }
        Self {
            pending_deps,
            dependents,
            submitted: HashSet::new(),
            eligible: BTreeSet::new(),
        }
    }

    /// Marks a task as submitted. Returns `true` if it became eligible.
    pub fn submit(&mut self, task: TaskId) -> bool {
        self.submitted.insert(task);
        if self.pending_deps.get(&task).copied().unwrap_or(0) == 0 {
            self.eligible.insert(task)
        } else {
            false
        }
    }

    /// Records the completion of `task`. Returns dependents that became
    /// eligible, in dependency-list order.
    pub fn dependency_completed(&mut self, task: TaskId) -> Vec<TaskId> {
        let mut released = Vec::new();
        let Some(dependents) = self.dependents.get(&task) else {
            return released;
        };
        for &dependent in dependents {
            if let Some(count) = self.pending_deps.get_mut(&dependent) {
                *count = count.saturating_sub(1);
                if *count == 0
                    && self.submitted.contains(&dependent)
                    && self.eligible.insert(dependent)
                {
                    released.push(dependent);
                }
            }
        }
        released
    }

    /// Removes a task whose demand is fully assigned.
    pub fn remove_scheduled(&mut self, task: TaskId) -> bool {
        self.eligible.remove(&task)
    }

    /// Whether `task` is eligible and not yet fully placed.
    pub fn is_eligible(&self, task: TaskId) -> bool {
        self.eligible.contains(&task)
    }

    /// Fresh snapshot of the eligible tasks, by id, with residual demand.
    pub fn eligible(&self, state: &SimulationState) -> Result<Vec<PendingTask>> {
        self.eligible
            .iter()
            .map(|&id| {
                let ts = state.task(id)?;
                Ok(PendingTask {
                    id,
                    workflow: ts.task.workflow,
                    submission_tick: ts.task.submission_tick,
                    runtime: ts.task.runtime,
                    cores: ts.residual_demand(),
                    slack: ts.task.slack,
                    earliest_start: ts.task.earliest_start,
                })
            })
            .filter(|entry| !matches!(entry, Ok(pending) if pending.cores == 0))
            .collect()
    }

    /// Number of eligible tasks.
    pub fn len(&self) -> usize {
        self.eligible.len()
    }

    /// Whether no task is eligible.
    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty()
    }

    /// Submitted tasks still blocked on dependencies.
    pub fn blocked_count(&self) -> usize {
        self.submitted
            .iter()
            .filter(|t| self.pending_deps.get(*t).copied().unwrap_or(0) > 0)
            .count()
    }
}
