//! Result of a finished run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{OrderPolicyKind, PlacementPolicyKind};
use crate::models::{TaskId, Tick};
use crate::scheduler::RunSummary;
use crate::stats::{MachineEnergy, PowerSample, TaskTimeline, WorkflowStats};

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Ordering policy used.
    pub order_policy: OrderPolicyKind,
    /// Placement policy used.
    pub placement_policy: PlacementPolicyKind,
    /// Clock at the start of the run.
    pub start_tick: Tick,
    /// Clock after the last event.
    pub end_tick: Tick,
    /// Number of dispatched events.
    pub events_processed: u64,
    /// Number of placement passes.
    pub reschedule_passes: u64,
    /// Per-task timelines.
    pub tasks: BTreeMap<TaskId, TaskTimeline>,
    /// Per-workflow stats, by id.
    pub workflows: Vec<WorkflowStats>,
    /// Environment power snapshots.
    pub power_samples: Vec<PowerSample>,
    /// Energy per machine.
    pub machine_energy: Vec<MachineEnergy>,
    /// Aggregate KPIs.
    pub summary: RunSummary,
}

impl SimulationReport {
    /// Timeline of one task.
    pub fn task(&self, id: TaskId) -> Option<&TaskTimeline> {
        self.tasks.get(&id)
    }
}
