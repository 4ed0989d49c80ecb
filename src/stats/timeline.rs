//! Per-task timelines and the post-run consistency check.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{MachineId, TaskId, Tick, Trace, WorkflowId};

/// Observed lifecycle of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTimeline {
    /// Task id.
    pub task: TaskId,
    /// Owning workflow.
    pub workflow: Option<WorkflowId>,
    /// Submission tick.
    pub submission: Tick,
    /// Runtime at speed 1.0 (ticks).
    pub original_runtime: Tick,
    /// Cores demanded.
    pub cpu_demand: u32,
    /// Tick of the first placement.
    pub start: Option<Tick>,
    /// Tick of completion.
    pub completion: Option<Tick>,
    /// Machine-adjusted runtime (ticks).
    pub runtime: Tick,
    /// Energy consumed (Wh).
    pub energy_wh: f64,
    /// Machines that hosted the task.
    pub machines: Vec<MachineId>,
}

impl TaskTimeline {
    /// Time from submission to completion.
    pub fn response_time(&self) -> Option<Tick> {
        self.completion.map(|c| c - self.submission)
    }

    /// Time from submission to first placement.
    pub fn wait_time(&self) -> Option<Tick> {
        self.start.map(|s| s - self.submission)
    }

    /// Response time relative to the original runtime (at least 1 tick).
    pub fn slowdown(&self) -> Option<f64> {
        self.response_time()
            .map(|r| r as f64 / self.original_runtime.max(1) as f64)
    }
}

/// A broken run invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Offending task.
    pub task: TaskId,
    /// Human-readable description.
    pub message: String,
}

/// Classification of consistency violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Task never started or never completed.
    NeverCompleted,
    /// Task started before it was submitted.
    StartBeforeSubmission,
    /// Completion − start differs from the recorded runtime.
    RuntimeMismatch,
    /// Task started before a dependency completed.
    DependencyOrder,
}

impl Violation {
    /// Creates a violation.
    pub fn new(violation_type: ViolationType, task: TaskId, message: impl Into<String>) -> Self {
        Self {
            violation_type,
            task,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} (task {}): {}", self.violation_type, self.task, self.message)
    }
}

/// Checks finished timelines against the trace.
///
/// For every task:
/// 1. it started and completed
/// 2. start ≥ submission
/// 3. completion − start == runtime (completion == start for zero runtime)
/// 4. every dependency completed no later than the start
///
/// Returns every violation found; an empty list means the run is consistent.
pub fn verify_timelines(trace: &Trace, timelines: &BTreeMap<TaskId, TaskTimeline>) -> Vec<Violation> {
    let mut violations = Vec::new();

    for task in &trace.tasks {
        let Some(timeline) = timelines.get(&task.id) else {
            violations.push(Violation::new(
                ViolationType::NeverCompleted,
                task.id,
                "no timeline recorded",
            ));
            continue;
        };
        let (Some(start), Some(completion)) = (timeline.start, timeline.completion) else {
            violations.push(Violation::new(
                ViolationType::NeverCompleted,
                task.id,
                format!(
                    "start {:?}, completion {:?}",
                    timeline.start, timeline.completion
                ),
            ));
            continue;
        };

        if start < timeline.submission {
            violations.push(Violation::new(
                ViolationType::StartBeforeSubmission,
                task.id,
                format!("started at {start}, submitted at {}", timeline.submission),
            ));
        }

        let expected = timeline.runtime.max(0);
        if completion - start != expected {
            violations.push(Violation::new(
                ViolationType::RuntimeMismatch,
                task.id,
                format!(
                    "ran from {start} to {completion}, runtime is {}",
                    timeline.runtime
                ),
            ));
        }

        for dep in &task.dependencies {
            let dep_end = timelines.get(dep).and_then(|t| t.completion);
            match dep_end {
                Some(end) if end <= start => {}
                _ => violations.push(Violation::new(
                    ViolationType::DependencyOrder,
                    task.id,
                    format!("started at {start} before dependency {dep} ended ({dep_end:?})"),
                )),
            }
        }
    }

    violations
}
