//! Event-driven statistics collectors.
//!
//! Each collector is fed every dispatched event through `observe` and keeps
//! only what it needs. Values that events do not carry (machine-adjusted
//! runtime, energy) are read from the final state in `finish`.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::TaskTimeline;
use crate::engine::{Event, EventKind, SimulationState};
use crate::models::{MachineId, TaskId, Tick, Trace, WorkflowId};
use crate::ordering::WorkflowEstimates;

/// Builds one [`TaskTimeline`] per task.
#[derive(Debug, Clone, Default)]
pub struct TaskStatsCollector {
    timelines: BTreeMap<TaskId, TaskTimeline>,
}

impl TaskStatsCollector {
    /// Creates empty timelines for every task of the trace.
    pub fn new(trace: &Trace) -> Self {
        let timelines = trace
            .tasks
            .iter()
            .map(|t| {
                (
                    t.id,
                    TaskTimeline {
                        task: t.id,
                        workflow: t.workflow,
                        submission: t.submission_tick,
                        original_runtime: t.runtime,
                        cpu_demand: t.cpu_demand,
                        start: None,
                        completion: None,
                        runtime: 0,
                        energy_wh: 0.0,
                        machines: Vec::new(),
                    },
                )
            })
            .collect();
        Self { timelines }
    }

    /// Records starts and completions.
    pub fn observe(&mut self, event: &Event) {
        match &event.kind {
            EventKind::TaskStarted { task, machine, .. } => {
                if let Some(t) = self.timelines.get_mut(task) {
                    t.start.get_or_insert(event.tick);
                    if !t.machines.contains(machine) {
                        t.machines.push(*machine);
                    }
                }
            }
            EventKind::TaskCompleted { task } => {
                if let Some(t) = self.timelines.get_mut(task) {
                    t.completion = Some(event.tick);
                }
            }
            _ => {}
        }
    }

    /// Copies runtime and energy from the final state.
    pub fn finish(&mut self, state: &SimulationState) {
        for ts in state.tasks() {
            if let Some(t) = self.timelines.get_mut(&ts.task.id) {
                t.runtime = ts.runtime;
                t.energy_wh = ts.energy_wh;
            }
        }
    }

    /// Timelines by task id.
    pub fn timelines(&self) -> &BTreeMap<TaskId, TaskTimeline> {
        &self.timelines
    }

    /// Consumes the collector.
    pub fn into_timelines(self) -> BTreeMap<TaskId, TaskTimeline> {
        self.timelines
    }
}

/// Progress and completion estimate of one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStats {
    /// Workflow id.
    pub workflow: WorkflowId,
    /// Member tasks.
    pub task_count: usize,
    /// Completed member tasks.
    pub completed: usize,
    /// Earliest member submission.
    pub submission: Tick,
    /// Estimated completion tick.
    pub estimated_completion: Tick,
    /// Actual completion tick, once every member completed.
    pub completion: Option<Tick>,
}

impl WorkflowStats {
    /// Submission to completion.
    pub fn makespan(&self) -> Option<Tick> {
        self.completion.map(|c| c - self.submission)
    }
}

/// Tracks workflows and their estimated completion.
///
/// The initial estimate is the critical path of the workflow assuming
/// unlimited capacity at speed 1.0: a task ends at
/// `max(submission, latest dependency end) + runtime`. Started tasks raise
/// the estimate to their projected end, completions to the actual tick.
#[derive(Debug, Clone, Default)]
pub struct WorkflowStatsCollector {
    workflows: BTreeMap<WorkflowId, WorkflowStats>,
    members: HashMap<TaskId, (WorkflowId, Tick)>,
}

impl WorkflowStatsCollector {
    /// Computes initial estimates for every workflow of the trace.
    pub fn new(trace: &Trace) -> Self {
        let ends = critical_path_ends(trace);
        let mut workflows: BTreeMap<WorkflowId, WorkflowStats> = BTreeMap::new();
        let mut members = HashMap::new();

        for task in &trace.tasks {
            let Some(wf) = task.workflow else {
                continue;
            };
            members.insert(task.id, (wf, task.runtime));
            let end = ends
                .get(&task.id)
                .copied()
                .unwrap_or(task.submission_tick + task.runtime);
            let stats = workflows.entry(wf).or_insert(WorkflowStats {
                workflow: wf,
                task_count: 0,
                completed: 0,
                submission: task.submission_tick,
                estimated_completion: end,
                completion: None,
            });
            stats.task_count += 1;
            stats.submission = stats.submission.min(task.submission_tick);
            stats.estimated_completion = stats.estimated_completion.max(end);
        }

        Self { workflows, members }
    }

    /// Refines estimates from starts and completions.
    pub fn observe(&mut self, event: &Event) {
        match &event.kind {
            EventKind::TaskStarted { task, .. } => {
                if let Some(&(wf, runtime)) = self.members.get(task) {
                    if let Some(stats) = self.workflows.get_mut(&wf) {
                        stats.estimated_completion =
                            stats.estimated_completion.max(event.tick + runtime);
                    }
                }
            }
            EventKind::TaskCompleted { task } => {
                if let Some(&(wf, _)) = self.members.get(task) {
                    if let Some(stats) = self.workflows.get_mut(&wf) {
                        stats.completed += 1;
                        stats.estimated_completion = stats.estimated_completion.max(event.tick);
                        if stats.completed == stats.task_count {
                            stats.completion = Some(event.tick);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Stats of one workflow.
    pub fn workflow(&self, id: WorkflowId) -> Option<&WorkflowStats> {
        self.workflows.get(&id)
    }

    /// All workflows, by id.
    pub fn workflows(&self) -> impl Iterator<Item = &WorkflowStats> {
        self.workflows.values()
    }
}

impl WorkflowEstimates for WorkflowStatsCollector {
    fn estimated_completion(&self, workflow: WorkflowId) -> Option<Tick> {
        self.workflows.get(&workflow).map(|s| s.estimated_completion)
    }
}

// Kahn's algorithm; tasks on a cycle get no entry.
fn critical_path_ends(trace: &Trace) -> HashMap<TaskId, Tick> {
    let index = trace.task_index();
    let mut indegree: Vec<usize> = trace.tasks.iter().map(|t| t.dependencies.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); trace.tasks.len()];
    for (i, task) in trace.tasks.iter().enumerate() {
        for dep in &task.dependencies {
            match index.get(dep) {
                Some(&d) => dependents[d].push(i),
                None => indegree[i] -= 1,
            }
        }
    }

    let mut ready: Vec<Tick> = trace.tasks.iter().map(|t| t.submission_tick).collect();
    let mut queue: VecDeque<usize> = (0..trace.tasks.len()).filter(|&i| indegree[i] == 0).collect();
    let mut ends = HashMap::with_capacity(trace.tasks.len());

    while let Some(i) = queue.pop_front() {
        let task = &trace.tasks[i];
        let end = ready[i] + task.runtime.max(0);
        ends.insert(task.id, end);
        for &d in &dependents[i] {
            ready[d] = ready[d].max(end);
            indegree[d] -= 1;
            if indegree[d] == 0 {
                queue.push_back(d);
            }
        }
    }
    ends
}

/// One power reading of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    /// Tick of the reading.
    pub tick: Tick,
    /// Machine id.
    pub machine: MachineId,
    /// Instantaneous draw (W).
    pub watts: f64,
}

/// Energy a machine consumed over the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineEnergy {
    /// Machine id.
    pub machine: MachineId,
    /// Energy (J).
    pub joules: f64,
}

impl MachineEnergy {
    /// Energy (Wh).
    pub fn wh(&self) -> f64 {
        self.joules / 3600.0
    }
}

/// Collects per-machine power readings.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentStatsCollector {
    samples: Vec<PowerSample>,
    energy: Vec<MachineEnergy>,
}

impl EnvironmentStatsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records environment snapshots.
    pub fn observe(&mut self, event: &Event) {
        if let EventKind::EnvironmentExposed { power } = &event.kind {
            self.samples.extend(power.iter().map(|p| PowerSample {
                tick: event.tick,
                machine: p.machine,
                watts: p.watts,
            }));
        }
    }

    /// Captures accumulated machine energy from the final state.
    pub fn finish(&mut self, state: &SimulationState) {
        self.energy = state
            .machines()
            .map(|m| MachineEnergy {
                machine: m.id,
                joules: m.meter.accumulated_joules(),
            })
            .collect();
    }

    /// Power readings in dispatch order.
    pub fn samples(&self) -> &[PowerSample] {
        &self.samples
    }

    /// Energy per machine, by id. Empty until [`Self::finish`].
    pub fn energy(&self) -> &[MachineEnergy] {
        &self.energy
    }

    /// Highest total environment draw seen in one snapshot (W).
    pub fn peak_watts(&self) -> f64 {
        let mut per_tick: BTreeMap<Tick, f64> = BTreeMap::new();
        for s in &self.samples {
            *per_tick.entry(s.tick).or_insert(0.0) += s.watts;
        }
        per_tick.values().copied().fold(0.0, f64::max)
    }

    /// Total machine energy (Wh).
    pub fn total_energy_wh(&self) -> f64 {
        self.energy.iter().map(MachineEnergy::wh).sum()
    }

    /// Consumes the collector.
    pub fn into_parts(self) -> (Vec<PowerSample>, Vec<MachineEnergy>) {
        (self.samples, self.energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MachinePower;
    use crate::models::Task;

    fn event(tick: Tick, kind: EventKind) -> Event {
        Event { tick, seq: 0, kind }
    }

    fn workflow_trace() -> Trace {
        // wf 1: a(0..100) → b(+50); wf 2: c submitted at 30, runtime 10
        Trace::new()
            .with_task(Task::new(1).with_workflow(1).with_runtime(100))
            .with_task(
                Task::new(2)
                    .with_workflow(1)
                    .with_runtime(50)
                    .with_dependency(1),
            )
            .with_task(Task::new(3).with_workflow(2).with_runtime(10).with_submission(30))
            .with_task(Task::new(4).with_runtime(5))
    }

    #[test]
    fn test_task_timelines() {
        let trace = workflow_trace();
        let mut c = TaskStatsCollector::new(&trace);
        c.observe(&event(10, EventKind::TaskStarted { task: 1, machine: 0, cores: 1 }));
        c.observe(&event(10, EventKind::TaskStarted { task: 1, machine: 2, cores: 1 }));
        c.observe(&event(10, EventKind::TaskStarted { task: 1, machine: 0, cores: 1 }));
        c.observe(&event(110, EventKind::TaskCompleted { task: 1 }));

        let t = &c.timelines()[&1];
        assert_eq!(t.start, Some(10));
        assert_eq!(t.completion, Some(110));
        assert_eq!(t.machines, vec![0, 2]);
        assert_eq!(t.workflow, Some(1));
        assert_eq!(c.timelines()[&2].start, None);
        assert_eq!(c.into_timelines().len(), 4);
    }

    #[test]
    fn test_critical_path_estimates() {
        let c = WorkflowStatsCollector::new(&workflow_trace());
        assert_eq!(c.estimated_completion(1), Some(150));
        assert_eq!(c.estimated_completion(2), Some(40));
        assert_eq!(c.estimated_completion(9), None);
        assert_eq!(c.workflow(1).unwrap().task_count, 2);
        assert_eq!(c.workflows().count(), 2);
    }

    #[test]
    fn test_workflow_estimates_follow_progress() {
        let mut c = WorkflowStatsCollector::new(&workflow_trace());
        c.observe(&event(80, EventKind::TaskStarted { task: 1, machine: 0, cores: 1 }));
        assert_eq!(c.estimated_completion(1), Some(180));

        c.observe(&event(180, EventKind::TaskCompleted { task: 1 }));
        c.observe(&event(300, EventKind::TaskCompleted { task: 2 }));
        let wf = c.workflow(1).unwrap();
        assert_eq!(wf.completed, 2);
        assert_eq!(wf.completion, Some(300));
        assert_eq!(wf.makespan(), Some(300));
        assert_eq!(wf.estimated_completion, 300);
    }

    #[test]
    fn test_environment_samples() {
        let mut c = EnvironmentStatsCollector::new();
        let power = vec![
            MachinePower { machine: 0, watts: 100.0 },
            MachinePower { machine: 1, watts: 50.0 },
        ];
        c.observe(&event(0, EventKind::EnvironmentExposed { power }));
        c.observe(&event(
            5,
            EventKind::EnvironmentExposed {
                power: vec![MachinePower { machine: 0, watts: 20.0 }],
            },
        ));
        c.observe(&event(6, EventKind::TaskQueueExtended));

        assert_eq!(c.samples().len(), 3);
        assert!((c.peak_watts() - 150.0).abs() < 1e-10);
        assert!(c.energy().is_empty());
        assert_eq!(c.total_energy_wh(), 0.0);
    }
}
