//! Materialized workload trace.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Task, TaskId, Tick, Workflow, WorkflowId};

/// Tasks and workflows as handed over by the trace reader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    /// Tasks in trace order.
    pub tasks: Vec<Task>,
    /// Workflows in trace order.
    pub workflows: Vec<Workflow>,
    /// Workflow id → position in `workflows`. Rebuilt when stale.
    #[serde(skip)]
    workflow_index: HashMap<WorkflowId, usize>,
}

impl PartialEq for Trace {
    fn eq(&self, other: &Self) -> bool {
        self.tasks == other.tasks && self.workflows == other.workflows
    }
}

impl Trace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task. If the task names a workflow, the task is registered
    /// with that workflow (created on first use).
    pub fn with_task(mut self, task: Task) -> Self {
        self.add_task(task);
        self
    }

    /// Adds a task (see [`Trace::with_task`]).
    pub fn add_task(&mut self, task: Task) {
        if let Some(wf) = task.workflow {
            match self.workflow_position(wf) {
                Some(pos) => self.workflows[pos].tasks.push(task.id),
                None => {
                    self.workflow_index.insert(wf, self.workflows.len());
                    self.workflows.push(Workflow::new(wf).with_task(task.id));
                }
            }
        }
        self.tasks.push(task);
    }

    /// Position of a workflow in `workflows`, through the index.
    ///
    /// `workflows` is public, so the index is checked against it and
    /// rebuilt after direct edits.
    fn workflow_position(&mut self, id: WorkflowId) -> Option<usize> {
        if self.workflow_index.len() == self.workflows.len() {
            match self.workflow_index.get(&id) {
                None => return None,
                Some(&pos) if self.workflows.get(pos).is_some_and(|w| w.id == id) => {
                    return Some(pos)
                }
                Some(_) => {}
            }
        }
        self.workflow_index.clear();
        for (pos, wf) in self.workflows.iter().enumerate() {
            self.workflow_index.entry(wf.id).or_insert(pos);
        }
        self.workflow_index.get(&id).copied()
    }

    /// Index from task id to position in `tasks`.
    pub fn task_index(&self) -> HashMap<TaskId, usize> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i))
            .collect()
    }

    /// Earliest submission tick, or 0 for an empty trace.
    pub fn start_tick(&self) -> Tick {
        self.tasks
            .iter()
            .map(|t| t.submission_tick)
            .min()
            .unwrap_or(0)
    }

    /// Total number of dependency edges.
    pub fn dependency_count(&self) -> usize {
        self.tasks.iter().map(|t| t.dependencies.len()).sum()
    }

    /// Largest core demand of a single task.
    pub fn max_cpu_demand(&self) -> u32 {
        self.tasks.iter().map(|t| t.cpu_demand).max().unwrap_or(0)
    }

    /// Number of tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_registers_workflows() {
        let trace = Trace::new()
            .with_task(Task::new(1).with_workflow(10).with_submission(50))
            .with_task(Task::new(2).with_workflow(10).with_dependency(1))
            .with_task(Task::new(3).with_cpu_demand(4).with_submission(20));

        assert_eq!(trace.task_count(), 3);
        assert_eq!(trace.workflows.len(), 1);
        assert_eq!(trace.workflows[0].tasks, vec![1, 2]);
        assert_eq!(trace.dependency_count(), 1);
        assert_eq!(trace.max_cpu_demand(), 4);
        assert_eq!(trace.start_tick(), 0);
        assert_eq!(trace.task_index()[&3], 2);
    }

    #[test]
    fn test_many_workflows_build_in_linear_time() {
        let mut trace = Trace::new();
        for id in 0..100_000u64 {
            trace.add_task(Task::new(id).with_workflow(id));
        }
        trace.add_task(Task::new(100_000).with_workflow(99_999));

        assert_eq!(trace.workflows.len(), 100_000);
        assert_eq!(trace.workflows[99_999].tasks, vec![99_999, 100_000]);
    }

    #[test]
    fn test_index_follows_direct_edits() {
        let mut trace = Trace::new()
            .with_task(Task::new(1).with_workflow(10))
            .with_task(Task::new(2).with_workflow(20));
        trace.workflows.remove(0);
        trace.add_task(Task::new(3).with_workflow(20));
        trace.add_task(Task::new(4).with_workflow(10));

        let members: Vec<_> = trace.workflows.iter().map(|w| (w.id, w.tasks.clone())).collect();
        assert_eq!(members, vec![(20, vec![2, 3]), (10, vec![4])]);
    }

    #[test]
    fn test_equality_ignores_index() {
        let built = Trace::new().with_task(Task::new(1).with_workflow(3));
        let json = serde_json::to_string(&built).unwrap();
        let parsed: Trace = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, built);
    }

    #[test]
    fn test_empty_trace() {
        let trace = Trace::new();
        assert_eq!(trace.start_tick(), 0);
        assert_eq!(trace.max_cpu_demand(), 0);
    }
}
