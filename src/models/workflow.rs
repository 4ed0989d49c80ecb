//! Workflow model.

use serde::{Deserialize, Serialize};

use super::{TaskId, WorkflowId};

/// A group of tasks submitted together as one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier.
    pub id: WorkflowId,
    /// Member task ids.
    pub tasks: Vec<TaskId>,
}

impl Workflow {
    /// Creates an empty workflow.
    pub fn new(id: WorkflowId) -> Self {
        Self {
            id,
            tasks: Vec::new(),
        }
    }

    /// Adds a member task.
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.tasks.push(task);
        self
    }

    /// Number of member tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}
