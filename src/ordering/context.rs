//! Context for ordering rule evaluation.

use std::collections::HashMap;

use crate::models::{Tick, WorkflowId};

/// Read access to externally tracked workflow completion estimates.
pub trait WorkflowEstimates {
    /// Estimated completion tick of a workflow, if known.
    fn estimated_completion(&self, workflow: WorkflowId) -> Option<Tick>;
}

impl WorkflowEstimates for HashMap<WorkflowId, Tick> {
    fn estimated_completion(&self, workflow: WorkflowId) -> Option<Tick> {
        self.get(&workflow).copied()
    }
}

/// Runtime state passed to ordering rules.
#[derive(Clone, Copy, Default)]
pub struct OrderingContext<'a> {
    /// Current simulation tick.
    pub current_tick: Tick,
    /// Workflow completion estimates, when tracked.
    pub workflows: Option<&'a dyn WorkflowEstimates>,
}

impl<'a> OrderingContext<'a> {
    /// Creates a context at the given tick with no workflow data.
    pub fn at_tick(current_tick: Tick) -> Self {
        Self {
            current_tick,
            workflows: None,
        }
    }

    /// Attaches workflow completion estimates.
    pub fn with_workflows(mut self, workflows: &'a dyn WorkflowEstimates) -> Self {
        self.workflows = Some(workflows);
        self
    }

    /// Estimated completion of `workflow`, if any data is attached.
    pub fn workflow_completion(&self, workflow: WorkflowId) -> Option<Tick> {
        self.workflows
            .and_then(|w| w.estimated_completion(workflow))
    }
}

impl std::fmt::Debug for OrderingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderingContext")
            .field("current_tick", &self.current_tick)
            .field("workflows", &self.workflows.is_some())
            .finish()
    }
}
