//! Built-in ordering rules.
//!
//! # Score Convention
//! All rules return lower scores for tasks that should be offered first.

use super::{OrderingContext, OrderingRule, RuleScore};
use crate::engine::PendingTask;

/// Submission tick (first come, first served).
#[derive(Debug, Clone, Copy)]
pub struct SubmissionTick;

impl OrderingRule for SubmissionTick {
    fn name(&self) -> &'static str {
        "SUBMIT"
    }

    fn evaluate(&self, task: &PendingTask, _context: &OrderingContext<'_>) -> RuleScore {
        task.submission_tick as f64
    }
}

/// Original runtime (shortest job first).
///
/// Uses the trace runtime, not the machine-adjusted one, so the order does
/// not depend on where earlier slices landed.
#[derive(Debug, Clone, Copy)]
pub struct OriginalRuntime;

impl OrderingRule for OriginalRuntime {
    fn name(&self) -> &'static str {
        "RUNTIME"
    }

    fn evaluate(&self, task: &PendingTask, _context: &OrderingContext<'_>) -> RuleScore {
        task.runtime as f64
    }
}

/// Estimated completion of the task's workflow.
///
/// Tasks without a workflow, or whose workflow has no estimate, score
/// `f64::MAX` and tie with each other.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowCompletion;

impl OrderingRule for WorkflowCompletion {
    fn name(&self) -> &'static str {
        "WORKFLOW"
    }

    fn evaluate(&self, task: &PendingTask, context: &OrderingContext<'_>) -> RuleScore {
        task.workflow
            .and_then(|wf| context.workflow_completion(wf))
            .map(|t| t as f64)
            .unwrap_or(f64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::{Tick, WorkflowId};

    fn pending(workflow: Option<WorkflowId>) -> PendingTask {
        PendingTask {
            id: 1,
            workflow,
            submission_tick: 42,
            runtime: 900,
            cores: 2,
            slack: 0,
            earliest_start: 42,
        }
    }

    #[test]
    fn test_time_rules() {
        let ctx = OrderingContext::at_tick(0);
        assert_eq!(SubmissionTick.evaluate(&pending(None), &ctx), 42.0);
        assert_eq!(OriginalRuntime.evaluate(&pending(None), &ctx), 900.0);
    }

    #[test]
    fn test_workflow_rule_missing_data() {
        let estimates: HashMap<WorkflowId, Tick> = [(5, 1234)].into_iter().collect();
        let ctx = OrderingContext::at_tick(0).with_workflows(&estimates);
        assert_eq!(WorkflowCompletion.evaluate(&pending(Some(5)), &ctx), 1234.0);
        assert_eq!(WorkflowCompletion.evaluate(&pending(Some(6)), &ctx), f64::MAX);
        assert_eq!(WorkflowCompletion.evaluate(&pending(None), &ctx), f64::MAX);
        assert_eq!(
            WorkflowCompletion.evaluate(&pending(Some(5)), &OrderingContext::at_tick(0)),
            f64::MAX
        );
    }
}
