//! Task ordering policies.
//!
//! Orders the eligible tasks offered to a placement pass. Each policy is a
//! chain of score-based rules evaluated sequentially (next rule only on a
//! tie) with a final tie-break by task id, so every ordering is total and
//! deterministic.
//!
//! # Usage
//!
//! ```
//! use wta_replay::config::OrderPolicyKind;
//! use wta_replay::ordering::{OrderingContext, TaskOrderPolicy};
//!
//! let policy = TaskOrderPolicy::from_kind(OrderPolicyKind::ShortestJobFirst);
//! let context = OrderingContext::at_tick(0);
//! let mut tasks = Vec::new();
//! policy.order(&mut tasks, &context);
//! ```
//!
//! # References
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Versluis et al. (2020), "The Workflow Trace Archive"

mod chain;
mod context;
pub mod rules;

pub use chain::RuleChain;
pub use context::{OrderingContext, WorkflowEstimates};

use std::fmt::Debug;

use crate::config::OrderPolicyKind;
use crate::engine::PendingTask;

/// Score returned by an ordering rule.
///
/// Lower scores = earlier in the order.
pub type RuleScore = f64;

/// A rule that scores an eligible task.
///
/// # Score Convention
/// **Lower score = offered first.** Rules return `f64::MAX` when they have
/// no data for a task, which makes such tasks tie with each other.
pub trait OrderingRule: Send + Sync + Debug {
    /// Rule name (e.g., "SUBMIT", "RUNTIME").
    fn name(&self) -> &'static str;

    /// Scores a task; lower goes first.
    fn evaluate(&self, task: &PendingTask, context: &OrderingContext<'_>) -> RuleScore;
}

/// The closed set of ordering policies.
#[derive(Debug, Clone)]
pub struct TaskOrderPolicy {
    kind: OrderPolicyKind,
    chain: RuleChain,
}

impl TaskOrderPolicy {
    /// Builds the rule chain for a policy kind.
    ///
    /// - FCFS: submission tick, then id.
    /// - SJF: original runtime, then submission tick, then id.
    /// - EWF: estimated workflow completion, then FCFS.
    pub fn from_kind(kind: OrderPolicyKind) -> Self {
        let chain = match kind {
            OrderPolicyKind::FirstComeFirstServe => {
                RuleChain::new().with_rule(rules::SubmissionTick)
            }
            OrderPolicyKind::ShortestJobFirst => RuleChain::new()
                .with_rule(rules::OriginalRuntime)
                .with_rule(rules::SubmissionTick),
            OrderPolicyKind::EarliestWorkflowFirst => RuleChain::new()
                .with_rule(rules::WorkflowCompletion)
                .with_rule(rules::SubmissionTick),
        };
        Self { kind, chain }
    }

    /// Policy kind.
    pub fn kind(&self) -> OrderPolicyKind {
        self.kind
    }

    /// Sorts `tasks` in place into offer order.
    pub fn order(&self, tasks: &mut [PendingTask], context: &OrderingContext<'_>) {
        self.chain.sort(tasks, context);
    }
}
