//! Sequential rule chain.
//!
//! Applies rules in order and consults the next rule only on a tie; when
//! every rule ties, task ids decide.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::{OrderingContext, OrderingRule, RuleScore};
use crate::engine::PendingTask;

/// An ordered list of ordering rules.
#[derive(Clone)]
pub struct RuleChain {
    rules: Vec<Arc<dyn OrderingRule>>,
    epsilon: f64,
}

impl RuleChain {
    /// Creates an empty chain (pure id order).
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            epsilon: 1e-9,
        }
    }

    /// Appends a rule.
    pub fn with_rule<R: OrderingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Sorts tasks into offer order. Stable.
    pub fn sort(&self, tasks: &mut [PendingTask], context: &OrderingContext<'_>) {
        if tasks.len() < 2 {
            return;
        }
        // Score once per task and rule instead of once per comparison.
        let mut keyed: Vec<(Vec<RuleScore>, PendingTask)> = tasks
            .iter()
            .map(|t| (self.evaluate(t, context), t.clone()))
            .collect();
        keyed.sort_by(|(sa, a), (sb, b)| self.compare(sa, sb).then(a.id.cmp(&b.id)));
        for (slot, (_, task)) in tasks.iter_mut().zip(keyed) {
            *slot = task;
        }
    }

    /// Scores a task under every rule.
    pub fn evaluate(&self, task: &PendingTask, context: &OrderingContext<'_>) -> Vec<RuleScore> {
        self.rules
            .iter()
            .map(|rule| rule.evaluate(task, context))
            .collect()
    }

    fn compare(&self, a: &[RuleScore], b: &[RuleScore]) -> Ordering {
        for (score_a, score_b) in a.iter().zip(b) {
            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(score_b).unwrap_or(Ordering::Equal);
            }
        }
        Ordering::Equal
    }
}

impl Default for RuleChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleChain")
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
