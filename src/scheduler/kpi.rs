//! Run-level performance and energy indicators.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Latest completion − earliest submission |
//! | Avg Response Time | Mean(completion − submission) |
//! | Avg Wait Time | Mean(first start − submission) |
//! | Avg Slowdown | Mean(response time / original runtime) |
//! | Task Energy | Σ energy charged to tasks (Wh) |
//! | Machine Energy | Σ energy integrated by machine power meters (Wh) |
//!
//! Only completed tasks enter the averages.
//!
//! # Reference
//! Feitelson (2015), "Workload Modeling for Computer Systems Performance
//! Evaluation", Ch. 8: Performance Metrics

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{TaskId, Tick};
use crate::stats::TaskTimeline;

/// Summary of one simulation run. Times are in ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of tasks in the trace.
    pub task_count: usize,
    /// Number of completed tasks.
    pub completed_count: usize,
    /// Latest completion − earliest submission.
    pub makespan: Tick,
    /// Mean submission-to-completion time.
    pub avg_response_time: f64,
    /// Mean submission-to-start time.
    pub avg_wait_time: f64,
    /// Mean response time relative to the original runtime.
    pub avg_slowdown: f64,
    /// Energy charged to tasks (Wh).
    pub task_energy_wh: f64,
    /// Energy integrated by machine meters, idle draw included (Wh).
    pub machine_energy_wh: f64,
}

impl RunSummary {
    /// Computes the summary from finished timelines.
    ///
    /// # Arguments
    /// * `timelines` - Per-task timelines.
    /// * `machine_energy_wh` - Total machine energy of the run.
    pub fn calculate(timelines: &BTreeMap<TaskId, TaskTimeline>, machine_energy_wh: f64) -> Self {
        let mut completed = 0usize;
        let mut total_response = 0.0;
        let mut total_wait = 0.0;
        let mut total_slowdown = 0.0;
        let mut first_submission: Option<Tick> = None;
        let mut last_completion: Option<Tick> = None;
        let mut task_energy_wh = 0.0;

        for t in timelines.values() {
            task_energy_wh += t.energy_wh;
            first_submission = Some(first_submission.map_or(t.submission, |s| s.min(t.submission)));

            let (Some(response), Some(completion)) = (t.response_time(), t.completion) else {
                continue;
            };
            completed += 1;
            total_response += response as f64;
            total_wait += t.wait_time().unwrap_or(0) as f64;
            total_slowdown += t.slowdown().unwrap_or(1.0);
            last_completion = Some(last_completion.map_or(completion, |c| c.max(completion)));
        }

        let makespan = match (first_submission, last_completion) {
            (Some(s), Some(c)) => (c - s).max(0),
            _ => 0,
        };
        let mean = |total: f64| {
            if completed == 0 {
                0.0
            } else {
                total / completed as f64
            }
        };

        Self {
            task_count: timelines.len(),
            completed_count: completed,
            makespan,
            avg_response_time: mean(total_response),
            avg_wait_time: mean(total_wait),
            avg_slowdown: mean(total_slowdown),
            task_energy_wh,
            machine_energy_wh,
        }
    }

    /// Whether every task completed.
    pub fn all_completed(&self) -> bool {
        self.completed_count == self.task_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(
        task: TaskId,
        submission: Tick,
        start: Option<Tick>,
        runtime: Tick,
        energy_wh: f64,
    ) -> (TaskId, TaskTimeline) {
        (
            task,
            TaskTimeline {
                task,
                workflow: None,
                submission,
                original_runtime: runtime,
                cpu_demand: 1,
                start,
                completion: start.map(|s| s + runtime),
                runtime,
                energy_wh,
                machines: Vec::new(),
            },
        )
    }

    #[test]
    fn test_summary_basic() {
        let timelines: BTreeMap<_, _> = [
            timeline(1, 0, Some(0), 1000, 1.0),
            timeline(2, 0, Some(1000), 2000, 2.0),
        ]
        .into_iter()
        .collect();

        let s = RunSummary::calculate(&timelines, 5.0);
        assert_eq!(s.task_count, 2);
        assert_eq!(s.completed_count, 2);
        assert_eq!(s.makespan, 3000);
        assert!((s.avg_response_time - 2000.0).abs() < 1e-10); // (1000+3000)/2
        assert!((s.avg_wait_time - 500.0).abs() < 1e-10);
        assert!((s.avg_slowdown - 1.25).abs() < 1e-10); // (1 + 1.5)/2
        assert!((s.task_energy_wh - 3.0).abs() < 1e-10);
        assert!((s.machine_energy_wh - 5.0).abs() < 1e-10);
        assert!(s.all_completed());
    }

    #[test]
    fn test_summary_skips_unfinished() {
        let timelines: BTreeMap<_, _> = [
            timeline(1, 100, Some(200), 300, 0.0),
            timeline(2, 50, None, 10, 0.0),
        ]
        .into_iter()
        .collect();

        let s = RunSummary::calculate(&timelines, 0.0);
        assert_eq!(s.completed_count, 1);
        assert!(!s.all_completed());
        // earliest submission 50, latest completion 500
        assert_eq!(s.makespan, 450);
        assert!((s.avg_response_time - 400.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_empty() {
        let s = RunSummary::calculate(&BTreeMap::new(), 0.0);
        assert_eq!(s.makespan, 0);
        assert_eq!(s.avg_response_time, 0.0);
        assert_eq!(s.avg_slowdown, 0.0);
        assert!(s.all_completed());
    }
}
