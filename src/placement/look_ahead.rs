//! Slack- and energy-aware placement with DVFS.
//!
//! Each task gets a deadline of `original runtime + remaining slack`, where
//! remaining slack shrinks with the time the task already waited past its
//! earliest feasible start. Machines are visited from the most
//! energy-efficient one. Machines too slow for the deadline are skipped, but
//! only when the faster speed classes alone can hold the whole demand.
//!
//! On DVFS machines that beat the deadline, the leftover slack buys a
//! frequency reduction: the table row with the largest slowdown not
//! exceeding `1 + (deadline - natural) / natural` scales the runtime up and
//! energy and power down.
//!
//! # Reference
//! Kim, Buyya, Kim (2007), "Power Aware Scheduling of Bag-of-Tasks
//! Applications with Deadline Constraints on DVS-enabled Clusters"

use tracing::{debug, trace};

use super::{runtime_on, whole_ticks, Allocator, Assignment, PlacementContext};
use crate::engine::PendingTask;
use crate::error::Result;
use crate::models::{DvfsLevel, Machine, Tick};
use crate::power::task_energy_wh;

/// Slack-aware, energy-first placement policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookAhead;

impl LookAhead {
    /// Runs one placement pass.
    pub fn place(
        &self,
        tasks: &[PendingTask],
        allocator: &mut dyn Allocator,
        context: &PlacementContext<'_>,
    ) -> Result<usize> {
        let mut placed = 0;
        for task in tasks {
            let free = allocator.cluster().free_cores();
            if free == 0 {
                break;
            }
            if task.cores > free {
                debug!(task = task.id, demand = task.cores, free, "deferred");
                continue;
            }

            let slack = remaining_slack(task, context.now);
            let deadline = (task.runtime + slack) as f64;

            let cluster = allocator.cluster();
            let in_time: u32 = cluster
                .free_cores_per_speed()
                .iter()
                .filter(|(speed, _)| runtime_on(task.runtime, speed.0) <= deadline)
                .map(|(_, free)| *free)
                .sum();
            let reject_slow = task.cores <= in_time;
            let candidates = cluster.by_ascending_energy_efficiency();

            let mut left = task.cores;
            for candidate in candidates {
                if left == 0 {
                    break;
                }
                if candidate.free_cores == 0 {
                    continue;
                }
                let natural = runtime_on(task.runtime, candidate.normalized_speed);
                if reject_slow && natural > deadline {
                    continue;
                }

                let machine = context.machine(candidate.id)?;
                let cores = left.min(candidate.free_cores);
                let level = if machine.dvfs_enabled && natural < deadline {
                    dvfs_level(machine, deadline, natural)
                } else {
                    DvfsLevel::NOMINAL
                };
                let factor = 1.0 - level.saving;
                let energy = task_energy_wh(machine, cores, natural, context.ticks_per_second);
                trace!(
                    task = task.id,
                    machine = machine.id,
                    slowdown = level.slowdown,
                    "look-ahead slice"
                );

                allocator.assign(Assignment {
                    task: task.id,
                    machine: machine.id,
                    cores,
                    runtime: whole_ticks(natural * level.slowdown),
                    energy_wh: energy * factor,
                    power_factor: factor,
                })?;
                left -= cores;
            }
            if left == 0 {
                placed += 1;
            }
        }
        Ok(placed)
    }
}

/// Slack left after the time a task already waited past its earliest start.
pub fn remaining_slack(task: &PendingTask, now: Tick) -> Tick {
    let waited = (now - task.earliest_start).max(0);
    (task.slack - waited).max(0)
}

/// Deepest DVFS level that still meets `deadline`.
fn dvfs_level(machine: &Machine, deadline: f64, natural: f64) -> DvfsLevel {
    let base = if natural > 0.0 { natural } else { 1.0 };
    machine.dvfs.floor(1.0 + (deadline - base) / base)
}
