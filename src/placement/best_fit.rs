//! Best-fit placement.
//!
//! For every remainder, picks the machine with the fewest free cores that
//! still covers it. When no single machine can, the machine with the most
//! free cores is drained and the rest carries over.

use tracing::debug;

use super::{nominal_assignment, Allocator, PlacementContext};
use crate::engine::PendingTask;
use crate::error::Result;

/// Tightest-fit packing policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFit;

impl BestFit {
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

            let mut left = task.cores;
            while left > 0 {
                let cluster = allocator.cluster();
                let target = cluster
                    .by_ascending_free_cores(left)
                    .into_iter()
                    .next()
                    .or_else(|| cluster.by_descending_free_cores(1).into_iter().next());
                let Some(target) = target else {
                    break;
                };
                let cores = left.min(target.free_cores);
                let machine = context.machine(target.id)?;
                allocator.assign(nominal_assignment(
                    task,
                    machine,
                    cores,
                    context.ticks_per_second,
                ))?;
                left -= cores;
            }
            if left == 0 {
                placed += 1;
            }
        }
        Ok(placed)
    }
}
