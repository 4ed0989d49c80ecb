//! Fastest-machine placement.
//!
//! Machines are visited in descending speed through a cursor into a
//! snapshot taken at the start of the pass. The cursor stays on a machine
//! until it runs out of free cores, then moves on modulo the snapshot
//! length.

use tracing::debug;

use super::{nominal_assignment, Allocator, PlacementContext};
use crate::engine::{MachineSnapshot, PendingTask};
use crate::error::Result;

/// Fastest machines first, round robin.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastestMachine;

impl FastestMachine {
    /// Creates the policy.
    pub fn new() -> Self {
        Self
    }

    /// Runs one placement pass.
    pub fn place(
        &self,
        tasks: &[PendingTask],
        allocator: &mut dyn Allocator,
        context: &PlacementContext<'_>,
    ) -> Result<usize> {
        let mut ring = Ring::new(allocator.cluster().by_descending_speed());
        let mut placed = 0;

        for task in tasks {
            let free = ring.total_free();
            if free == 0 {
                break;
            }
            if task.cores > free {
                debug!(task = task.id, demand = task.cores, free, "deferred");
                continue;
            }

            let mut left = task.cores;
            while left > 0 {
                let Some(slot) = ring.current() else {
                    break;
                };
                let cores = left.min(ring.free[slot]);
                let machine = context.machine(ring.machines[slot].id)?;
                allocator.assign(nominal_assignment(
                    task,
                    machine,
                    cores,
                    context.ticks_per_second,
                ))?;
                ring.consume(slot, cores);
                left -= cores;
            }
            if left == 0 {
                placed += 1;
            }
        }
        Ok(placed)
    }
}

/// Snapshot of machines with local free-core bookkeeping.
#[derive(Debug)]
struct Ring {
    machines: Vec<MachineSnapshot>,
    free: Vec<u32>,
    cursor: usize,
}

impl Ring {
    fn new(machines: Vec<MachineSnapshot>) -> Self {
        let free = machines.iter().map(|m| m.free_cores).collect();
        Self {
            machines,
            free,
            cursor: 0,
        }
    }

    fn total_free(&self) -> u32 {
        self.free.iter().sum()
    }

    /// Moves the cursor to the next machine with free cores.
    fn current(&mut self) -> Option<usize> {
        let len = self.machines.len();
        for _ in 0..len {
            if self.free[self.cursor] > 0 {
                return Some(self.cursor);
            }
            self.cursor = (self.cursor + 1) % len;
        }
        None
    }

    fn consume(&mut self, slot: usize, cores: u32) {
        self.free[slot] -= cores;
        if self.free[slot] == 0 {
            self.cursor = (slot + 1) % self.machines.len();
        }
    }
}
