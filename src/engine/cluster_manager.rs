//! Free-capacity bookkeeping with indexed machine views.
//!
//! Speed and energy-efficiency orders never change during a run, so they
//! are indexed once at construction. Free-core orders are sorted per call.
//! Every view is a fresh snapshot the caller may hold across `assign`
//! calls.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use tracing::trace;

use super::event::{EventKind, EventQueue};
use crate::error::{Result, SimError};
use crate::models::{ClusterId, Environment, MachineId, TaskId, Tick};

/// Point-in-time view of one machine.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSnapshot {
    /// Machine id.
    pub id: MachineId,
    /// Owning cluster.
    pub cluster: ClusterId,
    /// Total cores.
    pub cores: u32,
    /// Free cores when the snapshot was taken.
    pub free_cores: u32,
    /// Normalized speed.
    pub normalized_speed: f64,
    /// Thermal design power (W).
    pub tdp: f64,
    /// Whether DVFS is available.
    pub dvfs_enabled: bool,
    /// TDP per core adjusted by speed (lower is better).
    pub energy_efficiency: f64,
}

/// Owner of per-machine free-core counts.
#[derive(Debug, Clone)]
pub struct ClusterManager {
    machines: BTreeMap<MachineId, MachineSnapshot>,
    free_total: u32,
    by_descending_speed: Vec<MachineId>,
    by_ascending_efficiency: Vec<MachineId>,
}

impl ClusterManager {
    /// Indexes every machine of the environment, all cores free.
    pub fn new(environment: &Environment) -> Self {
        let machines: BTreeMap<MachineId, MachineSnapshot> = environment
            .machines
            .iter()
            .map(|m| {
                (
                    m.id,
                    MachineSnapshot {
                        id: m.id,
                        cluster: m.cluster,
                        cores: m.cores,
                        free_cores: m.cores,
                        normalized_speed: m.normalized_speed,
                        tdp: m.tdp,
                        dvfs_enabled: m.dvfs_enabled,
                        energy_efficiency: m.energy_efficiency(),
                    },
                )
            })
            .collect();

        let mut by_descending_speed: Vec<MachineId> = machines.keys().copied().collect();
        by_descending_speed.sort_by(|a, b| {
            let (ma, mb) = (&machines[a], &machines[b]);
            OrderedFloat(mb.normalized_speed)
                .cmp(&OrderedFloat(ma.normalized_speed))
                .then(a.cmp(b))
        });

        let mut by_ascending_efficiency: Vec<MachineId> = machines.keys().copied().collect();
        by_ascending_efficiency.sort_by(|a, b| {
            let (ma, mb) = (&machines[a], &machines[b]);
            OrderedFloat(ma.energy_efficiency)
                .cmp(&OrderedFloat(mb.energy_efficiency))
                .then(a.cmp(b))
        });

        let free_total = machines.values().map(|m| m.cores).sum();

        Self {
            machines,
            free_total,
            by_descending_speed,
            by_ascending_efficiency,
        }
    }

    /// Grants `cores` cores of `machine` to `task` and signals the change.
    ///
    /// # Errors
    /// [`SimError::InsufficientCapacity`] if the machine has fewer free cores.
    pub fn assign(
        &mut self,
        task: TaskId,
        machine: MachineId,
        cores: u32,
        now: Tick,
        events: &mut EventQueue,
    ) -> Result<()> {
        let entry = self
            .machines
            .get_mut(&machine)
            .ok_or(SimError::MachineNotFound(machine))?;
        if cores > entry.free_cores {
            return Err(SimError::InsufficientCapacity {
                machine,
                requested: cores,
                free: entry.free_cores,
            });
        }
        entry.free_cores -= cores;
        self.free_total -= cores;
        trace!(task, machine, cores, free = entry.free_cores, "cores assigned");
        events.submit(now, EventKind::ClusterStateChanged);
        Ok(())
    }

    /// Returns `cores` cores of `machine` to the free pool and signals the
    /// change.
    ///
    /// # Errors
    /// [`SimError::OverRelease`] if the machine has fewer cores assigned.
    pub fn release(
        &mut self,
        machine: MachineId,
        cores: u32,
        now: Tick,
        events: &mut EventQueue,
    ) -> Result<()> {
        let entry = self
            .machines
            .get_mut(&machine)
            .ok_or(SimError::MachineNotFound(machine))?;
        let assigned = entry.cores - entry.free_cores;
        if cores > assigned {
            return Err(SimError::OverRelease {
                machine,
                released: cores,
                assigned,
            });
        }
        entry.free_cores += cores;
        self.free_total += cores;
        trace!(machine, cores, free = entry.free_cores, "cores released");
        events.submit(now, EventKind::ClusterStateChanged);
        Ok(())
    }

    /// Free cores across all machines.
    #[inline]
    pub fn free_cores(&self) -> u32 {
        self.free_total
    }

    /// Free cores of one machine.
    pub fn free_cores_on(&self, machine: MachineId) -> Result<u32> {
        self.machines
            .get(&machine)
            .map(|m| m.free_cores)
            .ok_or(SimError::MachineNotFound(machine))
    }

    /// Cores currently assigned on one machine.
    pub fn assigned_cores_on(&self, machine: MachineId) -> Result<u32> {
        self.machines
            .get(&machine)
            .map(|m| m.cores - m.free_cores)
            .ok_or(SimError::MachineNotFound(machine))
    }

    /// Snapshot of one machine.
    pub fn snapshot(&self, machine: MachineId) -> Result<MachineSnapshot> {
        self.machines
            .get(&machine)
            .cloned()
            .ok_or(SimError::MachineNotFound(machine))
    }

    /// All machines, by id.
    pub fn machines(&self) -> Vec<MachineSnapshot> {
        self.machines.values().cloned().collect()
    }

    /// Machines with at least `min_free` free cores, fewest free first.
    pub fn by_ascending_free_cores(&self, min_free: u32) -> Vec<MachineSnapshot> {
        let mut view: Vec<MachineSnapshot> = self
            .machines
            .values()
            .filter(|m| m.free_cores >= min_free)
            .cloned()
            .collect();
        view.sort_by(|a, b| a.free_cores.cmp(&b.free_cores).then(a.id.cmp(&b.id)));
        view
    }

    /// Machines with at least `min_free` free cores, most free first.
    pub fn by_descending_free_cores(&self, min_free: u32) -> Vec<MachineSnapshot> {
        let mut view: Vec<MachineSnapshot> = self
            .machines
            .values()
            .filter(|m| m.free_cores >= min_free)
            .cloned()
            .collect();
        view.sort_by(|a, b| b.free_cores.cmp(&a.free_cores).then(a.id.cmp(&b.id)));
        view
    }

    /// All machines, fastest first.
    pub fn by_descending_speed(&self) -> Vec<MachineSnapshot> {
        self.indexed(&self.by_descending_speed)
    }

    /// All machines, most energy-efficient first.
    pub fn by_ascending_energy_efficiency(&self) -> Vec<MachineSnapshot> {
        self.indexed(&self.by_ascending_efficiency)
    }

    /// Aggregate free cores per normalized speed.
    pub fn free_cores_per_speed(&self) -> BTreeMap<OrderedFloat<f64>, u32> {
        let mut per_speed = BTreeMap::new();
        for m in self.machines.values() {
            *per_speed.entry(OrderedFloat(m.normalized_speed)).or_insert(0) += m.free_cores;
        }
        per_speed
    }

    fn indexed(&self, order: &[MachineId]) -> Vec<MachineSnapshot> {
        order
            .iter()
            .filter_map(|id| self.machines.get(id))
            .cloned()
            .collect()
    }
}
