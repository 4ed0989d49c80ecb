//! Environment model: machines grouped into clusters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ClusterId, Machine, MachineId};

/// A named group of machines (grouping only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Unique cluster identifier.
    pub id: ClusterId,
    /// Human-readable name.
    pub name: String,
    /// Member machine ids, in creation order.
    pub machines: Vec<MachineId>,
}

/// The simulated datacenter.
///
/// Built once before the run; machines persist for the whole simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    /// Clusters in creation order.
    pub clusters: Vec<Cluster>,
    /// Machines in creation order.
    pub machines: Vec<Machine>,
    /// Machine id → position in `machines`.
    #[serde(skip)]
    machine_index: HashMap<MachineId, usize>,
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.clusters == other.clusters && self.machines == other.machines
    }
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cluster and returns its id.
    pub fn create_cluster(&mut self, name: impl Into<String>) -> ClusterId {
        let id = self.clusters.len() as ClusterId;
        self.clusters.push(Cluster {
            id,
            name: name.into(),
            machines: Vec::new(),
        });
        id
    }

    /// Adds a machine and registers it with its cluster (if the cluster
    /// exists). Returns the machine id.
    pub fn add_machine(&mut self, machine: Machine) -> MachineId {
        let id = machine.id;
        if let Some(cluster) = self.clusters.iter_mut().find(|c| c.id == machine.cluster) {
            cluster.machines.push(id);
        }
        self.machine_index.entry(id).or_insert(self.machines.len());
        self.machines.push(machine);
        id
    }

    /// Rebuilds the id index, e.g. after deserializing or editing
    /// `machines` directly.
    pub fn reindex(&mut self) {
        self.machine_index.clear();
        for (pos, m) in self.machines.iter().enumerate() {
            self.machine_index.entry(m.id).or_insert(pos);
        }
    }

    /// Creates a machine with the next free id in `cluster`.
    pub fn create_machine(&mut self, cluster: ClusterId, cores: u32) -> &mut Machine {
        let id = self
            .machines
            .iter()
            .map(|m| m.id + 1)
            .max()
            .unwrap_or(0);
        self.add_machine(Machine::new(id, cluster, cores));
        let last = self.machines.len() - 1;
        &mut self.machines[last]
    }

    /// Looks up a machine by id. Falls back to a scan when the index is
    /// stale.
    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machine_index
            .get(&id)
            .and_then(|&pos| self.machines.get(pos))
            .filter(|m| m.id == id)
            .or_else(|| self.machines.iter().find(|m| m.id == id))
    }

    /// Total number of cores across all machines.
    pub fn total_cores(&self) -> u64 {
        self.machines.iter().map(|m| m.cores as u64).sum()
    }

    /// Largest core count of a single machine.
    pub fn max_machine_cores(&self) -> u32 {
        self.machines.iter().map(|m| m.cores).max().unwrap_or(0)
    }

    /// Number of machines.
    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }
}
