//! Machine model.
//!
//! A machine is a pool of identical cores with a normalized clock speed and
//! a power envelope. DVFS-capable machines carry a table of slowdown
//! multipliers and the energy fraction each one saves.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::{ClusterId, MachineId};

/// A simulated machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Unique machine identifier.
    pub id: MachineId,
    /// Human-readable name.
    pub name: String,
    /// Owning cluster.
    pub cluster: ClusterId,
    /// Total number of cores.
    pub cores: u32,
    /// Whether the machine supports frequency scaling.
    pub dvfs_enabled: bool,
    /// Clock multiplier relative to the fastest machine (0.0, 1.0].
    pub normalized_speed: f64,
    /// Thermal design power (W), drawn when all cores are busy.
    pub tdp: f64,
    /// Power drawn when all cores are idle (W).
    pub idle_power: f64,
    /// Slowdown multiplier → energy saving fraction.
    pub dvfs: DvfsTable,
}

impl Machine {
    /// Creates a machine with speed 1.0, no power draw and no DVFS.
    pub fn new(id: MachineId, cluster: ClusterId, cores: u32) -> Self {
        Self {
            id,
            name: String::new(),
            cluster,
            cores,
            dvfs_enabled: false,
            normalized_speed: 1.0,
            tdp: 0.0,
            idle_power: 0.0,
            dvfs: DvfsTable::default(),
        }
    }

    /// Sets the machine name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the normalized speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.normalized_speed = speed;
        self
    }

    /// Sets the thermal design power (W).
    pub fn with_tdp(mut self, tdp: f64) -> Self {
        self.tdp = tdp;
        self
    }

    /// Sets the idle power draw (W).
    pub fn with_idle_power(mut self, watts: f64) -> Self {
        self.idle_power = watts;
        self
    }

    /// Enables DVFS with the given table.
    pub fn with_dvfs(mut self, table: DvfsTable) -> Self {
        self.dvfs_enabled = true;
        self.dvfs = table;
        self
    }

    /// TDP per core (W).
    #[inline]
    pub fn tdp_per_core(&self) -> f64 {
        if self.cores == 0 {
            return 0.0;
        }
        self.tdp / self.cores as f64
    }

    /// TDP per core adjusted by speed. Lower is more efficient.
    #[inline]
    pub fn energy_efficiency(&self) -> f64 {
        self.tdp_per_core() * self.normalized_speed
    }
}

/// One row of a DVFS table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DvfsLevel {
    /// Runtime multiplier (≥ 1.0).
    pub slowdown: f64,
    /// Fraction of energy saved at this slowdown (0.0..1.0).
    pub saving: f64,
}

impl DvfsLevel {
    /// Running at nominal frequency.
    pub const NOMINAL: DvfsLevel = DvfsLevel {
        slowdown: 1.0,
        saving: 0.0,
    };
}

/// Floor-keyed table of slowdown multipliers.
///
/// Lookups return the largest slowdown not exceeding the requested one;
/// anything without a matching row resolves to [`DvfsLevel::NOMINAL`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<DvfsLevel>", into = "Vec<DvfsLevel>")]
pub struct DvfsTable {
    levels: BTreeMap<OrderedFloat<f64>, f64>,
}

impl DvfsTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row. Rows with a slowdown below 1.0 or a non-finite value are
    /// ignored; savings are clamped to [0, 1).
    pub fn with_level(mut self, slowdown: f64, saving: f64) -> Self {
        self.insert(slowdown, saving);
        self
    }

    /// Adds a row (see [`DvfsTable::with_level`]).
    pub fn insert(&mut self, slowdown: f64, saving: f64) {
        if !slowdown.is_finite() || slowdown < 1.0 || !saving.is_finite() {
            return;
        }
        self.levels
            .insert(OrderedFloat(slowdown), saving.clamp(0.0, 0.999_999));
    }

    /// Largest level whose slowdown is ≤ `max_slowdown`.
    pub fn floor(&self, max_slowdown: f64) -> DvfsLevel {
        if !max_slowdown.is_finite() || max_slowdown < 1.0 {
            return DvfsLevel::NOMINAL;
        }
        self.levels
            .range(..=OrderedFloat(max_slowdown))
            .next_back()
            .map(|(slowdown, saving)| DvfsLevel {
                slowdown: slowdown.0,
                saving: *saving,
            })
            .unwrap_or(DvfsLevel::NOMINAL)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl From<Vec<DvfsLevel>> for DvfsTable {
    fn from(levels: Vec<DvfsLevel>) -> Self {
        let mut table = DvfsTable::new();
        for level in levels {
            table.insert(level.slowdown, level.saving);
        }
        table
    }
}

impl From<DvfsTable> for Vec<DvfsLevel> {
    fn from(table: DvfsTable) -> Self {
        table
            .levels
            .into_iter()
            .map(|(slowdown, saving)| DvfsLevel {
                slowdown: slowdown.0,
                saving,
            })
            .collect()
    }
}
