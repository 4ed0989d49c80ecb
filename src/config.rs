//! Simulation configuration.
//!
//! Policies form a closed set selected once per run, either in code, from a
//! serialized config, or from their registry names (`"fcfs"`,
//! `"look_ahead"`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Task ordering policy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPolicyKind {
    /// First come, first served.
    #[default]
    #[serde(alias = "fcfs")]
    FirstComeFirstServe,
    /// Shortest original runtime first.
    #[serde(alias = "sjf")]
    ShortestJobFirst,
    /// Earliest estimated workflow completion first.
    #[serde(alias = "ewf")]
    EarliestWorkflowFirst,
}

impl OrderPolicyKind {
    /// Registry name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FirstComeFirstServe => "fcfs",
            Self::ShortestJobFirst => "sjf",
            Self::EarliestWorkflowFirst => "ewf",
        }
    }
}

impl FromStr for OrderPolicyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcfs" | "first_come_first_serve" => Ok(Self::FirstComeFirstServe),
            "sjf" | "shortest_job_first" => Ok(Self::ShortestJobFirst),
            "ewf" | "earliest_workflow_first" => Ok(Self::EarliestWorkflowFirst),
            other => Err(SimError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for OrderPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Task placement policy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicyKind {
    /// Tightest-fitting machine first.
    #[default]
    BestFit,
    /// Slack- and DVFS-aware placement on energy-efficient machines.
    LookAhead,
    /// Fastest machines first, round robin.
    FastestMachine,
}

impl PlacementPolicyKind {
    /// Registry name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BestFit => "best_fit",
            Self::LookAhead => "look_ahead",
            Self::FastestMachine => "fastest_machine",
        }
    }
}

impl FromStr for PlacementPolicyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "best_fit" => Ok(Self::BestFit),
            "look_ahead" => Ok(Self::LookAhead),
            "fastest_machine" => Ok(Self::FastestMachine),
            other => Err(SimError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for PlacementPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ordering of eligible tasks.
    pub order_policy: OrderPolicyKind,
    /// Placement of ordered tasks on machines.
    pub placement_policy: PlacementPolicyKind,
    /// Ticks per simulated second (1000 = millisecond ticks).
    pub ticks_per_second: f64,
    /// Emit `EnvironmentExposed` power samples on cluster changes.
    pub expose_environment: bool,
    /// Run the post-run consistency check.
    pub verify: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            order_policy: OrderPolicyKind::default(),
            placement_policy: PlacementPolicyKind::default(),
            ticks_per_second: 1000.0,
            expose_environment: true,
            verify: true,
        }
    }
}

impl SimulationConfig {
    /// Creates the default configuration (FCFS + best fit, ms ticks).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ordering policy.
    pub fn with_order_policy(mut self, kind: OrderPolicyKind) -> Self {
        self.order_policy = kind;
        self
    }

    /// Sets the placement policy.
    pub fn with_placement_policy(mut self, kind: PlacementPolicyKind) -> Self {
        self.placement_policy = kind;
        self
    }

    /// Sets the tick resolution.
    pub fn with_ticks_per_second(mut self, ticks: f64) -> Self {
        self.ticks_per_second = ticks;
        self
    }

    /// Enables or disables power samples.
    pub fn with_environment_exposure(mut self, enabled: bool) -> Self {
        self.expose_environment = enabled;
        self
    }

    /// Enables or disables the post-run consistency check.
    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }
}
