//! Machine power model.
//!
//! Combined idle + busy model: every idle core draws `idle_power / cores`,
//! every busy core draws `tdp / cores` scaled by the DVFS power factor of the
//! placement occupying it. Energy is integrated piecewise-constant between
//! load changes.
//!
//! # Units
//! - Power: watts.
//! - Machine energy: joules (integrated over simulated seconds).
//! - Task energy: watt-hours, matching the trace tooling.

use serde::{Deserialize, Serialize};

use crate::models::{Machine, Tick};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Energy (Wh) a placement of `cores` cores consumes on `machine` for
/// `runtime` ticks at nominal frequency.
pub fn task_energy_wh(machine: &Machine, cores: u32, runtime: f64, ticks_per_second: f64) -> f64 {
    if ticks_per_second <= 0.0 {
        return 0.0;
    }
    machine.tdp_per_core() * cores as f64 * (runtime / ticks_per_second / SECONDS_PER_HOUR)
}

/// Live power bookkeeping for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerMeter {
    cores: u32,
    idle_per_core: f64,
    busy_per_core: f64,
    busy_cores: u32,
    /// Σ cores × power factor over active placements.
    busy_load: f64,
    accumulated_joules: f64,
    last_tick: Tick,
}

impl PowerMeter {
    /// Creates an idle meter for `machine`, starting at `start`.
    pub fn for_machine(machine: &Machine, start: Tick) -> Self {
        let idle_per_core = if machine.cores == 0 {
            0.0
        } else {
            machine.idle_power / machine.cores as f64
        };
        Self {
            cores: machine.cores,
            idle_per_core,
            busy_per_core: machine.tdp_per_core(),
            busy_cores: 0,
            busy_load: 0.0,
            accumulated_joules: 0.0,
            last_tick: start,
        }
    }

    /// Instantaneous power draw (W).
    pub fn watts(&self) -> f64 {
        let idle = self.cores.saturating_sub(self.busy_cores) as f64;
        self.idle_per_core * idle + self.busy_per_core * self.busy_load
    }

    /// Integrates the current draw up to `now`.
    pub fn advance(&mut self, now: Tick, ticks_per_second: f64) {
        if now <= self.last_tick {
            return;
        }
        if ticks_per_second > 0.0 {
            let seconds = (now - self.last_tick) as f64 / ticks_per_second;
            self.accumulated_joules += self.watts() * seconds;
        }
        self.last_tick = now;
    }

    /// Marks `cores` cores busy from `now` on, at `power_factor` of nominal
    /// busy power.
    pub fn start_load(&mut self, now: Tick, cores: u32, power_factor: f64, ticks_per_second: f64) {
        self.advance(now, ticks_per_second);
        self.busy_cores = (self.busy_cores + cores).min(self.cores);
        self.busy_load += cores as f64 * power_factor;
    }

    /// Reverts a [`PowerMeter::start_load`].
    pub fn end_load(&mut self, now: Tick, cores: u32, power_factor: f64, ticks_per_second: f64) {
        self.advance(now, ticks_per_second);
        self.busy_cores = self.busy_cores.saturating_sub(cores);
        self.busy_load = if self.busy_cores == 0 {
            0.0
        } else {
            (self.busy_load - cores as f64 * power_factor).max(0.0)
        };
    }

    /// Number of busy cores.
    pub fn busy_cores(&self) -> u32 {
        self.busy_cores
    }

    /// Energy integrated so far (J).
    pub fn accumulated_joules(&self) -> f64 {
        self.accumulated_joules
    }

    /// Energy integrated so far (Wh).
    pub fn accumulated_wh(&self) -> f64 {
        self.accumulated_joules / SECONDS_PER_HOUR
    }
}
