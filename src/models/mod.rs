//! Trace and environment models.
//!
//! Input data handed to the simulation core by the trace reader and the
//! environment builder. Everything here is immutable once the simulation
//! starts; live state lives in [`crate::engine::state`].
//!
//! # Domain Mappings
//!
//! | wta-replay | Trace archive | Cluster |
//! |------------|---------------|---------|
//! | Task | Task record | Container / process |
//! | Workflow | Workflow record | Job DAG |
//! | Machine | - | Host (or aggregated host type) |
//! | Cluster | - | Datacenter |

mod environment;
mod machine;
mod task;
mod trace;
mod workflow;

pub use environment::{Cluster, Environment};
pub use machine::{DvfsLevel, DvfsTable, Machine};
pub use task::Task;
pub use trace::Trace;
pub use workflow::Workflow;

/// Indivisible simulated time unit.
pub type Tick = i64;

/// Task identifier (unique within a trace).
pub type TaskId = u64;

/// Workflow identifier (unique within a trace).
pub type WorkflowId = u64;

/// Machine identifier (unique within an environment).
pub type MachineId = u32;

/// Cluster identifier (unique within an environment).
pub type ClusterId = u32;
