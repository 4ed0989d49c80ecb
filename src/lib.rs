//! Discrete-event replay of workflow traces on heterogeneous clusters.
//!
//! Tasks from a trace are submitted at their recorded ticks, wait for their
//! dependencies, get ordered by a task-order policy and placed on machines by
//! a placement policy. The run records per-task timelines, per-workflow
//! completion and machine power draw.
//!
//! # Modules
//!
//! - **`models`**: Input types: `Task`, `Workflow`, `Trace`, `Machine`,
//!   `DvfsTable`, `Environment`
//! - **`validation`**: Input integrity checks (duplicate IDs, DAG cycles,
//!   capacity)
//! - **`engine`**: Event queue, simulation state, cluster manager, task queue
//!   and the run loop
//! - **`ordering`**: FCFS / SJF / EWF task ordering as score-based rule chains
//! - **`placement`**: Best fit, look-ahead with DVFS, fastest machine
//! - **`scheduler`**: Reschedule orchestration and run KPIs
//! - **`power`**: Idle + busy power model, task energy
//! - **`stats`**: Task, workflow and environment collectors
//!
//! # Example
//!
//! ```
//! use wta_replay::config::{OrderPolicyKind, PlacementPolicyKind, SimulationConfig};
//! use wta_replay::models::{Environment, Machine, Task, Trace};
//! use wta_replay::Simulation;
//!
//! let trace = Trace::new()
//!     .with_task(Task::new(1).with_workflow(1).with_runtime(400).with_cpu_demand(2))
//!     .with_task(Task::new(2).with_workflow(1).with_runtime(100).with_dependency(1));
//!
//! let mut env = Environment::new();
//! let dc = env.create_cluster("dc");
//! env.add_machine(Machine::new(0, dc, 4).with_speed(1.0).with_tdp(120.0));
//! env.add_machine(Machine::new(1, dc, 4).with_speed(2.0).with_tdp(200.0));
//!
//! let config = SimulationConfig::new()
//!     .with_order_policy(OrderPolicyKind::ShortestJobFirst)
//!     .with_placement_policy(PlacementPolicyKind::FastestMachine);
//! let report = Simulation::new(trace, env, config).unwrap().run().unwrap();
//!
//! assert!(report.summary.all_completed());
//! assert_eq!(report.task(1).unwrap().runtime, 200);
//! ```
//!
//! # References
//!
//! - Versluis et al. (2020), "The Workflow Trace Archive: Open-Access Data
//!   from Public and Private Computing Infrastructures"
//! - Ilyushkin et al. (2018), "An Experimental Performance Evaluation of
//!   Autoscaling Policies for Complex Workflows"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod ordering;
pub mod placement;
pub mod power;
pub mod scheduler;
pub mod stats;
pub mod validation;

pub use config::{OrderPolicyKind, PlacementPolicyKind, SimulationConfig};
pub use engine::{Simulation, SimulationReport};
pub use error::{Result, SimError};
pub use models::{Environment, Machine, Task, Trace};
