//! Discrete-event simulation core.
//!
//! A [`Simulation`] owns every component and drives them from a single
//! time-ordered [`EventQueue`]. Each popped event first advances the clock,
//! then runs the core handlers in a fixed order (task lifecycle, scheduler,
//! environment exposure, statistics), and finally reaches the external
//! observers registered for its kind.
//!
//! # Event flow
//!
//! ```text
//! TaskSubmitted ─▶ TaskQueueExtended ─┐
//!                                     ├─▶ RescheduleTriggered ─▶ TaskStarted
//! ClusterStateChanged ────────────────┘                        └▶ TaskAttemptCompleted
//! TaskAttemptCompleted ─▶ ClusterStateChanged, TaskCompleted ─▶ TaskQueueExtended
//! ```
//!
//! The run is single-threaded and deterministic: events of one tick fire in
//! insertion order, and every component iterates in id order.

pub mod cluster_manager;
pub mod event;
mod observer;
mod report;
mod simulation;
pub mod state;
pub mod task_queue;

pub use cluster_manager::{ClusterManager, MachineSnapshot};
pub use event::{Event, EventKind, EventQueue, EventType, MachinePower};
pub use observer::{ObserverFn, ObserverRegistry};
pub use report::SimulationReport;
pub use simulation::Simulation;
pub use state::{MachineState, Placement, SimulationState, TaskState, TaskStatus};
pub use task_queue::{PendingTask, TaskQueue};
