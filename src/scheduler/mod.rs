//! Event-driven scheduling and run KPIs.
//!
//! The [`Scheduler`] reacts to queue growth and capacity changes with a
//! debounced reschedule: one ordering + placement pass per tick burst.
//!
//! # KPI
//!
//! [`RunSummary`] condenses a finished run: makespan, response time,
//! slowdown, and task/machine energy.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Feitelson (2015), "Workload Modeling for Computer Systems Performance Evaluation"

mod dispatch;
pub mod kpi;

pub use dispatch::{Scheduler, SchedulerAllocator, SchedulerContext};
pub use kpi::RunSummary;
