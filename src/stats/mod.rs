//! Run statistics and consistency checking.
//!
//! Collectors consume dispatched events like any other observer. After the
//! run, [`verify_timelines`] checks the recorded task timelines:
//!
//! | Check | Violation |
//! |-------|-----------|
//! | Every task started and completed | [`ViolationType::NeverCompleted`] |
//! | Start ≥ submission | [`ViolationType::StartBeforeSubmission`] |
//! | Completion − start = runtime | [`ViolationType::RuntimeMismatch`] |
//! | Dependencies end before start | [`ViolationType::DependencyOrder`] |

mod collectors;
mod timeline;

pub use collectors::{
    EnvironmentStatsCollector, MachineEnergy, PowerSample, TaskStatsCollector, WorkflowStats,
    WorkflowStatsCollector,
};
pub use timeline::{verify_timelines, TaskTimeline, Violation, ViolationType};
