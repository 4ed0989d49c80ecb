//! Error types for the simulation core.

use thiserror::Error;

use crate::models::{MachineId, TaskId, Tick};
use crate::stats::Violation;
use crate::validation::ValidationError;

/// Simulation result type.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that abort a simulation run.
///
/// Tasks that cannot be placed in a reschedule pass are deferred and never
/// surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Lookup of an unknown task.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// Lookup of an unknown machine.
    #[error("machine {0} not found")]
    MachineNotFound(MachineId),

    /// An event would move the clock backwards.
    #[error("tick regression: clock at {current}, event at {event}")]
    TickRegression { current: Tick, event: Tick },

    /// An assignment asked for more cores than the machine has free.
    #[error("insufficient capacity on machine {machine}: requested {requested} cores, {free} free")]
    InsufficientCapacity {
        machine: MachineId,
        requested: u32,
        free: u32,
    },

    /// A release returned more cores than the machine had assigned.
    #[error("over-release on machine {machine}: released {released} cores, {assigned} assigned")]
    OverRelease {
        machine: MachineId,
        released: u32,
        assigned: u32,
    },

    /// A task would receive more cores than it demands.
    #[error("task {task} over-assigned: demand {demand} cores, would hold {assigned}")]
    OverAssignment {
        task: TaskId,
        demand: u32,
        assigned: u32,
    },

    /// Trace or environment rejected before the run started.
    #[error("invalid input: {} problem(s), first: {}", .0.len(), first_message(.0))]
    InvalidInput(Vec<ValidationError>),

    /// Post-run consistency check failed.
    #[error("inconsistent simulation result: {} violation(s)", .0.len())]
    Inconsistent(Vec<Violation>),

    /// A policy name that is not part of the closed policy set.
    #[error("unknown policy `{0}`")]
    UnknownPolicy(String),
}

fn first_message(errors: &[ValidationError]) -> String {
    errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SimError::InsufficientCapacity {
            machine: 3,
            requested: 8,
            free: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient capacity on machine 3: requested 8 cores, 2 free"
        );

        let err = SimError::TickRegression {
            current: 100,
            event: 50,
        };
        assert!(err.to_string().contains("clock at 100"));
        assert_eq!(SimError::TaskNotFound(7).to_string(), "task 7 not found");

        let err = SimError::OverRelease {
            machine: 1,
            released: 4,
            assigned: 2,
        };
        assert_eq!(
            err.to_string(),
            "over-release on machine 1: released 4 cores, 2 assigned"
        );
    }
}
