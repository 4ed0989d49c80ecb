//! Input validation for traces and environments.
//!
//! Checks structural integrity before the simulation starts. Detects:
//! - Duplicate IDs (tasks, workflows, machines)
//! - Unknown dependency and workflow references
//! - Circular dependencies (DAG validation)
//! - Degenerate machines (no cores, bad speed, negative power)
//! - Tasks demanding more cores than the whole environment supplies
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Environment, TaskId, Trace};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A task depends on a task that is not in the trace.
    UnknownDependency,
    /// A task names a workflow that does not exist, or a workflow lists a
    /// task that does not name it.
    WorkflowMismatch,
    /// Dependency graph contains a cycle.
    CyclicDependency,
    /// A task field is out of range (negative runtime or slack, zero cores,
    /// earliest start before submission).
    InvalidTask,
    /// A machine field is out of range.
    InvalidMachine,
    /// A task needs more cores than the environment has in total.
    DemandExceedsCapacity,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Validates a trace against the environment it will run on.
///
/// Checks:
/// 1. No duplicate task, workflow or machine IDs
/// 2. Every dependency points to a task in the trace
/// 3. Workflow membership is consistent in both directions
/// 4. No circular dependencies
/// 5. Task fields are in range
/// 6. Machines have cores, a finite positive speed and non-negative power
/// 7. No task demands more cores than the environment supplies
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(trace: &Trace, environment: &Environment) -> ValidationResult {
    let mut errors = Vec::new();

    // Machines
    let mut machine_ids = HashSet::new();
    for m in &environment.machines {
        if !machine_ids.insert(m.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate machine ID: {}", m.id),
            ));
        }
        if m.cores == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidMachine,
                format!("Machine {} has no cores", m.id),
            ));
        }
        if !m.normalized_speed.is_finite() || m.normalized_speed <= 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidMachine,
                format!("Machine {} has invalid speed {}", m.id, m.normalized_speed),
            ));
        }
        if !(m.tdp >= 0.0 && m.idle_power >= 0.0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidMachine,
                format!("Machine {} has negative power draw", m.id),
            ));
        }
    }

    // Tasks
    let mut task_ids: HashMap<TaskId, Option<u64>> = HashMap::new();
    for task in &trace.tasks {
        if task_ids.insert(task.id, task.workflow).is_some() {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }
        if task.runtime < 0 || task.slack < 0 || task.cpu_demand == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTask,
                format!(
                    "Task {} has runtime {}, slack {}, demand {}",
                    task.id, task.runtime, task.slack, task.cpu_demand
                ),
            ));
        }
    }

    // Capacity
    let total_cores = environment.total_cores();
    for task in &trace.tasks {
        if task.cpu_demand as u64 > total_cores {
            errors.push(ValidationError::new(
                ValidationErrorKind::DemandExceedsCapacity,
                format!(
                    "Task {} requires {} cores but the environment has {}",
                    task.id, task.cpu_demand, total_cores
                ),
            ));
        }
    }

    // Dependency references
    for task in &trace.tasks {
        for dep in &task.dependencies {
            if !task_ids.contains_key(dep) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownDependency,
                    format!("Task {} depends on unknown task {}", task.id, dep),
                ));
            }
        }
    }

    // Workflows
    let mut workflow_ids = HashSet::new();
    for wf in &trace.workflows {
        if !workflow_ids.insert(wf.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate workflow ID: {}", wf.id),
            ));
        }
        for member in &wf.tasks {
            if task_ids.get(member) != Some(&Some(wf.id)) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::WorkflowMismatch,
                    format!("Workflow {} lists task {} which does not belong to it", wf.id, member),
                ));
            }
        }
    }
    for task in &trace.tasks {
        if let Some(wf) = task.workflow {
            if !workflow_ids.contains(&wf) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::WorkflowMismatch,
                    format!("Task {} references unknown workflow {}", task.id, wf),
                ));
            }
        }
    }

    if let Some(cycle_err) = detect_cycles(trace) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the dependency graph using DFS.
///
/// # Algorithm
/// Iterative three-colour DFS over dependency → dependent edges with an
/// explicit `(node, next edge)` stack, so chain depth never reaches the call
/// stack. An edge into a node still on the stack closes a cycle. Roots are
/// taken in trace order so the reported task is deterministic.
fn detect_cycles(trace: &Trace) -> Option<ValidationError> {
    // dependency → dependents
    let mut adj: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for task in &trace.tasks {
        for &dep in &task.dependencies {
            adj.entry(dep).or_default().push(task.id);
        }
    }

    let mut colour: HashMap<TaskId, Colour> = HashMap::with_capacity(trace.tasks.len());
    let mut stack: Vec<(TaskId, usize)> = Vec::new();

    for task in &trace.tasks {
        if colour.contains_key(&task.id) {
            continue;
        }
        colour.insert(task.id, Colour::OnStack);
        stack.push((task.id, 0));

        while let Some(top) = stack.last_mut() {
            let (node, edge) = *top;
            match adj.get(&node).and_then(|next| next.get(edge)) {
                Some(&next) => {
                    top.1 += 1;
                    match colour.get(&next) {
                        Some(Colour::OnStack) => {
                            return Some(ValidationError::new(
                                ValidationErrorKind::CyclicDependency,
                                format!("Circular dependency detected involving task {next}"),
                            ));
                        }
                        Some(Colour::Done) => {}
                        None => {
                            colour.insert(next, Colour::OnStack);
                            stack.push((next, 0));
                        }
                    }
                }
                None => {
                    colour.insert(node, Colour::Done);
                    stack.pop();
                }
            }
        }
    }

    None
}

#[derive(Clone, Copy)]
enum Colour {
    OnStack,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Machine, Task};

    fn sample_environment() -> Environment {
        let mut env = Environment::new();
        let c = env.create_cluster("dc");
        env.add_machine(Machine::new(0, c, 4).with_tdp(200.0));
        env.add_machine(Machine::new(1, c, 4).with_speed(0.5).with_tdp(100.0));
        env
    }

    fn sample_trace() -> Trace {
        Trace::new()
            .with_task(Task::new(1).with_workflow(1).with_runtime(1000).with_cpu_demand(2))
            .with_task(
                Task::new(2)
                    .with_workflow(1)
                    .with_runtime(500)
                    .with_dependency(1),
            )
            .with_task(Task::new(3).with_runtime(10).with_cpu_demand(8))
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&sample_trace(), &sample_environment()).is_ok());
    }

    #[test]
    fn test_duplicate_task_id() {
        let trace = Trace::new().with_task(Task::new(1)).with_task(Task::new(1));
        let errors = validate_input(&trace, &sample_environment()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("task")));
    }

    #[test]
    fn test_duplicate_machine_id() {
        let mut env = Environment::new();
        env.add_machine(Machine::new(0, 0, 4));
        env.add_machine(Machine::new(0, 0, 4));
        let errors = validate_input(&Trace::new(), &env).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("machine")));
    }

    #[test]
    fn test_demand_exceeds_capacity() {
        // 9 cores against 8 in total is flagged before any simulation starts
        let trace = Trace::new().with_task(Task::new(1).with_cpu_demand(9));
        let errors = validate_input(&trace, &sample_environment()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::DemandExceedsCapacity);
    }

    #[test]
    fn test_unknown_dependency() {
        let trace = Trace::new().with_task(Task::new(1).with_dependency(99));
        let errors = validate_input(&trace, &sample_environment()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownDependency));
    }

    #[test]
    fn test_cyclic_dependency() {
        // 1 → 2 → 3 → 1
        let trace = Trace::new()
            .with_task(Task::new(1).with_dependency(3))
            .with_task(Task::new(2).with_dependency(1))
            .with_task(Task::new(3).with_dependency(2));
        let errors = validate_input(&trace, &sample_environment()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::CyclicDependency));
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let trace = Trace::new()
            .with_task(Task::new(1))
            .with_task(Task::new(2).with_dependency(1))
            .with_task(Task::new(3).with_dependency(2).with_dependency(1));
        assert!(validate_input(&trace, &sample_environment()).is_ok());
    }

    #[test]
    fn test_workflow_mismatch() {
        let mut trace = sample_trace();
        trace.workflows[0].tasks.push(3);
        trace.tasks[0].workflow = Some(77);
        let errors = validate_input(&trace, &sample_environment()).unwrap_err();
        let mismatches = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::WorkflowMismatch)
            .count();
        // task 3 listed under workflow 1, task 1 listed but moved, workflow 77 unknown
        assert_eq!(mismatches, 3);
    }

    #[test]
    fn test_invalid_machine() {
        let mut env = Environment::new();
        env.add_machine(Machine::new(0, 0, 0));
        env.add_machine(Machine::new(1, 0, 4).with_speed(0.0));
        env.add_machine(Machine::new(2, 0, 4).with_tdp(-1.0));
        let errors = validate_input(&Trace::new(), &env).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::InvalidMachine)
                .count(),
            3
        );
    }

    #[test]
    fn test_invalid_task_fields() {
        let trace = Trace::new()
            .with_task(Task::new(1).with_runtime(-5))
            .with_task(Task::new(2).with_cpu_demand(0))
            .with_task(Task::new(3).with_slack(-1));
        let errors = validate_input(&trace, &sample_environment()).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::InvalidTask)
                .count(),
            3
        );
    }

    #[test]
    fn test_earliest_start_before_submission_is_accepted() {
        // slack windows come from a separate source and may open early
        let trace = Trace::new().with_task(
            Task::new(1)
                .with_submission(100)
                .with_earliest_start(50)
                .with_slack(20),
        );
        assert!(validate_input(&trace, &sample_environment()).is_ok());
    }

    #[test]
    fn test_long_chain_does_not_exhaust_stack() {
        let mut trace = Trace::new();
        trace.add_task(Task::new(0));
        for id in 1..150_000u64 {
            trace.add_task(Task::new(id).with_dependency(id - 1));
        }
        assert!(validate_input(&trace, &sample_environment()).is_ok());

        // closing the chain into a ring is still found
        trace.tasks[0].dependencies.push(149_999);
        let errors = validate_input(&trace, &sample_environment()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::CyclicDependency);
    }

    #[test]
    fn test_multiple_errors() {
        let trace = Trace::new()
            .with_task(Task::new(1).with_cpu_demand(100))
            .with_task(Task::new(2).with_dependency(42));
        let errors = validate_input(&trace, &sample_environment()).unwrap_err();
        assert!(errors.len() >= 2);
        assert!(errors[0].to_string().contains("DemandExceedsCapacity"));
    }
}
