//! Reschedule orchestration.
//!
//! Queue growth and capacity changes request a reschedule; requests are
//! debounced into a single `RescheduleTriggered` event for the current tick.
//! A reschedule orders the eligible tasks and hands them to the placement
//! policy, whose assignments are committed through [`SchedulerAllocator`].

use tracing::debug;

use crate::config::{OrderPolicyKind, PlacementPolicyKind};
use crate::engine::state::Placement;
use crate::engine::{ClusterManager, Event, EventKind, EventQueue, SimulationState, TaskQueue};
use crate::error::Result;
use crate::models::{Environment, Tick};
use crate::ordering::{OrderingContext, TaskOrderPolicy, WorkflowEstimates};
use crate::placement::{Allocator, Assignment, PlacementContext, PlacementPolicy};

/// Mutable simulation components lent to the scheduler for one event.
pub struct SchedulerContext<'a> {
    /// Task and machine records.
    pub state: &'a mut SimulationState,
    /// Free-capacity bookkeeping.
    pub cluster: &'a mut ClusterManager,
    /// Eligible tasks.
    pub queue: &'a mut TaskQueue,
    /// Pending events.
    pub events: &'a mut EventQueue,
    /// Machine catalogue.
    pub environment: &'a Environment,
    /// Workflow completion estimates for ordering.
    pub workflows: &'a dyn WorkflowEstimates,
    /// Ticks per simulated second.
    pub ticks_per_second: f64,
}

/// Drives ordering and placement.
#[derive(Debug, Clone)]
pub struct Scheduler {
    ordering: TaskOrderPolicy,
    placement: PlacementPolicy,
    reschedule_pending: bool,
    passes: u64,
}

impl Scheduler {
    /// Creates a scheduler for the given policy pair.
    pub fn new(order: OrderPolicyKind, placement: PlacementPolicyKind) -> Self {
        Self {
            ordering: TaskOrderPolicy::from_kind(order),
            placement: PlacementPolicy::from_kind(placement),
            reschedule_pending: false,
            passes: 0,
        }
    }

    /// Ordering policy.
    pub fn ordering(&self) -> &TaskOrderPolicy {
        &self.ordering
    }

    /// Placement policy.
    pub fn placement(&self) -> &PlacementPolicy {
        &self.placement
    }

    /// Number of placement passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Whether a reschedule event is queued.
    pub fn is_reschedule_pending(&self) -> bool {
        self.reschedule_pending
    }

    /// Handles the event kinds the scheduler listens to; ignores the rest.
    pub fn handle(&mut self, event: &Event, ctx: &mut SchedulerContext<'_>) -> Result<()> {
        match event.kind {
            EventKind::TaskQueueExtended | EventKind::ClusterStateChanged => {
                self.request_reschedule(event.tick, ctx.events);
            }
            EventKind::RescheduleTriggered => {
                self.reschedule(ctx)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Queues a reschedule for `now` unless one is already pending.
    pub fn request_reschedule(&mut self, now: Tick, events: &mut EventQueue) {
        if !self.reschedule_pending {
            events.submit(now, EventKind::RescheduleTriggered);
            self.reschedule_pending = true;
        }
    }

    /// Runs one placement pass. Returns the number of tasks fully placed.
    pub fn reschedule(&mut self, ctx: &mut SchedulerContext<'_>) -> Result<usize> {
        self.reschedule_pending = false;
        self.passes += 1;

        let now = ctx.state.now();
        let mut tasks = ctx.queue.eligible(ctx.state)?;
        if tasks.is_empty() {
            return Ok(0);
        }
        let ordering = OrderingContext::at_tick(now).with_workflows(ctx.workflows);
        self.ordering.order(&mut tasks, &ordering);

        let placement = PlacementContext::new(ctx.environment, now, ctx.ticks_per_second);
        let mut allocator = SchedulerAllocator {
            state: &mut *ctx.state,
            cluster: &mut *ctx.cluster,
            queue: &mut *ctx.queue,
            events: &mut *ctx.events,
            ticks_per_second: ctx.ticks_per_second,
        };
        let placed = self.placement.place(&tasks, &mut allocator, &placement)?;

        debug!(
            tick = now,
            eligible = tasks.len(),
            placed,
            free = ctx.cluster.free_cores(),
            "reschedule pass"
        );
        Ok(placed)
    }
}

/// Commits placement decisions to the simulation.
///
/// Each assignment takes the cores from the cluster manager, records the
/// slice on the task, loads the machine's power meter, emits `TaskStarted`
/// now and `TaskAttemptCompleted` at `now + runtime`, and drops the task from
/// the queue once its demand is covered.
pub struct SchedulerAllocator<'a> {
    /// Task and machine records.
    pub state: &'a mut SimulationState,
    /// Free-capacity bookkeeping.
    pub cluster: &'a mut ClusterManager,
    /// Eligible tasks.
    pub queue: &'a mut TaskQueue,
    /// Pending events.
    pub events: &'a mut EventQueue,
    /// Ticks per simulated second.
    pub ticks_per_second: f64,
}

impl Allocator for SchedulerAllocator<'_> {
    fn cluster(&self) -> &ClusterManager {
        &*self.cluster
    }

    fn assign(&mut self, assignment: Assignment) -> Result<()> {
        let now = self.state.now();
        let Assignment {
            task,
            machine,
            cores,
            ..
        } = assignment;

        self.cluster.assign(task, machine, cores, now, self.events)?;

        let ts = self.state.task_mut(task)?;
        ts.record_placement(
            Placement {
                machine,
                cores,
                power_factor: assignment.power_factor,
                started: now,
            },
            assignment.runtime,
            assignment.energy_wh,
        )?;
        let (runtime, attempt, fully) = (ts.runtime, ts.attempt, ts.is_fully_scheduled());

        self.state.machine_mut(machine)?.meter.start_load(
            now,
            cores,
            assignment.power_factor,
            self.ticks_per_second,
        );

        if fully {
            self.queue.remove_scheduled(task);
        }
        self.events.submit(now, EventKind::TaskStarted { task, machine, cores });
        self.events.submit(
            now + runtime.max(0),
            EventKind::TaskAttemptCompleted {
                task,
                attempt,
                machine,
                cores,
            },
        );
        Ok(())
    }
}
