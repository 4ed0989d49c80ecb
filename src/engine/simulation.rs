//! The simulation loop.

use tracing::{debug, info, trace, warn};

use super::cluster_manager::ClusterManager;
use super::event::{Event, EventKind, EventQueue, EventType, MachinePower};
use super::observer::ObserverRegistry;
use super::report::SimulationReport;
use super::state::{SimulationState, TaskStatus};
use super::task_queue::TaskQueue;
use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::models::{Environment, MachineId, TaskId, Tick, Trace};
use crate::scheduler::{RunSummary, Scheduler, SchedulerContext};
use crate::stats::{
    verify_timelines, EnvironmentStatsCollector, TaskStatsCollector, WorkflowStatsCollector,
};
use crate::validation::validate_input;

/// One replay of a trace on an environment.
///
/// # Example
///
/// ```
/// use wta_replay::config::SimulationConfig;
/// use wta_replay::engine::Simulation;
/// use wta_replay::models::{Environment, Machine, Task, Trace};
///
/// let trace = Trace::new()
///     .with_task(Task::new(1).with_runtime(500))
///     .with_task(Task::new(2).with_runtime(200).with_dependency(1));
/// let mut env = Environment::new();
/// env.add_machine(Machine::new(0, 0, 4).with_tdp(100.0));
///
/// let report = Simulation::new(trace, env, SimulationConfig::default())
///     .unwrap()
///     .run()
///     .unwrap();
/// assert_eq!(report.task(2).unwrap().start, Some(500));
/// assert_eq!(report.summary.makespan, 700);
/// ```
pub struct Simulation {
    trace: Trace,
    environment: Environment,
    config: SimulationConfig,
    state: SimulationState,
    events: EventQueue,
    cluster: ClusterManager,
    queue: TaskQueue,
    scheduler: Scheduler,
    task_stats: TaskStatsCollector,
    workflow_stats: WorkflowStatsCollector,
    environment_stats: EnvironmentStatsCollector,
    observers: ObserverRegistry,
    exposure_pending: bool,
    events_processed: u64,
}

impl Simulation {
    /// Validates the input and builds the initial state.
    ///
    /// # Errors
    /// [`SimError::InvalidInput`] with every problem found in the trace or
    /// environment, including tasks that demand more cores than the whole
    /// environment has.
    pub fn new(
        trace: Trace,
        mut environment: Environment,
        config: SimulationConfig,
    ) -> Result<Self> {
        validate_input(&trace, &environment).map_err(SimError::InvalidInput)?;
        environment.reindex();

        let start = trace.start_tick();
        let state = SimulationState::new(&trace, &environment, start);
        let cluster = ClusterManager::new(&environment);
        let queue = TaskQueue::new(&trace);
        let scheduler = Scheduler::new(config.order_policy, config.placement_policy);
        let task_stats = TaskStatsCollector::new(&trace);
        let workflow_stats = WorkflowStatsCollector::new(&trace);

        Ok(Self {
            trace,
            environment,
            config,
            state,
            events: EventQueue::new(),
            cluster,
            queue,
            scheduler,
            task_stats,
            workflow_stats,
            environment_stats: EnvironmentStatsCollector::new(),
            observers: ObserverRegistry::new(),
            exposure_pending: false,
            events_processed: 0,
        })
    }

    /// Registers an external observer for one event kind.
    ///
    /// Observers run after the core handlers, in registration order.
    pub fn subscribe<F>(&mut self, event_type: EventType, observer: F)
    where
        F: FnMut(&Event) + 'static,
    {
        self.observers.subscribe(event_type, Box::new(observer));
    }

    /// Configuration of this run.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Runs until the event queue is empty.
    ///
    /// # Errors
    /// - [`SimError::TickRegression`] if an event lies before the clock
    /// - [`SimError::InsufficientCapacity`] / [`SimError::OverAssignment`]
    ///   if a policy over-commits
    /// - [`SimError::OverRelease`] if a completion returns cores the machine
    ///   never lent out
    /// - [`SimError::Inconsistent`] if verification is enabled and the
    ///   finished timelines break a run invariant
    pub fn run(mut self) -> Result<SimulationReport> {
        let start_tick = self.state.now();
        info!(
            tasks = self.trace.task_count(),
            machines = self.environment.machine_count(),
            order = %self.config.order_policy,
            placement = %self.config.placement_policy,
            "simulation started"
        );

        for task in &self.trace.tasks {
            self.events
                .submit(task.submission_tick, EventKind::TaskSubmitted { task: task.id });
        }

        while let Some(mut event) = self.events.pop_next() {
            self.state.advance_to(event.tick)?;
            self.dispatch(&mut event)?;
            self.events_processed += 1;
        }

        self.finish(start_tick)
    }

    fn dispatch(&mut self, event: &mut Event) -> Result<()> {
        let now = event.tick;
        trace!(tick = now, kind = ?event.event_type(), "dispatch");

        match &mut event.kind {
            EventKind::TaskSubmitted { task } => self.on_task_submitted(*task, now)?,
            EventKind::TaskAttemptCompleted {
                task,
                attempt,
                machine,
                cores,
            } => self.on_attempt_completed(*task, *attempt, *machine, *cores, now)?,
            EventKind::TaskCompleted { task } => self.on_task_completed(*task, now),
            EventKind::EnvironmentExposed { power } => {
                self.exposure_pending = false;
                *power = self.power_snapshot();
            }
            _ => {}
        }

        let mut ctx = SchedulerContext {
            state: &mut self.state,
            cluster: &mut self.cluster,
            queue: &mut self.queue,
            events: &mut self.events,
            environment: &self.environment,
            workflows: &self.workflow_stats,
            ticks_per_second: self.config.ticks_per_second,
        };
        self.scheduler.handle(event, &mut ctx)?;

        if self.config.expose_environment
            && !self.exposure_pending
            && event.event_type() == EventType::ClusterStateChanged
        {
            self.events
                .submit(now, EventKind::EnvironmentExposed { power: Vec::new() });
            self.exposure_pending = true;
        }

        self.task_stats.observe(event);
        self.workflow_stats.observe(event);
        self.environment_stats.observe(event);
        self.observers.publish(event);
        Ok(())
    }

    fn on_task_submitted(&mut self, task: TaskId, now: Tick) -> Result<()> {
        self.state.task_mut(task)?.status = TaskStatus::Queued;
        if self.queue.submit(task) {
            self.events.submit(now, EventKind::TaskQueueExtended);
        }
        Ok(())
    }

    fn on_attempt_completed(
        &mut self,
        task: TaskId,
        attempt: u32,
        machine: MachineId,
        cores: u32,
        now: Tick,
    ) -> Result<()> {
        let ts = self.state.task_mut(task)?;
        if attempt != ts.attempt {
            warn!(task, attempt, current = ts.attempt, "ignoring stale attempt completion");
            return Ok(());
        }
        let Some(placement) = ts.finish_placement(machine, cores) else {
            warn!(task, machine, cores, "ignoring completion of unknown placement");
            return Ok(());
        };
        let finished = ts.is_finished();
        if finished {
            ts.status = TaskStatus::Completed;
            ts.completion_tick = Some(now);
        }

        self.state.machine_mut(machine)?.meter.end_load(
            now,
            cores,
            placement.power_factor,
            self.config.ticks_per_second,
        );
        self.cluster.release(machine, cores, now, &mut self.events)?;
        if finished {
            self.events.submit(now, EventKind::TaskCompleted { task });
        }
        Ok(())
    }

    fn on_task_completed(&mut self, task: TaskId, now: Tick) {
        let released = self.queue.dependency_completed(task);
        if !released.is_empty() {
            debug!(task, released = released.len(), "dependents eligible");
            self.events.submit(now, EventKind::TaskQueueExtended);
        }
    }

    fn power_snapshot(&self) -> Vec<MachinePower> {
        self.state
            .machines()
            .map(|m| MachinePower {
                machine: m.id,
                watts: m.meter.watts(),
            })
            .collect()
    }

    fn finish(mut self, start_tick: Tick) -> Result<SimulationReport> {
        let end_tick = self.state.now();
        for machine in self.state.machines_mut() {
            machine.meter.advance(end_tick, self.config.ticks_per_second);
        }
        self.task_stats.finish(&self.state);
        self.environment_stats.finish(&self.state);

        if self.config.verify {
            let violations = verify_timelines(&self.trace, self.task_stats.timelines());
            if !violations.is_empty() {
                warn!(count = violations.len(), first = %violations[0], "consistency check failed");
                return Err(SimError::Inconsistent(violations));
            }
        }

        let summary = RunSummary::calculate(
            self.task_stats.timelines(),
            self.environment_stats.total_energy_wh(),
        );
        info!(
            end_tick,
            events = self.events_processed,
            completed = summary.completed_count,
            makespan = summary.makespan,
            task_energy_wh = summary.task_energy_wh,
            machine_energy_wh = summary.machine_energy_wh,
            "simulation finished"
        );

        let workflows = self.workflow_stats.workflows().cloned().collect();
        let (power_samples, machine_energy) = self.environment_stats.into_parts();
        Ok(SimulationReport {
            order_policy: self.config.order_policy,
            placement_policy: self.config.placement_policy,
            start_tick,
            end_tick,
            events_processed: self.events_processed,
            reschedule_passes: self.scheduler.passes(),
            tasks: self.task_stats.into_timelines(),
            workflows,
            power_samples,
            machine_energy,
            summary,
        })
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("now", &self.state.now())
            .field("config", &self.config)
            .field("pending_events", &self.events.len())
            .field("observers", &self.observers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::config::{OrderPolicyKind, PlacementPolicyKind};
    use crate::models::{DvfsTable, Machine, Task};
    use crate::validation::ValidationErrorKind;

    fn run(trace: Trace, env: Environment, config: SimulationConfig) -> SimulationReport {
        Simulation::new(trace, env, config).unwrap().run().unwrap()
    }

    fn single_machine(cores: u32) -> Environment {
        let mut env = Environment::new();
        let c = env.create_cluster("dc");
        env.add_machine(Machine::new(0, c, cores).with_tdp(100.0));
        env
    }

    fn all_policy_pairs() -> Vec<(OrderPolicyKind, PlacementPolicyKind)> {
        let orders = [
            OrderPolicyKind::FirstComeFirstServe,
            OrderPolicyKind::ShortestJobFirst,
            OrderPolicyKind::EarliestWorkflowFirst,
        ];
        let placements = [
            PlacementPolicyKind::BestFit,
            PlacementPolicyKind::LookAhead,
            PlacementPolicyKind::FastestMachine,
        ];
        orders
            .iter()
            .flat_map(|&o| placements.iter().map(move |&p| (o, p)))
            .collect()
    }

    #[test]
    fn test_fastest_machine_single_task() {
        let mut env = Environment::new();
        env.add_machine(Machine::new(0, 0, 4).with_speed(1.0).with_tdp(200.0));
        let trace = Trace::new().with_task(Task::new(1).with_cpu_demand(4).with_runtime(1000));
        let config =
            SimulationConfig::new().with_placement_policy(PlacementPolicyKind::FastestMachine);

        let report = run(trace, env, config);
        let t = report.task(1).unwrap();
        assert_eq!(t.start, Some(0));
        assert_eq!(t.completion, Some(1000));
        let expected = 200.0 / 4.0 * 4.0 * (1000.0 / 1000.0 / 3600.0);
        assert!((t.energy_wh - expected).abs() < 1e-12);
        // 200 W for one second, no idle draw
        assert!((report.summary.machine_energy_wh - 200.0 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn test_dependencies_complete_before_dependents_start() {
        let trace = Trace::new()
            .with_task(Task::new(1).with_runtime(100))
            .with_task(Task::new(2).with_runtime(300))
            .with_task(Task::new(3).with_runtime(50).with_dependency(1).with_dependency(2))
            .with_task(Task::new(4).with_runtime(10).with_dependency(3).with_submission(20));

        let report = run(trace, single_machine(8), SimulationConfig::default());
        assert_eq!(report.task(3).unwrap().start, Some(300));
        assert_eq!(report.task(4).unwrap().start, Some(350));
        assert_eq!(report.summary.makespan, 360);
        assert!(report.summary.all_completed());
    }

    #[test]
    fn test_capacity_queues_tasks() {
        let trace = Trace::new()
            .with_task(Task::new(1).with_cpu_demand(2).with_runtime(100))
            .with_task(Task::new(2).with_cpu_demand(2).with_runtime(100))
            .with_task(Task::new(3).with_cpu_demand(2).with_runtime(100).with_submission(10));

        let report = run(trace, single_machine(2), SimulationConfig::default());
        let starts: Vec<_> = (1..=3).map(|id| report.task(id).unwrap().start).collect();
        assert_eq!(starts, vec![Some(0), Some(100), Some(200)]);
        assert!((report.summary.avg_wait_time - (0.0 + 100.0 + 190.0) / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_shortest_job_first_order() {
        let trace = Trace::new()
            .with_task(Task::new(1).with_runtime(50))
            .with_task(Task::new(2).with_runtime(500).with_submission(1))
            .with_task(Task::new(3).with_runtime(100).with_submission(1))
            .with_task(Task::new(4).with_runtime(10).with_submission(2));
        let config = SimulationConfig::new().with_order_policy(OrderPolicyKind::ShortestJobFirst);

        let report = run(trace, single_machine(1), config);
        let start = |id| report.task(id).unwrap().start.unwrap();
        // 1 runs 0..50; then 4 (10), 3 (100), 2 (500)
        assert_eq!(start(4), 50);
        assert_eq!(start(3), 60);
        assert_eq!(start(2), 160);
    }

    #[test]
    fn test_earliest_workflow_first_order() {
        // wf 1 is long, wf 2 short; both wait behind task 9
        let trace = Trace::new()
            .with_task(Task::new(9).with_runtime(100))
            .with_task(Task::new(1).with_workflow(1).with_runtime(1000).with_submission(1))
            .with_task(Task::new(2).with_workflow(2).with_runtime(10).with_submission(2));
        let config =
            SimulationConfig::new().with_order_policy(OrderPolicyKind::EarliestWorkflowFirst);

        let report = run(trace, single_machine(1), config);
        assert_eq!(report.task(2).unwrap().start, Some(100));
        assert_eq!(report.task(1).unwrap().start, Some(110));
        let wf2 = report.workflows.iter().find(|w| w.workflow == 2).unwrap();
        assert_eq!(wf2.completion, Some(110));
    }

    #[test]
    fn test_zero_runtime_tasks() {
        let trace = Trace::new()
            .with_task(Task::new(1).with_runtime(0).with_submission(5))
            .with_task(Task::new(2).with_runtime(0).with_dependency(1));

        let report = run(trace, single_machine(1), SimulationConfig::default());
        for id in [1, 2] {
            let t = report.task(id).unwrap();
            assert_eq!(t.start, Some(5));
            assert_eq!(t.completion, Some(5));
            assert_eq!(t.runtime, 0);
        }
    }

    #[test]
    fn test_round_robin_defers_when_saturated() {
        let mut env = Environment::new();
        env.add_machine(Machine::new(0, 0, 2).with_speed(1.0).with_tdp(100.0));
        env.add_machine(Machine::new(1, 0, 2).with_speed(0.5).with_tdp(50.0));
        let mut trace = Trace::new();
        for id in 1..=5 {
            trace.add_task(Task::new(id).with_runtime(100));
        }
        let config =
            SimulationConfig::new().with_placement_policy(PlacementPolicyKind::FastestMachine);

        let report = run(trace, env, config);
        let machines: Vec<_> = (1..=4).map(|id| report.task(id).unwrap().machines[0]).collect();
        assert_eq!(machines, vec![0, 0, 1, 1]);
        // task 5 waits for the fast machine to free up
        let t5 = report.task(5).unwrap();
        assert_eq!(t5.start, Some(100));
        assert_eq!(t5.machines, vec![0]);
        assert!(report.summary.all_completed());
    }

    #[test]
    fn test_look_ahead_dvfs_saves_energy() {
        let speed = 1000.0 / 700.0;
        let table = DvfsTable::new().with_level(1.5, 0.2).with_level(2.0, 0.35);
        let build = |dvfs: bool| {
            let mut machine = Machine::new(0, 0, 4).with_speed(speed).with_tdp(200.0);
            if dvfs {
                machine = machine.with_dvfs(table.clone());
            }
            let mut env = Environment::new();
            env.add_machine(machine);
            env
        };
        let trace = || {
            Trace::new().with_task(Task::new(1).with_cpu_demand(4).with_runtime(1000).with_slack(500))
        };
        let config = SimulationConfig::new().with_placement_policy(PlacementPolicyKind::LookAhead);

        let plain = run(trace(), build(false), config.clone());
        let scaled = run(trace(), build(true), config);
        let (p, s) = (plain.task(1).unwrap(), scaled.task(1).unwrap());

        assert!(p.runtime <= 701);
        assert!(s.runtime > p.runtime);
        assert!(s.runtime <= 1500);
        assert_eq!(s.completion, Some(s.runtime));
        assert!(s.energy_wh < p.energy_wh);
    }

    #[test]
    fn test_slack_erodes_from_earliest_start_before_submission() {
        // m0 slow and efficient, m1 fast and hungry
        let mut env = Environment::new();
        env.add_machine(Machine::new(0, 0, 4).with_speed(0.5).with_tdp(40.0));
        env.add_machine(Machine::new(1, 0, 4).with_speed(1.0).with_tdp(200.0));
        let config = SimulationConfig::new().with_placement_policy(PlacementPolicyKind::LookAhead);
        let task = |earliest| {
            Task::new(1)
                .with_submission(100)
                .with_earliest_start(earliest)
                .with_cpu_demand(2)
                .with_runtime(100)
                .with_slack(150)
        };

        // window opened at 50: 100 of 150 slack left, the slow machine fits
        let early = run(Trace::new().with_task(task(50)), env.clone(), config.clone());
        let t = early.task(1).unwrap();
        assert_eq!((t.start, t.machines.clone(), t.runtime), (Some(100), vec![0], 200));

        // window opened at -100: slack used up, only the fast machine meets it
        let late = run(Trace::new().with_task(task(-100)), env, config);
        let t = late.task(1).unwrap();
        assert_eq!((t.start, t.machines.clone(), t.runtime), (Some(100), vec![1], 100));
    }

    #[test]
    fn test_long_dependency_chain_is_accepted() {
        let mut trace = Trace::new();
        trace.add_task(Task::new(0));
        for id in 1..100_000u64 {
            trace.add_task(Task::new(id).with_dependency(id - 1));
        }
        let sim = Simulation::new(trace, single_machine(4), SimulationConfig::default()).unwrap();
        assert_eq!(sim.state().task_count(), 100_000);
    }

    #[test]
    fn test_rejects_oversized_task_up_front() {
        let trace = Trace::new().with_task(Task::new(1).with_cpu_demand(9));
        let err = Simulation::new(trace, single_machine(8), SimulationConfig::default())
            .unwrap_err();
        match err {
            SimError::InvalidInput(errors) => {
                assert!(errors
                    .iter()
                    .any(|e| e.kind == ValidationErrorKind::DemandExceedsCapacity));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_observers_see_events_in_order() {
        let trace = Trace::new()
            .with_task(Task::new(1).with_runtime(10))
            .with_task(Task::new(2).with_runtime(10).with_dependency(1));
        let mut sim = Simulation::new(trace, single_machine(1), SimulationConfig::default()).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        for event_type in [EventType::TaskStarted, EventType::TaskCompleted] {
            let log = Rc::clone(&log);
            sim.subscribe(event_type, move |e: &Event| {
                log.borrow_mut().push((e.tick, e.event_type()));
            });
        }
        sim.run().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                (0, EventType::TaskStarted),
                (10, EventType::TaskCompleted),
                (10, EventType::TaskStarted),
                (20, EventType::TaskCompleted),
            ]
        );
    }

    #[test]
    fn test_environment_exposure() {
        let mut env = Environment::new();
        env.add_machine(Machine::new(0, 0, 2).with_tdp(100.0).with_idle_power(20.0));
        let trace = || Trace::new().with_task(Task::new(1).with_runtime(1000));

        let report = run(trace(), env.clone(), SimulationConfig::default());
        // one core busy (50 W) plus one idle (10 W)
        let at_start: Vec<_> = report.power_samples.iter().filter(|s| s.tick == 0).collect();
        assert_eq!(at_start.len(), 1);
        assert!((at_start[0].watts - 60.0).abs() < 1e-10);
        let at_end = report.power_samples.iter().find(|s| s.tick == 1000).unwrap();
        assert!((at_end.watts - 20.0).abs() < 1e-10);
        assert!((report.machine_energy[0].joules - 60.0).abs() < 1e-9);

        let quiet = run(
            trace(),
            env,
            SimulationConfig::default().with_environment_exposure(false),
        );
        assert!(quiet.power_samples.is_empty());
    }

    #[test]
    fn test_stale_attempt_completion_is_ignored() {
        let trace = Trace::new().with_task(Task::new(1).with_runtime(100));
        let mut sim = Simulation::new(trace, single_machine(1), SimulationConfig::default()).unwrap();
        sim.events.submit(
            50,
            EventKind::TaskAttemptCompleted {
                task: 1,
                attempt: 7,
                machine: 0,
                cores: 1,
            },
        );
        let report = sim.run().unwrap();
        assert_eq!(report.task(1).unwrap().completion, Some(100));
    }

    #[test]
    fn test_runs_are_deterministic() {
        let build = || {
            let mut trace = Trace::new();
            for id in 0..20u64 {
                let mut task = Task::new(id)
                    .with_workflow(id % 3)
                    .with_runtime(((id * 37) % 200) as Tick)
                    .with_cpu_demand((id % 3 + 1) as u32)
                    .with_submission((id * 7 % 50) as Tick);
                if id > 3 {
                    task = task.with_dependency(id - 3);
                }
                trace.add_task(task);
            }
            trace
        };
        let mut env = Environment::new();
        env.add_machine(Machine::new(0, 0, 4).with_tdp(100.0));
        env.add_machine(Machine::new(1, 0, 2).with_speed(0.5).with_tdp(30.0));

        for (order, placement) in all_policy_pairs() {
            let config = SimulationConfig::new()
                .with_order_policy(order)
                .with_placement_policy(placement);
            let a = run(build(), env.clone(), config.clone());
            let b = run(build(), env.clone(), config);
            assert_eq!(a, b, "{order}/{placement}");
        }
    }

    #[test]
    fn test_random_workloads_keep_invariants() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut env = Environment::new();
        let c = env.create_cluster("dc");
        env.add_machine(Machine::new(0, c, 8).with_speed(1.0).with_tdp(160.0).with_idle_power(40.0));
        env.add_machine(
            Machine::new(1, c, 4)
                .with_speed(0.75)
                .with_tdp(60.0)
                .with_dvfs(DvfsTable::new().with_level(1.25, 0.1).with_level(2.0, 0.4)),
        );
        env.add_machine(Machine::new(2, c, 4).with_speed(0.5).with_tdp(30.0));

        let mut trace = Trace::new();
        for id in 0..80u64 {
            let submission = rng.random_range(0..2_000);
            let mut task = Task::new(id)
                .with_workflow(id % 5)
                .with_submission(submission)
                .with_runtime(rng.random_range(0..500))
                .with_cpu_demand(rng.random_range(1..=10))
                .with_slack(rng.random_range(0..300));
            if id > 0 && rng.random_bool(0.5) {
                task = task.with_dependency(rng.random_range(0..id));
            }
            trace.add_task(task);
        }

        for (order, placement) in all_policy_pairs() {
            let config = SimulationConfig::new()
                .with_order_policy(order)
                .with_placement_policy(placement);
            let mut sim = Simulation::new(trace.clone(), env.clone(), config).unwrap();

            let busy: Rc<RefCell<HashMap<MachineId, i64>>> = Rc::default();
            let overflow = Rc::new(RefCell::new(false));
            let capacity: HashMap<MachineId, i64> =
                env.machines.iter().map(|m| (m.id, m.cores as i64)).collect();
            {
                let (busy, overflow) = (Rc::clone(&busy), Rc::clone(&overflow));
                sim.subscribe(EventType::TaskStarted, move |e: &Event| {
                    if let EventKind::TaskStarted { machine, cores, .. } = e.kind {
                        let mut busy = busy.borrow_mut();
                        let used = busy.entry(machine).or_insert(0);
                        *used += cores as i64;
                        if *used > capacity[&machine] {
                            *overflow.borrow_mut() = true;
                        }
                    }
                });
            }
            {
                let busy = Rc::clone(&busy);
                sim.subscribe(EventType::TaskAttemptCompleted, move |e: &Event| {
                    if let EventKind::TaskAttemptCompleted { machine, cores, .. } = e.kind {
                        *busy.borrow_mut().entry(machine).or_insert(0) -= cores as i64;
                    }
                });
            }

            let report = sim.run().unwrap();
            assert!(!*overflow.borrow(), "{order}/{placement}");
            assert!(busy.borrow().values().all(|&b| b == 0), "{order}/{placement}");
            assert!(report.summary.all_completed(), "{order}/{placement}");
            assert!(report.summary.machine_energy_wh >= 0.0);
            for t in report.tasks.values() {
                assert!(t.start.unwrap() >= t.submission);
            }
        }
    }
}
