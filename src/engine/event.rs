//! Simulation events and the time-ordered event queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::models::{MachineId, TaskId, Tick};

/// Instantaneous power of one machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachinePower {
    /// Machine id.
    pub machine: MachineId,
    /// Power draw (W).
    pub watts: f64,
}

/// Event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// A task reached its submission tick.
    TaskSubmitted { task: TaskId },
    /// New tasks became eligible.
    TaskQueueExtended,
    /// Free capacity changed on some machine.
    ClusterStateChanged,
    /// Run one placement pass.
    RescheduleTriggered,
    /// A (partial) placement started.
    TaskStarted {
        task: TaskId,
        machine: MachineId,
        cores: u32,
    },
    /// A (partial) placement finished and released its cores.
    TaskAttemptCompleted {
        task: TaskId,
        attempt: u32,
        machine: MachineId,
        cores: u32,
    },
    /// All placements of a task finished.
    TaskCompleted { task: TaskId },
    /// Per-machine power snapshot. Queued empty, filled in when dispatched.
    EnvironmentExposed { power: Vec<MachinePower> },
}

/// Discriminant of [`EventKind`], used to route events to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    TaskSubmitted,
    TaskQueueExtended,
    ClusterStateChanged,
    RescheduleTriggered,
    TaskStarted,
    TaskAttemptCompleted,
    TaskCompleted,
    EnvironmentExposed,
}

impl EventKind {
    /// Routing discriminant.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::TaskSubmitted { .. } => EventType::TaskSubmitted,
            Self::TaskQueueExtended => EventType::TaskQueueExtended,
            Self::ClusterStateChanged => EventType::ClusterStateChanged,
            Self::RescheduleTriggered => EventType::RescheduleTriggered,
            Self::TaskStarted { .. } => EventType::TaskStarted,
            Self::TaskAttemptCompleted { .. } => EventType::TaskAttemptCompleted,
            Self::TaskCompleted { .. } => EventType::TaskCompleted,
            Self::EnvironmentExposed { .. } => EventType::EnvironmentExposed,
        }
    }
}

/// A timestamped event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Tick at which the event fires.
    pub tick: Tick,
    /// Insertion sequence; breaks ties between events of the same tick.
    pub seq: u64,
    /// Payload.
    pub kind: EventKind,
}

impl Event {
    /// Routing discriminant.
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

// Heap entry: BinaryHeap is a max-heap, so the comparison is reversed.
#[derive(Debug)]
struct QueuedEvent(Event);

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.0.tick, other.0.seq).cmp(&(self.0.tick, self.0.seq))
    }
}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.0.tick == other.0.tick && self.0.seq == other.0.seq
    }
}

impl Eq for QueuedEvent {}

/// Min-priority queue of events keyed by (tick, insertion sequence).
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<QueuedEvent>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an event. O(log n).
    pub fn submit(&mut self, tick: Tick, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedEvent(Event { tick, seq, kind }));
    }

    /// Removes and returns the earliest event, or `None` when empty.
    pub fn pop_next(&mut self) -> Option<Event> {
        self.heap.pop().map(|q| q.0)
    }

    /// Tick of the earliest event.
    pub fn peek_tick(&self) -> Option<Tick> {
        self.heap.peek().map(|q| q.0.tick)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of events ever submitted.
    pub fn submitted(&self) -> u64 {
        self.next_seq
    }
}
