//! Typed narration events emitted by a simulation run.
//! Hosts subscribe to these instead of parsing log text; the `Display`
//! impl renders the human-readable line for consoles and transcripts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Algorithm, QueueTier};

/// Why a run was turned into a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigIssue {
    UnknownAlgorithm(String),
    ZeroQuantum,
    InvalidWorkload(String),
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::UnknownAlgorithm(name) => write!(f, "Invalid algorithm: {name}"),
            ConfigIssue::ZeroQuantum => f.write_str("Invalid time quantum: must be positive"),
            ConfigIssue::InvalidWorkload(reason) => write!(f, "Invalid workload: {reason}"),
        }
    }
}

/// The key a policy used to pick the task it dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SelectionBasis {
    /// Registry or round order.
    Order,
    /// Job length, for shortest-job-first.
    Burst(u64),
    Priority(i64),
    Tier(QueueTier),
    Level(u8),
    Deadline(u64),
    Vruntime(f64),
}

/// Why a priority changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    Decay,
    Aging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    ConfigError(ConfigIssue),
    RunStarted {
        tasks: usize,
        quantum_ms: u64,
    },
    CycleStarted {
        cycle: u32,
    },
    QueueStarted {
        tier: QueueTier,
    },
    TaskSelected {
        task_id: u32,
        at_ms: u64,
        basis: SelectionBasis,
    },
    SliceGranted {
        task_id: u32,
        start_ms: u64,
        end_ms: u64,
        remaining_ms: u64,
    },
    PriorityAdjusted {
        task_id: u32,
        from: i64,
        to: i64,
        cause: Adjustment,
    },
    Demoted {
        task_id: u32,
        from_level: u8,
        to_level: u8,
    },
    TaskFinished {
        task_id: u32,
        at_ms: u64,
    },
    DeadlineMissed {
        task_id: u32,
        deadline_ms: u64,
        finished_ms: u64,
    },
    RunFinished {
        slices: usize,
        makespan_ms: u64,
    },
}

/// One narration event. `algorithm` is `None` only for configuration
/// errors raised before an algorithm was resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub algorithm: Option<Algorithm>,
    pub kind: EventKind,
}

impl SimEvent {
    pub fn new(algorithm: Option<Algorithm>, kind: EventKind) -> Self {
        Self { algorithm, kind }
    }

    /// True for events that change which queue a task waits in.
    pub fn is_queue_change(&self) -> bool {
        matches!(
            self.kind,
            EventKind::QueueStarted { .. } | EventKind::Demoted { .. }
        )
    }

    pub fn task_id(&self) -> Option<u32> {
        match self.kind {
            EventKind::TaskSelected { task_id, .. }
            | EventKind::SliceGranted { task_id, .. }
            | EventKind::PriorityAdjusted { task_id, .. }
            | EventKind::Demoted { task_id, .. }
            | EventKind::TaskFinished { task_id, .. }
            | EventKind::DeadlineMissed { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(algorithm) = self.algorithm {
            write!(f, "[{algorithm}] ")?;
        }
        match &self.kind {
            EventKind::ConfigError(issue) => write!(f, "{issue}"),
            EventKind::RunStarted { tasks, quantum_ms } => match self.algorithm {
                Some(a) if a.uses_quantum() => write!(
                    f,
                    "Starting {} ({tasks} tasks, quantum {quantum_ms}ms).",
                    a.description()
                ),
                Some(a) => write!(f, "Starting {} ({tasks} tasks).", a.description()),
                None => write!(f, "Starting ({tasks} tasks)."),
            },
            EventKind::CycleStarted { cycle } => write!(f, "-- Cycle {cycle} --"),
            EventKind::QueueStarted { tier } => write!(f, "Running {tier} priority queue."),
            EventKind::TaskSelected {
                task_id,
                at_ms,
                basis,
            } => {
                write!(f, "Selected Task {task_id} at {at_ms}ms")?;
                match basis {
                    SelectionBasis::Order => Ok(()),
                    SelectionBasis::Burst(ms) => write!(f, " (job length {ms}ms)"),
                    SelectionBasis::Priority(p) => write!(f, " (priority={p})"),
                    SelectionBasis::Tier(tier) => write!(f, " (Queue: {tier})"),
                    SelectionBasis::Level(level) => write!(f, " at level {level}"),
                    SelectionBasis::Deadline(ms) => write!(f, " (deadline {ms})"),
                    SelectionBasis::Vruntime(v) => write!(f, " (vruntime {v:.2})"),
                }
            }
            EventKind::SliceGranted {
                task_id,
                start_ms,
                end_ms,
                remaining_ms,
            } => write!(
                f,
                "Task {task_id} runs from {start_ms} to {end_ms}, remaining {remaining_ms}ms."
            ),
            EventKind::PriorityAdjusted {
                task_id,
                from,
                to,
                cause: Adjustment::Decay,
            } => write!(
                f,
                "Adjusted priority of Task {task_id} from {from} to {to}"
            ),
            EventKind::PriorityAdjusted {
                task_id,
                to,
                cause: Adjustment::Aging,
                ..
            } => write!(f, "Aging: Increased priority of Task {task_id} to {to}"),
            EventKind::Demoted {
                task_id, to_level, ..
            } => write!(f, "Task {task_id} demoted to level {to_level}."),
            EventKind::TaskFinished { task_id, at_ms } => {
                write!(f, "Task {task_id} finished at {at_ms}ms.")
            }
            EventKind::DeadlineMissed {
                task_id,
                deadline_ms,
                finished_ms,
            } => write!(
                f,
                "Task {task_id} missed its deadline of {deadline_ms}ms (finished at {finished_ms}ms)."
            ),
            EventKind::RunFinished {
                slices,
                makespan_ms,
            } => write!(
                f,
                "All tasks finished ({slices} slices, {makespan_ms}ms)."
            ),
        }
    }
}
