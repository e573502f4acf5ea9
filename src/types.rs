//! Core domain types shared by the registry, policies and engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Scheduling policies the engine knows how to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Algorithm {
    Fcfs,
    Rr,
    Priority,
    Sjf,
    Mlq,
    Mlfq,
    Edf,
    Cfs,
}

impl Algorithm {
    /// Every algorithm, in the order hosts present them.
    pub const ALL: [Algorithm; 8] = [
        Algorithm::Fcfs,
        Algorithm::Rr,
        Algorithm::Priority,
        Algorithm::Sjf,
        Algorithm::Mlq,
        Algorithm::Mlfq,
        Algorithm::Edf,
        Algorithm::Cfs,
    ];

    /// Canonical upper-case name, also used as the narration prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Fcfs => "FCFS",
            Algorithm::Rr => "RR",
            Algorithm::Priority => "PRIORITY",
            Algorithm::Sjf => "SJF",
            Algorithm::Mlq => "MLQ",
            Algorithm::Mlfq => "MLFQ",
            Algorithm::Edf => "EDF",
            Algorithm::Cfs => "CFS",
        }
    }

    /// Human description used in the run-start banner.
    pub fn description(&self) -> &'static str {
        match self {
            Algorithm::Fcfs => "First Come First Served scheduling",
            Algorithm::Rr => "Round Robin scheduling",
            Algorithm::Priority => "Priority scheduling with dynamic feedback and aging",
            Algorithm::Sjf => "Shortest Job First scheduling (non-preemptive)",
            Algorithm::Mlq => "Multilevel Queue scheduling",
            Algorithm::Mlfq => "Multilevel Feedback Queue scheduling",
            Algorithm::Edf => "Earliest Deadline First scheduling (preemptive)",
            Algorithm::Cfs => "Completely Fair Scheduling",
        }
    }

    /// Whether the policy preempts at quantum boundaries.
    pub fn uses_quantum(&self) -> bool {
        !matches!(self, Algorithm::Fcfs | Algorithm::Sjf | Algorithm::Mlq)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a name matches no known algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown algorithm: {}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownAlgorithm(wanted.to_string()))
    }
}

/// One unit of CPU-bound work.
///
/// Only the fields a policy needs are meaningful for it: `deadline_ms` for
/// EDF, `level` for MLFQ, `vruntime` for CFS. `priority` is the static
/// priority for Priority/MLQ and the weight for CFS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub priority: i64,
    pub remaining_ms: u64,
    #[serde(default)]
    pub deadline_ms: u64,
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub vruntime: f64,
}

impl Task {
    pub fn new(id: u32, priority: i64, remaining_ms: u64) -> Self {
        Self {
            id,
            priority,
            remaining_ms,
            deadline_ms: 0,
            level: 0,
            vruntime: 0.0,
        }
    }

    pub fn with_deadline(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = deadline_ms;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_ms == 0
    }
}

/// Static partition used by the multilevel queue policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueTier {
    High,
    Low,
}

impl QueueTier {
    /// Priority 2 (or above, for custom workloads) lands in the high tier.
    pub fn for_priority(priority: i64) -> Self {
        if priority >= 2 {
            QueueTier::High
        } else {
            QueueTier::Low
        }
    }
}

impl fmt::Display for QueueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueTier::High => f.write_str("High"),
            QueueTier::Low => f.write_str("Low"),
        }
    }
}
