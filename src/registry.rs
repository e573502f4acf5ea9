//! Task registry.
//! Builds the fixed four-task workload each algorithm is simulated against,
//! and validates caller-supplied replacement workloads.

use std::collections::HashSet;

use crate::types::{Algorithm, Task};

/// Burst lengths shared by every canonical workload, in registry order.
const BURSTS_MS: [u64; 4] = [250, 100, 300, 150];

/// Distinct priorities that exercise decay and aging.
const PRIORITY_LEVELS: [i64; 4] = [15, 5, 20, 10];

/// Even ids go to the high tier, odd ids to the low tier.
const MLQ_PRIORITIES: [i64; 4] = [1, 2, 1, 2];

/// Absolute deadlines, tighter for the shorter jobs.
const EDF_DEADLINES_MS: [u64; 4] = [400, 200, 500, 300];

/// Canonical workload for an algorithm, in registry order.
pub fn workload_for(algorithm: Algorithm) -> Vec<Task> {
    BURSTS_MS
        .iter()
        .enumerate()
        .map(|(i, &burst)| {
            let id = i as u32 + 1;
            match algorithm {
                Algorithm::Priority => Task::new(id, PRIORITY_LEVELS[i], burst),
                Algorithm::Mlq => Task::new(id, MLQ_PRIORITIES[i], burst),
                Algorithm::Edf => Task::new(id, 1, burst).with_deadline(EDF_DEADLINES_MS[i]),
                Algorithm::Fcfs
                | Algorithm::Rr
                | Algorithm::Sjf
                | Algorithm::Mlfq
                | Algorithm::Cfs => Task::new(id, 1, burst),
            }
        })
        .collect()
}

/// Canonical workload looked up by name.
/// Unknown names yield an empty workload; the caller reports the error.
pub fn workload_for_name(name: &str) -> Vec<Task> {
    name.parse::<Algorithm>()
        .map(workload_for)
        .unwrap_or_default()
}

/// Check a replacement workload before a run takes ownership of it.
pub fn validate_workload(tasks: &[Task]) -> Result<(), String> {
    if tasks.is_empty() {
        return Err("workload has no tasks".to_string());
    }
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if task.id == 0 {
            return Err("task ids must be positive".to_string());
        }
        if !seen.insert(task.id) {
            return Err(format!("duplicate task id {}", task.id));
        }
        if task.priority < 1 {
            return Err(format!(
                "task {} has priority {}, minimum is 1",
                task.id, task.priority
            ));
        }
    }
    let total = tasks
        .iter()
        .try_fold(0u64, |total, task| total.checked_add(task.remaining_ms));
    if total.is_none() {
        return Err("total burst time overflows the simulated clock".to_string());
    }
    Ok(())
}
