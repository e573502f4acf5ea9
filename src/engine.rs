//! Simulation engine.
//! Owns the clock, the timeline and a private copy of the workload for one
//! run, and drives the selected policy until every task has finished.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::events::{ConfigIssue, EventKind, SimEvent};
use crate::pacing::{NoPacing, Pacer};
use crate::policy::{policy_for, Narrator};
use crate::registry::{validate_workload, workload_for};
use crate::sink::{ConsoleSink, EventSink};
use crate::timeline::{Timeline, TimelineEntry};
use crate::types::{Algorithm, Task};

/// Quantum used when the caller does not set one.
pub const DEFAULT_QUANTUM_MS: u64 = 100;

/// An EDF task that finished after its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineMiss {
    pub task_id: u32,
    pub deadline_ms: u64,
    pub finished_ms: u64,
}

/// Builder for a [`Simulation`].
pub struct SimulationBuilder {
    requested: String,
    quantum_ms: u64,
    sink: Option<Arc<dyn EventSink>>,
    pacer: Option<Arc<dyn Pacer>>,
    workload: Option<Vec<Task>>,
}

impl SimulationBuilder {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            requested: algorithm.into(),
            quantum_ms: DEFAULT_QUANTUM_MS,
            sink: None,
            pacer: None,
            workload: None,
        }
    }

    pub fn quantum_ms(mut self, quantum_ms: u64) -> Self {
        self.quantum_ms = quantum_ms;
        self
    }

    pub fn sink(self, sink: impl EventSink + 'static) -> Self {
        self.shared_sink(Arc::new(sink))
    }

    pub fn shared_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn pacer(self, pacer: impl Pacer + 'static) -> Self {
        self.shared_pacer(Arc::new(pacer))
    }

    pub fn shared_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Replace the canonical workload.
    pub fn workload(mut self, tasks: Vec<Task>) -> Self {
        self.workload = Some(tasks);
        self
    }

    /// Resolve the algorithm and workload. Problems are reported to the
    /// sink once and leave the simulation with nothing to run.
    pub fn build(self) -> Simulation {
        let sink = self.sink.unwrap_or_else(|| Arc::new(ConsoleSink));
        let pacer = self.pacer.unwrap_or_else(|| Arc::new(NoPacing));

        let (algorithm, tasks, issue) = match self.requested.parse::<Algorithm>() {
            Err(unknown) => (None, Vec::new(), Some(ConfigIssue::UnknownAlgorithm(unknown.0))),
            Ok(algorithm) if algorithm.uses_quantum() && self.quantum_ms == 0 => {
                (Some(algorithm), Vec::new(), Some(ConfigIssue::ZeroQuantum))
            }
            Ok(algorithm) => match self.workload {
                None => (Some(algorithm), workload_for(algorithm), None),
                Some(tasks) => match validate_workload(&tasks) {
                    Ok(()) => (Some(algorithm), tasks, None),
                    Err(reason) => (
                        Some(algorithm),
                        Vec::new(),
                        Some(ConfigIssue::InvalidWorkload(reason)),
                    ),
                },
            },
        };

        if let Some(issue) = &issue {
            tracing::warn!(requested = %self.requested, "simulation misconfigured: {issue}");
            sink.emit(&SimEvent::new(algorithm, EventKind::ConfigError(issue.clone())));
        }

        Simulation {
            requested: self.requested,
            algorithm,
            quantum_ms: self.quantum_ms,
            tasks,
            final_tasks: Vec::new(),
            timeline: Timeline::new(),
            deadline_misses: Vec::new(),
            issue,
            sink,
            pacer,
            has_run: false,
        }
    }
}

/// One simulated run of one algorithm over its workload.
pub struct Simulation {
    requested: String,
    algorithm: Option<Algorithm>,
    quantum_ms: u64,
    tasks: Vec<Task>,
    final_tasks: Vec<Task>,
    timeline: Timeline,
    deadline_misses: Vec<DeadlineMiss>,
    issue: Option<ConfigIssue>,
    sink: Arc<dyn EventSink>,
    pacer: Arc<dyn Pacer>,
    has_run: bool,
}

impl Simulation {
    /// Simulation narrating to stdout, without pacing.
    pub fn new(algorithm: &str, quantum_ms: u64) -> Self {
        SimulationBuilder::new(algorithm).quantum_ms(quantum_ms).build()
    }

    pub fn builder(algorithm: impl Into<String>) -> SimulationBuilder {
        SimulationBuilder::new(algorithm)
    }

    /// Run the policy to completion.
    ///
    /// A misconfigured simulation returns an empty timeline. Calling this a
    /// second time is an error and leaves the first timeline untouched.
    pub fn run(&mut self) -> Result<&Timeline> {
        if self.has_run {
            bail!(
                "simulation for {} already ran; build a new one to run again",
                self.requested
            );
        }
        self.has_run = true;

        let algorithm = match (self.algorithm, &self.issue) {
            (Some(algorithm), None) => algorithm,
            _ => {
                tracing::debug!(requested = %self.requested, "skipping misconfigured run");
                return Ok(&self.timeline);
            }
        };

        let mut tasks = self.tasks.clone();
        let narrator = Narrator::new(algorithm, self.sink.as_ref());
        narrator.emit(EventKind::RunStarted {
            tasks: tasks.len(),
            quantum_ms: self.quantum_ms,
        });
        tracing::debug!(%algorithm, tasks = tasks.len(), quantum_ms = self.quantum_ms, "run started");

        let mut policy = policy_for(algorithm, &tasks, self.quantum_ms);
        let mut clock = 0u64;

        while let Some(selection) = policy.select_next(&tasks, &narrator) {
            let task = &mut tasks[selection.slot];
            let slice_ms = selection
                .budget_ms
                .map_or(task.remaining_ms, |budget| budget.min(task.remaining_ms));
            debug_assert!(slice_ms > 0, "policy dispatched finished task {}", task.id);

            narrator.emit(EventKind::TaskSelected {
                task_id: task.id,
                at_ms: clock,
                basis: selection.basis,
            });

            let start_ms = clock;
            let end_ms = clock + slice_ms;
            task.remaining_ms -= slice_ms;
            self.timeline
                .push(TimelineEntry::new(task.id, start_ms, end_ms));
            narrator.emit(EventKind::SliceGranted {
                task_id: task.id,
                start_ms,
                end_ms,
                remaining_ms: task.remaining_ms,
            });
            tracing::trace!(%algorithm, task = task.id, start_ms, end_ms, "slice");

            self.pacer.pace(slice_ms);
            clock = end_ms;

            policy.after_slice(selection.slot, slice_ms, &mut tasks, &narrator);

            let task = &tasks[selection.slot];
            if task.is_finished() {
                narrator.emit(EventKind::TaskFinished {
                    task_id: task.id,
                    at_ms: clock,
                });
                if let Some(miss) = policy.on_finished(task, clock, &narrator) {
                    self.deadline_misses.push(miss);
                }
            }
        }

        debug_assert!(tasks.iter().all(Task::is_finished));
        narrator.emit(EventKind::RunFinished {
            slices: self.timeline.len(),
            makespan_ms: clock,
        });
        tracing::debug!(%algorithm, slices = self.timeline.len(), makespan_ms = clock, "run finished");

        self.final_tasks = tasks;
        Ok(&self.timeline)
    }

    /// Name as the caller supplied it.
    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    pub fn quantum_ms(&self) -> u64 {
        self.quantum_ms
    }

    /// Canonical workload; never mutated by a run.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The run's own task copy after it finished; empty before then.
    pub fn final_tasks(&self) -> &[Task] {
        &self.final_tasks
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn deadline_misses(&self) -> &[DeadlineMiss] {
        &self.deadline_misses
    }

    pub fn config_issue(&self) -> Option<&ConfigIssue> {
        self.issue.as_ref()
    }

    pub fn has_run(&self) -> bool {
        self.has_run
    }
}
