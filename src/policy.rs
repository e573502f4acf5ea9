//! Scheduling policies.
//!
//! Each algorithm is one variant behind the `SchedulingPolicy` interface:
//! `select_next` picks the task to dispatch and how long it may run,
//! `after_slice` applies the policy's bookkeeping (decay, aging, demotion,
//! vruntime) and requeues or retires the task. The engine owns the clock,
//! the timeline and the task arena; policies only hold indices into it.

use std::collections::VecDeque;

use crate::engine::DeadlineMiss;
use crate::events::{Adjustment, EventKind, SelectionBasis, SimEvent};
use crate::sink::EventSink;
use crate::types::{Algorithm, QueueTier, Task};

// ============================================================================
// Tuning constants
// ============================================================================

/// CPU milliseconds per point of priority decay.
pub const FEEDBACK_FACTOR_MS: u64 = 50;

/// Priority gained by every waiting task after each slice.
pub const AGING_INCREMENT: i64 = 1;

/// Decay never pushes a priority below this.
pub const MIN_PRIORITY: i64 = 1;

/// Deepest feedback-queue level; tasks are never demoted past it.
pub const LOWEST_LEVEL: u8 = 1;

/// Priority after a slice of `slice_ms`: one point lost per
/// `FEEDBACK_FACTOR_MS`, floored at `MIN_PRIORITY`.
pub fn decayed_priority(priority: i64, slice_ms: u64) -> i64 {
    let decay = (slice_ms / FEEDBACK_FACTOR_MS) as i64;
    priority.saturating_sub(decay).max(MIN_PRIORITY)
}

/// Slice budget at a feedback level: the base quantum doubles per level.
pub fn level_quantum(quantum_ms: u64, level: u8) -> u64 {
    quantum_ms.saturating_mul(1u64 << level)
}

/// Virtual runtime accrued by a slice; heavier tasks accrue more slowly.
pub fn vruntime_delta(slice_ms: u64, weight: i64) -> f64 {
    slice_ms as f64 / weight.max(1) as f64
}

// ============================================================================
// Policy interface
// ============================================================================

/// Writes events tagged with the running algorithm.
pub(crate) struct Narrator<'a> {
    algorithm: Algorithm,
    sink: &'a dyn EventSink,
}

impl<'a> Narrator<'a> {
    pub(crate) fn new(algorithm: Algorithm, sink: &'a dyn EventSink) -> Self {
        Self { algorithm, sink }
    }

    pub(crate) fn emit(&self, kind: EventKind) {
        self.sink.emit(&SimEvent::new(Some(self.algorithm), kind));
    }
}

/// A dispatch decision.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Selection {
    /// Index into the run's task arena.
    pub slot: usize,
    /// Longest slice allowed; `None` runs the task to completion.
    pub budget_ms: Option<u64>,
    pub basis: SelectionBasis,
}

pub(crate) trait SchedulingPolicy: Send {
    /// Next task to dispatch, or `None` once every task has finished.
    fn select_next(&mut self, tasks: &[Task], narrator: &Narrator<'_>) -> Option<Selection>;

    /// Bookkeeping after `slot` ran for `slice_ms`. Its remaining time has
    /// already been charged.
    fn after_slice(
        &mut self,
        slot: usize,
        slice_ms: u64,
        tasks: &mut [Task],
        narrator: &Narrator<'_>,
    );

    /// Called once when a task's remaining time reaches zero.
    fn on_finished(
        &mut self,
        _task: &Task,
        _finished_ms: u64,
        _narrator: &Narrator<'_>,
    ) -> Option<DeadlineMiss> {
        None
    }
}

/// Pick the policy for `algorithm` over the runnable tasks of `tasks`.
pub(crate) fn policy_for(
    algorithm: Algorithm,
    tasks: &[Task],
    quantum_ms: u64,
) -> Box<dyn SchedulingPolicy> {
    let runnable: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_finished())
        .map(|(slot, _)| slot)
        .collect();

    match algorithm {
        Algorithm::Fcfs => Box::new(FirstCome::new(runnable)),
        Algorithm::Rr => Box::new(RoundRobin::new(runnable, quantum_ms)),
        Algorithm::Priority => Box::new(PriorityAging::new(runnable, quantum_ms)),
        Algorithm::Sjf => Box::new(ShortestJobFirst::new(runnable, tasks)),
        Algorithm::Mlq => Box::new(MultilevelQueue::new(runnable, tasks)),
        Algorithm::Mlfq => Box::new(MultilevelFeedback::new(runnable, quantum_ms)),
        Algorithm::Edf => Box::new(EarliestDeadline::new(runnable, quantum_ms)),
        Algorithm::Cfs => Box::new(FairShare::new(runnable, quantum_ms)),
    }
}

// ============================================================================
// Run-to-completion policies
// ============================================================================

/// Registry order, each task runs to completion.
struct FirstCome {
    queue: VecDeque<usize>,
}

impl FirstCome {
    fn new(runnable: Vec<usize>) -> Self {
        Self {
            queue: runnable.into(),
        }
    }
}

impl SchedulingPolicy for FirstCome {
    fn select_next(&mut self, _tasks: &[Task], _narrator: &Narrator<'_>) -> Option<Selection> {
        self.queue.pop_front().map(|slot| Selection {
            slot,
            budget_ms: None,
            basis: SelectionBasis::Order,
        })
    }

    fn after_slice(&mut self, _: usize, _: u64, _: &mut [Task], _: &Narrator<'_>) {}
}

/// Ascending job length, decided once. The sort is stable so equal
/// lengths keep registry order.
struct ShortestJobFirst {
    queue: VecDeque<usize>,
}

impl ShortestJobFirst {
    fn new(mut runnable: Vec<usize>, tasks: &[Task]) -> Self {
        runnable.sort_by_key(|&slot| tasks[slot].remaining_ms);
        Self {
            queue: runnable.into(),
        }
    }
}

impl SchedulingPolicy for ShortestJobFirst {
    fn select_next(&mut self, tasks: &[Task], _narrator: &Narrator<'_>) -> Option<Selection> {
        self.queue.pop_front().map(|slot| Selection {
            slot,
            budget_ms: None,
            basis: SelectionBasis::Burst(tasks[slot].remaining_ms),
        })
    }

    fn after_slice(&mut self, _: usize, _: u64, _: &mut [Task], _: &Narrator<'_>) {}
}

/// Two static tiers; the high tier drains completely before the low one.
struct MultilevelQueue {
    high: VecDeque<usize>,
    low: VecDeque<usize>,
    serving: Option<QueueTier>,
}

impl MultilevelQueue {
    fn new(runnable: Vec<usize>, tasks: &[Task]) -> Self {
        let (high, low): (Vec<usize>, Vec<usize>) = runnable
            .into_iter()
            .partition(|&slot| QueueTier::for_priority(tasks[slot].priority) == QueueTier::High);
        Self {
            high: high.into(),
            low: low.into(),
            serving: None,
        }
    }
}

impl SchedulingPolicy for MultilevelQueue {
    fn select_next(&mut self, _tasks: &[Task], narrator: &Narrator<'_>) -> Option<Selection> {
        let (tier, slot) = if let Some(slot) = self.high.pop_front() {
            (QueueTier::High, slot)
        } else {
            (QueueTier::Low, self.low.pop_front()?)
        };

        if self.serving != Some(tier) {
            self.serving = Some(tier);
            narrator.emit(EventKind::QueueStarted { tier });
        }

        Some(Selection {
            slot,
            budget_ms: None,
            basis: SelectionBasis::Tier(tier),
        })
    }

    fn after_slice(&mut self, _: usize, _: u64, _: &mut [Task], _: &Narrator<'_>) {}
}

// ============================================================================
// Quantum-based policies
// ============================================================================

/// FIFO rounds: every unfinished task gets one quantum per cycle and is
/// re-enqueued at the tail.
struct RoundRobin {
    quantum_ms: u64,
    current: VecDeque<usize>,
    next_round: VecDeque<usize>,
    cycle: u32,
}

impl RoundRobin {
    fn new(runnable: Vec<usize>, quantum_ms: u64) -> Self {
        Self {
            quantum_ms,
            current: VecDeque::new(),
            next_round: runnable.into(),
            cycle: 0,
        }
    }
}

impl SchedulingPolicy for RoundRobin {
    fn select_next(&mut self, _tasks: &[Task], narrator: &Narrator<'_>) -> Option<Selection> {
        if self.current.is_empty() {
            if self.next_round.is_empty() {
                return None;
            }
            std::mem::swap(&mut self.current, &mut self.next_round);
            self.cycle += 1;
            narrator.emit(EventKind::CycleStarted { cycle: self.cycle });
        }

        self.current.pop_front().map(|slot| Selection {
            slot,
            budget_ms: Some(self.quantum_ms),
            basis: SelectionBasis::Order,
        })
    }

    fn after_slice(&mut self, slot: usize, _: u64, tasks: &mut [Task], _: &Narrator<'_>) {
        if !tasks[slot].is_finished() {
            self.next_round.push_back(slot);
        }
    }
}

/// Highest current priority first, re-sorted every dispatch. The runner
/// decays by CPU used; everyone else waiting ages upward.
struct PriorityAging {
    quantum_ms: u64,
    active: Vec<usize>,
}

impl PriorityAging {
    fn new(runnable: Vec<usize>, quantum_ms: u64) -> Self {
        Self {
            quantum_ms,
            active: runnable,
        }
    }
}

impl SchedulingPolicy for PriorityAging {
    fn select_next(&mut self, tasks: &[Task], _narrator: &Narrator<'_>) -> Option<Selection> {
        // Stable: ties keep their order from the previous dispatch.
        self.active
            .sort_by(|&a, &b| tasks[b].priority.cmp(&tasks[a].priority));
        let slot = *self.active.first()?;
        Some(Selection {
            slot,
            budget_ms: Some(self.quantum_ms),
            basis: SelectionBasis::Priority(tasks[slot].priority),
        })
    }

    fn after_slice(
        &mut self,
        slot: usize,
        slice_ms: u64,
        tasks: &mut [Task],
        narrator: &Narrator<'_>,
    ) {
        debug_assert_eq!(self.active.first(), Some(&slot));

        let running = &mut tasks[slot];
        let from = running.priority;
        running.priority = decayed_priority(from, slice_ms);
        narrator.emit(EventKind::PriorityAdjusted {
            task_id: running.id,
            from,
            to: running.priority,
            cause: Adjustment::Decay,
        });

        for &waiting in &self.active[1..] {
            let task = &mut tasks[waiting];
            let from = task.priority;
            task.priority = from.saturating_add(AGING_INCREMENT);
            narrator.emit(EventKind::PriorityAdjusted {
                task_id: task.id,
                from,
                to: task.priority,
                cause: Adjustment::Aging,
            });
        }

        if tasks[slot].is_finished() {
            self.active.remove(0);
        }
    }
}

/// Level 0 always beats level 1. A task that survives its level-0 slice is
/// demoted once and then cycles at the lowest level with a doubled quantum.
struct MultilevelFeedback {
    quantum_ms: u64,
    levels: [VecDeque<usize>; LOWEST_LEVEL as usize + 1],
    cycle: u32,
}

impl MultilevelFeedback {
    fn new(runnable: Vec<usize>, quantum_ms: u64) -> Self {
        Self {
            quantum_ms,
            levels: [runnable.into(), VecDeque::new()],
            cycle: 0,
        }
    }
}

impl SchedulingPolicy for MultilevelFeedback {
    fn select_next(&mut self, tasks: &[Task], narrator: &Narrator<'_>) -> Option<Selection> {
        let level = self.levels.iter().position(|q| !q.is_empty())?;
        let slot = self.levels[level].pop_front()?;

        self.cycle += 1;
        narrator.emit(EventKind::CycleStarted { cycle: self.cycle });

        Some(Selection {
            slot,
            budget_ms: Some(level_quantum(self.quantum_ms, level as u8)),
            basis: SelectionBasis::Level(tasks[slot].level),
        })
    }

    fn after_slice(&mut self, slot: usize, _: u64, tasks: &mut [Task], narrator: &Narrator<'_>) {
        let task = &mut tasks[slot];
        if task.is_finished() {
            return;
        }
        if task.level < LOWEST_LEVEL {
            let from_level = task.level;
            task.level += 1;
            narrator.emit(EventKind::Demoted {
                task_id: task.id,
                from_level,
                to_level: task.level,
            });
        }
        self.levels[task.level as usize].push_back(slot);
    }
}

/// Earliest absolute deadline first, re-sorted every dispatch.
struct EarliestDeadline {
    quantum_ms: u64,
    active: Vec<usize>,
}

impl EarliestDeadline {
    fn new(runnable: Vec<usize>, quantum_ms: u64) -> Self {
        Self {
            quantum_ms,
            active: runnable,
        }
    }
}

impl SchedulingPolicy for EarliestDeadline {
    fn select_next(&mut self, tasks: &[Task], _narrator: &Narrator<'_>) -> Option<Selection> {
        self.active.sort_by_key(|&slot| tasks[slot].deadline_ms);
        let slot = *self.active.first()?;
        Some(Selection {
            slot,
            budget_ms: Some(self.quantum_ms),
            basis: SelectionBasis::Deadline(tasks[slot].deadline_ms),
        })
    }

    fn after_slice(&mut self, slot: usize, _: u64, tasks: &mut [Task], _: &Narrator<'_>) {
        if tasks[slot].is_finished() {
            self.active.retain(|&s| s != slot);
        }
    }

    fn on_finished(
        &mut self,
        task: &Task,
        finished_ms: u64,
        narrator: &Narrator<'_>,
    ) -> Option<DeadlineMiss> {
        if finished_ms <= task.deadline_ms {
            return None;
        }
        narrator.emit(EventKind::DeadlineMissed {
            task_id: task.id,
            deadline_ms: task.deadline_ms,
            finished_ms,
        });
        Some(DeadlineMiss {
            task_id: task.id,
            deadline_ms: task.deadline_ms,
            finished_ms,
        })
    }
}

/// Smallest virtual runtime first; each slice adds `slice / weight`.
struct FairShare {
    quantum_ms: u64,
    active: Vec<usize>,
}

impl FairShare {
    fn new(runnable: Vec<usize>, quantum_ms: u64) -> Self {
        Self {
            quantum_ms,
            active: runnable,
        }
    }
}

impl SchedulingPolicy for FairShare {
    fn select_next(&mut self, tasks: &[Task], _narrator: &Narrator<'_>) -> Option<Selection> {
        self.active
            .sort_by(|&a, &b| tasks[a].vruntime.total_cmp(&tasks[b].vruntime));
        let slot = *self.active.first()?;
        Some(Selection {
            slot,
            budget_ms: Some(self.quantum_ms),
            basis: SelectionBasis::Vruntime(tasks[slot].vruntime),
        })
    }

    fn after_slice(&mut self, slot: usize, slice_ms: u64, tasks: &mut [Task], _: &Narrator<'_>) {
        let task = &mut tasks[slot];
        task.vruntime += vruntime_delta(slice_ms, task.priority);
        if task.is_finished() {
            self.active.retain(|&s| s != slot);
        }
    }
}
