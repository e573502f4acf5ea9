//! Execution timeline: the ordered record of which task held the CPU when.

use serde::{Deserialize, Serialize};

/// One contiguous interval of CPU ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub task_id: u32,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimelineEntry {
    pub fn new(task_id: u32, start_ms: u64, end_ms: u64) -> Self {
        Self {
            task_id,
            start_ms,
            end_ms,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Intervals in execution order. Only the engine appends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: TimelineEntry) {
        debug_assert!(entry.start_ms < entry.end_ms, "empty interval {entry:?}");
        debug_assert!(
            self.entries
                .last()
                .map_or(true, |prev| prev.end_ms == entry.start_ms),
            "interval {entry:?} is not contiguous with the clock"
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End of the last interval; 0 for an empty timeline.
    pub fn makespan_ms(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.end_ms)
    }

    /// Total CPU time granted to a task.
    pub fn busy_ms(&self, task_id: u32) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.task_id == task_id)
            .map(TimelineEntry::duration_ms)
            .sum()
    }

    pub fn first_start(&self, task_id: u32) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.task_id == task_id)
            .map(|e| e.start_ms)
    }

    pub fn completion(&self, task_id: u32) -> Option<u64> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.task_id == task_id)
            .map(|e| e.end_ms)
    }

    pub fn slices_of(&self, task_id: u32) -> Vec<TimelineEntry> {
        self.entries
            .iter()
            .filter(|e| e.task_id == task_id)
            .copied()
            .collect()
    }

    /// Distinct task ids in order of first appearance.
    pub fn task_order(&self) -> Vec<u32> {
        let mut order = Vec::new();
        for entry in &self.entries {
            if !order.contains(&entry.task_id) {
                order.push(entry.task_id);
            }
        }
        order
    }

    /// True when every interval starts where the previous one ended,
    /// beginning at time zero.
    pub fn is_contiguous(&self) -> bool {
        let mut clock = 0;
        for entry in &self.entries {
            if entry.start_ms != clock || entry.end_ms <= entry.start_ms {
                return false;
            }
            clock = entry.end_ms;
        }
        true
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEntry;
    type IntoIter = std::slice::Iter<'a, TimelineEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
