//! Derived scheduling metrics.
//! All tasks arrive at time zero, so response time is the first start,
//! turnaround is the completion time, and waiting is turnaround minus burst.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::Simulation;
use crate::registry::workload_for;
use crate::sink::NullSink;
use crate::timeline::Timeline;
use crate::types::{Algorithm, Task};

/// CSV header understood by the comparison plotting tool.
pub const CSV_HEADER: &str = "Algorithm,Response,Turnaround,Waiting";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub task_id: u32,
    pub burst_ms: u64,
    pub response_ms: u64,
    pub turnaround_ms: u64,
    pub waiting_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub avg_response_ms: f64,
    pub avg_turnaround_ms: f64,
    pub avg_waiting_ms: f64,
}

/// Per-task metrics for `tasks` (the workload as built, before the run) over `timeline`.
/// Tasks that never ran are skipped.
pub fn task_metrics(tasks: &[Task], timeline: &Timeline) -> Vec<TaskMetrics> {
    tasks
        .iter()
        .filter_map(|task| {
            let response_ms = timeline.first_start(task.id)?;
            let turnaround_ms = timeline.completion(task.id)?;
            Some(TaskMetrics {
                task_id: task.id,
                burst_ms: task.remaining_ms,
                response_ms,
                turnaround_ms,
                waiting_ms: turnaround_ms.saturating_sub(task.remaining_ms),
            })
        })
        .collect()
}

/// Averages over `metrics`; all zero when empty.
pub fn summarize(metrics: &[TaskMetrics]) -> MetricsSummary {
    if metrics.is_empty() {
        return MetricsSummary::default();
    }
    // Summed as f64: per-task values are bounded by the clock, their sum is not.
    let (response, turnaround, waiting) = metrics.iter().fold((0.0, 0.0, 0.0), |acc, m| {
        (
            acc.0 + m.response_ms as f64,
            acc.1 + m.turnaround_ms as f64,
            acc.2 + m.waiting_ms as f64,
        )
    });
    let n = metrics.len() as f64;
    MetricsSummary {
        avg_response_ms: response / n,
        avg_turnaround_ms: turnaround / n,
        avg_waiting_ms: waiting / n,
    }
}

/// Run each algorithm quietly over its own canonical workload and summarize.
pub fn compare(algorithms: &[Algorithm], quantum_ms: u64) -> Result<BTreeMap<Algorithm, MetricsSummary>> {
    let mut out = BTreeMap::new();
    for &algorithm in algorithms {
        out.extend(compare_workload(&workload_for(algorithm), &[algorithm], quantum_ms)?);
    }
    Ok(out)
}

/// Run every algorithm over the same task list and summarize, so the
/// policies are compared on identical work.
pub fn compare_workload(
    tasks: &[Task],
    algorithms: &[Algorithm],
    quantum_ms: u64,
) -> Result<BTreeMap<Algorithm, MetricsSummary>> {
    let mut out = BTreeMap::new();
    for &algorithm in algorithms {
        let mut sim = Simulation::builder(algorithm.name())
            .quantum_ms(quantum_ms)
            .workload(tasks.to_vec())
            .sink(NullSink)
            .build();
        if let Some(issue) = sim.config_issue() {
            bail!("cannot compare {algorithm}: {issue}");
        }
        sim.run()
            .with_context(|| format!("running {algorithm} for comparison"))?;
        let summary = summarize(&task_metrics(sim.tasks(), sim.timeline()));
        out.insert(algorithm, summary);
    }
    Ok(out)
}

/// Render summaries as CSV with two decimals.
pub fn to_csv(summaries: &BTreeMap<Algorithm, MetricsSummary>) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for (algorithm, m) in summaries {
        let _ = writeln!(
            out,
            "{},{:.2},{:.2},{:.2}",
            algorithm, m.avg_response_ms, m.avg_turnaround_ms, m.avg_waiting_ms
        );
    }
    out
}

/// Comparison results written for external tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub generated_at: String,
    pub quantum_ms: u64,
    pub summaries: BTreeMap<Algorithm, MetricsSummary>,
}

impl MetricsReport {
    pub fn new(quantum_ms: u64, summaries: BTreeMap<Algorithm, MetricsSummary>) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            quantum_ms,
            summaries,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).context("reading metrics report")?;
        serde_json::from_slice(&data).context("parsing metrics report")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &serde_json::to_vec_pretty(self).context("serializing metrics report")?)
    }
}

/// Write the CSV comparison to `path`, replacing any previous file whole.
pub fn write_csv(path: &Path, summaries: &BTreeMap<Algorithm, MetricsSummary>) -> Result<()> {
    write_atomic(path, to_csv(summaries).as_bytes())
}

/// Write via a sibling temp file and rename over the target.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("creating report directory")?;
        }
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data).context("writing temp report")?;
    fs::rename(&tmp, path).context("replacing report")?;
    Ok(())
}
