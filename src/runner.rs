//! Run host - drives one simulation per configured algorithm.
//! Runs share nothing, so each one goes to its own blocking thread and
//! narrates into a shared channel.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};

use crate::config::Config;
use crate::engine::{DeadlineMiss, Simulation};
use crate::events::{ConfigIssue, SimEvent};
use crate::metrics::{summarize, task_metrics, MetricsSummary};
use crate::pacing::pacer_for_divisor;
use crate::sink::{ChannelSink, EventSink};
use crate::timeline::Timeline;
use crate::types::{Algorithm, Task};

// ============================================================================
// Types
// ============================================================================

/// Everything a host needs from one finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub requested: String,
    pub algorithm: Option<Algorithm>,
    pub config_issue: Option<ConfigIssue>,
    pub timeline: Timeline,
    /// `None` when the run was misconfigured.
    pub metrics: Option<MetricsSummary>,
    pub deadline_misses: Vec<DeadlineMiss>,
    pub final_tasks: Vec<Task>,
}

impl RunReport {
    pub fn from_simulation(sim: &Simulation) -> Self {
        let metrics = sim
            .config_issue()
            .is_none()
            .then(|| summarize(&task_metrics(sim.tasks(), sim.timeline())));
        Self {
            requested: sim.requested().to_string(),
            algorithm: sim.algorithm(),
            config_issue: sim.config_issue().cloned(),
            timeline: sim.timeline().clone(),
            metrics,
            deadline_misses: sim.deadline_misses().to_vec(),
            final_tasks: sim.final_tasks().to_vec(),
        }
    }

    /// Label for display: the resolved name, or what was asked for.
    pub fn label(&self) -> String {
        self.algorithm
            .map(|a| a.name().to_string())
            .unwrap_or_else(|| self.requested.clone())
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Run one algorithm to completion on the calling thread.
pub fn run_one(name: &str, cfg: &Config, sink: Arc<dyn EventSink>) -> Result<RunReport> {
    let mut sim = Simulation::builder(name)
        .quantum_ms(cfg.time_quantum_ms)
        .shared_sink(sink)
        .shared_pacer(pacer_for_divisor(cfg.pacing_divisor))
        .build();
    sim.run()?;
    Ok(RunReport::from_simulation(&sim))
}

/// Run every configured algorithm concurrently, at most
/// `max_parallel_runs` at a time. Reports come back in configuration order.
pub async fn run_all(
    cfg: &Config,
    events: mpsc::UnboundedSender<SimEvent>,
) -> Result<Vec<RunReport>> {
    let limiter = Arc::new(Semaphore::new(cfg.max_parallel_runs.max(1)));
    let mut pending = FuturesUnordered::new();

    for (index, name) in cfg.algorithms.iter().cloned().enumerate() {
        let run_cfg = cfg.clone();
        let sink: Arc<dyn EventSink> = Arc::new(ChannelSink::new(events.clone()));
        let limiter = limiter.clone();

        pending.push(async move {
            let _permit = limiter
                .acquire_owned()
                .await
                .context("run limiter closed")?;
            let label = name.clone();
            let report = tokio::task::spawn_blocking(move || run_one(&name, &run_cfg, sink))
                .await
                .with_context(|| format!("simulation thread for {label} failed"))??;
            tracing::debug!(algorithm = %label, slices = report.timeline.len(), "run complete");
            Ok::<_, anyhow::Error>((index, report))
        });
    }

    let mut slots: Vec<Option<RunReport>> = vec![None; cfg.algorithms.len()];
    while let Some(result) = pending.next().await {
        let (index, report) = result?;
        slots[index] = Some(report);
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Metrics of every well-configured report, keyed by algorithm.
pub fn comparison(reports: &[RunReport]) -> BTreeMap<Algorithm, MetricsSummary> {
    reports
        .iter()
        .filter_map(|r| Some((r.algorithm?, r.metrics?)))
        .collect()
}

/// One `T<id> start->end` line per interval, as chart hosts consume it.
pub fn format_timeline(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} timeline:", report.label());
    if report.timeline.is_empty() {
        let _ = writeln!(out, "  (empty)");
    }
    for entry in &report.timeline {
        let _ = writeln!(out, "  T{} {}->{}", entry.task_id, entry.start_ms, entry.end_ms);
    }
    out
}
