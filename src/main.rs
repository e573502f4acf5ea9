use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use schedsim::config::Config;
use schedsim::events::SimEvent;
use schedsim::metrics::{to_csv, write_csv, MetricsReport};
use schedsim::runner::{comparison, format_timeline, run_all, RunReport};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    let cfg_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = Config::load(cfg_path)?;
    info!("starting schedsim with config {:?}", cfg);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(events_rx));

    let reports = run_all(&cfg, events_tx).await?;
    printer.await.context("narration printer failed")?;

    print_timelines(&reports);
    write_outputs(&cfg, &reports)?;

    let misconfigured = reports.iter().filter(|r| r.config_issue.is_some()).count();
    info!(runs = reports.len(), misconfigured, "all simulations finished");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Drain narration from every run until all senders are gone.
async fn print_events(mut rx: mpsc::UnboundedReceiver<SimEvent>) {
    while let Some(event) = rx.recv().await {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let _ = writeln!(out, "{event}");
    }
}

fn print_timelines(reports: &[RunReport]) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for report in reports {
        let _ = write!(out, "{}", format_timeline(report));
        for miss in &report.deadline_misses {
            let _ = writeln!(
                out,
                "  T{} missed deadline {}ms (finished {}ms)",
                miss.task_id, miss.deadline_ms, miss.finished_ms
            );
        }
    }
}

fn write_outputs(cfg: &Config, reports: &[RunReport]) -> Result<()> {
    let summaries = comparison(reports);

    if let Some(path) = &cfg.report_path {
        MetricsReport::new(cfg.time_quantum_ms, summaries.clone())
            .save(path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!("wrote metrics report to {}", path.display());
    }

    if let Some(path) = &cfg.metrics_csv_path {
        write_csv(path, &summaries)
            .with_context(|| format!("writing metrics csv to {}", path.display()))?;
        info!("wrote metrics csv to {}", path.display());
    } else {
        info!("metrics:\n{}", to_csv(&summaries));
    }

    Ok(())
}
