//! Tests for derived response/turnaround/waiting metrics.

use std::collections::BTreeMap;

use schedsim::engine::Simulation;
use schedsim::metrics::{
    compare, compare_workload, summarize, task_metrics, to_csv, write_csv, MetricsReport,
    MetricsSummary, TaskMetrics, CSV_HEADER,
};
use schedsim::sink::NullSink;
use schedsim::types::{Algorithm, Task};
use tempfile::tempdir;

fn finished(name: &str) -> Simulation {
    let mut sim = Simulation::builder(name).sink(NullSink).build();
    sim.run().unwrap();
    sim
}

#[test]
fn test_fcfs_task_metrics() {
    let sim = finished("FCFS");
    let metrics = task_metrics(sim.tasks(), sim.timeline());
    assert_eq!(
        metrics[1],
        TaskMetrics {
            task_id: 2,
            burst_ms: 100,
            response_ms: 250,
            turnaround_ms: 350,
            waiting_ms: 250,
        }
    );

    let summary = summarize(&metrics);
    assert_eq!(summary.avg_response_ms, 312.5);
    assert_eq!(summary.avg_turnaround_ms, 512.5);
    assert_eq!(summary.avg_waiting_ms, 312.5);
}

#[test]
fn test_sjf_beats_fcfs_on_waiting() {
    let sjf = finished("SJF");
    let summary = summarize(&task_metrics(sjf.tasks(), sjf.timeline()));
    assert_eq!(summary.avg_response_ms, 212.5);
    assert_eq!(summary.avg_turnaround_ms, 412.5);
    assert_eq!(summary.avg_waiting_ms, 212.5);
}

#[test]
fn test_rr_metrics() {
    let rr = finished("RR");
    let summary = summarize(&task_metrics(rr.tasks(), rr.timeline()));
    assert_eq!(summary.avg_response_ms, 150.0);
    assert_eq!(summary.avg_turnaround_ms, 587.5);
    assert_eq!(summary.avg_waiting_ms, 387.5);
}

#[test]
fn test_unscheduled_tasks_are_skipped() {
    let mut sim = Simulation::builder("FCFS")
        .workload(vec![Task::new(1, 1, 0), Task::new(2, 1, 40)])
        .sink(NullSink)
        .build();
    sim.run().unwrap();
    let metrics = task_metrics(sim.tasks(), sim.timeline());
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].task_id, 2);
}

#[test]
fn test_summarize_empty() {
    assert_eq!(summarize(&[]), MetricsSummary::default());
}

#[test]
fn test_summarize_large_values() {
    let big = TaskMetrics {
        task_id: 1,
        burst_ms: u64::MAX,
        response_ms: u64::MAX,
        turnaround_ms: u64::MAX,
        waiting_ms: u64::MAX,
    };
    let second = TaskMetrics { task_id: 2, ..big };
    let summary = summarize(&[big, second]);
    assert_eq!(summary.avg_turnaround_ms, u64::MAX as f64);
}

fn shared_workload() -> Vec<Task> {
    vec![
        Task::new(1, 3, 300).with_deadline(900),
        Task::new(2, 1, 100).with_deadline(300),
        Task::new(3, 2, 200).with_deadline(500),
    ]
}

#[test]
fn test_compare_workload_runs_every_algorithm_on_the_same_tasks() {
    let summaries = compare_workload(&shared_workload(), &Algorithm::ALL, 50).unwrap();
    assert_eq!(summaries.len(), 8);

    // Waiting is turnaround minus burst, so on shared work every policy
    // differs by the same mean burst.
    for (algorithm, summary) in &summaries {
        let gap = summary.avg_turnaround_ms - summary.avg_waiting_ms;
        assert!((gap - 200.0).abs() < 1e-9, "{algorithm}: {gap}");
    }

    let fcfs = summaries[&Algorithm::Fcfs];
    assert!((fcfs.avg_turnaround_ms - 1300.0 / 3.0).abs() < 1e-9);
    let sjf = summaries[&Algorithm::Sjf];
    assert!((sjf.avg_waiting_ms - 400.0 / 3.0).abs() < 1e-9);
    assert!(sjf.avg_waiting_ms < fcfs.avg_waiting_ms);
}

#[test]
fn test_compare_workload_rejects_invalid_tasks() {
    let err = compare_workload(&[], &[Algorithm::Fcfs], 50).unwrap_err();
    assert!(err.to_string().contains("FCFS"), "{err}");
}

#[test]
fn test_compare_keeps_canonical_workloads() {
    let summaries = compare(&[Algorithm::Priority, Algorithm::Fcfs], 100).unwrap();
    assert_eq!(summaries[&Algorithm::Fcfs].avg_turnaround_ms, 512.5);
    assert_eq!(summaries.len(), 2);
}

#[test]
fn test_compare_and_csv() {
    let summaries = compare(&[Algorithm::Sjf, Algorithm::Fcfs], 100).unwrap();
    assert_eq!(summaries.len(), 2);

    let csv = to_csv(&summaries);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], CSV_HEADER);
    // BTreeMap order follows the enum: FCFS before SJF.
    assert_eq!(lines[1], "FCFS,312.50,512.50,312.50");
    assert_eq!(lines[2], "SJF,212.50,412.50,212.50");
}

#[test]
fn test_compare_all_algorithms() {
    let summaries = compare(&Algorithm::ALL, 100).unwrap();
    assert_eq!(summaries.len(), 8);
    for (algorithm, summary) in &summaries {
        assert!(
            summary.avg_turnaround_ms >= summary.avg_waiting_ms,
            "{algorithm}"
        );
        assert!(summary.avg_turnaround_ms <= 800.0, "{algorithm}");
    }
}

#[test]
fn test_report_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reports").join("metrics.json");

    let mut summaries = BTreeMap::new();
    summaries.insert(
        Algorithm::Edf,
        MetricsSummary {
            avg_response_ms: 1.0,
            avg_turnaround_ms: 2.0,
            avg_waiting_ms: 3.0,
        },
    );
    let report = MetricsReport::new(100, summaries);
    report.save(&path).unwrap();

    let loaded = MetricsReport::load(&path).unwrap();
    assert_eq!(loaded.quantum_ms, 100);
    assert_eq!(loaded.summaries, report.summaries);
    assert_eq!(loaded.generated_at, report.generated_at);
    assert!(!path.with_extension("tmp").exists());

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"EDF\""));
}

#[test]
fn test_write_csv_replaces_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("metrics.csv");
    std::fs::write(&path, "stale").unwrap();

    let summaries = compare(&[Algorithm::Fcfs], 100).unwrap();
    write_csv(&path, &summaries).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, to_csv(&summaries));
    assert!(!path.with_extension("tmp").exists());
}
