//! Tests for configuration loading.

use schedsim::config::{parse_algorithm_list, Config, DEFAULT_MAX_PARALLEL_RUNS};
use schedsim::engine::DEFAULT_QUANTUM_MS;
use schedsim::types::Algorithm;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn sample_config_toml() -> &'static str {
    r#"
algorithms = ["FCFS", "rr", "LOTTERY"]
time_quantum_ms = 40
pacing_divisor = 10
max_parallel_runs = 2
report_path = "/tmp/schedsim/report.json"
metrics_csv_path = "/tmp/schedsim/metrics.csv"
"#
}

#[test]
fn test_load_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, sample_config_toml()).unwrap();

    let cfg = Config::load(Some(path)).unwrap();
    assert_eq!(cfg.algorithms, vec!["FCFS", "rr", "LOTTERY"]);
    assert_eq!(cfg.time_quantum_ms, 40);
    assert_eq!(cfg.pacing_divisor, 10);
    assert_eq!(cfg.max_parallel_runs, 2);
}

#[test]
fn test_from_toml_paths() {
    let cfg = Config::from_toml(sample_config_toml()).unwrap();
    assert_eq!(
        cfg.report_path,
        Some(PathBuf::from("/tmp/schedsim/report.json"))
    );
    assert_eq!(
        cfg.metrics_csv_path,
        Some(PathBuf::from("/tmp/schedsim/metrics.csv"))
    );
}

#[test]
fn test_missing_fields_use_defaults() {
    let cfg = Config::from_toml("").unwrap();
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.time_quantum_ms, DEFAULT_QUANTUM_MS);
    assert_eq!(cfg.max_parallel_runs, DEFAULT_MAX_PARALLEL_RUNS);
    assert_eq!(cfg.pacing_divisor, 0);
    assert_eq!(cfg.algorithms.len(), 8);
    assert!(cfg.report_path.is_none());
}

#[test]
fn test_blank_algorithm_names_fall_back_to_all() {
    let cfg = Config::from_toml(r#"algorithms = ["  ", ""]"#).unwrap();
    assert_eq!(cfg.known_algorithms(), Algorithm::ALL.to_vec());
}

#[test]
fn test_known_algorithms_skips_unknown_names() {
    let cfg = Config::from_toml(sample_config_toml()).unwrap();
    assert_eq!(cfg.known_algorithms(), vec![Algorithm::Fcfs, Algorithm::Rr]);
}

#[test]
fn test_zero_quantum_is_rejected() {
    let err = Config::from_toml("time_quantum_ms = 0").unwrap_err();
    assert!(err.to_string().contains("TIME_QUANTUM_MS"), "{err}");
}

#[test]
fn test_zero_parallel_runs_is_rejected() {
    let err = Config::from_toml("max_parallel_runs = 0").unwrap_err();
    assert!(err.to_string().contains("MAX_PARALLEL_RUNS"), "{err}");
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "time_quantum_ms = \"fast\"").unwrap();
    assert!(Config::load(Some(path)).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(Config::load(Some(dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_parse_algorithm_list() {
    assert_eq!(
        parse_algorithm_list(" fcfs, EDF ,,cfs "),
        vec!["fcfs", "EDF", "cfs"]
    );
    assert!(parse_algorithm_list(" , ").is_empty());
}
