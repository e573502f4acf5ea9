//! Environment overrides for configuration loading.
//! Kept to a single test in its own binary: the process environment is shared
//! by every test thread.

use schedsim::config::Config;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

const OVERRIDES: [(&str, &str); 6] = [
    ("SCHEDSIM_ALGORITHMS", "edf, cfs"),
    ("TIME_QUANTUM_MS", "25"),
    ("PACING_DIVISOR", "5"),
    ("MAX_PARALLEL_RUNS", "3"),
    ("REPORT_PATH", "/tmp/schedsim-env/report.json"),
    ("METRICS_CSV_PATH", "/tmp/schedsim-env/metrics.csv"),
];

#[test]
fn test_env_overrides_win_over_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
algorithms = ["FCFS"]
time_quantum_ms = 40
pacing_divisor = 10
max_parallel_runs = 2
report_path = "/tmp/schedsim/report.json"
"#,
    )
    .unwrap();

    for (key, value) in OVERRIDES {
        env::set_var(key, value);
    }
    let cfg = Config::load(Some(path.clone()));
    for (key, _) in OVERRIDES {
        env::remove_var(key);
    }
    let cfg = cfg.unwrap();

    assert_eq!(cfg.algorithms, vec!["edf", "cfs"]);
    assert_eq!(cfg.time_quantum_ms, 25);
    assert_eq!(cfg.pacing_divisor, 5);
    assert_eq!(cfg.max_parallel_runs, 3);
    assert_eq!(
        cfg.report_path,
        Some(PathBuf::from("/tmp/schedsim-env/report.json"))
    );
    assert_eq!(
        cfg.metrics_csv_path,
        Some(PathBuf::from("/tmp/schedsim-env/metrics.csv"))
    );

    // Unparsable numbers and an empty list leave the file values alone.
    env::set_var("TIME_QUANTUM_MS", "soon");
    env::set_var("SCHEDSIM_ALGORITHMS", " , ");
    let cfg = Config::load(Some(path.clone()));
    env::remove_var("TIME_QUANTUM_MS");
    env::remove_var("SCHEDSIM_ALGORITHMS");
    let cfg = cfg.unwrap();
    assert_eq!(cfg.time_quantum_ms, 40);
    assert_eq!(cfg.algorithms, vec!["FCFS"]);

    // Overrides are validated like file values.
    env::set_var("TIME_QUANTUM_MS", "0");
    let result = Config::load(Some(path));
    env::remove_var("TIME_QUANTUM_MS");
    assert!(result.is_err());
}
