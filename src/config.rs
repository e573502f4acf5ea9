use std::{env, fs, path::PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use serde::Deserialize;

use crate::engine::DEFAULT_QUANTUM_MS;
use crate::types::Algorithm;

pub const DEFAULT_MAX_PARALLEL_RUNS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Names as given; unknown names surface as run-level configuration errors.
    pub algorithms: Vec<String>,
    pub time_quantum_ms: u64,
    /// 0 disables pacing; N sleeps `slice / N` ms per slice.
    pub pacing_divisor: u64,
    pub max_parallel_runs: usize,
    pub report_path: Option<PathBuf>,
    pub metrics_csv_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    algorithms: Vec<String>,
    #[serde(default = "default_quantum")]
    time_quantum_ms: u64,
    #[serde(default)]
    pacing_divisor: u64,
    #[serde(default = "default_parallel_runs")]
    max_parallel_runs: usize,
    #[serde(default)]
    report_path: Option<PathBuf>,
    #[serde(default)]
    metrics_csv_path: Option<PathBuf>,
}

fn default_quantum() -> u64 {
    DEFAULT_QUANTUM_MS
}

fn default_parallel_runs() -> usize {
    DEFAULT_MAX_PARALLEL_RUNS
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        let algorithms = collect_algorithms(raw.algorithms);
        Self {
            algorithms: if algorithms.is_empty() {
                all_algorithm_names()
            } else {
                algorithms
            },
            time_quantum_ms: raw.time_quantum_ms,
            pacing_divisor: raw.pacing_divisor,
            max_parallel_runs: raw.max_parallel_runs,
            report_path: raw.report_path,
            metrics_csv_path: raw.metrics_csv_path,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithms: all_algorithm_names(),
            time_quantum_ms: DEFAULT_QUANTUM_MS,
            pacing_divisor: 0,
            max_parallel_runs: DEFAULT_MAX_PARALLEL_RUNS,
            report_path: None,
            metrics_csv_path: None,
        }
    }
}

impl Config {
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut cfg = if let Some(path) = path {
            let raw = fs::read_to_string(path)?;
            Config::from(toml::from_str::<RawConfig>(&raw)?)
        } else {
            let default_path = default_config_path();
            if default_path.exists() {
                let raw = fs::read_to_string(&default_path)?;
                Config::from(toml::from_str::<RawConfig>(&raw)?)
            } else {
                Self::default()
            }
        };

        cfg.apply_env();
        validate_required(&cfg)?;
        Ok(cfg)
    }

    /// Parse a TOML document without touching the environment.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let cfg = Config::from(toml::from_str::<RawConfig>(raw)?);
        validate_required(&cfg)?;
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(names) = env::var("SCHEDSIM_ALGORITHMS") {
            let parsed = parse_algorithm_list(&names);
            if !parsed.is_empty() {
                self.algorithms = parsed;
            }
        }
        maybe_env_u64(&mut self.time_quantum_ms, "TIME_QUANTUM_MS");
        maybe_env_u64(&mut self.pacing_divisor, "PACING_DIVISOR");
        maybe_env_usize(&mut self.max_parallel_runs, "MAX_PARALLEL_RUNS");
        if let Ok(p) = env::var("REPORT_PATH") {
            self.report_path = Some(PathBuf::from(p));
        }
        if let Ok(p) = env::var("METRICS_CSV_PATH") {
            self.metrics_csv_path = Some(PathBuf::from(p));
        }
    }

    /// Configured names that resolve to a known algorithm.
    pub fn known_algorithms(&self) -> Vec<Algorithm> {
        self.algorithms
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }
}

fn default_config_path() -> PathBuf {
    default_state_dir().join("config.toml")
}

fn default_state_dir() -> PathBuf {
    ProjectDirs::from("com", "schedsim", "schedsim")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".schedsim"))
}

fn validate_required(cfg: &Config) -> Result<()> {
    if cfg.algorithms.is_empty() {
        anyhow::bail!("at least one algorithm is required (set via env or config)");
    }
    if cfg.time_quantum_ms == 0 {
        anyhow::bail!("TIME_QUANTUM_MS must be positive");
    }
    if cfg.max_parallel_runs == 0 {
        anyhow::bail!("MAX_PARALLEL_RUNS must be positive");
    }
    Ok(())
}

fn maybe_env_usize(val: &mut usize, key: &str) {
    if let Ok(v) = env::var(key) {
        if let Ok(n) = v.parse::<usize>() {
            *val = n;
        }
    }
}

fn maybe_env_u64(val: &mut u64, key: &str) {
    if let Ok(v) = env::var(key) {
        if let Ok(n) = v.parse::<u64>() {
            *val = n;
        }
    }
}

fn all_algorithm_names() -> Vec<String> {
    Algorithm::ALL.iter().map(|a| a.name().to_string()).collect()
}

fn collect_algorithms(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Split a comma-separated list of algorithm names.
pub fn parse_algorithm_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
