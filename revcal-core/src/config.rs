//! Configuration system for revcal.
//!
//! Uses `figment` for layered configuration: defaults -> config files -> environment.
//! Command-line flags are applied on top by the binary after extraction.
//! Configuration is loaded from the user config directory (`config.toml`),
//! `revcal.toml` in the run directory, and an optional explicit file.

use crate::error::{CalError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-run-directory configuration file.
pub const RUN_CONFIG_FILE: &str = "revcal.toml";

/// Top-level configuration for one review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Topic id; prefixes every training and model file.
    #[serde(default)]
    pub topic: String,
    /// Pool file the seed training set is drawn from.
    #[serde(default)]
    pub pool: PathBuf,
    /// Relevance judgments used as ground truth.
    #[serde(default)]
    pub qrels: PathBuf,
    /// Directory holding `{topic}.train.*` and `{topic}.model.*`.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Maximum pool rank used for the seed set.
    #[serde(default = "default_train_rank")]
    pub train_rank: u32,
    /// Documents scored and revealed per round.
    #[serde(default = "default_num_docs")]
    pub num_docs: usize,
    /// Round limit; defaults to the number of judged documents.
    #[serde(default)]
    pub max_steps: Option<usize>,
    /// Stop once this many consecutive rounds find nothing relevant.
    #[serde(default)]
    pub zero_steps: Option<usize>,
    /// Apply the yield-based cutoffs.
    #[serde(default)]
    pub fail_out: bool,
    /// Stop once every relevant document has been found.
    #[serde(default = "default_true")]
    pub relstop: bool,
    /// Where to write the JSON run report, if anywhere.
    #[serde(default)]
    pub report: Option<PathBuf>,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub stopping: StoppingThresholds,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            pool: PathBuf::new(),
            qrels: PathBuf::new(),
            work_dir: default_work_dir(),
            train_rank: default_train_rank(),
            num_docs: default_num_docs(),
            max_steps: None,
            zero_steps: None,
            fail_out: false,
            relstop: true,
            report: None,
            lock: LockConfig::default(),
            backend: BackendConfig::default(),
            stopping: StoppingThresholds::default(),
        }
    }
}

impl RunConfig {
    /// Check the settings a run cannot start without.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(CalError::config("topic must not be empty"));
        }
        if self.topic.chars().any(char::is_whitespace) {
            return Err(CalError::config(format!(
                "topic {:?} must not contain whitespace",
                self.topic
            )));
        }
        if self.pool.as_os_str().is_empty() {
            return Err(CalError::config("pool file is required"));
        }
        if self.qrels.as_os_str().is_empty() {
            return Err(CalError::config("qrels file is required"));
        }
        if self.num_docs == 0 {
            return Err(CalError::config("num_docs must be at least 1"));
        }
        if self.lock.enabled && self.lock.path.as_os_str().is_empty() {
            return Err(CalError::config("lock.path is required when locking is enabled"));
        }
        self.stopping.validate()?;
        if self.backend.transport == Transport::Http && self.backend.host.is_empty() {
            return Err(CalError::config("backend.host is required for the http transport"));
        }
        Ok(())
    }
}

/// Collection lock settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Take an exclusive lock around every training call.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lock file shared by concurrent runs on the same collection.
    #[serde(default = "default_lock_path")]
    pub path: PathBuf,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_lock_path(),
        }
    }
}

/// How the ranking engine is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Process,
    Http,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Process => write!(f, "process"),
            Self::Http => write!(f, "http"),
        }
    }
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "process" => Ok(Self::Process),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown transport '{other}' (expected process or http)")),
        }
    }
}

/// Ranking backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub transport: Transport,
    /// Document collection prefix passed to the process transport.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Executable that trains a model from a training file.
    #[serde(default = "default_train_program")]
    pub train_program: PathBuf,
    /// Executable that scores the collection against a model.
    #[serde(default = "default_score_program")]
    pub score_program: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP request timeout in seconds; 0 waits indefinitely.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            collection: default_collection(),
            train_program: default_train_program(),
            score_program: default_score_program(),
            host: default_host(),
            port: default_port(),
            timeout_secs: 0,
        }
    }
}

impl BackendConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Thresholds for the yield-based stopping rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppingThresholds {
    #[serde(default = "default_high_yield_min_reviewed")]
    pub high_yield_min_reviewed: usize,
    #[serde(default = "default_high_yield_fraction")]
    pub high_yield_fraction: f64,
    #[serde(default = "default_low_yield_min_reviewed")]
    pub low_yield_min_reviewed: usize,
    #[serde(default = "default_low_yield_max_new_relevant")]
    pub low_yield_max_new_relevant: usize,
    #[serde(default = "default_low_yield_fraction")]
    pub low_yield_fraction: f64,
}

impl Default for StoppingThresholds {
    fn default() -> Self {
        Self {
            high_yield_min_reviewed: default_high_yield_min_reviewed(),
            high_yield_fraction: default_high_yield_fraction(),
            low_yield_min_reviewed: default_low_yield_min_reviewed(),
            low_yield_max_new_relevant: default_low_yield_max_new_relevant(),
            low_yield_fraction: default_low_yield_fraction(),
        }
    }
}

impl StoppingThresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("high_yield_fraction", self.high_yield_fraction),
            ("low_yield_fraction", self.low_yield_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CalError::config(format!(
                    "stopping.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_train_rank() -> u32 {
    10
}

fn default_num_docs() -> usize {
    1
}

fn default_lock_path() -> PathBuf {
    PathBuf::from("lockfile")
}

fn default_collection() -> String {
    "cd45".to_string()
}

fn default_train_program() -> PathBuf {
    PathBuf::from("mycal")
}

fn default_score_program() -> PathBuf {
    PathBuf::from("score-index")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8123
}

fn default_high_yield_min_reviewed() -> usize {
    300
}

fn default_high_yield_fraction() -> f64 {
    0.5
}

fn default_low_yield_min_reviewed() -> usize {
    150
}

fn default_low_yield_max_new_relevant() -> usize {
    3
}

fn default_low_yield_fraction() -> f64 {
    0.4
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `REVCAL_`, `__` for nesting)
/// 2. Explicit config file
/// 3. Run-directory config (`revcal.toml`)
/// 4. User config (`~/.config/revcal/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    work_dir: Option<&Path>,
    explicit: Option<&Path>,
) -> std::result::Result<RunConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(RunConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "revcal", "revcal") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(dir) = work_dir {
        let run_config = dir.join(RUN_CONFIG_FILE);
        if run_config.exists() {
            figment = figment.merge(Toml::file(&run_config));
        }
    }

    if let Some(path) = explicit {
        figment = figment.merge(Toml::file(path));
    }

    // REVCAL_BACKEND__TRANSPORT=http, REVCAL_LOCK__ENABLED=false, etc.
    figment = figment.merge(Env::prefixed("REVCAL_").split("__"));

    figment.extract().map_err(Box::new)
}
