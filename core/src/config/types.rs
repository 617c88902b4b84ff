use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::executor::types::{ExecutionOpts, PoolKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;
        self.executor.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "dongol_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Structural splitting threshold, in serialized bytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Informational only; no splitter enforces it.
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    /// Share of a token window carried into the next one. Must be in [0, 1).
    #[serde(default = "default_overlap_ratio")]
    pub overlap_ratio: f64,

    /// Token limit used when task options do not set `chunk_size`.
    #[serde(default = "default_token_limit")]
    pub default_token_limit: usize,
}

fn default_max_chunk_size() -> usize {
    1000
}

fn default_min_chunk_size() -> usize {
    10
}

fn default_overlap_ratio() -> f64 {
    0.1
}

fn default_token_limit() -> usize {
    500
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            min_chunk_size: default_min_chunk_size(),
            overlap_ratio: default_overlap_ratio(),
            default_token_limit: default_token_limit(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(ConfigError::OverlapRatio(self.overlap_ratio));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Default worker pool width for tasks that do not set `max_workers`.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default)]
    pub pool: PoolKind,

    /// Bounded queue between the orchestrator and its event loop.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Buffer of the subscriber broadcast channel.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_max_workers() -> usize {
    4
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_broadcast_capacity() -> usize {
    1000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            pool: PoolKind::default(),
            event_channel_capacity: default_event_channel_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    pub fn execution_opts(&self) -> ExecutionOpts {
        ExecutionOpts {
            max_workers: self.max_workers,
            pool: self.pool,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Jsonl,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON results (ignored by the JSONL renderer).
    #[serde(default)]
    pub pretty_print: bool,
}
