use thiserror::Error;

use crate::state::TransitionError;

/// Errors surfaced to callers of the task orchestrator.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Task {0} not found")]
    TaskNotFound(String),

    #[error("invalid status transition: {0}")]
    Transition(#[from] TransitionError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("executor error: {0}")]
    Executor(#[from] super::ExecutorError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("overlap_ratio must be within [0, 1), got {0}")]
    OverlapRatio(f64),

    #[error("priority ordinal must be within 0..=4, got {0}")]
    Priority(u8),

    #[error("unknown worker pool kind: {0}")]
    PoolKind(String),

    #[error("max_workers must be at least 1")]
    ZeroWorkers,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("engine failed: {0}")]
    Engine(#[from] EngineError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
