use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ExecutorConfig;
use crate::error::ConfigError;

/// Worker pool flavor, chosen per task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// Runtime blocking threads gated by a semaphore. For I/O-bound or cheap
    /// handlers.
    #[default]
    Shared,
    /// Dedicated OS threads owned by the pool. For CPU-bound handlers.
    Isolated,
}

impl FromStr for PoolKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" | "thread" | "threads" => Ok(Self::Shared),
            "isolated" | "process" | "processes" => Ok(Self::Isolated),
            other => Err(ConfigError::PoolKind(other.to_string())),
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Isolated => write!(f, "isolated"),
        }
    }
}

/// Execution options for one scheduler run.
#[derive(Debug, Clone)]
pub struct ExecutionOpts {
    /// Maximum chunks in flight at once.
    pub max_workers: usize,

    pub pool: PoolKind,

    /// Level-synchronous scheduling when true; strict emission order otherwise.
    pub parallel: bool,
}

impl Default for ExecutionOpts {
    fn default() -> Self {
        ExecutorConfig::default().execution_opts()
    }
}
