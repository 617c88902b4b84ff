use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::HandlerError;
use crate::error::ExecutorError;

/// Outcome recorded for one chunk.
///
/// A failed chunk is kept as a marker instead of aborting its level, so
/// callers always get one entry per executed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkResult {
    Completed { value: Value },
    Failed { kind: String, message: String },
}

impl ChunkResult {
    pub fn completed(value: Value) -> Self {
        Self::Completed { value }
    }

    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Completed { value } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    /// Form published to dependents: the raw value on success, the tagged
    /// failure marker otherwise.
    pub fn as_context_value(&self) -> Value {
        match self {
            Self::Completed { value } => value.clone(),
            Self::Failed { kind, message } => json!({
                "status": "failed",
                "kind": kind,
                "message": message,
            }),
        }
    }
}

impl From<Result<Value, HandlerError>> for ChunkResult {
    fn from(res: Result<Value, HandlerError>) -> Self {
        match res {
            Ok(value) => Self::completed(value),
            Err(e) => Self::failed(e.kind(), e.message()),
        }
    }
}

impl From<ExecutorError> for ChunkResult {
    fn from(err: ExecutorError) -> Self {
        Self::failed(err.kind(), err.to_string())
    }
}

/// Summary of one scheduler run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Chunk ids per dispatched level, in dispatch order.
    pub levels: Vec<Vec<String>>,

    /// Levels that had to be forced because nothing was ready.
    pub forced_progress: usize,

    pub completed: usize,

    pub failed: usize,

    /// True when a cancel request stopped scheduling early.
    pub cancelled: bool,

    pub duration_ms: u64,
}

/// Result map plus report for a scheduler run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub results: HashMap<String, ChunkResult>,
    pub report: ExecutionReport,
}
