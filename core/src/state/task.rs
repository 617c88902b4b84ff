//! 任务类型定义

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::executor::types::{Chunk, ChunkResult, PoolKind, Priority};

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        Self::Pending,
        Self::Running,
        Self::Paused,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 创建任务时的选项（可从 JSON / TOML 反序列化）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOptions {
    #[serde(default)]
    pub description: String,

    /// 优先级序号 0-4
    #[serde(default = "default_priority")]
    pub priority: u8,

    #[serde(default = "default_true")]
    pub parallel: bool,

    /// 未设置时使用 `executor.max_workers`
    #[serde(default)]
    pub max_workers: Option<usize>,

    #[serde(default = "default_true")]
    pub auto_chunk: bool,

    /// 文本切分的 token 上限；未设置时使用 `chunking.default_token_limit`
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// 未设置时使用 `executor.pool`
    #[serde(default)]
    pub pool: Option<PoolKind>,
}

fn default_priority() -> u8 {
    Priority::Normal.ordinal()
}

fn default_true() -> bool {
    true
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            description: String::new(),
            priority: default_priority(),
            parallel: true,
            max_workers: None,
            auto_chunk: true,
            chunk_size: None,
            pool: None,
        }
    }
}

impl TaskOptions {
    pub fn resolved_priority(&self) -> Result<Priority, ConfigError> {
        Priority::try_from(self.priority)
    }
}

/// 任务：独占持有自己的 chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,

    /// 按切分产出的顺序（不是执行顺序）
    pub chunks: Vec<Chunk>,

    pub status: TaskStatus,
    pub priority: Priority,
    pub parallel_mode: bool,
    pub max_workers: usize,
    #[serde(default)]
    pub pool: PoolKind,

    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// chunk id -> 结果，只在 chunk 完成后写入
    #[serde(default)]
    pub results: HashMap<String, ChunkResult>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Task {
    pub fn new(name: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            chunks,
            status: TaskStatus::Pending,
            priority: Priority::default(),
            parallel_mode: true,
            max_workers: 4,
            pool: PoolKind::default(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            results: HashMap::new(),
            metadata: Map::new(),
        }
    }

    /// `(completed_at - started_at)` in milliseconds; `None` until both are set.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    pub fn chunk(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == chunk_id)
    }

    pub fn failed_chunks(&self) -> impl Iterator<Item = (&String, &ChunkResult)> {
        self.results.iter().filter(|(_, res)| !res.is_ok())
    }
}

/// 引擎事件（经有界队列进入事件循环，再广播给订阅者）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    TaskCreated {
        task_id: String,
        chunks: usize,
        timestamp: DateTime<Utc>,
    },
    TaskStarted {
        task_id: String,
        handler: String,
        timestamp: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: String,
        status: TaskStatus,
        duration_ms: Option<i64>,
        timestamp: DateTime<Utc>,
    },
    TaskCancelled {
        task_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn task_id(&self) -> &str {
        match self {
            Self::TaskCreated { task_id, .. }
            | Self::TaskStarted { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskCancelled { task_id, .. } => task_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::TaskCreated { timestamp, .. }
            | Self::TaskStarted { timestamp, .. }
            | Self::TaskCompleted { timestamp, .. }
            | Self::TaskCancelled { timestamp, .. } => *timestamp,
        }
    }
}
