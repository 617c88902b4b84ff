//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `dongol_core::api` instead of reaching into internal modules.

pub use crate::chunking::{split_by_structure, split_by_tokens, ChunkingEngine};
pub use crate::config::{
    load_default, AppConfig, ChunkingConfig, ExecutorConfig, LoggingConfig, OutputConfig,
    OutputFormat,
};
pub use crate::engine::{default_handler, Engine, EngineBuilder, EngineStats, DEFAULT_HANDLER};
pub use crate::error::{CliError, ConfigError, EngineError, ExecutorError};
pub use crate::executor::{
    analyze_dependencies, execute_chunks, plan_levels, AsyncChunkProcessor, Chunk, ChunkHandler,
    ChunkProcessor, ChunkResult, DependencyAnalysis, DependencyRepair, ExecutionEngine,
    ExecutionOpts, ExecutionReport, ExecutionResult, HandlerError, HandlerResult,
    OutputRendererPlugin, PoolKind, Priority, RenderEvent, WorkerPool,
};
pub use crate::state::{EngineEvent, StateTransition, Task, TaskOptions, TaskStatus, TransitionError};
