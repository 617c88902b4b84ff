//! Dependency-ordered chunk executor.
//!
//! ```text
//! Vec<Chunk>
//!   ↓
//! graph::analyze_dependencies()  → repaired, acyclic dependency sets
//!   ↓
//! graph::plan_levels()           → Vec<PlannedLevel> (forced levels flagged)
//!   ↓
//! ExecutionEngine::execute()     → ExecutionResult { results, report }
//!   ↓ per level
//! WorkerPool::run()              → ChunkResult (bounded by pool width)
//! ```

mod engine;
pub mod graph;
mod output;
mod pool;
mod scheduler;
pub mod traits;
pub mod types;

pub use engine::{execute_chunks, ExecutionEngine, ExecutionEngineBuilder};
pub use graph::{
    analyze_dependencies, check_unique_ids, has_cycle, plan_levels, DependencyAnalysis,
    DependencyRepair, PlannedLevel, RepairReason,
};
pub use pool::WorkerPool;
pub use scheduler::{dependency_context, execute_level_parallel};
pub use traits::{
    AsyncChunkProcessor, ChunkHandler, ChunkProcessor, HandlerResult, OutputRendererPlugin,
    RenderEvent,
};
pub use types::{
    Chunk, ChunkResult, ExecutionOpts, ExecutionReport, ExecutionResult, HandlerError, PoolKind,
    Priority,
};
