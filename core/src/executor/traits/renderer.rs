use crate::executor::types::ExecutionReport;

/// Observer for scheduler progress (controls output format).
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Scheduler events, keyed by the run id (the task id).
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        total_chunks: usize,
        parallel: bool,
    },
    LevelStart {
        run_id: String,
        level: usize,
        chunk_ids: Vec<String>,
    },
    ChunkStart {
        run_id: String,
        chunk_id: String,
        level: usize,
    },
    ChunkComplete {
        run_id: String,
        chunk_id: String,
        level: usize,
        success: bool,
        duration_ms: u64,
    },
    /// Nothing was ready; `chunk_id` was dispatched anyway.
    ForcedProgress {
        run_id: String,
        chunk_id: String,
        remaining: usize,
    },
    LevelEnd {
        run_id: String,
        level: usize,
    },
    RunEnd {
        run_id: String,
        report: ExecutionReport,
    },
}

impl RenderEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStart { run_id, .. }
            | Self::LevelStart { run_id, .. }
            | Self::ChunkStart { run_id, .. }
            | Self::ChunkComplete { run_id, .. }
            | Self::ForcedProgress { run_id, .. }
            | Self::LevelEnd { run_id, .. }
            | Self::RunEnd { run_id, .. } => run_id,
        }
    }
}
