use thiserror::Error;

/// Executor-specific errors raised by the worker pool and scheduler internals.
///
/// These never abort a batch: the scheduler converts them into per-chunk
/// failure markers.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("worker pool is shut down")]
    PoolClosed,

    #[error("failed to build worker pool: {0}")]
    PoolBuild(String),

    #[error("handler panicked on chunk '{chunk_id}': {message}")]
    Panicked { chunk_id: String, message: String },

    #[error("worker join failed: {0}")]
    Join(String),

    #[error("duplicate chunk id: {0}")]
    DuplicateChunkId(String),

    #[error("worker dropped result for chunk {0}")]
    ResultDropped(String),
}

impl ExecutorError {
    /// Stable kind string recorded in chunk failure markers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Panicked { .. } => "panic",
            _ => "worker_error",
        }
    }
}
