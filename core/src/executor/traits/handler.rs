use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::executor::types::{Chunk, HandlerError};

pub type HandlerResult = Result<Value, HandlerError>;

/// Synchronous chunk handler. Runs on a worker pool thread.
pub trait ChunkProcessor: Send + Sync {
    fn process(&self, chunk: &Chunk) -> HandlerResult;
}

impl<F> ChunkProcessor for F
where
    F: Fn(&Chunk) -> HandlerResult + Send + Sync,
{
    fn process(&self, chunk: &Chunk) -> HandlerResult {
        self(chunk)
    }
}

/// Suspending chunk handler. Awaited inline on the scheduling task.
#[async_trait]
pub trait AsyncChunkProcessor: Send + Sync {
    async fn process(&self, chunk: Chunk) -> HandlerResult;
}

struct AsyncFnProcessor<F>(F);

#[async_trait]
impl<F, Fut> AsyncChunkProcessor for AsyncFnProcessor<F>
where
    F: Fn(Chunk) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn process(&self, chunk: Chunk) -> HandlerResult {
        (self.0)(chunk).await
    }
}

/// Per-chunk handler, dispatched explicitly by variant.
#[derive(Clone)]
pub enum ChunkHandler {
    Sync(Arc<dyn ChunkProcessor>),
    Suspending(Arc<dyn AsyncChunkProcessor>),
}

impl ChunkHandler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Chunk) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(Chunk) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Suspending(Arc::new(AsyncFnProcessor(f)))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Self::Suspending(_))
    }
}

impl fmt::Debug for ChunkHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("ChunkHandler::Sync"),
            Self::Suspending(_) => f.write_str("ChunkHandler::Suspending"),
        }
    }
}
