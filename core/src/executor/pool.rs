//! Bounded worker pool.
//!
//! Every dispatch first takes a permit from a semaphore sized to the pool
//! width, so at most `width` handlers run at once regardless of flavor.
//! Synchronous handlers then run either on tokio's blocking threads
//! ([`PoolKind::Shared`]) or on a dedicated rayon pool owned by this worker
//! pool ([`PoolKind::Isolated`]). Suspending handlers are awaited inline on
//! the caller's task.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{oneshot, Semaphore};

use crate::error::ExecutorError;

use super::traits::{ChunkHandler, ChunkProcessor};
use super::types::{Chunk, ChunkResult, PoolKind};

pub struct WorkerPool {
    kind: PoolKind,
    width: usize,
    permits: Arc<Semaphore>,
    dedicated: Option<rayon::ThreadPool>,
}

impl WorkerPool {
    pub fn new(kind: PoolKind, width: usize) -> Result<Self, ExecutorError> {
        let width = width.max(1);
        let dedicated = match kind {
            PoolKind::Shared => None,
            PoolKind::Isolated => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(width)
                    .thread_name(|i| format!("dongol-worker-{i}"))
                    .build()
                    .map_err(|e| ExecutorError::PoolBuild(e.to_string()))?,
            ),
        };

        tracing::debug!("worker pool ready (kind={}, width={})", kind, width);

        Ok(Self {
            kind,
            width,
            permits: Arc::new(Semaphore::new(width)),
            dedicated,
        })
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Handlers currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.width - self.permits.available_permits()
    }

    /// Stop handing out slots. Dispatches after this fail with
    /// [`ExecutorError::PoolClosed`].
    pub fn close(&self) {
        self.permits.close();
    }

    /// Run one handler invocation. Never fails: handler errors, panics and
    /// pool failures are all folded into the returned [`ChunkResult`].
    pub async fn run(&self, handler: &ChunkHandler, chunk: Chunk) -> ChunkResult {
        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            return ExecutorError::PoolClosed.into();
        };

        match handler {
            ChunkHandler::Suspending(processor) => {
                let chunk_id = chunk.id.clone();
                match AssertUnwindSafe(processor.process(chunk))
                    .catch_unwind()
                    .await
                {
                    Ok(res) => res.into(),
                    Err(payload) => ExecutorError::Panicked {
                        chunk_id,
                        message: panic_message(payload),
                    }
                    .into(),
                }
            }
            ChunkHandler::Sync(processor) => self.run_blocking(processor.clone(), chunk).await,
        }
    }

    async fn run_blocking(&self, processor: Arc<dyn ChunkProcessor>, chunk: Chunk) -> ChunkResult {
        let chunk_id = chunk.id.clone();

        let Some(pool) = self.dedicated.as_ref() else {
            return match tokio::task::spawn_blocking(move || processor.process(&chunk)).await {
                Ok(res) => res.into(),
                Err(e) if e.is_panic() => ExecutorError::Panicked {
                    chunk_id,
                    message: panic_message(e.into_panic()),
                }
                .into(),
                Err(e) => ExecutorError::Join(e.to_string()).into(),
            };
        };

        let (tx, rx) = oneshot::channel();
        pool.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| processor.process(&chunk)));
            let _ = tx.send(outcome);
        });

        match rx.await {
            Ok(Ok(res)) => res.into(),
            Ok(Err(payload)) => ExecutorError::Panicked {
                chunk_id,
                message: panic_message(payload),
            }
            .into(),
            Err(_) => ExecutorError::ResultDropped(chunk_id).into(),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
