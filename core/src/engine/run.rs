use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::executor::types::ExecutionResult;
use crate::executor::{ExecutionEngine, WorkerPool};
use crate::state::{EngineEvent, StateTransition, Task, TaskStatus};

use super::Engine;

impl Engine {
    /// Run every chunk of a pending task through the named handler.
    ///
    /// Fails only when the task does not exist, is not `PENDING`, or its
    /// worker pool cannot be built. Handler failures end up as failure
    /// markers in `results`; the task still ends `COMPLETED`.
    pub async fn execute_task(&self, task_id: &str, handler_name: &str) -> Result<Task, EngineError> {
        let (mut chunks, parallel, max_workers, pool_kind) = {
            let mut tasks = self.inner.tasks.write().await;
            let task = tasks.get_mut(task_id)?;
            StateTransition::validate(task.status, TaskStatus::Running)?;

            task.status = TaskStatus::Running;
            task.started_at = Some(Utc::now());
            (task.chunks.clone(), task.parallel_mode, task.max_workers, task.pool)
        };

        let handler = self.resolve_handler(handler_name).await;
        let cancel = self.cancel_flag(task_id).await;

        tracing::info!(
            task_id,
            handler = %handler_name,
            chunks = chunks.len(),
            parallel,
            max_workers,
            pool = %pool_kind,
            "task started"
        );
        self.inner.events.emit(EngineEvent::TaskStarted {
            task_id: task_id.to_string(),
            handler: handler_name.to_string(),
            timestamp: Utc::now(),
        });

        let pool = match WorkerPool::new(pool_kind, max_workers) {
            Ok(pool) => Arc::new(pool),
            Err(e) => {
                tracing::error!(task_id, "failed to build worker pool: {}", e);
                self.finish(task_id, TaskStatus::Failed, |task| {
                    task.metadata
                        .insert("error".to_string(), Value::String(e.to_string()));
                })
                .await?;
                return Err(e.into());
            }
        };

        let mut builder = ExecutionEngine::builder(Arc::clone(&pool))
            .run_id(task_id)
            .cancel_flag(cancel);
        if let Some(renderer) = &self.inner.renderer {
            builder = builder.renderer(Arc::clone(renderer));
        }

        let ExecutionResult { results, report } =
            builder.build().execute(&mut chunks, &handler, parallel).await;
        pool.close();

        let status = if report.cancelled {
            TaskStatus::Cancelled
        } else {
            TaskStatus::Completed
        };

        let task = self
            .finish(task_id, status, |task| {
                task.chunks = chunks;
                task.results = results;
                task.metadata
                    .insert("handler".to_string(), json!(handler_name));
                task.metadata
                    .insert("report".to_string(), json!(report));
            })
            .await?;

        Ok(task)
    }

    async fn cancel_flag(&self, task_id: &str) -> Arc<AtomicBool> {
        let mut flags = self.inner.cancel_flags.write().await;
        Arc::clone(
            flags
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        )
    }

    /// Move a running task to its terminal `status`, apply `update`, and
    /// publish the completion event.
    async fn finish<F>(&self, task_id: &str, status: TaskStatus, update: F) -> Result<Task, EngineError>
    where
        F: FnOnce(&mut Task),
    {
        let task = {
            let mut tasks = self.inner.tasks.write().await;
            let task = tasks.get_mut(task_id)?;
            StateTransition::validate(task.status, status)?;

            update(task);
            task.status = status;
            task.completed_at = Some(Utc::now());
            task.clone()
        };

        self.inner.cancel_flags.write().await.remove(task_id);

        let failed = task.failed_chunks().count();
        tracing::info!(
            task_id,
            status = %status,
            results = task.results.len(),
            failed,
            duration_ms = task.duration_ms().unwrap_or_default(),
            "task finished"
        );

        if status == TaskStatus::Cancelled {
            self.inner.events.emit(EngineEvent::TaskCancelled {
                task_id: task_id.to_string(),
                timestamp: Utc::now(),
            });
        }
        self.inner.events.emit(EngineEvent::TaskCompleted {
            task_id: task_id.to_string(),
            status,
            duration_ms: task.duration_ms(),
            timestamp: Utc::now(),
        });

        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::engine::DEFAULT_HANDLER as DEFAULT;
    use crate::executor::traits::ChunkHandler;
    use crate::executor::types::{Chunk, ChunkResult, HandlerError};
    use crate::state::TaskOptions;

    #[tokio::test]
    async fn test_execute_default_handler() {
        let engine = Engine::new(AppConfig::default()).unwrap();
        let task = engine
            .create_task("t", json!("hello world"), TaskOptions::default())
            .await
            .unwrap();

        let done = engine.execute_task(&task.id, "nope").await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.results.len(), done.chunks.len());
        assert!(done.duration_ms().is_some());
        assert_eq!(done.metadata["handler"], json!("nope"));

        let value = done.results.values().next().unwrap().value().unwrap();
        assert_eq!(value["processed"], json!(true));
    }

    #[tokio::test]
    async fn test_execute_twice_is_transition_error() {
        let engine = Engine::new(AppConfig::default()).unwrap();
        let task = engine
            .create_task("t", json!(1), TaskOptions::default())
            .await
            .unwrap();

        engine.execute_task(&task.id, DEFAULT).await.unwrap();
        let err = engine.execute_task(&task.id, DEFAULT).await.unwrap_err();
        assert!(matches!(err, EngineError::Transition(_)));
    }

    #[tokio::test]
    async fn test_execute_unknown_task() {
        let engine = Engine::new(AppConfig::default()).unwrap();
        let err = engine.execute_task("missing", DEFAULT).await.unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_suspending_handler_and_failures() {
        let engine = Engine::new(AppConfig::default()).unwrap();
        engine
            .register_handler(
                "upper",
                ChunkHandler::suspending(|chunk: Chunk| async move {
                    match chunk.text() {
                        Some("bad") => Err(HandlerError::msg("refused")),
                        Some(text) => Ok(json!(text.to_uppercase())),
                        None => Err(HandlerError::InvalidInput("not text".into())),
                    }
                }),
            )
            .await;

        let chunks = vec![
            Chunk::with_id("a", "ok"),
            Chunk::with_id("b", "bad"),
            Chunk::with_id("c", 3),
        ];
        let task = engine
            .create_task_from_chunks("mixed", chunks, TaskOptions::default())
            .await
            .unwrap();
        let done = engine.execute_task(&task.id, "upper").await.unwrap();

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.results["a"], ChunkResult::completed(json!("OK")));
        assert!(matches!(&done.results["b"], ChunkResult::Failed { kind, .. } if kind == "handler_error"));
        assert!(matches!(&done.results["c"], ChunkResult::Failed { kind, .. } if kind == "invalid_input"));
        assert_eq!(done.metadata["report"]["failed"], json!(2));
    }
}
