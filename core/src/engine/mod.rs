//! Task orchestrator.
//!
//! [`Engine`] owns the task and handler registries, turns raw content into
//! chunked tasks and drives them through the executor. Clones share state.

mod events;
mod handlers;
mod run;
mod stats;

pub use handlers::{default_handler, DEFAULT_HANDLER};
pub use stats::EngineStats;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use crate::chunking::{single_chunk, ChunkingEngine};
use crate::config::AppConfig;
use crate::error::{ConfigError, EngineError};
use crate::executor::graph::check_unique_ids;
use crate::executor::traits::{ChunkHandler, OutputRendererPlugin};
use crate::executor::types::Chunk;
use crate::state::{EngineEvent, StateTransition, Task, TaskOptions, TaskStatus};

use events::EventBus;

/// Registered tasks in creation order.
#[derive(Default)]
struct TaskTable {
    tasks: HashMap<String, Task>,
    order: Vec<String>,
}

impl TaskTable {
    fn insert(&mut self, task: Task) {
        self.order.push(task.id.clone());
        self.tasks.insert(task.id.clone(), task);
    }

    fn get_mut(&mut self, task_id: &str) -> Result<&mut Task, EngineError> {
        self.tasks
            .get_mut(task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))
    }

    fn iter(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }
}

#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: AppConfig,
    chunking: ChunkingEngine,
    tasks: RwLock<TaskTable>,
    handlers: RwLock<HashMap<String, ChunkHandler>>,
    /// Cancel flags of tasks that have not reached a terminal state.
    cancel_flags: RwLock<HashMap<String, Arc<AtomicBool>>>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    events: EventBus,
}

pub struct EngineBuilder {
    config: AppConfig,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
}

impl EngineBuilder {
    /// Attach an observer for scheduler progress of every executed task.
    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        self.config.validate()?;

        let events = EventBus::new(
            self.config.executor.event_channel_capacity,
            self.config.executor.broadcast_capacity,
        );

        Ok(Engine {
            inner: Arc::new(EngineInner {
                chunking: ChunkingEngine::new(self.config.chunking.clone()),
                config: self.config,
                tasks: RwLock::new(TaskTable::default()),
                handlers: RwLock::new(HashMap::new()),
                cancel_flags: RwLock::new(HashMap::new()),
                renderer: self.renderer,
                events,
            }),
        })
    }
}

impl Engine {
    pub fn new(config: AppConfig) -> Result<Self, EngineError> {
        Self::builder(config).build()
    }

    pub fn builder(config: AppConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            renderer: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn chunking(&self) -> &ChunkingEngine {
        &self.inner.chunking
    }

    /// Split `content`, repair its dependencies and register the task.
    ///
    /// Strings are split by token window, maps and sequences by structure;
    /// anything else, or `auto_chunk = false`, becomes a single chunk.
    pub async fn create_task(
        &self,
        name: &str,
        content: Value,
        options: TaskOptions,
    ) -> Result<Task, EngineError> {
        let chunks = if options.auto_chunk {
            self.inner.chunking.chunk_content(&content, options.chunk_size)
        } else {
            vec![single_chunk(content)]
        };

        self.register_task(name, chunks, options).await
    }

    /// Register a task over caller-built chunks. Chunk ids must be unique;
    /// their dependency sets are repaired like split output.
    pub async fn create_task_from_chunks(
        &self,
        name: &str,
        chunks: Vec<Chunk>,
        options: TaskOptions,
    ) -> Result<Task, EngineError> {
        check_unique_ids(&chunks)?;
        self.register_task(name, chunks, options).await
    }

    async fn register_task(
        &self,
        name: &str,
        mut chunks: Vec<Chunk>,
        options: TaskOptions,
    ) -> Result<Task, EngineError> {
        let priority = options.resolved_priority()?;
        let max_workers = options
            .max_workers
            .unwrap_or(self.inner.config.executor.max_workers);
        if max_workers == 0 {
            return Err(ConfigError::ZeroWorkers.into());
        }

        let analysis = self.inner.chunking.analyze_dependencies(&mut chunks);

        let mut task = Task::new(name, chunks);
        task.description = options.description;
        task.priority = priority;
        task.parallel_mode = options.parallel;
        task.max_workers = max_workers;
        task.pool = options.pool.unwrap_or(self.inner.config.executor.pool);
        if !analysis.is_clean() {
            task.metadata.insert(
                "dependency_repairs".to_string(),
                serde_json::to_value(&analysis.repairs).unwrap_or_default(),
            );
        }

        tracing::info!(
            task_id = %task.id,
            name = %task.name,
            chunks = task.chunks.len(),
            repairs = analysis.repairs.len(),
            "task created"
        );

        self.inner
            .cancel_flags
            .write()
            .await
            .insert(task.id.clone(), Arc::new(AtomicBool::new(false)));
        self.inner.tasks.write().await.insert(task.clone());

        self.inner.events.emit(EngineEvent::TaskCreated {
            task_id: task.id.clone(),
            chunks: task.chunks.len(),
            timestamp: Utc::now(),
        });

        Ok(task)
    }

    /// Bind `handler` under `name`, replacing any previous binding.
    pub async fn register_handler(&self, name: impl Into<String>, handler: ChunkHandler) {
        let name = name.into();
        tracing::debug!(handler = %name, suspending = handler.is_suspending(), "handler registered");
        self.inner.handlers.write().await.insert(name, handler);
    }

    /// Registered handler for `name`, or the built-in default.
    async fn resolve_handler(&self, name: &str) -> ChunkHandler {
        if let Some(handler) = self.inner.handlers.read().await.get(name) {
            return handler.clone();
        }
        if name != DEFAULT_HANDLER {
            tracing::warn!(handler = %name, "handler not registered; using default handler");
        }
        default_handler()
    }

    /// Cancel a task.
    ///
    /// Pending tasks move straight to `CANCELLED`. For a running task this
    /// only raises its cancel flag; the scheduler stops before its next level
    /// and the task ends `CANCELLED`. Returns the status after the call.
    pub async fn cancel_task(&self, task_id: &str) -> Result<TaskStatus, EngineError> {
        let mut tasks = self.inner.tasks.write().await;
        let task = tasks.get_mut(task_id)?;

        StateTransition::validate(task.status, TaskStatus::Cancelled)?;

        if let Some(flag) = self.inner.cancel_flags.read().await.get(task_id) {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        }

        if task.status == TaskStatus::Running {
            tracing::info!(task_id, "cancel requested for running task");
            return Ok(TaskStatus::Running);
        }

        task.status = TaskStatus::Cancelled;
        task.completed_at = Some(Utc::now());
        drop(tasks);

        self.inner.cancel_flags.write().await.remove(task_id);
        tracing::info!(task_id, "task cancelled");
        self.inner.events.emit(EngineEvent::TaskCancelled {
            task_id: task_id.to_string(),
            timestamp: Utc::now(),
        });

        Ok(TaskStatus::Cancelled)
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.inner.tasks.read().await.tasks.get(task_id).cloned()
    }

    /// All tasks in creation order.
    pub async fn list_tasks(&self) -> Vec<Task> {
        self.inner.tasks.read().await.iter().cloned().collect()
    }

    pub async fn get_stats(&self) -> EngineStats {
        let tasks = self.inner.tasks.read().await;
        EngineStats::collect(tasks.iter(), self.inner.events.is_running())
    }

    /// Start the background event loop.
    pub async fn start(&self) {
        self.inner.events.start().await;
    }

    pub async fn stop(&self) {
        self.inner.events.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.inner.events.is_running()
    }

    /// Events are delivered only while the event loop runs.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Events lost because the queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.inner.events.dropped()
    }
}
