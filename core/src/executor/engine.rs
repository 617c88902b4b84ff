use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::error::ExecutorError;

use super::graph::plan_levels;
use super::output;
use super::pool::WorkerPool;
use super::scheduler::{dependency_context, execute_level_parallel};
use super::traits::{ChunkHandler, OutputRendererPlugin, RenderEvent};
use super::types::{
    short_id, Chunk, ChunkResult, ExecutionOpts, ExecutionReport, ExecutionResult,
    DEPENDENCIES_KEY,
};

/// Level-synchronous scheduler over a [`WorkerPool`].
///
/// Chunks are dispatched level by level; a level only starts once every
/// chunk of the previous level has settled. Results (including failure
/// markers) are collected into one map keyed by chunk id.
pub struct ExecutionEngine {
    pool: Arc<WorkerPool>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    cancel: Option<Arc<AtomicBool>>,
    run_id: String,
}

pub struct ExecutionEngineBuilder {
    pool: Arc<WorkerPool>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    cancel: Option<Arc<AtomicBool>>,
    run_id: Option<String>,
}

impl ExecutionEngine {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self::builder(pool).build()
    }

    pub fn builder(pool: Arc<WorkerPool>) -> ExecutionEngineBuilder {
        ExecutionEngineBuilder::new(pool)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run every chunk exactly once.
    ///
    /// Parallel mode schedules by dependency level. Sequential mode (or a
    /// single chunk) runs in emission order and hands each chunk only the
    /// previous chunk's result. `chunks` receive their dependency context in
    /// place right before dispatch.
    pub async fn execute(
        &self,
        chunks: &mut [Chunk],
        handler: &ChunkHandler,
        parallel: bool,
    ) -> ExecutionResult {
        if parallel && chunks.len() > 1 {
            self.execute_parallel(chunks, handler).await
        } else {
            self.execute_sequential(chunks, handler).await
        }
    }

    pub async fn execute_parallel(
        &self,
        chunks: &mut [Chunk],
        handler: &ChunkHandler,
    ) -> ExecutionResult {
        let started = Instant::now();
        self.emit_run_start(chunks.len(), true);

        let mut results: HashMap<String, ChunkResult> = HashMap::with_capacity(chunks.len());
        let mut report = ExecutionReport::default();

        for (n, planned) in plan_levels(chunks).into_iter().enumerate() {
            if self.is_cancelled() {
                tracing::info!(run_id = %self.run_id, "cancel observed; stopping before level {}", n + 1);
                report.cancelled = true;
                break;
            }

            let level = n + 1;
            if planned.forced {
                report.forced_progress += 1;
                let chunk_id = chunks[planned.chunks[0]].id.clone();
                self.emit_forced_progress(&chunk_id, chunks.len() - results.len());
            }

            let chunk_ids: Vec<String> = planned
                .chunks
                .iter()
                .map(|&idx| chunks[idx].id.clone())
                .collect();
            self.emit_level_start(level, &chunk_ids);

            let batch: Vec<Chunk> = planned
                .chunks
                .iter()
                .map(|&idx| {
                    let ctx = dependency_context(&chunks[idx], &results);
                    chunks[idx]
                        .context
                        .insert(DEPENDENCIES_KEY.to_string(), Value::Object(ctx));
                    chunks[idx].clone()
                })
                .collect();

            let level_results =
                execute_level_parallel(batch, |chunk| self.run_chunk(handler, chunk, level)).await;

            tally(&mut report, level_results.values());
            results.extend(level_results);
            report.levels.push(chunk_ids);

            self.emit_level_end(level);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        self.emit_run_end(&report);

        ExecutionResult { results, report }
    }

    pub async fn execute_sequential(
        &self,
        chunks: &mut [Chunk],
        handler: &ChunkHandler,
    ) -> ExecutionResult {
        let started = Instant::now();
        self.emit_run_start(chunks.len(), false);

        let mut results: HashMap<String, ChunkResult> = HashMap::with_capacity(chunks.len());
        let mut report = ExecutionReport::default();
        let mut previous: Option<(String, Value)> = None;

        for idx in 0..chunks.len() {
            if self.is_cancelled() {
                tracing::info!(run_id = %self.run_id, "cancel observed; {} chunk(s) skipped", chunks.len() - idx);
                report.cancelled = true;
                break;
            }

            let level = idx + 1;
            let chunk_id = chunks[idx].id.clone();
            self.emit_level_start(level, std::slice::from_ref(&chunk_id));

            let mut ctx = Map::new();
            if let Some((prev_id, prev_value)) = previous.take() {
                ctx.insert(prev_id, prev_value);
            }
            chunks[idx]
                .context
                .insert(DEPENDENCIES_KEY.to_string(), Value::Object(ctx));

            let res = self.run_chunk(handler, chunks[idx].clone(), level).await;
            tally(&mut report, std::iter::once(&res));
            previous = Some((chunk_id.clone(), res.as_context_value()));
            results.insert(chunk_id.clone(), res);
            report.levels.push(vec![chunk_id]);

            self.emit_level_end(level);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        self.emit_run_end(&report);

        ExecutionResult { results, report }
    }

    async fn run_chunk(&self, handler: &ChunkHandler, chunk: Chunk, level: usize) -> ChunkResult {
        let chunk_id = chunk.id.clone();
        self.emit_chunk_start(&chunk_id, level);

        let started = Instant::now();
        let res = self.pool.run(handler, chunk).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if let ChunkResult::Failed { kind, message } = &res {
            if kind == "panic" || kind == "worker_error" {
                tracing::error!(run_id = %self.run_id, chunk_id = %chunk_id, kind = %kind, "{}", message);
            }
        }

        self.emit_chunk_complete(&chunk_id, level, res.is_ok(), duration_ms);
        res
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn emit_run_start(&self, total_chunks: usize, parallel: bool) {
        if let Some(renderer) = &self.renderer {
            renderer.render(&RenderEvent::RunStart {
                run_id: self.run_id.clone(),
                total_chunks,
                parallel,
            });
        } else {
            output::emit_run_start(&self.run_id, total_chunks, parallel);
        }
    }

    fn emit_level_start(&self, level: usize, chunk_ids: &[String]) {
        if let Some(renderer) = &self.renderer {
            renderer.render(&RenderEvent::LevelStart {
                run_id: self.run_id.clone(),
                level,
                chunk_ids: chunk_ids.to_vec(),
            });
        } else {
            output::emit_level_start(&self.run_id, level, chunk_ids);
        }
    }

    fn emit_chunk_start(&self, chunk_id: &str, level: usize) {
        if let Some(renderer) = &self.renderer {
            renderer.render(&RenderEvent::ChunkStart {
                run_id: self.run_id.clone(),
                chunk_id: chunk_id.to_string(),
                level,
            });
        } else {
            output::emit_chunk_start(&self.run_id, chunk_id, level);
        }
    }

    fn emit_chunk_complete(&self, chunk_id: &str, level: usize, success: bool, duration_ms: u64) {
        if let Some(renderer) = &self.renderer {
            renderer.render(&RenderEvent::ChunkComplete {
                run_id: self.run_id.clone(),
                chunk_id: chunk_id.to_string(),
                level,
                success,
                duration_ms,
            });
        } else {
            output::emit_chunk_complete(&self.run_id, chunk_id, success, duration_ms);
        }
    }

    fn emit_forced_progress(&self, chunk_id: &str, remaining: usize) {
        // Always logged, even with a renderer attached.
        output::emit_forced_progress(&self.run_id, chunk_id, remaining);
        if let Some(renderer) = &self.renderer {
            renderer.render(&RenderEvent::ForcedProgress {
                run_id: self.run_id.clone(),
                chunk_id: chunk_id.to_string(),
                remaining,
            });
        }
    }

    fn emit_level_end(&self, level: usize) {
        if let Some(renderer) = &self.renderer {
            renderer.render(&RenderEvent::LevelEnd {
                run_id: self.run_id.clone(),
                level,
            });
        } else {
            output::emit_level_end(&self.run_id, level);
        }
    }

    fn emit_run_end(&self, report: &ExecutionReport) {
        if let Some(renderer) = &self.renderer {
            renderer.render(&RenderEvent::RunEnd {
                run_id: self.run_id.clone(),
                report: report.clone(),
            });
        } else {
            output::emit_run_end(&self.run_id, report);
        }
    }
}

fn tally<'a>(report: &mut ExecutionReport, results: impl Iterator<Item = &'a ChunkResult>) {
    for res in results {
        if res.is_ok() {
            report.completed += 1;
        } else {
            report.failed += 1;
        }
    }
}

impl ExecutionEngineBuilder {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            pool,
            renderer: None,
            cancel: None,
            run_id: None,
        }
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Checked before every level; scheduling stops once it reads `true`.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn build(self) -> ExecutionEngine {
        ExecutionEngine {
            pool: self.pool,
            renderer: self.renderer,
            cancel: self.cancel,
            run_id: self.run_id.unwrap_or_else(|| format!("run-{}", short_id(8))),
        }
    }
}

/// Convenience entry point: build a pool from `opts` and run `chunks` once.
pub async fn execute_chunks(
    chunks: &mut [Chunk],
    handler: &ChunkHandler,
    opts: &ExecutionOpts,
) -> Result<ExecutionResult, ExecutorError> {
    let pool = Arc::new(WorkerPool::new(opts.pool, opts.max_workers)?);
    let engine = ExecutionEngine::new(Arc::clone(&pool));
    let result = engine.execute(chunks, handler, opts.parallel).await;
    pool.close();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::{HandlerError, PoolKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    fn engine(width: usize) -> ExecutionEngine {
        let pool = WorkerPool::new(PoolKind::Shared, width).unwrap();
        ExecutionEngine::new(Arc::new(pool))
    }

    fn echo_deps() -> ChunkHandler {
        ChunkHandler::sync(|chunk: &Chunk| {
            let deps = chunk.dependency_results().cloned().unwrap_or_default();
            Ok(json!({ "id": chunk.id, "deps": deps }))
        })
    }

    struct Recorder(Mutex<Vec<String>>);

    impl OutputRendererPlugin for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn format(&self) -> &str {
            "test"
        }

        fn render(&self, event: &RenderEvent) {
            let tag = match event {
                RenderEvent::RunStart { .. } => "run_start".to_string(),
                RenderEvent::LevelStart { level, .. } => format!("level_start:{level}"),
                RenderEvent::ChunkStart { .. } => "chunk_start".to_string(),
                RenderEvent::ChunkComplete { .. } => "chunk_complete".to_string(),
                RenderEvent::ForcedProgress { chunk_id, .. } => format!("forced:{chunk_id}"),
                RenderEvent::LevelEnd { level, .. } => format!("level_end:{level}"),
                RenderEvent::RunEnd { .. } => "run_end".to_string(),
            };
            self.0.lock().unwrap().push(tag);
        }
    }

    #[tokio::test]
    async fn test_fan_out_levels() {
        let mut chunks = vec![
            Chunk::with_id("a", "A"),
            Chunk::with_id("b", "B").depends_on(["a"]),
            Chunk::with_id("c", "C").depends_on(["a"]),
        ];
        let out = engine(4).execute(&mut chunks, &echo_deps(), true).await;

        assert_eq!(out.report.levels.len(), 2);
        assert_eq!(out.report.levels[0], vec!["a".to_string()]);
        let mut second = out.report.levels[1].clone();
        second.sort();
        assert_eq!(second, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(out.results.len(), 3);
        assert_eq!(out.report.completed, 3);
    }

    #[tokio::test]
    async fn test_chain_passes_results_forward() {
        let mut chunks = vec![
            Chunk::with_id("a", "A"),
            Chunk::with_id("b", "B").depends_on(["a"]),
            Chunk::with_id("c", "C").depends_on(["b"]),
        ];
        let out = engine(2).execute(&mut chunks, &echo_deps(), true).await;

        let b = out.results["b"].value().unwrap();
        assert_eq!(b["deps"]["a"]["id"], json!("a"));
        let c = out.results["c"].value().unwrap();
        assert_eq!(c["deps"]["b"]["id"], json!("b"));
        assert!(c["deps"].get("a").is_none());
        assert!(chunks[2].dependency_results().unwrap().contains_key("b"));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let handler = ChunkHandler::sync(|chunk: &Chunk| {
            if chunk.id == "x" {
                Err(HandlerError::msg("boom"))
            } else {
                Ok(json!(chunk.id))
            }
        });
        let mut chunks: Vec<Chunk> = ["a", "b", "x", "d", "e"]
            .into_iter()
            .map(|id| Chunk::with_id(id, id))
            .collect();
        let out = engine(4).execute(&mut chunks, &handler, true).await;

        assert_eq!(out.results.len(), 5);
        assert_eq!(out.report.failed, 1);
        assert_eq!(
            out.results["x"],
            ChunkResult::failed("handler_error", "boom")
        );
    }

    #[tokio::test]
    async fn test_failed_dependency_passes_marker() {
        let handler = ChunkHandler::sync(|chunk: &Chunk| match chunk.id.as_str() {
            "a" => Err(HandlerError::msg("bad input")),
            _ => Ok(Value::Object(
                chunk.dependency_results().cloned().unwrap_or_default(),
            )),
        });
        let mut chunks = vec![
            Chunk::with_id("a", ""),
            Chunk::with_id("b", "").depends_on(["a"]),
        ];
        let out = engine(2).execute(&mut chunks, &handler, true).await;

        let b = out.results["b"].value().unwrap();
        assert_eq!(b["a"]["status"], json!("failed"));
        assert_eq!(b["a"]["kind"], json!("handler_error"));
    }

    #[tokio::test]
    async fn test_sequential_sees_only_previous() {
        let mut chunks = vec![
            Chunk::with_id("a", ""),
            Chunk::with_id("b", ""),
            Chunk::with_id("c", ""),
        ];
        let out = engine(4).execute(&mut chunks, &echo_deps(), false).await;

        assert_eq!(out.report.levels.len(), 3);
        let a = out.results["a"].value().unwrap();
        assert_eq!(a["deps"], json!({}));
        let c = out.results["c"].value().unwrap();
        let keys: Vec<&String> = c["deps"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b"]);
    }

    #[tokio::test]
    async fn test_forced_progress_counted() {
        let mut chunks = vec![
            Chunk::with_id("a", "").depends_on(["b"]),
            Chunk::with_id("b", "").depends_on(["a"]),
        ];
        let out = engine(2).execute(&mut chunks, &echo_deps(), true).await;

        assert_eq!(out.report.forced_progress, 1);
        assert_eq!(out.results.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_flag_stops_before_first_level() {
        let flag = Arc::new(AtomicBool::new(true));
        let pool = Arc::new(WorkerPool::new(PoolKind::Shared, 2).unwrap());
        let engine = ExecutionEngine::builder(pool).cancel_flag(flag).build();

        let mut chunks = vec![Chunk::with_id("a", ""), Chunk::with_id("b", "")];
        let out = engine.execute(&mut chunks, &echo_deps(), true).await;

        assert!(out.report.cancelled);
        assert!(out.results.is_empty());
    }

    #[tokio::test]
    async fn test_renderer_event_order() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let pool = Arc::new(WorkerPool::new(PoolKind::Shared, 1).unwrap());
        let engine = ExecutionEngine::builder(pool)
            .renderer(recorder.clone())
            .run_id("t1")
            .build();

        let mut chunks = vec![
            Chunk::with_id("a", ""),
            Chunk::with_id("b", "").depends_on(["a"]),
        ];
        engine.execute(&mut chunks, &echo_deps(), true).await;

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "run_start",
                "level_start:1",
                "chunk_start",
                "chunk_complete",
                "level_end:1",
                "level_start:2",
                "chunk_start",
                "chunk_complete",
                "level_end:2",
                "run_end",
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_chunks_entry_point() {
        let mut chunks = vec![Chunk::with_id("only", "x")];
        let out = execute_chunks(&mut chunks, &echo_deps(), &ExecutionOpts::default())
            .await
            .unwrap();
        assert_eq!(out.report.completed, 1);
    }
}
