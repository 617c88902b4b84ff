use chrono::Local;
use dongol_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use serde_json::{json, Value};

pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        match event {
            RenderEvent::RunStart {
                run_id,
                total_chunks,
                parallel,
            } => json!({
                "v": 1,
                "event_type": "run.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "total_chunks": total_chunks,
                    "parallel": parallel,
                }
            }),
            RenderEvent::LevelStart {
                run_id,
                level,
                chunk_ids,
            } => json!({
                "v": 1,
                "event_type": "level.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "level": level,
                    "chunks": chunk_ids,
                }
            }),
            RenderEvent::ChunkStart {
                run_id,
                chunk_id,
                level,
            } => json!({
                "v": 1,
                "event_type": "chunk.start",
                "ts": ts,
                "run_id": run_id,
                "chunk_id": chunk_id,
                "metadata": {
                    "level": level,
                }
            }),
            RenderEvent::ChunkComplete {
                run_id,
                chunk_id,
                level,
                success,
                duration_ms,
            } => json!({
                "v": 1,
                "event_type": "chunk.end",
                "ts": ts,
                "run_id": run_id,
                "chunk_id": chunk_id,
                "metadata": {
                    "level": level,
                    "success": success,
                    "duration_ms": duration_ms,
                }
            }),
            RenderEvent::ForcedProgress {
                run_id,
                chunk_id,
                remaining,
            } => json!({
                "v": 1,
                "event_type": "executor.forced_progress",
                "ts": ts,
                "run_id": run_id,
                "chunk_id": chunk_id,
                "metadata": {
                    "remaining": remaining,
                }
            }),
            RenderEvent::LevelEnd { run_id, level } => json!({
                "v": 1,
                "event_type": "level.end",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "level": level,
                }
            }),
            RenderEvent::RunEnd { run_id, report } => json!({
                "v": 1,
                "event_type": "run.end",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "levels": report.levels.len(),
                    "completed": report.completed,
                    "failed": report.failed,
                    "forced_progress": report.forced_progress,
                    "cancelled": report.cancelled,
                    "duration_ms": report.duration_ms,
                }
            }),
        }
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
