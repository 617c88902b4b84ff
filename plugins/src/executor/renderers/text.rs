use dongol_core::executor::traits::{OutputRendererPlugin, RenderEvent};

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_chunks,
                parallel,
            } => format!(
                "RUN START {} (chunks: {}, mode: {})",
                run_id,
                total_chunks,
                if *parallel { "parallel" } else { "sequential" }
            ),
            RenderEvent::LevelStart {
                run_id,
                level,
                chunk_ids,
            } => format!(
                "LEVEL START {} (level {}, chunks: {})",
                run_id,
                level,
                chunk_ids.len()
            ),
            RenderEvent::ChunkStart {
                run_id,
                chunk_id,
                level,
            } => format!("CHUNK START {} (level {}, chunk {})", run_id, level, chunk_id),
            RenderEvent::ChunkComplete {
                run_id,
                chunk_id,
                level,
                success,
                duration_ms,
            } => {
                let status = match (*success, self.ascii_only) {
                    (true, true) => "OK",
                    (true, false) => "✓ SUCCESS",
                    (false, true) => "FAIL",
                    (false, false) => "✗ FAILED",
                };
                format!(
                    "CHUNK END {} (level {}, chunk {}, status {}, duration {}ms)",
                    run_id, level, chunk_id, status, duration_ms
                )
            }
            RenderEvent::ForcedProgress {
                run_id,
                chunk_id,
                remaining,
            } => format!(
                "FORCED {} (nothing ready; running {} with {} remaining)",
                run_id, chunk_id, remaining
            ),
            RenderEvent::LevelEnd { run_id, level } => {
                format!("LEVEL END {} (level {})", run_id, level)
            }
            RenderEvent::RunEnd { run_id, report } => {
                let mut line = format!(
                    "RUN END {} (levels {}, completed {}, failed {}, duration {}ms)",
                    run_id,
                    report.levels.len(),
                    report.completed,
                    report.failed,
                    report.duration_ms
                );
                if report.forced_progress > 0 {
                    line.push_str(&format!(" forced {}", report.forced_progress));
                }
                if report.cancelled {
                    line.push_str(" CANCELLED");
                }
                line
            }
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}
