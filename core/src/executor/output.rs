//! Default scheduler output when no renderer plugin is installed: structured
//! log lines only.

use super::types::ExecutionReport;

pub fn emit_run_start(run_id: &str, total_chunks: usize, parallel: bool) {
    tracing::info!(
        run_id,
        total_chunks,
        parallel,
        "run started"
    );
}

pub fn emit_level_start(run_id: &str, level: usize, chunk_ids: &[String]) {
    tracing::debug!(run_id, level, "level {} dispatching [{}]", level, chunk_ids.join(", "));
}

pub fn emit_chunk_start(run_id: &str, chunk_id: &str, level: usize) {
    tracing::trace!(run_id, chunk_id, level, "chunk started");
}

pub fn emit_chunk_complete(run_id: &str, chunk_id: &str, success: bool, duration_ms: u64) {
    if success {
        tracing::debug!(run_id, chunk_id, duration_ms, "chunk completed");
    } else {
        tracing::warn!(run_id, chunk_id, duration_ms, "chunk failed");
    }
}

pub fn emit_forced_progress(run_id: &str, chunk_id: &str, remaining: usize) {
    tracing::warn!(
        run_id,
        chunk_id,
        remaining,
        "no chunk is ready; forcing progress (dependency graph was not fully resolvable)"
    );
}

pub fn emit_level_end(run_id: &str, level: usize) {
    tracing::trace!(run_id, level, "level settled");
}

pub fn emit_run_end(run_id: &str, report: &ExecutionReport) {
    tracing::info!(
        run_id,
        levels = report.levels.len(),
        completed = report.completed,
        failed = report.failed,
        forced_progress = report.forced_progress,
        cancelled = report.cancelled,
        duration_ms = report.duration_ms,
        "run finished"
    );
}
