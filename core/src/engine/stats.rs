use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::Task;

/// Engine statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_tasks: usize,
    pub total_chunks: usize,
    /// Status name -> task count. Statuses with no tasks are omitted.
    pub status_distribution: BTreeMap<String, usize>,
    pub avg_chunks_per_task: f64,
    pub engine_running: bool,
}

impl EngineStats {
    pub fn collect<'a>(tasks: impl IntoIterator<Item = &'a Task>, engine_running: bool) -> Self {
        let mut stats = Self {
            engine_running,
            ..Self::default()
        };

        for task in tasks {
            stats.total_tasks += 1;
            stats.total_chunks += task.chunks.len();
            *stats
                .status_distribution
                .entry(task.status.name().to_string())
                .or_default() += 1;
        }

        if stats.total_tasks > 0 {
            stats.avg_chunks_per_task = stats.total_chunks as f64 / stats.total_tasks as f64;
        }

        stats
    }
}
