use std::collections::HashMap;
use std::future::Future;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde_json::{Map, Value};

use super::types::{Chunk, ChunkResult};

/// Results of `chunk`'s own declared dependencies that are already recorded.
pub fn dependency_context(chunk: &Chunk, results: &HashMap<String, ChunkResult>) -> Map<String, Value> {
    chunk
        .dependencies
        .iter()
        .filter_map(|dep_id| {
            results
                .get(dep_id)
                .map(|res| (dep_id.clone(), res.as_context_value()))
        })
        .collect()
}

/// Execute a single level of chunks concurrently and wait for all of them.
///
/// # Arguments
///
/// * `batch` - Chunks of this level, already carrying their dependency context
/// * `executor_fn` - Runs one chunk; bounding happens inside (worker pool)
///
/// # Returns
///
/// Map of chunk_id -> ChunkResult for every chunk in the batch. A failing
/// chunk never cuts its siblings short.
pub async fn execute_level_parallel<F, Fut>(
    batch: Vec<Chunk>,
    executor_fn: F,
) -> HashMap<String, ChunkResult>
where
    F: Fn(Chunk) -> Fut,
    Fut: Future<Output = ChunkResult>,
{
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for chunk in batch {
        let chunk_id = chunk.id.clone();
        let fut = executor_fn(chunk);
        futs.push(async move { (chunk_id, fut.await) });
    }

    let mut results = HashMap::with_capacity(futs.len());
    while let Some((chunk_id, res)) = futs.next().await {
        results.insert(chunk_id, res);
    }

    results
}
