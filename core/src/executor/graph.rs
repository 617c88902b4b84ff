//! Dependency validation and level planning.
//!
//! The validator never rejects a chunk collection. Edges that can never be
//! satisfied (self-loops, unknown ids, back edges of a cycle) are removed
//! from the chunks in place and reported back as [`DependencyRepair`]s.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;

use super::types::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairReason {
    SelfLoop,
    Cycle,
    Dangling,
}

/// One removed edge: `chunk_id` no longer depends on `removed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRepair {
    pub chunk_id: String,
    pub removed: String,
    pub reason: RepairReason,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyAnalysis {
    /// chunk id -> dependency ids, guaranteed acyclic.
    pub graph: HashMap<String, BTreeSet<String>>,
    pub repairs: Vec<DependencyRepair>,
}

impl DependencyAnalysis {
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Reject collections where two chunks share an id.
pub fn check_unique_ids(chunks: &[Chunk]) -> Result<(), ExecutorError> {
    let mut seen = HashSet::with_capacity(chunks.len());
    for chunk in chunks {
        if !seen.insert(chunk.id.as_str()) {
            return Err(ExecutorError::DuplicateChunkId(chunk.id.clone()));
        }
    }
    Ok(())
}

/// Validate and repair the dependency sets of `chunks` in place.
///
/// Repairs happen in a fixed order so the outcome only depends on the input:
/// self-loops and dangling ids first, then one back edge at a time, found by
/// a DFS that visits chunks in emission order and dependencies in sorted
/// order. Each pass removes one edge, so this terminates after at most |E|
/// passes.
pub fn analyze_dependencies(chunks: &mut [Chunk]) -> DependencyAnalysis {
    let mut repairs = Vec::new();

    let known: HashSet<String> = chunks.iter().map(|c| c.id.clone()).collect();
    for chunk in chunks.iter_mut() {
        if chunk.dependencies.remove(&chunk.id) {
            repairs.push(DependencyRepair {
                chunk_id: chunk.id.clone(),
                removed: chunk.id.clone(),
                reason: RepairReason::SelfLoop,
            });
        }

        let dangling: Vec<String> = chunk
            .dependencies
            .iter()
            .filter(|dep| !known.contains(*dep))
            .cloned()
            .collect();
        for dep in dangling {
            chunk.dependencies.remove(&dep);
            repairs.push(DependencyRepair {
                chunk_id: chunk.id.clone(),
                removed: dep,
                reason: RepairReason::Dangling,
            });
        }
    }

    while let Some((from, dep)) = find_back_edge(chunks) {
        chunks[from].dependencies.remove(&dep);
        repairs.push(DependencyRepair {
            chunk_id: chunks[from].id.clone(),
            removed: dep,
            reason: RepairReason::Cycle,
        });
    }

    for repair in &repairs {
        tracing::warn!(
            chunk_id = %repair.chunk_id,
            removed = %repair.removed,
            reason = ?repair.reason,
            "removed unsatisfiable dependency"
        );
    }

    let graph = chunks
        .iter()
        .map(|c| (c.id.clone(), c.dependencies.clone()))
        .collect();

    DependencyAnalysis { graph, repairs }
}

/// True when the dependency edges of `chunks` contain a cycle.
pub fn has_cycle(chunks: &[Chunk]) -> bool {
    find_back_edge(chunks).is_some()
}

/// Iterative white/gray/black DFS. Returns the first back edge as
/// (index of the dependent chunk, dependency id).
fn find_back_edge(chunks: &[Chunk]) -> Option<(usize, String)> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(chunks.len());
    for (idx, chunk) in chunks.iter().enumerate() {
        index.entry(chunk.id.as_str()).or_insert(idx);
    }

    let mut marks = vec![Mark::White; chunks.len()];

    for root in 0..chunks.len() {
        if marks[root] != Mark::White {
            continue;
        }

        marks[root] = Mark::Gray;
        let mut stack = vec![(root, chunks[root].dependencies.iter())];

        while let Some((node, deps)) = stack.last_mut() {
            let node = *node;
            match deps.next() {
                Some(dep) => {
                    let Some(&next) = index.get(dep.as_str()) else {
                        continue;
                    };
                    match marks[next] {
                        Mark::Gray => return Some((node, dep.clone())),
                        Mark::White => {
                            marks[next] = Mark::Gray;
                            stack.push((next, chunks[next].dependencies.iter()));
                        }
                        Mark::Black => {}
                    }
                }
                None => {
                    marks[node] = Mark::Black;
                    stack.pop();
                }
            }
        }
    }

    None
}

/// Chunks dispatched together, as indices into the chunk slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLevel {
    pub chunks: Vec<usize>,
    /// Nothing was ready; the earliest remaining chunk was picked anyway.
    pub forced: bool,
}

/// Indices of every `remaining` chunk whose dependencies have all completed,
/// in dispatch order: priority first, then emission order.
pub fn ready_set(chunks: &[Chunk], remaining: &[usize], completed: &HashSet<&str>) -> Vec<usize> {
    let mut ready: Vec<usize> = remaining
        .iter()
        .copied()
        .filter(|&idx| {
            chunks[idx]
                .dependencies
                .iter()
                .all(|dep| completed.contains(dep.as_str()))
        })
        .collect();

    ready.sort_by_key(|&idx| (chunks[idx].priority, idx));
    ready
}

/// Split `chunks` into dispatch levels.
///
/// Every chunk appears in exactly one level. A level only holds chunks whose
/// dependencies all sit in earlier levels, except forced levels, which hold
/// the single earliest remaining chunk when no chunk is ready (only possible
/// when the collection skipped validation).
pub fn plan_levels(chunks: &[Chunk]) -> Vec<PlannedLevel> {
    let mut remaining: Vec<usize> = (0..chunks.len()).collect();
    let mut completed: HashSet<&str> = HashSet::with_capacity(chunks.len());
    let mut levels = Vec::new();

    while !remaining.is_empty() {
        let mut ready = ready_set(chunks, &remaining, &completed);
        let forced = ready.is_empty();
        if forced {
            ready.push(remaining[0]);
        }

        for &idx in &ready {
            completed.insert(chunks[idx].id.as_str());
        }
        remaining.retain(|idx| !ready.contains(idx));

        levels.push(PlannedLevel {
            chunks: ready,
            forced,
        });
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::Priority;
    use pretty_assertions::assert_eq;

    fn ids(chunks: &[Chunk], level: &PlannedLevel) -> Vec<String> {
        level.chunks.iter().map(|&i| chunks[i].id.clone()).collect()
    }

    #[test]
    fn test_clean_graph_is_untouched() {
        let mut chunks = vec![
            Chunk::with_id("a", ""),
            Chunk::with_id("b", "").depends_on(["a"]),
            Chunk::with_id("c", "").depends_on(["a", "b"]),
        ];
        let analysis = analyze_dependencies(&mut chunks);

        assert!(analysis.is_clean());
        assert_eq!(analysis.graph["c"].len(), 2);
        assert!(analysis.graph["a"].is_empty());
    }

    #[test]
    fn test_self_loop_removed() {
        let mut chunks = vec![Chunk::with_id("a", "").depends_on(["a"])];
        let analysis = analyze_dependencies(&mut chunks);

        assert!(chunks[0].dependencies.is_empty());
        assert_eq!(analysis.repairs[0].reason, RepairReason::SelfLoop);
    }

    #[test]
    fn test_dangling_dependency_removed() {
        let mut chunks = vec![Chunk::with_id("a", "").depends_on(["ghost"])];
        let analysis = analyze_dependencies(&mut chunks);

        assert!(chunks[0].dependencies.is_empty());
        assert_eq!(
            analysis.repairs,
            vec![DependencyRepair {
                chunk_id: "a".into(),
                removed: "ghost".into(),
                reason: RepairReason::Dangling,
            }]
        );
    }

    #[test]
    fn test_cycle_repair_is_deterministic() {
        let build = || {
            vec![
                Chunk::with_id("a", "").depends_on(["c"]),
                Chunk::with_id("b", "").depends_on(["a"]),
                Chunk::with_id("c", "").depends_on(["b"]),
            ]
        };

        let mut first = build();
        let mut second = build();
        let r1 = analyze_dependencies(&mut first);
        let r2 = analyze_dependencies(&mut second);

        assert!(!has_cycle(&first));
        assert_eq!(r1.repairs, r2.repairs);
        assert_eq!(r1.repairs.len(), 1);
        // DFS from a: a -> c -> b -> a closes at b.
        assert_eq!(r1.repairs[0].chunk_id, "b");
        assert_eq!(r1.repairs[0].removed, "a");
    }

    #[test]
    fn test_two_cycles_both_broken() {
        let mut chunks = vec![
            Chunk::with_id("a", "").depends_on(["b"]),
            Chunk::with_id("b", "").depends_on(["a"]),
            Chunk::with_id("c", "").depends_on(["d"]),
            Chunk::with_id("d", "").depends_on(["c", "a"]),
        ];
        let analysis = analyze_dependencies(&mut chunks);

        assert!(!has_cycle(&chunks));
        assert_eq!(analysis.repairs.len(), 2);
        // The edge d -> a is not part of any cycle and survives.
        assert!(chunks[3].dependencies.contains("a"));
    }

    #[test]
    fn test_no_chunk_in_own_closure_after_repair() {
        let mut chunks = vec![
            Chunk::with_id("a", "").depends_on(["d"]),
            Chunk::with_id("b", "").depends_on(["a"]),
            Chunk::with_id("c", "").depends_on(["b", "a"]),
            Chunk::with_id("d", "").depends_on(["c"]),
        ];
        analyze_dependencies(&mut chunks);

        let by_id: HashMap<&str, &Chunk> = chunks.iter().map(|c| (c.id.as_str(), c)).collect();
        for chunk in &chunks {
            let mut seen = HashSet::new();
            let mut stack: Vec<&str> = chunk.dependencies.iter().map(String::as_str).collect();
            while let Some(id) = stack.pop() {
                assert_ne!(id, chunk.id, "chunk {} reaches itself", chunk.id);
                if seen.insert(id) {
                    stack.extend(by_id[id].dependencies.iter().map(String::as_str));
                }
            }
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let chunks = vec![Chunk::with_id("a", ""), Chunk::with_id("a", "")];
        let err = check_unique_ids(&chunks).unwrap_err();
        assert!(matches!(err, ExecutorError::DuplicateChunkId(id) if id == "a"));
    }

    #[test]
    fn test_plan_fan_out() {
        let chunks = vec![
            Chunk::with_id("a", ""),
            Chunk::with_id("b", "").depends_on(["a"]),
            Chunk::with_id("c", "").depends_on(["a"]),
        ];
        let levels = plan_levels(&chunks);

        assert_eq!(levels.len(), 2);
        assert_eq!(ids(&chunks, &levels[0]), vec!["a"]);
        assert_eq!(ids(&chunks, &levels[1]), vec!["b", "c"]);
        assert!(levels.iter().all(|l| !l.forced));
    }

    #[test]
    fn test_plan_orders_ready_set_by_priority() {
        let chunks = vec![
            Chunk::with_id("low", "").with_priority(Priority::Low),
            Chunk::with_id("normal", ""),
            Chunk::with_id("critical", "").with_priority(Priority::Critical),
        ];
        let levels = plan_levels(&chunks);

        assert_eq!(levels.len(), 1);
        assert_eq!(ids(&chunks, &levels[0]), vec!["critical", "normal", "low"]);
    }

    #[test]
    fn test_plan_forces_progress_on_cycle() {
        let chunks = vec![
            Chunk::with_id("a", "").depends_on(["b"]),
            Chunk::with_id("b", "").depends_on(["a"]),
        ];
        let levels = plan_levels(&chunks);

        assert_eq!(levels.len(), 2);
        assert!(levels[0].forced);
        assert_eq!(ids(&chunks, &levels[0]), vec!["a"]);
        assert!(!levels[1].forced);
        assert_eq!(ids(&chunks, &levels[1]), vec!["b"]);
    }
}
