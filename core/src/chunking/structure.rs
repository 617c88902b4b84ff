//! Structural splitting for nested maps and sequences.

use serde_json::{json, Map, Value};

use crate::executor::types::Chunk;
use crate::util::{batch_id, chunk_id};

use super::tokens::TAG_AUTO_CHUNKED;

pub const TAG_STRUCTURED: &str = "structured";

/// One node that became a chunk.
struct Leaf<'a> {
    path: String,
    index: Option<usize>,
    value: &'a Value,
}

/// Walk `data` and emit one chunk per node that is small enough.
///
/// The root is always walked. Below it, a node becomes a chunk when it is a
/// scalar, an empty container, or serializes to at most `max_chunk_size`
/// bytes; larger containers are walked further. Paths use dotted keys and
/// bracketed indices (`settings.features[1]`). A scalar root yields a single
/// chunk with an empty path.
pub fn split_by_structure(data: &Value, max_chunk_size: usize) -> Vec<Chunk> {
    let mut leaves = Vec::new();

    match data {
        Value::Object(_) | Value::Array(_) => walk(data, "", max_chunk_size, &mut leaves),
        scalar => leaves.push(Leaf {
            path: String::new(),
            index: None,
            value: scalar,
        }),
    }

    let parent_id = batch_id(&data.to_string());
    let chunks: Vec<Chunk> = leaves
        .into_iter()
        .enumerate()
        .map(|(n, leaf)| {
            let mut context = Map::new();
            context.insert("path".to_string(), json!(leaf.path));
            if let Some(index) = leaf.index {
                context.insert("index".to_string(), json!(index));
            }

            let mut chunk = Chunk::with_id(
                chunk_id(&parent_id, n),
                json!({ "path": leaf.path, "value": leaf.value }),
            )
            .with_parent(parent_id.clone())
            .tagged([TAG_STRUCTURED, TAG_AUTO_CHUNKED]);
            chunk.context = context;
            chunk
        })
        .collect();

    tracing::debug!(
        parent_id = %parent_id,
        chunks = chunks.len(),
        max_chunk_size,
        "structural split finished"
    );

    chunks
}

fn walk<'a>(node: &'a Value, path: &str, max_chunk_size: usize, out: &mut Vec<Leaf<'a>>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                visit(value, child_path, None, max_chunk_size, out);
            }
        }
        Value::Array(items) => {
            for (i, value) in items.iter().enumerate() {
                visit(value, format!("{path}[{i}]"), Some(i), max_chunk_size, out);
            }
        }
        _ => {}
    }
}

fn visit<'a>(
    value: &'a Value,
    path: String,
    index: Option<usize>,
    max_chunk_size: usize,
    out: &mut Vec<Leaf<'a>>,
) {
    if is_leaf(value, max_chunk_size) {
        out.push(Leaf { path, index, value });
    } else {
        walk(value, &path, max_chunk_size, out);
    }
}

fn is_leaf(value: &Value, max_chunk_size: usize) -> bool {
    match value {
        Value::Object(map) if !map.is_empty() => serialized_len(value) <= max_chunk_size,
        Value::Array(items) if !items.is_empty() => serialized_len(value) <= max_chunk_size,
        _ => true,
    }
}

fn serialized_len(value: &Value) -> usize {
    value.to_string().len()
}
