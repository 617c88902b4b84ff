//! Batch id derivation for splitter output.
//!
//! All chunks emitted by one splitter call share a parent id derived from the
//! input, so identical input always yields identical ids.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const BATCH_BUCKETS: u64 = 10_000;

/// Stable 64-bit hash of `content` (SipHash with fixed keys).
fn content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// `batch_<hash % 10000>`
pub fn batch_id(content: &str) -> String {
    format!("batch_{}", content_hash(content) % BATCH_BUCKETS)
}

/// Id of the `index`-th chunk of a batch.
pub fn chunk_id(parent_id: &str, index: usize) -> String {
    format!("{parent_id}-{index}")
}
