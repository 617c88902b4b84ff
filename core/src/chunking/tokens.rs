//! Token-window splitting for text content.

use serde_json::json;

use crate::executor::types::Chunk;
use crate::util::{batch_id, chunk_id};

pub const TAG_AUTO_CHUNKED: &str = "auto_chunked";
pub const TAG_TOKEN_BASED: &str = "token_based";

/// Rough token cost of one whitespace-delimited word.
pub fn estimate_tokens(word: &str) -> usize {
    word.chars().count() / 4 + 1
}

/// Split `content` into overlapping windows of at most `token_limit`
/// estimated tokens.
///
/// A window is emitted as soon as the next word would push it over the limit.
/// The next window is seeded with the trailing `floor(len * overlap_ratio)`
/// words of the previous one. A word larger than the limit still gets its own
/// window. The seed words are not re-checked against the limit, so a window
/// that starts from an overlap can exceed it by the next word even when no
/// single word is oversized. Every chunk after the first depends on its
/// predecessor.
///
/// Returns no chunks for blank content.
pub fn split_by_tokens(content: &str, token_limit: usize, overlap_ratio: f64) -> Vec<Chunk> {
    let token_limit = token_limit.max(1);
    let mut windows: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for word in content.split_whitespace() {
        let word_tokens = estimate_tokens(word);

        if current_tokens + word_tokens > token_limit && !current.is_empty() {
            windows.push(current.join(" "));

            let keep_from = current.len() - overlap_len(current.len(), overlap_ratio);
            current.drain(..keep_from);
            current_tokens = current.iter().map(|w| estimate_tokens(w)).sum();
        }

        current.push(word);
        current_tokens += word_tokens;
    }

    if !current.is_empty() {
        windows.push(current.join(" "));
    }

    let parent_id = batch_id(content);
    let mut chunks: Vec<Chunk> = Vec::with_capacity(windows.len());

    for (index, window) in windows.into_iter().enumerate() {
        let mut chunk = Chunk::with_id(chunk_id(&parent_id, index), window)
            .with_parent(parent_id.clone())
            .tagged([TAG_AUTO_CHUNKED, TAG_TOKEN_BASED])
            .with_context("index", json!(index));

        if let Some(prev) = chunks.last() {
            chunk.dependencies.insert(prev.id.clone());
        }
        chunks.push(chunk);
    }

    tracing::debug!(
        parent_id = %parent_id,
        chunks = chunks.len(),
        token_limit,
        "token split finished"
    );

    chunks
}

/// Number of trailing words carried into the next window.
fn overlap_len(len: usize, overlap_ratio: f64) -> usize {
    let ratio = overlap_ratio.clamp(0.0, 1.0);
    ((len as f64 * ratio).floor() as usize).min(len.saturating_sub(1))
}
