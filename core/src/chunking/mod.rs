//! Chunk splitters.
//!
//! Text is cut into overlapping token windows that form a linear dependency
//! chain; nested maps and sequences are cut along their structure into
//! independent chunks. Both are deterministic: identical input and config
//! produce identical chunk ids.

mod structure;
mod tokens;

pub use structure::{split_by_structure, TAG_STRUCTURED};
pub use tokens::{estimate_tokens, split_by_tokens, TAG_AUTO_CHUNKED, TAG_TOKEN_BASED};

use serde_json::Value;

use crate::config::ChunkingConfig;
use crate::executor::graph::{analyze_dependencies, DependencyAnalysis};
use crate::executor::types::Chunk;

pub const TAG_SINGLE: &str = "single";

#[derive(Debug, Clone, Default)]
pub struct ChunkingEngine {
    config: ChunkingConfig,
}

impl ChunkingEngine {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn chunk_by_tokens(&self, content: &str, token_limit: usize) -> Vec<Chunk> {
        split_by_tokens(content, token_limit, self.config.overlap_ratio)
    }

    pub fn chunk_by_structure(&self, data: &Value) -> Vec<Chunk> {
        split_by_structure(data, self.config.max_chunk_size)
    }

    /// Split by content shape: strings by token window, maps and sequences
    /// by structure, anything else as one chunk. Never returns an empty list;
    /// an empty split falls back to a single chunk.
    pub fn chunk_content(&self, content: &Value, token_limit: Option<usize>) -> Vec<Chunk> {
        let chunks = match content {
            Value::String(text) => self.chunk_by_tokens(
                text,
                token_limit.unwrap_or(self.config.default_token_limit),
            ),
            Value::Object(_) | Value::Array(_) => self.chunk_by_structure(content),
            _ => Vec::new(),
        };

        if chunks.is_empty() {
            vec![single_chunk(content.clone())]
        } else {
            chunks
        }
    }

    /// Repair the dependency sets of `chunks`; see [`analyze_dependencies`].
    pub fn analyze_dependencies(&self, chunks: &mut [Chunk]) -> DependencyAnalysis {
        analyze_dependencies(chunks)
    }
}

/// The whole content as one chunk with a random id.
pub fn single_chunk(content: Value) -> Chunk {
    Chunk::new(content).tagged([TAG_SINGLE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_content_dispatch() {
        let engine = ChunkingEngine::default();

        let text = engine.chunk_content(&json!("alpha beta gamma"), Some(2));
        assert!(text.iter().all(|c| c.tags.contains(TAG_TOKEN_BASED)));
        assert_eq!(text.len(), 3);

        let structured = engine.chunk_content(&json!({"a": 1}), None);
        assert!(structured[0].tags.contains(TAG_STRUCTURED));

        let number = engine.chunk_content(&json!(7), None);
        assert_eq!(number.len(), 1);
        assert!(number[0].tags.contains(TAG_SINGLE));
    }

    #[test]
    fn test_empty_split_falls_back_to_single() {
        let engine = ChunkingEngine::default();

        for content in [json!(""), json!({}), json!([])] {
            let chunks = engine.chunk_content(&content, None);
            assert_eq!(chunks.len(), 1);
            assert!(chunks[0].tags.contains(TAG_SINGLE));
            assert_eq!(chunks[0].content, content);
        }
    }

    #[test]
    fn test_uses_configured_token_limit() {
        let engine = ChunkingEngine::new(ChunkingConfig {
            default_token_limit: 4,
            overlap_ratio: 0.0,
            ..ChunkingConfig::default()
        });
        // "word" costs 2 tokens
        let chunks = engine.chunk_content(&json!("word word word word"), None);
        assert_eq!(chunks.len(), 2);
    }
}
