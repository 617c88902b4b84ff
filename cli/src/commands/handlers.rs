use serde_json::{json, Value};

use dongol_core::engine::Engine;
use dongol_core::executor::traits::ChunkHandler;
use dongol_core::executor::types::{Chunk, HandlerError};

pub const ECHO: &str = "echo";
pub const WORD_COUNT: &str = "word-count";

/// Bind the handlers the command line can select by name.
pub async fn register_builtin(engine: &Engine) {
    engine.register_handler(ECHO, ChunkHandler::sync(echo)).await;
    engine
        .register_handler(WORD_COUNT, ChunkHandler::sync(word_count))
        .await;
}

fn echo(chunk: &Chunk) -> Result<Value, HandlerError> {
    Ok(chunk.content.clone())
}

/// Word count of a text chunk, or of the string leaf of a structured chunk.
/// Includes the running total over direct dependencies when present.
fn word_count(chunk: &Chunk) -> Result<Value, HandlerError> {
    let text = chunk
        .text()
        .or_else(|| chunk.content.get("value").and_then(Value::as_str))
        .ok_or_else(|| HandlerError::InvalidInput(format!("{} has no text", chunk.id)))?;

    let words = text.split_whitespace().count() as u64;
    let upstream: u64 = chunk
        .dependency_results()
        .map(|deps| {
            deps.values()
                .filter_map(|v| v.get("total").and_then(Value::as_u64))
                .sum()
        })
        .unwrap_or(0);

    Ok(json!({ "words": words, "total": words + upstream }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_text_and_structure() {
        let text = Chunk::with_id("a", "one two three");
        assert_eq!(word_count(&text).unwrap(), json!({"words": 3, "total": 3}));

        let leaf = Chunk::with_id("b", json!({"path": "x", "value": "four five"}));
        assert_eq!(word_count(&leaf).unwrap()["words"], json!(2));

        let number = Chunk::with_id("c", json!({"path": "y", "value": 7}));
        assert_eq!(word_count(&number).unwrap_err().kind(), "invalid_input");
    }

    #[test]
    fn test_word_count_accumulates_dependencies() {
        let chunk = Chunk::with_id("b", "x y")
            .with_context("dependencies", json!({"a": {"words": 3, "total": 3}}));
        assert_eq!(word_count(&chunk).unwrap(), json!({"words": 2, "total": 5}));
    }

    #[test]
    fn test_echo_returns_content() {
        let chunk = Chunk::with_id("a", json!({"k": 1}));
        assert_eq!(echo(&chunk).unwrap(), json!({"k": 1}));
    }
}
