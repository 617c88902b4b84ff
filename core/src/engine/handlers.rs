use serde_json::json;

use crate::executor::traits::ChunkHandler;
use crate::executor::types::Chunk;
use crate::util::content_preview;
use crate::util::time::epoch_secs;

/// Name the built-in handler is resolved under.
pub const DEFAULT_HANDLER: &str = "default";

const PREVIEW_CHARS: usize = 100;

/// Built-in handler used when a task is executed with an unregistered name.
pub fn default_handler() -> ChunkHandler {
    ChunkHandler::sync(|chunk: &Chunk| {
        Ok(json!({
            "chunk_id": chunk.id,
            "processed": true,
            "content_preview": content_preview(&chunk.content, PREVIEW_CHARS),
            "timestamp": epoch_secs(),
        }))
    })
}
