#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use dongol_core::api::{AppConfig, Chunk, ChunkHandler, Engine, HandlerError};
use serde_json::{json, Value};

pub fn engine() -> Engine {
    Engine::new(AppConfig::default()).expect("default config is valid")
}

/// Handler that records the order chunks ran in and echoes the dependency
/// results it was handed.
pub fn recording_handler() -> (ChunkHandler, Arc<Mutex<Vec<String>>>) {
    let order = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&order);
    let handler = ChunkHandler::sync(move |chunk: &Chunk| {
        seen.lock().unwrap().push(chunk.id.clone());
        let deps = chunk.dependency_results().cloned().unwrap_or_default();
        Ok(json!({ "id": chunk.id, "deps": Value::Object(deps) }))
    });
    (handler, order)
}

/// Fails for `bad_id`, echoes content otherwise.
pub fn failing_handler(bad_id: &'static str) -> ChunkHandler {
    ChunkHandler::sync(move |chunk: &Chunk| {
        if chunk.id == bad_id {
            Err(HandlerError::msg(format!("cannot process {bad_id}")))
        } else {
            Ok(chunk.content.clone())
        }
    })
}

pub fn position(order: &[String], id: &str) -> usize {
    order
        .iter()
        .position(|x| x == id)
        .unwrap_or_else(|| panic!("{id} never ran"))
}
