use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::util::time::epoch_secs;

/// Context key under which the scheduler publishes dependency results.
pub const DEPENDENCIES_KEY: &str = "dependencies";

/// Scheduling hint. Lower ordinal runs earlier within a ready set; it never
/// overrides dependency order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
    Background = 4,
}

impl Priority {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Normal => "NORMAL",
            Self::Low => "LOW",
            Self::Background => "BACKGROUND",
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Critical),
            1 => Ok(Self::High),
            2 => Ok(Self::Normal),
            3 => Ok(Self::Low),
            4 => Ok(Self::Background),
            other => Err(ConfigError::Priority(other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Smallest schedulable unit of work.
///
/// Everything except `context` is fixed once the splitter (or caller) emits
/// the chunk. `context` is written by the scheduler right before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,

    #[serde(default)]
    pub content: Value,

    #[serde(default)]
    pub parent_id: Option<String>,

    /// Ids of chunks that must complete first. Ordered so that iteration and
    /// serialization are deterministic.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default = "default_estimated_duration_ms")]
    pub estimated_duration_ms: u64,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub context: Map<String, Value>,

    /// Seconds since the Unix epoch.
    #[serde(default = "epoch_secs")]
    pub created_at: f64,
}

fn default_estimated_duration_ms() -> u64 {
    1000
}

/// Short random id, used when the caller does not name a chunk.
pub fn short_id(len: usize) -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(len);
    id
}

impl Chunk {
    /// Chunk with a random 8-character id.
    pub fn new(content: impl Into<Value>) -> Self {
        Self::with_id(short_id(8), content)
    }

    pub fn with_id(id: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            parent_id: None,
            dependencies: BTreeSet::new(),
            priority: Priority::default(),
            estimated_duration_ms: default_estimated_duration_ms(),
            tags: BTreeSet::new(),
            context: Map::new(),
            created_at: epoch_secs(),
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn tagged<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Content as text, if it is a JSON string.
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }

    /// Results of this chunk's dependencies, as injected by the scheduler.
    pub fn dependency_results(&self) -> Option<&Map<String, Value>> {
        self.context.get(DEPENDENCIES_KEY).and_then(Value::as_object)
    }

    /// Structural path recorded by the structural splitter.
    pub fn path(&self) -> Option<&str> {
        self.context.get("path").and_then(Value::as_str)
    }

    /// Wire form for cross-boundary transfer. Sets serialize as sorted lists.
    pub fn to_json(&self) -> Value {
        // Every field is a plain JSON type; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_from_ordinal() {
        assert_eq!(Priority::try_from(0).unwrap(), Priority::Critical);
        assert_eq!(Priority::try_from(4).unwrap(), Priority::Background);
        assert!(Priority::try_from(5).is_err());
        assert!(Priority::Critical < Priority::Background);
    }

    #[test]
    fn test_chunk_serialization_shape() {
        let chunk = Chunk::with_id("test-123", "hello")
            .depends_on(["b", "a"])
            .tagged(["test", "demo"]);
        let data = chunk.to_json();

        assert_eq!(data["id"], "test-123");
        assert_eq!(data["content"], "hello");
        assert_eq!(data["priority"], "NORMAL");
        assert_eq!(data["estimated_duration_ms"], 1000);
        assert_eq!(data["dependencies"], json!(["a", "b"]));
        assert!(data["tags"].is_array());
        assert!(data["created_at"].as_f64().unwrap() > 0.0);
        assert!(data["parent_id"].is_null());
    }

    #[test]
    fn test_chunk_json_preserves_identity() {
        let chunk = Chunk::with_id("c1", json!({"path": "a.x", "value": 1}))
            .depends_on(["a", "b"])
            .tagged(["structured"])
            .with_priority(Priority::High);

        let back = Chunk::from_json(chunk.to_json()).unwrap();
        assert_eq!(back.id, chunk.id);
        assert_eq!(back.content, chunk.content);
        assert_eq!(back.dependencies, chunk.dependencies);
        assert_eq!(back.tags, chunk.tags);
        assert_eq!(back.priority, Priority::High);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let chunk = Chunk::from_json(json!({"id": "bare"})).unwrap();
        assert_eq!(chunk.content, Value::Null);
        assert!(chunk.dependencies.is_empty());
        assert_eq!(chunk.priority, Priority::Normal);
        assert_eq!(chunk.estimated_duration_ms, 1000);
    }

    #[test]
    fn test_short_id_length() {
        assert_eq!(short_id(8).len(), 8);
        assert_eq!(Chunk::new("x").id.len(), 8);
    }
}
