use serde_json::Value;

/// First `max_chars` characters of `value`: strings as-is, everything else
/// in compact JSON form. `None` for null or empty content.
pub fn content_preview(value: &Value, max_chars: usize) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if text.is_empty() {
        return None;
    }

    Some(text.chars().take(max_chars).collect())
}
