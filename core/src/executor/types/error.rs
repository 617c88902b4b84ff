use thiserror::Error;

/// Errors returned by chunk handlers.
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("handler error: {0}")]
    Other(String),
}

impl HandlerError {
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self::Other(message.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Io(_) => "io_error",
            Self::Other(_) => "handler_error",
        }
    }

    /// Payload without the kind prefix that `Display` adds.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(m) | Self::Io(m) | Self::Other(m) => m,
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::ChunkResult;
    use serde_json::Value;

    #[test]
    fn test_failure_marker_keeps_bare_message() {
        let res: Result<Value, HandlerError> = Err(HandlerError::msg("boom"));
        assert_eq!(ChunkResult::from(res), ChunkResult::failed("handler_error", "boom"));

        let res: Result<Value, HandlerError> = Err(HandlerError::InvalidInput("not text".into()));
        assert_eq!(
            ChunkResult::from(res),
            ChunkResult::failed("invalid_input", "not text")
        );
    }

    #[test]
    fn test_display_still_names_kind() {
        let err = HandlerError::Io("disk gone".into());
        assert_eq!(err.to_string(), "io error: disk gone");
        assert_eq!(err.message(), "disk gone");
    }
}
