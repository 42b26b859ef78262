use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Structured error type for the command engine. Serialized as `{code, detail}`
/// so the chat UI can match on error codes instead of parsing messages.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum EngineError {
    #[error(
        "Invalid command format. Commands should start with \"/\" followed by an action. Available commands: {}",
        available.join(", ")
    )]
    MalformedInput { available: Vec<String> },
    #[error("Unknown command: /{name}. Available commands: {}", available.join(", "))]
    UnknownCommand { name: String, available: Vec<String> },
    #[error("{message}")]
    MissingReference { message: String },
    #[error("Topic \"{reference}\" not found in the available topics")]
    TopicNotFound { reference: String },
    #[error("Invalid pattern for /{command}: {message}")]
    InvalidPattern { command: String, message: String },
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        operation: String,
        #[serde(serialize_with = "serialize_secs")]
        after: Duration,
    },
    #[error("Inference error: {message}")]
    Inference { message: String },
    #[error("Inference service unavailable: {message}")]
    InferenceUnavailable { message: String },
    #[error("Content error: {message}")]
    Content { message: String },
    #[error("/{command} panicked during execution")]
    ExecutorPanicked { command: String },
    #[error("I/O error: {message}")]
    Io { message: String },
    #[error("Invalid settings: {message}")]
    Settings { message: String },
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io {
            message: e.to_string(),
        }
    }
}

impl From<crate::storage::StorageError> for EngineError {
    fn from(e: crate::storage::StorageError) -> Self {
        match e {
            crate::storage::StorageError::Io(io_err) => EngineError::Io {
                message: io_err.to_string(),
            },
            crate::storage::StorageError::Json(json_err) => EngineError::Settings {
                message: json_err.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Inference {
            message: e.to_string(),
        }
    }
}

/// Allow converting EngineError to String for CLI and HTTP error bodies.
impl From<EngineError> for String {
    fn from(e: EngineError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_lists_available() {
        let err = EngineError::UnknownCommand {
            name: "dance".to_string(),
            available: vec!["explain".to_string(), "help".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown command: /dance. Available commands: explain, help"
        );
    }

    #[test]
    fn serializes_as_code_and_detail() {
        let err = EngineError::Timeout {
            operation: "Explanation".to_string(),
            after: Duration::from_secs(120),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "Timeout");
        assert_eq!(json["detail"]["after"], 120);
        assert_eq!(err.to_string(), "Explanation timed out after 120s");
    }
}
