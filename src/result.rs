//! Result types returned to the chat UI.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Difficulty;
use crate::inference::{Comparison, Diagram};
use crate::topics::TopicRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub enum ResultKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub enum ActionType {
    Navigate,
    Highlight,
    Extract,
    Visualize,
    Analyze,
}

/// Instruction for the UI to apply after rendering a result. The engine never
/// performs these itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub struct CommandAction {
    #[serde(rename = "type")]
    pub action: ActionType,
    pub target: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    #[cfg_attr(feature = "server", ts(type = "Record<string, unknown>"))]
    pub parameters: IndexMap<String, Value>,
}

impl CommandAction {
    pub fn new(action: ActionType, target: impl Into<String>) -> Self {
        Self {
            action,
            target: target.into(),
            parameters: IndexMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }
}

// ── Payloads ────────────────────────────────────────────────────

/// Typed payload of a successful command, one variant per command family.
/// Threaded into the next step of a chain as `previous_command_result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub enum CommandData {
    Explain(ExplainData),
    Visualize(VisualizeData),
    Compare(CompareData),
    Status(StatusData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct ExplainData {
    pub query: String,
    pub explanation: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<TopicRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub based_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct VisualizeData {
    pub query: String,
    pub topic: TopicRecord,
    pub diagram: Diagram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct CompareData {
    pub first: TopicRecord,
    pub second: TopicRecord,
    pub comparison: Comparison,
}

/// Payload of the commands whose domain logic is still a stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct StatusData {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub based_on: Option<String>,
}

// ── Command result ──────────────────────────────────────────────

/// Terminal value of one command execution. `message` is markdown for the chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CommandData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<CommandAction>,
}

impl CommandResult {
    fn new(success: bool, message: impl Into<String>, kind: ResultKind) -> Self {
        Self {
            success,
            message: message.into(),
            kind,
            data: None,
            actions: Vec::new(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(true, message, ResultKind::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(true, message, ResultKind::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(false, message, ResultKind::Error)
    }

    pub fn with_data(mut self, data: CommandData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_action(mut self, action: CommandAction) -> Self {
        self.actions.push(action);
        self
    }
}

impl From<crate::error::EngineError> for CommandResult {
    fn from(e: crate::error::EngineError) -> Self {
        CommandResult::error(e.to_string())
    }
}

/// Aggregate of a `/a ... and /b ...` chain, one entry per segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub struct ChainedCommandResult {
    pub success: bool,
    pub message: String,
    pub results: Vec<CommandResult>,
    /// Number of steps that succeeded.
    pub total_executed: usize,
    #[serde(rename = "type")]
    pub kind: ResultKind,
}

/// What `CommandEngine::execute` hands back to the chat layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub enum CommandOutcome {
    Chained(ChainedCommandResult),
    Single(CommandResult),
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        match self {
            CommandOutcome::Single(r) => r.success,
            CommandOutcome::Chained(c) => c.success,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CommandOutcome::Single(r) => &r.message,
            CommandOutcome::Chained(c) => &c.message,
        }
    }

    pub fn kind(&self) -> ResultKind {
        match self {
            CommandOutcome::Single(r) => r.kind,
            CommandOutcome::Chained(c) => c.kind,
        }
    }
}
