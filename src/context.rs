use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::result::CommandData;
use crate::topics::TopicRecord;

/// Audience level for generated explanations and diagrams.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }
}

/// Metadata about the document the user is studying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub struct ContentData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Per-invocation context supplied by the chat layer.
///
/// The engine only reads it. Chains work on an enriched clone so the caller's
/// value is never touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub struct ExecutionContext {
    #[serde(default)]
    pub content_data: Option<ContentData>,
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub available_topics: Vec<TopicRecord>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub previous_command_result: Option<CommandData>,
    #[serde(default)]
    pub previous_command_type: Option<String>,
}

impl ExecutionContext {
    /// Copy of this context carrying a previous step's output.
    pub fn enriched(&self, data: CommandData, command: &str) -> ExecutionContext {
        ExecutionContext {
            previous_command_result: Some(data),
            previous_command_type: Some(command.to_string()),
            ..self.clone()
        }
    }

    /// Short note describing how a previous chain step feeds this one.
    pub fn based_on(&self) -> Option<String> {
        self.previous_command_result.as_ref()?;
        let previous = self.previous_command_type.as_deref().unwrap_or("previous");
        Some(format!("Built on /{previous} results"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::result::StatusData;

    #[test]
    fn enriched_leaves_original_untouched() {
        let original = ExecutionContext {
            current_page: Some(4),
            ..Default::default()
        };
        let data = CommandData::Status(StatusData {
            command: "analyze".to_string(),
            target: None,
            note: "n".to_string(),
            based_on: None,
        });
        let next = original.enriched(data.clone(), "analyze");

        assert_eq!(original.previous_command_result, None);
        assert_eq!(next.previous_command_result, Some(data));
        assert_eq!(next.previous_command_type.as_deref(), Some("analyze"));
        assert_eq!(next.current_page, Some(4));
        assert_eq!(next.based_on().as_deref(), Some("Built on /analyze results"));
        assert_eq!(original.based_on(), None);
    }

    #[test]
    fn deserializes_sparse_json() {
        let ctx: ExecutionContext =
            serde_json::from_str(r#"{"current_page": 3, "difficulty": "expert"}"#).unwrap();
        assert_eq!(ctx.current_page, Some(3));
        assert_eq!(ctx.difficulty, Some(Difficulty::Expert));
        assert!(ctx.available_topics.is_empty());
    }
}
