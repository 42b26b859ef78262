//! One executor per built-in command.

pub mod analyze;
pub mod compare;
pub mod explain;
pub mod goto;
pub mod help;
pub mod solve;
pub mod visualize;

use crate::context::{Difficulty, ExecutionContext};
use crate::error::EngineError;
use crate::inference::InferenceService;
use crate::parser::ParsedCommand;
use crate::registry::CommandRegistry;
use crate::result::{CommandData, CommandResult, StatusData};
use crate::settings::TimeoutSettings;

/// Everything an executor may read besides the parsed command.
pub struct Invocation<'a> {
    pub context: &'a ExecutionContext,
    pub inference: &'a dyn InferenceService,
    pub registry: &'a CommandRegistry,
    pub timeouts: TimeoutSettings,
    pub default_difficulty: Difficulty,
}

impl Invocation<'_> {
    /// Context difficulty, else the configured default.
    pub fn difficulty(&self) -> Difficulty {
        self.context.difficulty.unwrap_or(self.default_difficulty)
    }

    /// Previous chain step's payload as JSON, for prompts.
    pub fn prior_result(&self) -> Option<String> {
        let data = self.context.previous_command_result.as_ref()?;
        serde_json::to_string(data).ok()
    }
}

/// Result for a command whose domain logic is still a stub.
fn in_development(
    parsed: &ParsedCommand,
    inv: &Invocation<'_>,
    headline: &str,
    note: &str,
) -> CommandResult {
    let target = parsed
        .referenced_topic
        .as_ref()
        .map(|t| t.topic_name.clone())
        .or_else(|| parsed.subject().map(ToString::to_string));
    let based_on = inv.context.based_on();

    let mut message = format!("{headline}\n\n{note}");
    if let Some(target) = &target {
        message.push_str(&format!("\n\nTarget: {target}"));
    }
    if let Some(based_on) = &based_on {
        message.push_str(&format!("\n\n_{based_on}_"));
    }

    CommandResult::info(message).with_data(CommandData::Status(StatusData {
        command: parsed.command.clone(),
        target,
        note: note.to_string(),
        based_on,
    }))
}

fn unexpected_reply(kind: &str) -> EngineError {
    EngineError::Inference {
        message: format!("unexpected {kind} reply"),
    }
}
