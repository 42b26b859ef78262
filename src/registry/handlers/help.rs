use crate::error::EngineError;
use crate::parser::ParsedCommand;
use crate::registry::{catalog, ExecutorFuture};
use crate::result::CommandResult;

use super::Invocation;

pub fn execute<'a>(parsed: &'a ParsedCommand, inv: &'a Invocation<'a>) -> ExecutorFuture<'a> {
    Box::pin(async move { help(parsed, inv) })
}

/// `/help` and `/help commands` list everything; `/help <name>` shows one command.
fn help(parsed: &ParsedCommand, inv: &Invocation<'_>) -> Result<CommandResult, EngineError> {
    let topic = parsed
        .subject()
        .map(|s| s.trim().trim_start_matches('/').to_lowercase())
        .filter(|s| !s.is_empty() && s != "commands");

    match topic {
        None => Ok(CommandResult::info(catalog::help_text(inv.registry))),
        Some(name) => match catalog::command_help(inv.registry, &name) {
            Some(text) => Ok(CommandResult::info(text)),
            None => Ok(CommandResult::error(format!(
                "Command '{name}' not found. Use /help to see all commands."
            ))),
        },
    }
}
