use crate::error::EngineError;
use crate::parser::ParsedCommand;
use crate::registry::ExecutorFuture;
use crate::result::{ActionType, CommandAction, CommandResult};

use super::{in_development, Invocation};

pub fn execute<'a>(parsed: &'a ParsedCommand, inv: &'a Invocation<'a>) -> ExecutorFuture<'a> {
    Box::pin(async move { analyze(parsed, inv) })
}

fn analyze(parsed: &ParsedCommand, inv: &Invocation<'_>) -> Result<CommandResult, EngineError> {
    tracing::info!(aspect = ?parsed.action, subject = ?parsed.subject(), "analyze");
    let result = in_development(
        parsed,
        inv,
        "🔬 **Analyze**",
        "Content analysis of trends, patterns and relationships is in development.",
    );
    Ok(match parsed.page() {
        Some(page) => result.with_action(
            CommandAction::new(ActionType::Analyze, page.to_string()).with_param("page", page),
        ),
        None => result,
    })
}
