use crate::error::EngineError;
use crate::parser::ParsedCommand;
use crate::registry::ExecutorFuture;
use crate::result::CommandResult;

use super::{in_development, Invocation};

pub fn execute<'a>(parsed: &'a ParsedCommand, inv: &'a Invocation<'a>) -> ExecutorFuture<'a> {
    Box::pin(async move { solve(parsed, inv) })
}

fn solve(parsed: &ParsedCommand, inv: &Invocation<'_>) -> Result<CommandResult, EngineError> {
    tracing::info!(target_text = ?parsed.subject(), pages = ?parsed.location, "solve");
    let note = match &parsed.location {
        Some(pages) => format!("Step-by-step problem solving for page {pages} is in development."),
        None => "Step-by-step problem solving is in development.".to_string(),
    };
    Ok(in_development(parsed, inv, "🧮 **Solve**", &note))
}
