use crate::error::EngineError;
use crate::parser::ParsedCommand;
use crate::registry::ExecutorFuture;
use crate::result::{ActionType, CommandAction, CommandResult};

use super::{in_development, Invocation};

pub fn execute<'a>(parsed: &'a ParsedCommand, inv: &'a Invocation<'a>) -> ExecutorFuture<'a> {
    Box::pin(async move { goto(parsed, inv) })
}

/// Page to jump to: a numeric target, or the first page of a referenced topic.
/// `chapter 5` and friends name a section, not a page.
fn destination(parsed: &ParsedCommand) -> Option<u32> {
    if let Some(topic) = &parsed.referenced_topic {
        return Some(topic.topic_page_start);
    }
    let qualifier = parsed.action.as_deref().map(str::trim);
    if qualifier.is_some_and(|q| !q.eq_ignore_ascii_case("page") && !q.eq_ignore_ascii_case("the")) {
        return None;
    }
    parsed.target.as_deref()?.trim().parse().ok()
}

fn goto(parsed: &ParsedCommand, inv: &Invocation<'_>) -> Result<CommandResult, EngineError> {
    let page = destination(parsed);
    tracing::info!(page = ?page, subject = ?parsed.subject(), "goto");

    if page == Some(0) {
        return Ok(CommandResult::error("Page numbers start at 1."));
    }
    if let Some(page) = page {
        if let Some(total) = inv
            .context
            .content_data
            .as_ref()
            .and_then(|c| c.total_pages)
        {
            if page > total {
                return Ok(CommandResult::error(format!(
                    "Page {page} is out of range (1-{total})."
                )));
            }
        }
    }

    let result = in_development(
        parsed,
        inv,
        "📖 **Goto**",
        "Navigation by section and chapter name is in development.",
    );
    Ok(match page {
        Some(page) => result.with_action(
            CommandAction::new(ActionType::Navigate, page.to_string()).with_param("page", page),
        ),
        None => result,
    })
}
