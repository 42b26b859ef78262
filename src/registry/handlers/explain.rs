use crate::error::EngineError;
use crate::inference::{with_deadline, ExplainRequest, InferenceReply, InferenceRequest};
use crate::parser::ParsedCommand;
use crate::registry::ExecutorFuture;
use crate::result::{ActionType, CommandAction, CommandData, CommandResult, ExplainData};

use super::{unexpected_reply, Invocation};

pub fn execute<'a>(parsed: &'a ParsedCommand, inv: &'a Invocation<'a>) -> ExecutorFuture<'a> {
    Box::pin(explain(parsed, inv))
}

async fn explain(parsed: &ParsedCommand, inv: &Invocation<'_>) -> Result<CommandResult, EngineError> {
    let topic = parsed.referenced_topic.clone();
    // Page grounding only applies without a topic: explicit page first, then the open one.
    let page_number = if topic.is_some() {
        None
    } else {
        parsed.page().or(inv.context.current_page)
    };

    if topic.is_none() && page_number.is_none() {
        return Err(EngineError::MissingReference {
            message: "Explain needs a topic or a page to work from. Reference one \
                      (`/explain @Photosynthesis`) or open a page first."
                .to_string(),
        });
    }
    let query = parsed
        .subject()
        .map(ToString::to_string)
        .or_else(|| topic.as_ref().map(|t| t.topic_name.clone()))
        .or_else(|| page_number.map(|p| format!("the content of page {p}")))
        .unwrap_or_default();

    let difficulty = inv.difficulty();
    let request = ExplainRequest {
        query: query.clone(),
        difficulty,
        topic: topic.clone(),
        page_number,
        content_id: inv.context.content_id.clone(),
        modifiers: parsed.modifiers.clone(),
        prior_result: inv.prior_result(),
    };

    tracing::info!(
        topic = ?topic.as_ref().map(|t| &t.topic_name),
        page = ?page_number,
        difficulty = difficulty.as_str(),
        "explain"
    );
    let reply = with_deadline(
        "Explanation",
        inv.timeouts.explain(),
        inv.inference.infer(InferenceRequest::Explain(request)),
    )
    .await?;
    let InferenceReply::Explanation(explanation) = reply else {
        return Err(unexpected_reply(reply.kind()));
    };

    let heading = match (&topic, page_number) {
        (Some(t), _) => format!("💡 **Explanation: {}**", t.topic_name),
        (None, Some(page)) => format!("💡 **Explanation (page {page})**"),
        (None, None) => "💡 **Explanation**".to_string(),
    };
    let mut result = CommandResult::success(format!("{heading}\n\n{explanation}"));

    if let Some(t) = &topic {
        result = result.with_action(
            CommandAction::new(ActionType::Highlight, t.topic_name.clone())
                .with_param("page_start", t.topic_page_start)
                .with_param("page_end", t.topic_page_end),
        );
    }

    Ok(result.with_data(CommandData::Explain(ExplainData {
        query,
        explanation,
        difficulty,
        topic,
        page_number,
        based_on: inv.context.based_on(),
    })))
}
