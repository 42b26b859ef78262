use crate::error::EngineError;
use crate::inference::{with_deadline, InferenceReply, InferenceRequest, VisualizeRequest};
use crate::parser::ParsedCommand;
use crate::registry::ExecutorFuture;
use crate::result::{ActionType, CommandAction, CommandData, CommandResult, VisualizeData};
use crate::tokenizer::strip_references;

use super::{unexpected_reply, Invocation};

pub fn execute<'a>(parsed: &'a ParsedCommand, inv: &'a Invocation<'a>) -> ExecutorFuture<'a> {
    Box::pin(visualize(parsed, inv))
}

async fn visualize(parsed: &ParsedCommand, inv: &Invocation<'_>) -> Result<CommandResult, EngineError> {
    let Some(topic) = parsed.referenced_topic.clone() else {
        return Err(match &parsed.topic_reference {
            Some(reference) => EngineError::TopicNotFound {
                reference: reference.clone(),
            },
            None => EngineError::MissingReference {
                message: "Visualize needs a topic, e.g. `/visualize @Photosynthesis`.".to_string(),
            },
        });
    };

    // References stay inline for this command; the query is the text around them.
    let query = parsed
        .subject()
        .map(strip_references)
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| topic.topic_name.clone());

    let request = VisualizeRequest {
        query: query.clone(),
        difficulty: inv.difficulty(),
        topic: topic.clone(),
        prior_result: inv.prior_result(),
    };

    tracing::info!(topic = %topic.topic_name, "visualize");
    let reply = with_deadline(
        "Visualization",
        inv.timeouts.visualize(),
        inv.inference.infer(InferenceRequest::Visualize(request)),
    )
    .await?;
    let InferenceReply::Diagram(diagram) = reply else {
        return Err(unexpected_reply(reply.kind()));
    };

    let mut message = format!(
        "📊 **Visualization: {}** ({})\n\n```mermaid\n{}\n```",
        topic.topic_name, diagram.diagram_type, diagram.mermaid_code
    );
    if !diagram.explanation.is_empty() {
        message.push_str(&format!("\n\n{}", diagram.explanation));
    }
    if !diagram.key_insights.is_empty() {
        message.push_str(&format!("\n\n**Key insights:** {}", diagram.key_insights));
    }

    let action = CommandAction::new(ActionType::Visualize, topic.topic_name.clone())
        .with_param("diagram_type", diagram.diagram_type.clone())
        .with_param("mermaid_code", diagram.mermaid_code.clone());

    Ok(CommandResult::success(message)
        .with_action(action)
        .with_data(CommandData::Visualize(VisualizeData {
            query,
            topic,
            diagram,
        })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::inference::tests::ScriptedInference;
    use crate::inference::Diagram;
    use crate::parser::parse;
    use crate::registry::handlers::tests::invocation;
    use crate::registry::standard_registry;
    use crate::topics::tests::topic;

    fn diagram() -> Diagram {
        Diagram {
            mermaid_code: "graph TD; Light-->Sugar".to_string(),
            diagram_type: "flowchart".to_string(),
            explanation: "Shows the flow.".to_string(),
            key_insights: String::new(),
            educational_value: String::new(),
        }
    }

    #[tokio::test]
    async fn diagram_becomes_message_action_and_data() {
        let registry = standard_registry().unwrap();
        let context = ExecutionContext {
            available_topics: vec![topic("Photosynthesis", 20, 24)],
            ..Default::default()
        };
        let inference = ScriptedInference::replying(vec![Ok(InferenceReply::Diagram(diagram()))]);
        let parsed = parse(
            &registry,
            "/visualize the light reactions of @Photosynthesis",
            &context.available_topics,
        )
        .unwrap();

        let result = execute(&parsed, &invocation(&context, &inference, &registry)).await.unwrap();
        assert!(result.message.contains("```mermaid\ngraph TD; Light-->Sugar\n```"));
        assert_eq!(result.actions[0].action, ActionType::Visualize);
        assert_eq!(result.actions[0].parameters["mermaid_code"], "graph TD; Light-->Sugar");

        let calls = inference.calls.lock();
        let InferenceRequest::Visualize(req) = &calls[0] else {
            unreachable!("visualize sends a visualize request")
        };
        assert_eq!(req.query, "the light reactions of");
        assert_eq!(req.topic.topic_name, "Photosynthesis");
    }

    #[tokio::test]
    async fn unresolved_topic_fails_without_a_call() {
        let registry = standard_registry().unwrap();
        let context = ExecutionContext::default();
        let inference = ScriptedInference::default();

        let parsed = parse(&registry, "/visualize @Nowhere", &[]).unwrap();
        let err = execute(&parsed, &invocation(&context, &inference, &registry)).await.unwrap_err();
        assert_eq!(err.to_string(), "Topic \"Nowhere\" not found in the available topics");

        let parsed = parse(&registry, "/visualize cells", &[]).unwrap();
        let err = execute(&parsed, &invocation(&context, &inference, &registry)).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingReference { .. }));
        assert_eq!(inference.call_count(), 0);
    }
}
