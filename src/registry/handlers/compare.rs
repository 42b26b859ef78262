use std::fmt::Write as _;

use crate::error::EngineError;
use crate::inference::{with_deadline, CompareRequest, Comparison, InferenceReply, InferenceRequest, LearningSequence};
use crate::parser::ParsedCommand;
use crate::registry::ExecutorFuture;
use crate::result::{CommandData, CommandResult, CompareData};
use crate::tokenizer::extract_all_references;
use crate::topics::{resolve_topic, TopicRecord};

use super::{unexpected_reply, Invocation};

pub fn execute<'a>(parsed: &'a ParsedCommand, inv: &'a Invocation<'a>) -> ExecutorFuture<'a> {
    Box::pin(compare(parsed, inv))
}

/// The two distinct references in the raw text, resolved in input order.
fn resolve_pair(text: &str, topics: &[TopicRecord]) -> Result<(TopicRecord, TopicRecord), EngineError> {
    let mut references: Vec<String> = Vec::new();
    for reference in extract_all_references(text) {
        if !references.iter().any(|r| r.eq_ignore_ascii_case(&reference)) {
            references.push(reference);
        }
    }

    let [first, second] = references.as_slice() else {
        return Err(EngineError::MissingReference {
            message: format!(
                "Compare needs exactly two topics, e.g. `/compare @Photosynthesis @Respiration` (found {}).",
                references.len()
            ),
        });
    };

    let lookup = |reference: &String| {
        resolve_topic(reference, topics)
            .cloned()
            .ok_or_else(|| EngineError::TopicNotFound {
                reference: reference.clone(),
            })
    };
    let (first, second) = (lookup(first)?, lookup(second)?);
    if first == second {
        return Err(EngineError::MissingReference {
            message: format!("Both references point to \"{}\"; pick two different topics.", first.topic_name),
        });
    }
    Ok((first, second))
}

async fn compare(parsed: &ParsedCommand, inv: &Invocation<'_>) -> Result<CommandResult, EngineError> {
    let (first, second) = resolve_pair(&parsed.original_text, &inv.context.available_topics)?;

    tracing::info!(first = %first.topic_name, second = %second.topic_name, "compare");
    let reply = with_deadline(
        "Comparison",
        inv.timeouts.compare(),
        inv.inference.infer(InferenceRequest::Compare(CompareRequest {
            first: first.clone(),
            second: second.clone(),
        })),
    )
    .await?;
    let InferenceReply::Comparison(comparison) = reply else {
        return Err(unexpected_reply(reply.kind()));
    };

    let message = render(&first, &second, &comparison);
    Ok(CommandResult::success(message).with_data(CommandData::Compare(CompareData {
        first,
        second,
        comparison,
    })))
}

fn bullets(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = write!(out, "\n\n**{heading}**");
    for item in items {
        let _ = write!(out, "\n• {item}");
    }
}

fn render(first: &TopicRecord, second: &TopicRecord, c: &Comparison) -> String {
    let mut out = format!("⚖️ **{} vs {}**", first.topic_name, second.topic_name);
    let overall = &c.overall_analysis;
    if !overall.relationship.is_empty() {
        let _ = write!(out, "\n\n{}", overall.relationship);
    }
    bullets(&mut out, "Similarities", &c.comparison.similarities);
    bullets(&mut out, "Differences", &c.comparison.differences);
    bullets(&mut out, "Complementary aspects", &c.comparison.complementary_aspects);
    bullets(
        &mut out,
        &format!("When to use {}", first.topic_name),
        &c.comparison.use_cases.when_to_use_topic1,
    );
    bullets(
        &mut out,
        &format!("When to use {}", second.topic_name),
        &c.comparison.use_cases.when_to_use_topic2,
    );

    let sequence = match overall.learning_sequence {
        LearningSequence::Topic1First => format!("learn {} first", first.topic_name),
        LearningSequence::Topic2First => format!("learn {} first", second.topic_name),
        LearningSequence::Parallel => "learn both in parallel".to_string(),
        LearningSequence::Independent => "either order works".to_string(),
    };
    if overall.recommendation.is_empty() {
        let _ = write!(out, "\n\n**Recommendation:** {sequence}");
    } else {
        let _ = write!(out, "\n\n**Recommendation:** {} ({sequence})", overall.recommendation);
    }
    out
}
