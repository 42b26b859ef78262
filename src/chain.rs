//! `/a ... and /b ...` detection, splitting and sequential execution.

use std::sync::LazyLock;

use regex::Regex;

use crate::context::ExecutionContext;
use crate::engine::CommandEngine;
use crate::parser::parse;
use crate::result::{ChainedCommandResult, CommandResult, ResultKind};

/// Whitespace, `and`, whitespace, then the `/` and first word character of the next command.
static DELIMITER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)\s+and\s+/\w").ok());

/// Name reported for a segment that could not be parsed at all.
const UNPARSED_STEP: &str = "unknown";

pub fn is_chained(input: &str) -> bool {
    DELIMITER.as_ref().is_some_and(|re| re.is_match(input))
}

/// Split on every delimiter, keeping each segment's leading `/`. Segments are trimmed.
pub fn split_chain(input: &str) -> Vec<String> {
    let Some(re) = DELIMITER.as_ref() else {
        return vec![input.trim().to_string()];
    };
    let mut segments = Vec::new();
    let mut start = 0;
    for m in re.find_iter(input) {
        segments.push(input.get(start..m.start()).unwrap_or_default().trim().to_string());
        // resume at the slash that opens the next command
        start = m.start() + m.as_str().rfind('/').unwrap_or_default();
    }
    segments.push(input.get(start..).unwrap_or_default().trim().to_string());
    segments
}

/// Run every segment in order. A failed step is recorded and the chain goes on;
/// only a successful step that produced data feeds the next step's context.
pub(crate) async fn execute_chain(
    engine: &CommandEngine,
    input: &str,
    context: &ExecutionContext,
) -> ChainedCommandResult {
    let segments = split_chain(input);
    tracing::info!(steps = segments.len(), "executing command chain");

    let mut threaded = context.clone();
    let mut steps: Vec<(String, CommandResult)> = Vec::with_capacity(segments.len());

    for (index, segment) in segments.iter().enumerate() {
        let Some(parsed) = parse(engine.registry(), segment, &threaded.available_topics) else {
            tracing::warn!(step = index + 1, segment = %segment, "unparseable chain segment");
            steps.push((UNPARSED_STEP.to_string(), CommandResult::error("Unknown command")));
            continue;
        };

        let result = engine.dispatch(&parsed, &threaded).await;
        if result.success {
            if let Some(data) = &result.data {
                threaded = threaded.enriched(data.clone(), &parsed.command);
            }
        } else {
            tracing::warn!(step = index + 1, command = %parsed.command, message = %result.message, "chain step failed");
        }
        steps.push((parsed.command, result));
    }

    aggregate(steps)
}

fn aggregate(steps: Vec<(String, CommandResult)>) -> ChainedCommandResult {
    let total = steps.len();
    let succeeded = steps.iter().filter(|(_, r)| r.success).count();

    let mut message = format!("🔗 **Command Chain Executed** ({succeeded}/{total} successful)\n\n");
    for (command, result) in &steps {
        let status = if result.success { "✅" } else { "❌" };
        message.push_str(&format!("{status} **/{command}**: {}\n", result.message));
    }

    let kind = if succeeded == total {
        ResultKind::Success
    } else if succeeded > 0 {
        ResultKind::Warning
    } else {
        ResultKind::Error
    };

    ChainedCommandResult {
        success: succeeded > 0,
        message,
        results: steps.into_iter().map(|(_, r)| r).collect(),
        total_executed: succeeded,
        kind,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn detection_needs_a_following_slash() {
        assert!(is_chained("/analyze trends and /explain results"));
        assert!(is_chained("/analyze trends AND   /explain results"));
        assert!(!is_chained("/analyze trends and stuff"));
        assert!(!is_chained("/compare @a and @b"));
        assert!(!is_chained("/explain sand/gravel"));
        assert!(!is_chained("/explain integer division and / operator"));
        assert!(!is_chained("/explain division and /"));
    }

    #[test]
    fn split_keeps_leading_slash() {
        assert_eq!(
            split_chain("/analyze trends and biology and /explain results And /goto 4"),
            vec!["/analyze trends and biology", "/explain results", "/goto 4"]
        );
        assert_eq!(split_chain("/help"), vec!["/help"]);
        assert_eq!(
            split_chain("/explain a and / b and /goto 2"),
            vec!["/explain a and / b", "/goto 2"]
        );
    }

    #[test]
    fn aggregate_kinds_and_counts() {
        let steps = vec![
            ("solve".to_string(), CommandResult::error("boom")),
            ("goto".to_string(), CommandResult::info("ok")),
        ];
        let chained = aggregate(steps);
        assert!(chained.success);
        assert_eq!(chained.kind, ResultKind::Warning);
        assert_eq!(chained.total_executed, 1);
        assert_eq!(chained.results.len(), 2);
        assert_eq!(
            chained.message,
            "🔗 **Command Chain Executed** (1/2 successful)\n\n❌ **/solve**: boom\n✅ **/goto**: ok\n"
        );

        let all_failed = aggregate(vec![("unknown".to_string(), CommandResult::error("Unknown command"))]);
        assert!(!all_failed.success);
        assert_eq!(all_failed.kind, ResultKind::Error);

        let all_ok = aggregate(vec![("help".to_string(), CommandResult::info("h"))]);
        assert_eq!(all_ok.kind, ResultKind::Success);
    }
}
