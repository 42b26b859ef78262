//! Pattern matching of a single (non-chained) command line.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::registry::CommandRegistry;
use crate::tokenizer::{self, Modifier};
use crate::topics::{resolve_topic, TopicRecord};

pub const CONFIDENCE_RESOLVED_TOPIC: f64 = 0.95;
pub const CONFIDENCE_PATTERN: f64 = 0.9;
pub const CONFIDENCE_FALLBACK_WITH_TOPIC: f64 = 0.6;
pub const CONFIDENCE_FALLBACK: f64 = 0.5;

/// `/word rest-of-line`, used when no registered pattern matches.
static FALLBACK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^/(\w+)(?:\s+(.*))?$").ok());

/// Outcome of parsing one command line. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub struct ParsedCommand {
    pub command: String,
    pub action: Option<String>,
    pub target: Option<String>,
    pub location: Option<String>,
    pub modifiers: Vec<Modifier>,
    /// Raw text of the first `@reference`, before resolution.
    pub topic_reference: Option<String>,
    /// Present only when `topic_reference` matched a catalog record.
    pub referenced_topic: Option<TopicRecord>,
    pub original_text: String,
    pub confidence: f64,
}

impl ParsedCommand {
    /// The free-text subject: `target`, else `action`.
    pub fn subject(&self) -> Option<&str> {
        self.target.as_deref().or(self.action.as_deref())
    }

    /// Page number from the `location` slot, when it holds a single page.
    pub fn page(&self) -> Option<u32> {
        self.location.as_deref()?.trim().parse().ok()
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

/// Parse a single command line against the registry and a topic catalog.
///
/// Returns `None` when the text does not start with `/` or matches neither a
/// registered pattern nor the generic `/word rest` fallback.
pub fn parse(registry: &CommandRegistry, input: &str, topics: &[TopicRecord]) -> Option<ParsedCommand> {
    let original = input.trim();
    if !original.starts_with('/') {
        return None;
    }

    let extraction = tokenizer::extract_reference(original);
    let topic_reference = extraction.reference;
    let referenced_topic = topic_reference
        .as_deref()
        .and_then(|r| resolve_topic(r, topics))
        .cloned();

    // Modifiers come from the cleaned text whether or not the reference resolved.
    let modifiers = tokenizer::extract_modifiers(&extraction.cleaned);

    // An unresolved reference stays in the text as a literal word.
    let text = if topic_reference.is_some() && referenced_topic.is_none() {
        tokenizer::collapse_whitespace(original)
    } else {
        extraction.cleaned
    };
    let base = |command: String, confidence: f64| ParsedCommand {
        command,
        action: None,
        target: None,
        location: None,
        modifiers: modifiers.clone(),
        topic_reference: topic_reference.clone(),
        referenced_topic: referenced_topic.clone(),
        original_text: original.to_string(),
        confidence,
    };

    let word = tokenizer::command_word(&text);

    // A topic-qualified explain takes the whole remainder as its query.
    if referenced_topic.is_some() && word.as_deref() == Some("explain") && registry.contains("explain") {
        let rest = text
            .trim_start()
            .get(1 + "explain".len()..)
            .unwrap_or_default()
            .trim();
        let mut parsed = base("explain".to_string(), CONFIDENCE_RESOLVED_TOPIC);
        parsed.target = (!rest.is_empty()).then(|| rest.to_string());
        tracing::debug!(query = ?parsed.target, "explain with resolved topic");
        return Some(parsed);
    }

    let matched = registry.iter().find_map(|descriptor| {
        descriptor
            .patterns
            .iter()
            .find_map(|rule| rule.captures(&text))
            .map(|slots| (descriptor.name.clone(), slots))
    });

    let mut parsed = if let Some((command, slots)) = matched {
        let confidence = if referenced_topic.is_some() {
            CONFIDENCE_RESOLVED_TOPIC
        } else {
            CONFIDENCE_PATTERN
        };
        let mut parsed = base(command, confidence);
        parsed.action = slots.action;
        parsed.target = slots.target;
        parsed.location = slots.location;
        parsed
    } else {
        let caps = FALLBACK.as_ref()?.captures(&text)?;
        let command = caps.get(1)?.as_str().to_lowercase();
        let confidence = if referenced_topic.is_some() {
            CONFIDENCE_FALLBACK_WITH_TOPIC
        } else {
            CONFIDENCE_FALLBACK
        };
        let mut parsed = base(command, confidence);
        parsed.target = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty());
        parsed
    };

    if let (Some(reference), None) = (&topic_reference, &parsed.referenced_topic) {
        let literal = format!("@{reference}");
        match &mut parsed.target {
            Some(target) if target.contains(&literal) => {}
            Some(target) => {
                target.push(' ');
                target.push_str(&literal);
            }
            None => parsed.target = Some(literal),
        }
    }

    tracing::debug!(
        command = %parsed.command,
        confidence = parsed.confidence,
        topic = ?parsed.referenced_topic.as_ref().map(|t| &t.topic_name),
        "parsed command"
    );
    Some(parsed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::registry::standard_registry;
    use crate::topics::tests::topic;

    fn catalog() -> Vec<TopicRecord> {
        vec![topic("biology", 10, 14), topic("Photosynthesis", 20, 24), topic("Respiration", 25, 30)]
    }

    #[test]
    fn resolved_topic_gets_highest_confidence() {
        let registry = standard_registry().unwrap();
        let topics = catalog();
        let parsed = parse(&registry, "/explain @biology", &topics).unwrap();
        assert_eq!(parsed.command, "explain");
        assert_eq!(parsed.referenced_topic.as_ref(), Some(&topics[0]));
        assert_eq!(parsed.topic_reference.as_deref(), Some("biology"));
        assert!((parsed.confidence - 0.95).abs() < f64::EPSILON);
        assert_eq!(parsed.target, None);
    }

    #[test]
    fn explain_with_topic_takes_whole_remainder() {
        let registry = standard_registry().unwrap();
        let parsed = parse(&registry, "/explain @Photosynthesis light reactions on page 3", &catalog()).unwrap();
        assert_eq!(parsed.target.as_deref(), Some("light reactions on page 3"));
        assert_eq!(parsed.location, None);
    }

    #[test]
    fn unresolved_reference_is_demoted_into_target() {
        let registry = standard_registry().unwrap();
        let parsed = parse(&registry, "/explain @nosuchtopic", &catalog()).unwrap();
        assert_eq!(parsed.command, "explain");
        assert_eq!(parsed.referenced_topic, None);
        assert!(parsed.target.as_deref().unwrap().contains("@nosuchtopic"));
        assert!((parsed.confidence - 0.9).abs() < f64::EPSILON);

        let parsed = parse(&registry, "/solve @quadratics on page 4", &catalog()).unwrap();
        assert_eq!(parsed.target.as_deref(), Some("@quadratics"));
        assert_eq!(parsed.location.as_deref(), Some("4"));
    }

    #[test]
    fn positional_slots_from_registered_pattern() {
        let registry = standard_registry().unwrap();
        let parsed = parse(&registry, "/solve all problems on page 28", &[]).unwrap();
        assert_eq!(parsed.action.as_deref(), Some("all"));
        assert_eq!(parsed.target.as_deref(), Some("problems"));
        assert_eq!(parsed.page(), Some(28));
        assert_eq!(parsed.modifiers, vec![Modifier::All]);

        let parsed = parse(&registry, "/goto page 42", &[]).unwrap();
        assert_eq!(parsed.subject(), Some("42"));
    }

    #[test]
    fn compare_keeps_references_inline() {
        let registry = standard_registry().unwrap();
        let parsed = parse(&registry, "/compare @Photosynthesis and @Respiration", &catalog()).unwrap();
        assert_eq!(parsed.command, "compare");
        assert_eq!(parsed.action.as_deref(), Some("@Photosynthesis"));
        assert_eq!(parsed.target.as_deref(), Some("@Respiration"));
        assert_eq!(parsed.referenced_topic.unwrap().topic_name, "Photosynthesis");
    }

    #[test]
    fn fallback_for_unregistered_words() {
        let registry = standard_registry().unwrap();
        let parsed = parse(&registry, "/dance wildly", &[]).unwrap();
        assert_eq!(parsed.command, "dance");
        assert_eq!(parsed.target.as_deref(), Some("wildly"));
        assert!((parsed.confidence - 0.5).abs() < f64::EPSILON);

        let parsed = parse(&registry, "/dance @biology", &catalog()).unwrap();
        assert!((parsed.confidence - 0.6).abs() < f64::EPSILON);

        // bare registered word falls through to the fallback and still names the command
        let parsed = parse(&registry, "/explain", &[]).unwrap();
        assert_eq!(parsed.command, "explain");
        assert_eq!(parsed.target, None);
    }

    #[test]
    fn rejects_non_commands() {
        let registry = standard_registry().unwrap();
        assert!(parse(&registry, "explain this", &[]).is_none());
        assert!(parse(&registry, "/", &[]).is_none());
        assert!(parse(&registry, "/ spaced out", &[]).is_none());
    }

    #[test]
    fn parsing_is_deterministic() {
        let registry = standard_registry().unwrap();
        let topics = catalog();
        let input = "/visualize all @Photosynthesis stages on page 21";
        assert_eq!(parse(&registry, input, &topics), parse(&registry, input, &topics));
    }

    #[test]
    fn reference_words_never_count_as_modifiers() {
        let registry = standard_registry().unwrap();
        let unresolved = parse(&registry, "/explain @quick-sort", &[]).unwrap();
        assert!(unresolved.modifiers.is_empty());
        assert_eq!(unresolved.target.as_deref(), Some("@quick-sort"));

        let topics = vec![topic("quick-sort", 3, 5)];
        let resolved = parse(&registry, "/explain @quick-sort", &topics).unwrap();
        assert_eq!(resolved.modifiers, unresolved.modifiers);

        let both = parse(&registry, "/explain @quick-sort step by step", &[]).unwrap();
        assert_eq!(both.modifiers, vec![Modifier::StepByStep]);
    }
}
