//! Reference and modifier extraction for raw chat input.

use serde::{Deserialize, Serialize};

/// Commands whose patterns need to see `@tokens` in place.
const INLINE_REFERENCE_COMMANDS: &[&str] = &["compare", "visualize"];

/// Result of stripping `@topic` references from an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Text handed to the pattern matcher.
    pub cleaned: String,
    /// First reference found, without the `@`.
    pub reference: Option<String>,
}

/// Lowercased command word after the leading `/`, if any.
pub fn command_word(text: &str) -> Option<String> {
    let rest = text.trim_start().strip_prefix('/')?;
    let word: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if word.is_empty() {
        None
    } else {
        Some(word.to_lowercase())
    }
}

/// Byte spans of every `@` followed by one or more non-whitespace characters.
fn reference_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c != '@' {
            continue;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if next.is_whitespace() {
                break;
            }
            end = i + next.len_utf8();
            chars.next();
        }
        if end > start + 1 {
            spans.push((start, end));
        }
    }
    spans
}

/// Every reference in the text, in order of appearance, without the `@`.
pub fn extract_all_references(text: &str) -> Vec<String> {
    reference_spans(text)
        .into_iter()
        .filter_map(|(start, end)| text.get(start + 1..end))
        .map(ToString::to_string)
        .collect()
}

/// Pull the first `@reference` out of the input.
///
/// For `compare` and `visualize` the text is returned untouched; for every
/// other command all references are removed and whitespace is collapsed.
pub fn extract_reference(text: &str) -> Extraction {
    let spans = reference_spans(text);
    let Some(&(first_start, first_end)) = spans.first() else {
        return Extraction {
            cleaned: text.to_string(),
            reference: None,
        };
    };
    let reference = text.get(first_start + 1..first_end).map(ToString::to_string);

    let keep_inline = command_word(text)
        .is_some_and(|w| INLINE_REFERENCE_COMMANDS.contains(&w.as_str()));
    if keep_inline {
        return Extraction {
            cleaned: text.to_string(),
            reference,
        };
    }

    Extraction {
        cleaned: strip_references(text),
        reference,
    }
}

/// Remove every `@reference` from free text, whatever command it belongs to.
pub fn strip_references(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in reference_spans(text) {
        stripped.push_str(text.get(cursor..start).unwrap_or_default());
        stripped.push(' ');
        cursor = end;
    }
    stripped.push_str(text.get(cursor..).unwrap_or_default());
    collapse_whitespace(&stripped)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Modifiers ───────────────────────────────────────────────────

/// Fixed vocabulary of intent modifiers, declared in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub enum Modifier {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "step by step")]
    StepByStep,
    #[serde(rename = "detailed")]
    Detailed,
    #[serde(rename = "quick")]
    Quick,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::All => "all",
            Modifier::StepByStep => "step by step",
            Modifier::Detailed => "detailed",
            Modifier::Quick => "quick",
        }
    }
}

/// Scan text for modifier words. Result follows the declaration order of
/// [`Modifier`] and never holds duplicates.
pub fn extract_modifiers(text: &str) -> Vec<Modifier> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |w: &str| words.contains(&w);

    let mut found = Vec::new();
    if has("all") {
        found.push(Modifier::All);
    }
    if words
        .windows(3)
        .any(|win| matches!(win, ["step", "by", "step"]))
    {
        found.push(Modifier::StepByStep);
    }
    if has("detail") || has("detailed") {
        found.push(Modifier::Detailed);
    }
    if has("quick") || has("quickly") {
        found.push(Modifier::Quick);
    }
    found
}
