use regex::Regex;

use crate::error::EngineError;

/// Positional captures of a successful match: group 1, 2 and 3, trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slots {
    pub action: Option<String>,
    pub target: Option<String>,
    pub location: Option<String>,
}

/// One pattern of a command. Case-insensitive; `.` also matches newlines.
///
/// Rules are anchored by their source (`^/name ...`), so a rule only ever
/// matches from the start of the input.
#[derive(Debug, Clone)]
pub struct MatchRule {
    source: String,
    regex: Regex,
}

impl MatchRule {
    pub fn new(command: &str, pattern: &str) -> Result<Self, EngineError> {
        let regex = Regex::new(&format!("(?is){pattern}")).map_err(|e| EngineError::InvalidPattern {
            command: command.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Groups 1..=3 fill `action`, `target`, `location`. A group that did not
    /// take part in the match, or captured only whitespace, leaves its slot empty.
    pub fn captures(&self, text: &str) -> Option<Slots> {
        let caps = self.regex.captures(text)?;
        let slot = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        };
        Some(Slots {
            action: slot(1),
            target: slot(2),
            location: slot(3),
        })
    }
}
