//! Topic catalog lookup.
//!
//! The catalog is owned by the caller and handed in per invocation; nothing
//! here caches or mutates it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One topic extracted from a piece of content, with the page span it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub struct TopicRecord {
    pub topic_name: String,
    pub topic_page_start: u32,
    pub topic_page_end: u32,
    #[serde(default)]
    pub topic_summary: String,
}

impl TopicRecord {
    /// Pages covered by this topic, inclusive. A reversed span yields only the start page.
    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.topic_page_start..=self.topic_page_end.max(self.topic_page_start)
    }
}

/// Resolve a reference (the text after `@`) against the catalog.
///
/// Case-insensitive exact match first, then the first record whose name contains
/// the reference or is contained in it. Ties go to catalog order, so "math" may
/// bind to "Mathematics" when that record comes first.
pub fn resolve_topic<'a>(reference: &str, topics: &'a [TopicRecord]) -> Option<&'a TopicRecord> {
    let needle = reference.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(exact) = topics
        .iter()
        .find(|t| t.topic_name.to_lowercase() == needle)
    {
        return Some(exact);
    }

    topics.iter().find(|t| {
        let name = t.topic_name.to_lowercase();
        !name.is_empty() && (name.contains(&needle) || needle.contains(&name))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn topic(name: &str, start: u32, end: u32) -> TopicRecord {
        TopicRecord {
            topic_name: name.to_string(),
            topic_page_start: start,
            topic_page_end: end,
            topic_summary: format!("All about {name}"),
        }
    }

    #[test]
    fn exact_match_wins_over_earlier_substring() {
        let topics = vec![topic("Mathematics", 1, 4), topic("math", 5, 6)];
        let found = resolve_topic("MATH", &topics).unwrap();
        assert_eq!(found.topic_name, "math");
    }

    #[test]
    fn substring_either_direction_in_catalog_order() {
        let topics = vec![topic("Cell Biology", 1, 9), topic("Biology", 10, 12)];
        // reference inside name: first record wins
        assert_eq!(resolve_topic("bio", &topics).unwrap().topic_name, "Cell Biology");
        // name inside reference
        let topics = vec![topic("photosynthesis", 3, 5)];
        assert_eq!(
            resolve_topic("photosynthesis-basics", &topics).unwrap().topic_name,
            "photosynthesis"
        );
    }

    #[test]
    fn no_match_and_empty_reference() {
        let topics = vec![topic("Biology", 1, 2)];
        assert!(resolve_topic("nosuchtopic", &topics).is_none());
        assert!(resolve_topic("", &topics).is_none());
        assert!(resolve_topic("bio", &[]).is_none());
    }

    #[test]
    fn reversed_page_span_is_clamped() {
        let t = topic("x", 7, 3);
        assert_eq!(t.pages().collect::<Vec<_>>(), vec![7]);
    }
}
