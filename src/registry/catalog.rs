use std::fmt::Write as _;

use schemars::schema_for;
use serde::Serialize;
use serde_json::Value;

use super::CommandRegistry;
use crate::context::ExecutionContext;

/// Public description of one command, for UIs and API clients.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
#[cfg_attr(feature = "server", ts(export))]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub examples: Vec<String>,
    pub patterns: Vec<String>,
}

/// Every registered command in match order.
pub fn entries(registry: &CommandRegistry) -> Vec<CatalogEntry> {
    registry
        .iter()
        .map(|d| CatalogEntry {
            name: d.name.clone(),
            description: d.description.clone(),
            examples: d.examples.clone(),
            patterns: d.patterns.iter().map(|p| p.source().to_string()).collect(),
        })
        .collect()
}

/// JSON Schema of the context object callers send with each invocation.
pub fn context_schema() -> Value {
    let root = schema_for!(ExecutionContext);
    serde_json::to_value(root).unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
}

/// Full help: every command once, with its examples, then usage tips.
pub fn help_text(registry: &CommandRegistry) -> String {
    let mut help = String::from("🤖 **Conversational Commands Help**\n\n");
    for cmd in registry.iter() {
        let _ = writeln!(help, "**/{}** - {}", cmd.name, cmd.description);
        help.push_str("Examples:\n");
        for example in &cmd.examples {
            let _ = writeln!(help, "  • `{example}`");
        }
        help.push('\n');
    }

    help.push_str("\n💡 **Tips:**\n");
    help.push_str("• Reference a topic with `@name`, e.g. `/explain @Photosynthesis`\n");
    help.push_str("• Specify page numbers for precise navigation\n");
    help.push_str("• Use \"all\" to apply actions globally\n");
    help.push_str("• **Chain commands** with \"and\", e.g. `/analyze trends and /explain results`\n");
    help.push_str("• Chained commands pass data between each other for enhanced results\n");
    help
}

/// Help for a single command, or `None` when it is not registered.
pub fn command_help(registry: &CommandRegistry, name: &str) -> Option<String> {
    let cmd = registry.get(name)?;
    let mut help = format!("**/{}** - {}\n\n**Examples:**\n", cmd.name, cmd.description);
    for example in &cmd.examples {
        let _ = writeln!(help, "• `{example}`");
    }
    Some(help)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::registry::standard_registry;

    #[test]
    fn help_lists_every_command_exactly_once() {
        let registry = standard_registry().unwrap();
        let help = help_text(&registry);
        for cmd in registry.iter() {
            let header = format!("**/{}** - ", cmd.name);
            assert_eq!(help.matches(&header).count(), 1, "{}", cmd.name);
            assert!(!cmd.examples.is_empty());
            assert!(help.contains(&format!("`{}`", cmd.examples[0])));
        }
    }

    #[test]
    fn catalog_and_schema() {
        let registry = standard_registry().unwrap();
        let entries = registry.catalog();
        assert_eq!(entries.len(), registry.len());
        assert_eq!(entries[2].name, "compare");
        assert!(entries[2].patterns[0].starts_with("^/compare"));

        let schema = context_schema();
        let properties = &schema["properties"];
        assert!(properties.get("available_topics").is_some());
        assert!(properties.get("previous_command_result").is_some());
    }

    #[test]
    fn unknown_command_has_no_help() {
        let registry = standard_registry().unwrap();
        assert!(command_help(&registry, "dance").is_none());
        assert!(command_help(&registry, "GOTO").unwrap().contains("`/goto page 42`"));
    }
}
