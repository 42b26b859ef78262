pub mod catalog;
pub mod handlers;
pub mod rules;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;

use crate::error::EngineError;
use crate::parser::ParsedCommand;
use crate::result::CommandResult;

use handlers::Invocation;
use rules::MatchRule;

/// Future returned by every executor.
pub type ExecutorFuture<'a> = BoxFuture<'a, Result<CommandResult, EngineError>>;

/// Entry point of one command. An `Err` is folded into an error result by the engine.
pub type Executor = for<'a> fn(&'a ParsedCommand, &'a Invocation<'a>) -> ExecutorFuture<'a>;

/// A registered command: its patterns (most specific first), examples and executor.
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    pub patterns: Vec<MatchRule>,
    pub examples: Vec<String>,
    pub executor: Executor,
}

impl CommandDescriptor {
    pub fn new(
        name: &str,
        description: &str,
        patterns: &[&str],
        examples: &[&str],
        executor: Executor,
    ) -> Result<Self, EngineError> {
        let name = name.to_lowercase();
        let patterns = patterns
            .iter()
            .map(|p| MatchRule::new(&name, p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            description: description.to_string(),
            patterns,
            examples: examples.iter().map(ToString::to_string).collect(),
            executor,
        })
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("patterns", &self.patterns.len())
            .finish_non_exhaustive()
    }
}

/// Collects descriptors before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    commands: IndexMap<String, CommandDescriptor>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Registering a name twice replaces the earlier descriptor
    /// but keeps its original position in the match order.
    pub fn register(mut self, descriptor: CommandDescriptor) -> Self {
        if self.commands.contains_key(&descriptor.name) {
            tracing::debug!(command = %descriptor.name, "replacing registered command");
        }
        self.commands.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn build(self) -> CommandRegistry {
        CommandRegistry {
            commands: self.commands,
        }
    }
}

/// Immutable name → descriptor table, iterated in registration order.
///
/// There is no way to add or remove commands once built; share it behind an `Arc`.
#[derive(Debug)]
pub struct CommandRegistry {
    commands: IndexMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Public description of every command, in match order.
    pub fn catalog(&self) -> Vec<catalog::CatalogEntry> {
        catalog::entries(self)
    }
}

// ── standard_commands! macro ────────────────────────────────────

/// Single table of the built-in commands. Generates `standard_registry()`,
/// registering each command in the order written here.
macro_rules! standard_commands {
    (
        $(
            $name:literal => $executor:path, $description:literal ;
            patterns [ $( $pattern:literal ),+ $(,)? ]
            examples [ $( $example:literal ),+ $(,)? ]
        )*
    ) => {
        /// The built-in command set.
        pub fn standard_registry() -> Result<CommandRegistry, EngineError> {
            let mut builder = RegistryBuilder::new();
            $(
                builder = builder.register(CommandDescriptor::new(
                    $name,
                    $description,
                    &[ $( $pattern ),+ ],
                    &[ $( $example ),+ ],
                    $executor,
                )?);
            )*
            Ok(builder.build())
        }
    };
}

standard_commands! {
    "explain" => handlers::explain::execute, "Provide detailed explanations of concepts, topics or pages";
    patterns [
        r"^/explain\s+(step\s+by\s+step\s+)?(.+?)\s+(?:(?:on|from)\s+)?page\s+(\d+)\s*$",
        r"^/explain\s+(step\s+by\s+step\s+)?(.+)$",
    ]
    examples [
        "/explain photosynthesis on page 67",
        "/explain step by step this process",
        "/explain quantum mechanics",
        "/explain @Photosynthesis in simple terms",
    ]

    "visualize" => handlers::visualize::execute, "Create a diagram of a topic";
    patterns [
        r"^/visualize\s+(all\s+)?(.+?)\s+(?:(?:on|from)\s+)?page\s+(\d+)\s*$",
        r"^/visualize\s+(all\s+)?(.+)$",
    ]
    examples [
        "/visualize @Photosynthesis",
        "/visualize the light reactions of @Photosynthesis",
        "/visualize all @Mitosis stages on page 12",
    ]

    "compare" => handlers::compare::execute, "Compare two topics side by side";
    patterns [
        r"^/compare\s+(.+?)\s+(?:and|with|vs\.?|versus|to)\s+(.+)$",
        r"^/compare\s+(.+)$",
    ]
    examples [
        "/compare @Photosynthesis @Respiration",
        "/compare @Mitosis and @Meiosis",
        "/compare @DNA with @RNA",
    ]

    "solve" => handlers::solve::execute, "Solve problems, equations, or exercises";
    patterns [
        r"^/solve\s+(all\s+)?(.+?)\s+(?:(?:on|from)\s+)?(?:pages?\s+)?(\d+(?:\s*-\s*\d+)?)\s*$",
        r"^/solve\s+(all\s+)?(.+)$",
    ]
    examples [
        "/solve all problems on page 28",
        "/solve exercises from page 15-20",
        "/solve quadratic equations",
        "/solve this differential equation",
    ]

    "goto" => handlers::goto::execute, "Navigate to specific pages, sections, or topics";
    patterns [
        r"^/goto\s+(page\s+)?(\d+)\s*$",
        r"^/goto\s+(chapter|section|part)\s+(.+)$",
        r"^/goto\s+(the\s+)?(.+)$",
    ]
    examples [
        "/goto page 42",
        "/goto chapter 5",
        "/goto conclusion section",
        "/goto @Photosynthesis",
    ]

    "analyze" => handlers::analyze::execute, "Perform deep analysis of content, patterns, or relationships";
    patterns [
        r"^/analyze\s+(all\s+)?(.+?)\s+(?:(?:on|from)\s+)?page\s+(\d+)\s*$",
        r"^/analyze\s+(trends?|patterns?|relationships?)\s+(?:in|of|between)\s+(.+)$",
        r"^/analyze\s+(all\s+)?(.+)$",
    ]
    examples [
        "/analyze key concepts on page 15",
        "/analyze trends in this data",
        "/analyze relationships between variables",
        "/analyze writing style",
    ]

    "help" => handlers::help::execute, "Show available commands and usage examples";
    patterns [
        r"^/help\s*$",
        r"^/help\s+/?(.+?)\s*$",
    ]
    examples [
        "/help",
        "/help solve",
        "/help commands",
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn standard_order_and_lookup() {
        let registry = standard_registry().unwrap();
        assert_eq!(
            registry.names(),
            vec!["explain", "visualize", "compare", "solve", "goto", "analyze", "help"]
        );
        assert!(registry.contains("EXPLAIN"));
        assert!(!registry.contains("dance"));
    }

    #[test]
    fn every_example_parses_to_its_own_command() {
        let registry = standard_registry().unwrap();
        for descriptor in registry.iter() {
            assert!(!descriptor.examples.is_empty(), "{} has no examples", descriptor.name);
            for example in &descriptor.examples {
                let command = parse(&registry, example, &[]).map(|p| p.command);
                assert_eq!(
                    command.as_deref(),
                    Some(descriptor.name.as_str()),
                    "example {example:?}"
                );
            }
        }
    }

    #[test]
    fn last_registration_wins_in_place() {
        let noop: Executor = handlers::help::execute;
        let registry = RegistryBuilder::new()
            .register(CommandDescriptor::new("a", "first", &[r"^/a$"], &["/a"], noop).unwrap())
            .register(CommandDescriptor::new("b", "b", &[r"^/b$"], &["/b"], noop).unwrap())
            .register(CommandDescriptor::new("A", "second", &[r"^/a\s*$"], &["/a"], noop).unwrap())
            .build();
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().description, "second");
    }

    #[test]
    fn invalid_pattern_fails_construction() {
        let noop: Executor = handlers::help::execute;
        let err = CommandDescriptor::new("x", "x", &[r"^/x("], &["/x"], noop).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPattern { .. }));
    }
}
