//! Conversational `/command` engine for study chat sessions.
//!
//! A chat message such as `/explain @Photosynthesis step by step and /visualize @Photosynthesis`
//! is parsed against a registry of commands, resolved against the caller's
//! topic catalog and executed, with chained steps threading their results.

pub mod audit;
pub mod chain;
pub mod content;
pub mod context;
pub mod engine;
pub mod error;
pub mod inference;
pub mod llm;
pub mod parser;
pub mod paths;
pub mod registry;
pub mod result;
pub mod settings;
pub mod storage;
pub mod tokenizer;
pub mod topics;

#[cfg(feature = "server")]
pub mod api;

pub use context::ExecutionContext;
pub use engine::CommandEngine;
pub use error::EngineError;
pub use result::{ChainedCommandResult, CommandOutcome, CommandResult};
