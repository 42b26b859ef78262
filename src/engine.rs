//! Top-level entry point: one chat message in, one result out.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use crate::audit::AuditLog;
use crate::chain;
use crate::content::{ContentSource, HttpContentSource};
use crate::context::{Difficulty, ExecutionContext};
use crate::error::EngineError;
use crate::inference::{InferenceService, LlmInference, OfflineInference};
use crate::llm::ResolvedProvider;
use crate::parser::{parse, ParsedCommand};
use crate::registry::handlers::Invocation;
use crate::registry::{standard_registry, CommandRegistry};
use crate::result::{CommandOutcome, CommandResult};
use crate::settings::{self, EngineSettings, TimeoutSettings};

/// Stateless between calls; share one engine across sessions.
pub struct CommandEngine {
    registry: Arc<CommandRegistry>,
    inference: Arc<dyn InferenceService>,
    timeouts: TimeoutSettings,
    default_difficulty: Difficulty,
    audit: Option<AuditLog>,
}

impl CommandEngine {
    pub fn new(
        registry: Arc<CommandRegistry>,
        inference: Arc<dyn InferenceService>,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            registry,
            inference,
            timeouts: settings.timeouts,
            default_difficulty: settings.default_difficulty,
            audit: None,
        }
    }

    /// Build the standard engine from `settings.json` and the credentials file
    /// in `config_dir`. Without an API key the generative commands report the
    /// service as unavailable; everything else still works.
    pub fn from_config_dir(config_dir: &Path) -> Result<Self, EngineError> {
        let settings = settings::load_settings(config_dir)?;
        let api_key = settings::load_api_key(config_dir);
        let client = reqwest::Client::new();

        let inference: Arc<dyn InferenceService> =
            match ResolvedProvider::from_config(&settings.llm, api_key.as_deref()) {
                Ok(provider) => {
                    let content = settings.backend_url.as_deref().map(|url| {
                        Arc::new(HttpContentSource::new(client.clone(), url)) as Arc<dyn ContentSource>
                    });
                    tracing::info!(model = %provider.model, grounded = content.is_some(), "inference configured");
                    Arc::new(LlmInference::new(client, provider, content))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "running without inference");
                    let reason = match e {
                        EngineError::InferenceUnavailable { message } => message,
                        other => other.to_string(),
                    };
                    Arc::new(OfflineInference::new(reason))
                }
            };

        let engine = Self::new(Arc::new(standard_registry()?), inference, &settings);
        Ok(if settings.audit_log {
            engine.with_audit(AuditLog::new(config_dir))
        } else {
            engine
        })
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn parse(&self, input: &str, topics: &[crate::topics::TopicRecord]) -> Option<ParsedCommand> {
        parse(&self.registry, input, topics)
    }

    /// Execute a raw `/command` line, chained or not.
    ///
    /// Never fails: unknown commands, executor errors, timeouts and panics all
    /// come back as an error-typed result.
    pub async fn execute(&self, raw: &str, context: &ExecutionContext) -> CommandOutcome {
        let started = Instant::now();
        let outcome = if chain::is_chained(raw) {
            CommandOutcome::Chained(chain::execute_chain(self, raw, context).await)
        } else {
            CommandOutcome::Single(self.execute_single(raw, context).await)
        };

        tracing::info!(
            success = outcome.success(),
            kind = ?outcome.kind(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "command finished"
        );
        if let Some(audit) = &self.audit {
            audit.record(raw, &outcome, started.elapsed());
        }
        outcome
    }

    async fn execute_single(&self, raw: &str, context: &ExecutionContext) -> CommandResult {
        match parse(&self.registry, raw, &context.available_topics) {
            Some(parsed) => self.dispatch(&parsed, context).await,
            None => EngineError::MalformedInput {
                available: self.registry.names(),
            }
            .into(),
        }
    }

    /// Run the executor for an already parsed command.
    pub(crate) async fn dispatch(&self, parsed: &ParsedCommand, context: &ExecutionContext) -> CommandResult {
        let Some(descriptor) = self.registry.get(&parsed.command) else {
            return EngineError::UnknownCommand {
                name: parsed.command.clone(),
                available: self.registry.names(),
            }
            .into();
        };

        let invocation = Invocation {
            context,
            inference: self.inference.as_ref(),
            registry: &self.registry,
            timeouts: self.timeouts,
            default_difficulty: self.default_difficulty,
        };

        tracing::info!(command = %descriptor.name, confidence = parsed.confidence, "dispatching");
        let outcome = AssertUnwindSafe((descriptor.executor)(parsed, &invocation))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!(command = %descriptor.name, error = %e, "command failed");
                e.into()
            }
            Err(_) => {
                tracing::error!(command = %descriptor.name, "executor panicked");
                EngineError::ExecutorPanicked {
                    command: descriptor.name.clone(),
                }
                .into()
            }
        }
    }
}
