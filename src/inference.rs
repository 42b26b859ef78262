//! The inference collaborator used by the generative commands.
//!
//! Executors talk to an [`InferenceService`]; the production implementation is
//! [`LlmInference`], which prompts an LLM provider and parses its output into
//! typed payloads. Every call goes through [`with_deadline`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::content::{fetch_pages, ContentSource};
use crate::context::Difficulty;
use crate::error::EngineError;
use crate::llm::{self, ResolvedProvider};
use crate::tokenizer::Modifier;
use crate::topics::TopicRecord;

// ── Requests ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainRequest {
    pub query: String,
    pub difficulty: Difficulty,
    pub topic: Option<TopicRecord>,
    pub page_number: Option<u32>,
    pub content_id: Option<String>,
    pub modifiers: Vec<Modifier>,
    /// Serialized output of the previous chain step, if any.
    pub prior_result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizeRequest {
    pub query: String,
    pub difficulty: Difficulty,
    pub topic: TopicRecord,
    pub prior_result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareRequest {
    pub first: TopicRecord,
    pub second: TopicRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InferenceRequest {
    Explain(ExplainRequest),
    Visualize(VisualizeRequest),
    Compare(CompareRequest),
}

impl InferenceRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceRequest::Explain(_) => "explain",
            InferenceRequest::Visualize(_) => "visualize",
            InferenceRequest::Compare(_) => "compare",
        }
    }
}

// ── Replies ─────────────────────────────────────────────────────

/// A Mermaid diagram with the reasoning behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct Diagram {
    pub mermaid_code: String,
    pub diagram_type: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub key_insights: String,
    #[serde(default)]
    pub educational_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct TopicAssessment {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct UseCases {
    #[serde(default)]
    pub when_to_use_topic1: Vec<String>,
    #[serde(default)]
    pub when_to_use_topic2: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct ComparisonDetail {
    #[serde(default)]
    pub similarities: Vec<String>,
    #[serde(default)]
    pub differences: Vec<String>,
    #[serde(default)]
    pub complementary_aspects: Vec<String>,
    #[serde(default)]
    pub use_cases: UseCases,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub enum LearningSequence {
    Topic1First,
    Topic2First,
    Parallel,
    #[default]
    Independent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct OverallAnalysis {
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub learning_sequence: LearningSequence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "server", derive(ts_rs::TS))]
pub struct Comparison {
    pub topic1: TopicAssessment,
    pub topic2: TopicAssessment,
    #[serde(default)]
    pub comparison: ComparisonDetail,
    #[serde(default)]
    pub overall_analysis: OverallAnalysis,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceReply {
    Explanation(String),
    Diagram(Diagram),
    Comparison(Comparison),
}

impl InferenceReply {
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceReply::Explanation(_) => "explanation",
            InferenceReply::Diagram(_) => "diagram",
            InferenceReply::Comparison(_) => "comparison",
        }
    }
}

/// External service that turns a request into generated content.
///
/// A service-level failure (the `success: false` case) is an `Err`.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceReply, EngineError>;
}

/// Race `fut` against a deadline. Whichever finishes first decides the outcome;
/// on timeout the pending future is dropped.
pub async fn with_deadline<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    if let Ok(outcome) = tokio::time::timeout(limit, fut).await {
        outcome
    } else {
        tracing::warn!(operation, limit_secs = limit.as_secs(), "inference deadline hit");
        Err(EngineError::Timeout {
            operation: operation.to_string(),
            after: limit,
        })
    }
}

// ── Offline ─────────────────────────────────────────────────────

/// Used when no provider is configured; every call reports the reason.
pub struct OfflineInference {
    reason: String,
}

impl OfflineInference {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl InferenceService for OfflineInference {
    async fn infer(&self, _request: InferenceRequest) -> Result<InferenceReply, EngineError> {
        Err(EngineError::InferenceUnavailable {
            message: self.reason.clone(),
        })
    }
}

// ── LLM-backed ──────────────────────────────────────────────────

const SYSTEM_PROMPT: &str = "You are an expert educator helping a learner study a document. \
Answer precisely, structure the response clearly, and stay grounded in any reference material provided.";

pub struct LlmInference {
    client: reqwest::Client,
    provider: ResolvedProvider,
    content: Option<Arc<dyn ContentSource>>,
}

impl LlmInference {
    pub fn new(
        client: reqwest::Client,
        provider: ResolvedProvider,
        content: Option<Arc<dyn ContentSource>>,
    ) -> Self {
        Self {
            client,
            provider,
            content,
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, EngineError> {
        let response = llm::build_request(&self.client, &self.provider, SYSTEM_PROMPT, prompt)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Inference {
                message: format!("API error {status}: {text}"),
            });
        }

        let json: serde_json::Value = response.json().await?;
        llm::parse_response_text(self.provider.provider, &json)
    }

    async fn complete_json<T: serde::de::DeserializeOwned>(&self, prompt: &str) -> Result<T, EngineError> {
        let text = self.complete(prompt).await?;
        let object = llm::extract_json_object(&text).ok_or_else(|| EngineError::Inference {
            message: "Model reply contained no JSON object".to_string(),
        })?;
        serde_json::from_str(object).map_err(|e| EngineError::Inference {
            message: format!("Model reply did not match the expected shape: {e}"),
        })
    }

    /// Reference material for an explanation: topic pages, else the single page.
    async fn reference_material(&self, req: &ExplainRequest) -> String {
        let mut material = String::new();
        if let Some(topic) = &req.topic {
            material.push_str(&format!(
                "{} (Pages {}-{})\nSummary: {}\n\n",
                topic.topic_name, topic.topic_page_start, topic.topic_page_end, topic.topic_summary
            ));
            if let (Some(source), Some(id)) = (&self.content, &req.content_id) {
                let text = fetch_pages(source.as_ref(), id, topic.pages()).await;
                if text.trim().is_empty() {
                    material.push_str("Content: [Unable to fetch content for this topic]\n\n");
                } else {
                    material.push_str(&format!("Content:\n{text}\n\n"));
                }
            }
        } else if let (Some(page), Some(source), Some(id)) =
            (req.page_number, &self.content, &req.content_id)
        {
            let text = fetch_pages(source.as_ref(), id, page..=page).await;
            if text.trim().is_empty() {
                material.push_str(&format!("[Unable to fetch content for page {page}]\n\n"));
            } else {
                material.push_str(&format!("Page {page} Content:\n\n{text}\n\n"));
            }
        }
        material
    }
}

fn explain_prompt(req: &ExplainRequest, material: &str) -> String {
    let mut prompt = format!(
        "Explain the following for a {} learner. Break the idea into parts, cover the \
         underlying principles, give concrete examples, and address common misconceptions. \
         Use headings.\n\n",
        req.difficulty.as_str()
    );
    if !req.modifiers.is_empty() {
        let styles: Vec<&str> = req.modifiers.iter().map(|m| m.as_str()).collect();
        prompt.push_str(&format!("Style requested: {}.\n\n", styles.join(", ")));
    }
    if !material.is_empty() {
        prompt.push_str(&format!(
            "REFERENCE MATERIAL (primary source; synthesize, don't just summarize):\n{material}"
        ));
    }
    if let Some(prior) = &req.prior_result {
        prompt.push_str(&format!("EARLIER RESULT TO BUILD ON:\n{prior}\n\n"));
    }
    prompt.push_str(&format!("QUESTION:\n{}", req.query));
    prompt
}

fn visualize_prompt(req: &VisualizeRequest) -> String {
    let mut prompt = format!(
        "Create one Mermaid diagram (flowchart, graph, sequence, class, state, gantt, pie, \
         mindmap or timeline, whichever fits best) for:\n{}\n\nTopic: {} ({})\nLevel: {}\n\n",
        req.query,
        req.topic.topic_name,
        req.topic.topic_summary,
        req.difficulty.as_str()
    );
    if let Some(prior) = &req.prior_result {
        prompt.push_str(&format!("Earlier result to build on:\n{prior}\n\n"));
    }
    prompt.push_str(
        "Reply with only a JSON object with string fields: mermaid_code (valid Mermaid source), \
         diagram_type, explanation (why this diagram type), key_insights, educational_value.",
    );
    prompt
}

fn compare_prompt(req: &CompareRequest) -> String {
    let describe = |t: &TopicRecord| {
        format!(
            "{}\nSummary: {}\nPages: {}-{}",
            t.topic_name, t.topic_summary, t.topic_page_start, t.topic_page_end
        )
    };
    format!(
        "Compare these two topics for a learner.\n\nTopic 1: {}\n\nTopic 2: {}\n\n\
         Reply with only a JSON object:\n\
         {{\"topic1\": {{\"name\", \"summary\", \"key_concepts\": [], \"strengths\": [], \"limitations\": []}},\n \
         \"topic2\": {{same fields}},\n \
         \"comparison\": {{\"similarities\": [], \"differences\": [], \"complementary_aspects\": [], \
         \"use_cases\": {{\"when_to_use_topic1\": [], \"when_to_use_topic2\": []}}}},\n \
         \"overall_analysis\": {{\"relationship\", \"recommendation\", \
         \"learning_sequence\": one of topic1_first|topic2_first|parallel|independent}}}}",
        describe(&req.first),
        describe(&req.second)
    )
}

#[async_trait]
impl InferenceService for LlmInference {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceReply, EngineError> {
        tracing::debug!(kind = request.kind(), model = %self.provider.model, "inference request");
        match request {
            InferenceRequest::Explain(req) => {
                let material = self.reference_material(&req).await;
                let text = self.complete(&explain_prompt(&req, &material)).await?;
                Ok(InferenceReply::Explanation(text))
            }
            InferenceRequest::Visualize(req) => {
                let diagram: Diagram = self.complete_json(&visualize_prompt(&req)).await?;
                if diagram.mermaid_code.trim().is_empty() {
                    return Err(EngineError::Inference {
                        message: "Model returned an empty diagram".to_string(),
                    });
                }
                Ok(InferenceReply::Diagram(diagram))
            }
            InferenceRequest::Compare(req) => {
                let comparison: Comparison = self.complete_json(&compare_prompt(&req)).await?;
                Ok(InferenceReply::Comparison(comparison))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::*;
    use crate::topics::tests::topic;

    /// Scripted test double: replays queued replies and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedInference {
        replies: Mutex<VecDeque<Result<InferenceReply, EngineError>>>,
        pub(crate) calls: Mutex<Vec<InferenceRequest>>,
        /// Never resolve, to exercise deadlines.
        pub(crate) hang: bool,
    }

    impl ScriptedInference {
        pub(crate) fn replying(replies: Vec<Result<InferenceReply, EngineError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        pub(crate) fn hanging() -> Self {
            Self {
                hang: true,
                ..Default::default()
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl InferenceService for ScriptedInference {
        async fn infer(&self, request: InferenceRequest) -> Result<InferenceReply, EngineError> {
            self.calls.lock().push(request);
            if self.hang {
                futures_util::future::pending::<()>().await;
            }
            self.replies.lock().pop_front().unwrap_or_else(|| {
                Err(EngineError::Inference {
                    message: "no scripted reply".to_string(),
                })
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_turns_hang_into_timeout() {
        let service = ScriptedInference::hanging();
        let req = InferenceRequest::Compare(CompareRequest {
            first: topic("a", 1, 1),
            second: topic("b", 2, 2),
        });
        let err = with_deadline("Comparison", Duration::from_secs(5), service.infer(req))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
        assert_eq!(err.to_string(), "Comparison timed out after 5s");
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn deadline_passes_through_result_and_error() {
        let service = ScriptedInference::replying(vec![
            Ok(InferenceReply::Explanation("done".to_string())),
            Err(EngineError::Inference {
                message: "boom".to_string(),
            }),
        ]);
        let req = || {
            InferenceRequest::Compare(CompareRequest {
                first: topic("a", 1, 1),
                second: topic("b", 2, 2),
            })
        };
        let ok = with_deadline("x", Duration::from_secs(5), service.infer(req())).await;
        assert_eq!(ok.unwrap(), InferenceReply::Explanation("done".to_string()));
        let err = with_deadline("x", Duration::from_secs(5), service.infer(req())).await;
        assert_eq!(err.unwrap_err().to_string(), "Inference error: boom");
    }

    #[tokio::test]
    async fn offline_reports_reason() {
        let err = OfflineInference::new("No API key configured")
            .infer(InferenceRequest::Compare(CompareRequest {
                first: topic("a", 1, 1),
                second: topic("b", 2, 2),
            }))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Inference service unavailable: No API key configured"
        );
    }

    #[test]
    fn comparison_parses_with_missing_sections() {
        let json = r#"{"topic1": {"name": "A"}, "topic2": {"name": "B"},
            "overall_analysis": {"learning_sequence": "topic2_first"}}"#;
        let c: Comparison = serde_json::from_str(json).unwrap();
        assert_eq!(c.topic2.name, "B");
        assert_eq!(c.overall_analysis.learning_sequence, LearningSequence::Topic2First);
        assert!(c.comparison.similarities.is_empty());
    }

    #[test]
    fn explain_prompt_carries_material_and_prior() {
        let req = ExplainRequest {
            query: "why is the sky blue".to_string(),
            difficulty: Difficulty::Beginner,
            topic: None,
            page_number: None,
            content_id: None,
            modifiers: vec![Modifier::StepByStep],
            prior_result: Some("{\"kind\":\"status\"}".to_string()),
        };
        let prompt = explain_prompt(&req, "[Page 2]\nRayleigh");
        assert!(prompt.contains("beginner learner"));
        assert!(prompt.contains("Style requested: step by step."));
        assert!(prompt.contains("[Page 2]\nRayleigh"));
        assert!(prompt.contains("EARLIER RESULT"));
        assert!(prompt.ends_with("why is the sky blue"));
    }
}
