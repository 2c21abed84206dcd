//! Chat/suggestion orchestrator.
//!
//! Wraps the `ChatBackend` behind two operations, `plan` and `suggest`. Both
//! are infallible by contract: any call failure or unparseable response
//! degrades to deterministic local content, logged at warn level and never
//! surfaced to the client. Responses keep the same shape either way, only
//! the content origin differs.

pub mod prompts;

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::llm_client::ChatBackend;
use crate::runs::models::{ChatSuggestion, SuggestionStatus};
use crate::text::{sanitize_text, truncate_chars};

const MAX_SUGGESTIONS: usize = 4;
const MIN_SUGGESTIONS: usize = 2;
/// Characters of composed section context passed to the suggestion call.
const CONTEXT_MAX_CHARS: usize = 4000;

/// A generated (or fallback) plan for a run.
#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub summary: String,
    pub draft: String,
    #[serde(default)]
    pub deliverables: Vec<PlanDeliverable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanDeliverable {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub checklist: Vec<String>,
}

/// The uploaded source document, as far as we could read it.
#[derive(Debug)]
pub struct PlanUpload {
    pub byte_len: usize,
    pub text: Option<String>,
}

#[derive(Debug)]
pub struct SuggestionBatch {
    pub summary: String,
    pub suggestions: Vec<ChatSuggestion>,
}

/// What the model is asked to return for a suggestion request. Lenient on
/// purpose: missing fields degrade per item instead of failing the parse.
#[derive(Debug, Deserialize)]
struct RawSuggestionPayload {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    suggestions: Vec<RawSuggestion>,
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

pub struct Assistant {
    backend: Arc<dyn ChatBackend>,
}

impl Assistant {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Produces an initial plan for the run, from the model when possible,
    /// otherwise the fixed default built from run name and file name.
    pub async fn plan(
        &self,
        run_name: &str,
        file_name: &str,
        upload: Option<&PlanUpload>,
        company_prompt: Option<&str>,
    ) -> Plan {
        let user_prompt = prompts::plan_user_prompt(run_name, file_name, upload, company_prompt);
        match self.backend.complete(prompts::PLAN_SYSTEM, &user_prompt).await {
            Ok(response) => match parse_json_object::<Plan>(&response) {
                Some(plan) => plan,
                None => {
                    warn!("Failed to parse a plan from the model response, using the default plan");
                    default_plan(run_name, file_name)
                }
            },
            Err(e) => {
                warn!("Plan generation call failed ({e}), using the default plan");
                default_plan(run_name, file_name)
            }
        }
    }

    /// Produces 2-4 insertable suggestions for the prompt, with the run's
    /// composed sections (bounded) as context. Always returns at least two.
    pub async fn suggest(&self, context: &str, prompt: &str) -> SuggestionBatch {
        let context = truncate_chars(context, CONTEXT_MAX_CHARS);
        let user_prompt = prompts::suggest_user_prompt(context, prompt);
        let payload = match self
            .backend
            .complete(prompts::SUGGEST_SYSTEM, &user_prompt)
            .await
        {
            Ok(response) => parse_json_object::<RawSuggestionPayload>(&response),
            Err(e) => {
                warn!("Suggestion call failed ({e}), using local fallback suggestions");
                None
            }
        };

        let Some(payload) = payload else {
            return fallback_suggestions(prompt);
        };

        let suggestions: Vec<ChatSuggestion> = payload
            .suggestions
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .filter_map(|item| {
                let content = sanitize_text(&item.content.unwrap_or_default());
                if content.is_empty() {
                    return None;
                }
                let summary = item
                    .summary
                    .map(|summary| sanitize_text(&summary))
                    .filter(|summary| !summary.is_empty())
                    .unwrap_or_else(|| truncate_chars(prompt, 60).to_string());
                Some(ChatSuggestion {
                    id: Uuid::new_v4(),
                    summary,
                    content,
                    status: SuggestionStatus::Pending,
                })
            })
            .collect();

        if suggestions.len() < MIN_SUGGESTIONS {
            warn!(
                "Model returned {} usable suggestions, using local fallback suggestions",
                suggestions.len()
            );
            return fallback_suggestions(prompt);
        }

        let summary = payload
            .summary
            .map(|summary| sanitize_text(&summary))
            .filter(|summary| !summary.is_empty())
            .unwrap_or_else(|| "Generated suggestions.".to_string());

        SuggestionBatch {
            summary,
            suggestions,
        }
    }
}

/// Pulls the first `{` ... last `}` span out of a model response and parses
/// it. Tolerates code fences and prose around the object.
fn parse_json_object<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// The fixed offline plan. Built purely from the run's metadata; no
/// randomness, so repeated fallbacks produce identical content.
fn default_plan(run_name: &str, file_name: &str) -> Plan {
    let overview = format!(
        "This draft for {run_name} summarises the uploaded document {file_name}.\n\n\
        • Provide an executive summary highlighting security outcomes.\n\
        • Detail FedRAMP control alignment and mitigation activities.\n\
        • Outline deliverables, timelines, and responsible parties."
    );
    Plan {
        summary: format!("Initial draft generated for {run_name}."),
        draft: format!(
            "# Executive Summary\n{overview}\n\n\
            # Security Implementation\nDescribe control families, inherited controls, and compensating measures.\n\n\
            # Compliance & Assurance\nDocument testing cadence, evidence handling, and continuous monitoring."
        ),
        deliverables: vec![
            PlanDeliverable {
                title: "System Security Plan (SSP) Refresh".to_string(),
                description:
                    "Update SSP with current architecture diagrams, components, and boundary definition."
                        .to_string(),
                checklist: vec![
                    "Confirm latest asset inventory and network diagrams".to_string(),
                    "Validate control implementations for all FedRAMP families".to_string(),
                ],
            },
            PlanDeliverable {
                title: "Plan of Action & Milestones (POA&M)".to_string(),
                description: "Compile remediation tasks with owners and completion dates."
                    .to_string(),
                checklist: vec![
                    "List all open findings with severity ratings".to_string(),
                    "Assign remediation owners and target dates".to_string(),
                ],
            },
            PlanDeliverable {
                title: "Continuous Monitoring Strategy".to_string(),
                description:
                    "Summarise monthly/quarterly monitoring cadence and reporting workflow."
                        .to_string(),
                checklist: vec![
                    "Define metrics and tooling for ongoing monitoring".to_string(),
                    "Identify escalation paths and notification windows".to_string(),
                ],
            },
        ],
    }
}

/// The two fixed local suggestions. Each quotes the user's prompt verbatim.
fn fallback_suggestions(prompt: &str) -> SuggestionBatch {
    SuggestionBatch {
        summary: "Draft alternatives generated locally.".to_string(),
        suggestions: vec![
            ChatSuggestion {
                id: Uuid::new_v4(),
                summary: "Structured compliance response".to_string(),
                content: format!(
                    "Provide a structured answer that references the FedRAMP control families \
                    relevant to \"{prompt}\" and outlines key actions, owners, and evidence expectations."
                ),
                status: SuggestionStatus::Pending,
            },
            ChatSuggestion {
                id: Uuid::new_v4(),
                summary: "Risk mitigation emphasis".to_string(),
                content: format!(
                    "Create a paragraph describing risk mitigation activities for \"{prompt}\", \
                    including monitoring cadence and reporting artifacts."
                ),
                status: SuggestionStatus::Pending,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;

    /// Backend that always answers with a fixed string.
    struct Scripted(&'static str);

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    /// Backend that always fails, like an unconfigured credential.
    struct Failing;

    #[async_trait]
    impl ChatBackend for Failing {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Err(LlmError::NotConfigured)
        }
    }

    fn assistant(backend: impl ChatBackend + 'static) -> Assistant {
        Assistant::new(Arc::new(backend))
    }

    #[test]
    fn test_parse_json_object_ignores_fences_and_prose() {
        #[derive(Deserialize)]
        struct Probe {
            key: String,
        }
        let wrapped = "Sure! Here you go:\n```json\n{\"key\": \"value\"}\n```\nHope that helps.";
        let probe: Probe = parse_json_object(wrapped).unwrap();
        assert_eq!(probe.key, "value");
        assert!(parse_json_object::<Probe>("no json here").is_none());
        assert!(parse_json_object::<Probe>("} backwards {").is_none());
    }

    #[tokio::test]
    async fn test_plan_parses_model_response() {
        let assistant = assistant(Scripted(
            r##"{"summary": "s", "draft": "# Draft", "deliverables": [{"title": "SSP"}]}"##,
        ));
        let plan = assistant.plan("Alpha", "a.pdf", None, None).await;
        assert_eq!(plan.summary, "s");
        assert_eq!(plan.draft, "# Draft");
        assert_eq!(plan.deliverables.len(), 1);
        assert!(plan.deliverables[0].checklist.is_empty());
    }

    #[tokio::test]
    async fn test_plan_falls_back_on_call_failure() {
        let assistant = assistant(Failing);
        let plan = assistant.plan("Alpha", "a.pdf", None, None).await;
        assert!(plan.summary.contains("Alpha"));
        assert!(plan.draft.contains("a.pdf"));
        assert_eq!(plan.deliverables.len(), 3);
    }

    #[tokio::test]
    async fn test_plan_falls_back_on_unparseable_response() {
        let assistant = assistant(Scripted("I cannot produce JSON today."));
        let plan = assistant.plan("Beta", "b.pdf", None, None).await;
        assert!(plan.summary.contains("Beta"));
    }

    #[tokio::test]
    async fn test_plan_fallback_is_deterministic() {
        let assistant = assistant(Failing);
        let first = assistant.plan("Alpha", "a.pdf", None, None).await;
        let second = assistant.plan("Alpha", "a.pdf", None, None).await;
        assert_eq!(first.draft, second.draft);
        assert_eq!(first.summary, second.summary);
    }

    #[tokio::test]
    async fn test_suggest_clamps_to_four() {
        let response = r#"{"summary": "many", "suggestions": [
            {"summary": "1", "content": "one"},
            {"summary": "2", "content": "two"},
            {"summary": "3", "content": "three"},
            {"summary": "4", "content": "four"},
            {"summary": "5", "content": "five"}
        ]}"#;
        let batch = assistant(Scripted(response)).suggest("", "prompt").await;
        assert_eq!(batch.suggestions.len(), 4);
        assert!(batch
            .suggestions
            .iter()
            .all(|s| s.status == SuggestionStatus::Pending));
    }

    #[tokio::test]
    async fn test_suggest_fallback_quotes_prompt_verbatim() {
        let batch = assistant(Failing)
            .suggest("", "tighten the incident response section")
            .await;
        assert_eq!(batch.suggestions.len(), 2);
        for suggestion in &batch.suggestions {
            assert!(suggestion
                .content
                .contains("tighten the incident response section"));
        }
    }

    #[tokio::test]
    async fn test_suggest_fallback_on_non_json_response() {
        let batch = assistant(Scripted("plain prose, no object"))
            .suggest("ctx", "my prompt")
            .await;
        assert_eq!(batch.summary, "Draft alternatives generated locally.");
        assert!(batch.suggestions.iter().all(|s| s.content.contains("my prompt")));
    }

    #[tokio::test]
    async fn test_suggest_fallback_when_too_few_usable() {
        // Two items, but one has empty content after sanitising.
        let response = r#"{"suggestions": [
            {"summary": "ok", "content": "usable"},
            {"summary": "bad", "content": "   "}
        ]}"#;
        let batch = assistant(Scripted(response)).suggest("", "the prompt").await;
        assert_eq!(batch.suggestions.len(), 2);
        assert!(batch.suggestions[0].content.contains("the prompt"));
    }

    #[tokio::test]
    async fn test_suggest_fills_missing_summaries_from_prompt() {
        let response = r#"{"suggestions": [
            {"content": "alpha body"},
            {"content": "beta body"}
        ]}"#;
        let batch = assistant(Scripted(response))
            .suggest("", "describe the audit cadence")
            .await;
        assert_eq!(batch.suggestions[0].summary, "describe the audit cadence");
        assert_eq!(batch.summary, "Generated suggestions.");
    }
}
