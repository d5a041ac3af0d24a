//! Input safety screening
//!
//! Every user message passes through a [`SafetyScreen`] before the session is
//! touched. The LLM-backed screen fails closed: if the classifier errors, times
//! out or answers with something that is not a verdict, the input is blocked.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tera::{Context, Tera};

use crate::chat::domain::{Message, SafetyVerdict};
use crate::chat::llm::{CompletionRequest, LlmProvider, ResponseFormat};

/// Reason given when the screen itself could not reach a verdict
pub const SCREEN_UNAVAILABLE_REASON: &str =
    "The message could not be checked right now. Please try again.";

const RUBRIC_TEMPLATE: &str = r#"You are an input guardrail for an assistant that answers questions about {{ domain }}.
Decide whether the user's message is allowed. The message is NOT allowed when it:
- is unrelated to {{ domain }}
- is too long (more than {{ max_input_chars }} characters) or too short to be a question
- is too vague or too general to be answered from a database
- is overly specific, complex or simple to the point of being unanswerable
- contains profanity, sexual content or violence
- contains hate or bias: racism, sexism, ageism or religious attacks
- is political
- is spam

Respond only with the JSON verdict. Set is_not_allowed to true when the message
is not allowed and give a short reason addressed to the user. Otherwise set
is_not_allowed to false and reason to null."#;

/// Allow/deny decision for a single user input
#[async_trait]
pub trait SafetyScreen: Send + Sync {
    async fn screen(&self, input: &str) -> SafetyVerdict;
}

/// Output of the classifier model
#[derive(Debug, Deserialize)]
struct ScreenOutput {
    is_not_allowed: bool,
    reason: Option<String>,
}

/// Safety screen backed by a classification call to a language model
pub struct LlmSafetyScreen {
    llm: Arc<dyn LlmProvider>,
    rubric: String,
    max_input_chars: usize,
    timeout: Duration,
}

impl LlmSafetyScreen {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        domain: &str,
        max_input_chars: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            rubric: render_rubric(domain, max_input_chars),
            max_input_chars,
            timeout,
        }
    }

    fn request(&self, input: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::system(&self.rubric), Message::user(input)],
            response_format: Some(ResponseFormat {
                name: "guardrail_verdict".to_string(),
                schema: json!({
                    "type": "object",
                    "properties": {
                        "is_not_allowed": { "type": "boolean" },
                        "reason": { "type": ["string", "null"] }
                    },
                    "required": ["is_not_allowed", "reason"],
                    "additionalProperties": false
                }),
            }),
            ..Default::default()
        }
    }
}

fn render_rubric(domain: &str, max_input_chars: usize) -> String {
    let mut context = Context::new();
    context.insert("domain", domain);
    context.insert("max_input_chars", &max_input_chars);

    match Tera::one_off(RUBRIC_TEMPLATE, &context, false) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::warn!("Failed to render guardrail rubric: {}", e);
            RUBRIC_TEMPLATE.to_string()
        }
    }
}

/// Parse the classifier output, tolerating a fenced JSON block
fn parse_verdict(content: &str) -> Option<SafetyVerdict> {
    let trimmed = content.trim();
    let json_text = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    let output: ScreenOutput = serde_json::from_str(json_text.trim()).ok()?;
    Some(if output.is_not_allowed {
        SafetyVerdict {
            is_blocked: true,
            reason: output.reason.filter(|r| !r.trim().is_empty()),
        }
    } else {
        SafetyVerdict::allow()
    })
}

#[async_trait]
impl SafetyScreen for LlmSafetyScreen {
    async fn screen(&self, input: &str) -> SafetyVerdict {
        if input.chars().count() > self.max_input_chars {
            return SafetyVerdict::block(format!(
                "The message is too long. Please keep it under {} characters.",
                self.max_input_chars
            ));
        }

        let response = match tokio::time::timeout(self.timeout, self.llm.complete(self.request(input)))
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Safety screen call failed, blocking input");
                return SafetyVerdict::block(SCREEN_UNAVAILABLE_REASON);
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "Safety screen timed out, blocking input");
                return SafetyVerdict::block(SCREEN_UNAVAILABLE_REASON);
            }
        };

        match parse_verdict(&response.message.content) {
            Some(verdict) => {
                if verdict.is_blocked {
                    tracing::info!(reason = ?verdict.reason, "Input blocked by safety screen");
                }
                verdict
            }
            None => {
                tracing::warn!(
                    content = %response.message.content,
                    "Unparsable safety verdict, blocking input"
                );
                SafetyVerdict::block(SCREEN_UNAVAILABLE_REASON)
            }
        }
    }
}
