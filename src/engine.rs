//! External text-generation engine.
//!
//! The engine is an untrusted black box: whatever it returns goes through
//! cleaning and validation before anyone sees it. Only the gateway calls it.

use crate::config::Config;
use crate::error::EngineError;
use crate::i18n::Language;
use crate::retry::{with_retry_if, RetryConfig};
use crate::terminology::TerminologyEntry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A fully built prompt for one translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePrompt {
    pub system: String,
    pub user: String,
    pub source_language: Language,
    pub target_language: Language,
}

impl EnginePrompt {
    /// Prompt asking for a translation of `text`, pinning the given terms.
    pub fn for_translation(
        text: &str,
        source: Language,
        target: Language,
        terminology: &[TerminologyEntry],
    ) -> Self {
        Self {
            system: build_system_prompt(source, target, terminology),
            user: build_user_prompt(text, source, target),
            source_language: source,
            target_language: target,
        }
    }
}

/// The single outbound call of the pipeline.
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_or_translate(&self, prompt: &EnginePrompt) -> Result<String, EngineError>;
}

/// Build the system prompt for a legal translation
fn build_system_prompt(
    source: Language,
    target: Language,
    terminology: &[TerminologyEntry],
) -> String {
    let mut prompt = format!(
        r#"You are a sworn legal translator. Translate the user's text from {} to {}.

## Output Rules
- Write the answer entirely in {} ({}). Do not leave any word in {}.
- Output only the translation. No notes, no headings, no quotation marks around it.
- Never add interface text such as buttons, version labels or product names.
- Keep article numbers, dates and amounts exactly as written.
- Keep the formal register of legal drafting."#,
        source.name(),
        target.name(),
        target.name(),
        target.native_name(),
        source.name(),
    );

    if !terminology.is_empty() {
        prompt.push_str("\n\n## Mandatory Terminology\n");
        for entry in terminology {
            prompt.push_str(&format!("- {} => {}\n", entry.source_term, entry.target_term));
        }
    }
    prompt
}

/// Build the user prompt
fn build_user_prompt(text: &str, source: Language, target: Language) -> String {
    format!(
        "Translate the following {} legal text into {}:\n\n{}",
        source.name(),
        target.name(),
        text
    )
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

/// OpenAI Chat Completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// OpenAI-compatible chat-completions engine.
pub struct OpenAiEngine {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    retry: RetryConfig,
}

impl OpenAiEngine {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.openai_api_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            max_tokens: config.engine_max_tokens,
            retry: RetryConfig::engine_call(config.engine_max_attempts),
        }
    }

    fn build_request(&self, prompt: &EnginePrompt) -> ChatRequest {
        // Reasoning models need higher token limits and don't support temperature
        let is_reasoning = is_reasoning_model(&self.model);
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            max_completion_tokens: if is_reasoning { 16000 } else { self.max_tokens },
            temperature: if is_reasoning { None } else { Some(0.1) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        }
    }

    async fn call_once(&self, request: &ChatRequest) -> Result<String, EngineError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(EngineError::Api { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Malformed(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EngineError::Malformed("response contained no choices".into()))?;

        if content.trim().is_empty() {
            return Err(EngineError::Malformed("empty completion".into()));
        }
        Ok(content)
    }
}

#[async_trait]
impl TranslationEngine for OpenAiEngine {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_or_translate(&self, prompt: &EnginePrompt) -> Result<String, EngineError> {
        let request = self.build_request(prompt);
        let operation = format!(
            "Engine call {} -> {}",
            prompt.source_language, prompt.target_language
        );
        let text = with_retry_if(
            &self.retry,
            &operation,
            || self.call_once(&request),
            EngineError::is_retryable,
        )
        .await?;
        debug!(chars = text.chars().count(), "Engine returned text");
        Ok(text)
    }
}
