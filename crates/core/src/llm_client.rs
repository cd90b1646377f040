//! Remote Completion Client
//!
//! One chat-completion request per call against any OpenAI-compatible
//! endpoint. Every failure is reported as one of three kinds so callers can
//! fall back without inspecting transport details.

use crate::credential::Credential;
use crate::phase::LessonPhase;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the completion service is told about the lesson, alongside the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionContext {
    pub lesson_phase: LessonPhase,
    pub participants: Vec<String>,
    pub previous_messages: Vec<String>,
    pub current_topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("Completion service unreachable: {0}")]
    Network(String),
    #[error("Completion service rejected the credential: {0}")]
    Auth(String),
    #[error("Completion service returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// A service that turns a prompt plus lesson context into a reply.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        context: &CompletionContext,
    ) -> Result<String, CompletionError>;
}

/// Default persona for the facilitator. `{phase}`, `{participants}` and
/// `{topic}` are substituted per request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Ms. Adventure, an enthusiastic AI teacher leading a kids' entrepreneurship lesson for ages 8-11.

Context:
- Lesson: Desert Island Survival & Entrepreneurship
- Phase: {phase}
- Participants: {participants}
- Current Topic: {topic}

Guidelines:
- Keep responses under 50 words
- Use encouraging, age-appropriate language
- Ask engaging questions
- Connect activities to entrepreneurship concepts
- Use emojis sparingly but effectively
- Maintain excitement and energy
- Encourage creativity and problem-solving
- Build on kids' ideas positively

Focus on teaching:
- Creative problem-solving
- Teamwork and collaboration
- Resource management
- Planning and organization
- Innovation and adaptation
- Leadership skills";

/// Request parameters shared by every call.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub system_prompt: String,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: 150,
            timeout: Duration::from_secs(30),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Fills the persona template from the lesson context.
pub fn build_system_prompt(template: &str, context: &CompletionContext) -> String {
    let mut prompt = template
        .replace("{phase}", context.lesson_phase.as_str())
        .replace("{participants}", &context.participants.join(", "))
        .replace("{topic}", &context.current_topic);
    if !context.previous_messages.is_empty() {
        prompt.push_str("\n\nRecent conversation:\n");
        for line in &context.previous_messages {
            prompt.push_str("- ");
            prompt.push_str(line);
            prompt.push('\n');
        }
    }
    prompt
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// An implementation of `CompletionClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    settings: CompletionSettings,
}

impl OpenAICompatibleClient {
    /// Creates a client for the credential's provider.
    ///
    /// # Arguments
    ///
    /// * `credential` - Provider and API key; the provider picks the base URL.
    /// * `settings` - Model, sampling and timeout parameters for every request.
    pub fn new(
        credential: &Credential,
        settings: CompletionSettings,
    ) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| CompletionError::Network(e.to_string()))?;
        Ok(Self {
            http,
            api_base: credential.provider().api_base().to_string(),
            api_key: credential.api_key().to_string(),
            settings,
        })
    }

    /// Points the client at a different OpenAI-compatible server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        prompt: &str,
        context: &CompletionContext,
    ) -> Result<String, CompletionError> {
        let system_prompt = build_system_prompt(&self.settings.system_prompt, context);
        let request = ChatCompletionRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Auth(format!("HTTP {}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(CompletionError::Network(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;
        let parsed: ChatCompletionResponse = serde_json::from_slice(&body)
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                CompletionError::MalformedResponse("no content in choices[0].message".to_string())
            })
    }
}
