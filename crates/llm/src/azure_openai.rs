//! Azure OpenAI chat-completions backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use totem_config::{LlmSettings, CONTEXT_PREAMBLE, DEFAULT_SYSTEM_PROMPT};
use totem_core::{Error, GenerateReply, GenerateRequest, LanguageModel, Result, TokenUsage, TurnRole};

/// Azure OpenAI deployment client
pub struct AzureOpenAiBackend {
    client: Client,
    cfg: LlmSettings,
}

impl AzureOpenAiBackend {
    pub fn new(cfg: LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, cfg })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.cfg.endpoint, self.cfg.deployment, self.cfg.api_version
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<UsageWire>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct UsageWire {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// Assemble the wire messages: system prompt (with optional knowledge
/// context appended), recent turns, then the user message.
fn build_messages(request: &GenerateRequest) -> Vec<ChatMessage> {
    let mut system = request
        .prompt_override
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    if !request.context.trim().is_empty() {
        system.push_str("\n\n");
        system.push_str(CONTEXT_PREAMBLE);
        system.push(' ');
        system.push_str(request.context.trim());
    }

    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(ChatMessage {
        role: "system",
        content: system,
    });

    for turn in &request.history {
        messages.push(ChatMessage {
            role: match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            },
            content: turn.content.clone(),
        });
    }

    messages.push(ChatMessage {
        role: "user",
        content: request.user_message.clone(),
    });

    messages
}

#[async_trait]
impl LanguageModel for AzureOpenAiBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateReply> {
        if request.user_message.trim().is_empty() {
            return Err(Error::InvalidInput("user message cannot be empty".into()));
        }

        debug!(
            context_chars = request.context.len(),
            history_turns = request.history.len(),
            override_prompt = request.prompt_override.is_some(),
            "generating reply"
        );

        let body = ChatRequest {
            messages: build_messages(&request),
            temperature: self.cfg.temperature,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_tokens: self.cfg.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "completions request failed: {status} {detail}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("bad completions response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Generation("no choices in completions response".into()))?;

        debug!(chars = choice.message.content.len(), "reply received");

        Ok(GenerateReply {
            text: choice.message.content,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    fn model_name(&self) -> &str {
        &self.cfg.deployment
    }
}
