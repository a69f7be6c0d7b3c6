//! Language model traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Turn;
use crate::Result;

/// A generation request: the visitor's message plus whatever grounding the
/// caller assembled (knowledge snippets, recent turns, a prompt override
/// for predefined questions).
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// The visitor's message
    pub user_message: String,
    /// Knowledge snippets to ground the reply (may be empty)
    pub context: String,
    /// Replaces the default system prompt when set
    pub prompt_override: Option<String>,
    /// Recent conversation turns, oldest first
    pub history: Vec<Turn>,
}

impl GenerateRequest {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_prompt_override(mut self, prompt: impl Into<String>) -> Self {
        self.prompt_override = Some(prompt.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A generated reply
#[derive(Debug, Clone)]
pub struct GenerateReply {
    /// Generated text
    pub text: String,
    /// Usage, when the provider reports it
    pub usage: Option<TokenUsage>,
}

impl GenerateReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Language model interface
///
/// Implementations:
/// - `AzureOpenAiBackend` - Azure OpenAI chat completions deployment
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate a reply for the request
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateReply>;

    /// Deployment/model name for logging
    fn model_name(&self) -> &str;
}
