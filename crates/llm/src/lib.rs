//! Language model backend
//!
//! Azure OpenAI chat-completions client implementing
//! [`totem_core::LanguageModel`]. Prompt assembly (system prompt, knowledge
//! context, recent turns) lives here; callers hand over a
//! [`totem_core::GenerateRequest`] and get text back.

pub mod azure_openai;

pub use azure_openai::AzureOpenAiBackend;
