//! Collaborator traits
//!
//! Each external provider is reached through one of these interfaces.
//! Implementations are constructed once per process (or per session for
//! the reply generator) and passed in explicitly, no global service
//! singletons.

pub mod generator;
pub mod llm;
pub mod search;
pub mod speech;
pub mod transcriber;

pub use generator::ReplyGenerator;
pub use llm::{GenerateReply, GenerateRequest, LanguageModel, TokenUsage};
pub use search::{KnowledgeSearch, Snippet};
pub use speech::SpeechSynthesizer;
pub use transcriber::{LinkEventStream, LinkHandle, TranscriberLink};
