//! Core traits and types for the totem voice backend
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits (transcriber link, LLM, knowledge search, TTS)
//! - Audio format constants and PCM helpers
//! - Transcript and call event types
//! - Conversation history types
//! - Error types

pub mod audio;
pub mod conversation;
pub mod error;
pub mod events;
pub mod traits;
pub mod transcript;

pub use audio::{pcm16_samples, BYTES_PER_SAMPLE, CHANNELS, FRAME_BYTES, FRAME_DURATION_MS, SAMPLE_RATE_HZ};
pub use conversation::{ConversationHistory, Turn, TurnRole};
pub use error::{Error, Result};
pub use events::{CallEvent, CallStatus};
pub use transcript::{LinkEvent, TranscriptFragment};

pub use traits::{
    // Transcriber
    LinkEventStream, LinkHandle, TranscriberLink,
    // LLM
    GenerateReply, GenerateRequest, LanguageModel, TokenUsage,
    // Retrieval
    KnowledgeSearch, Snippet,
    // Speech
    SpeechSynthesizer,
    // Turn generation
    ReplyGenerator,
};
