//! Typed call events emitted by the orchestrator
//!
//! The orchestrator pushes these over an mpsc channel; the transport
//! adapter is the only consumer and serializes each into an outbound
//! message. A closed enum keeps ordering explicit; there is no broadcast
//! pub/sub between the two.

use serde::Serialize;

use crate::transcript::TranscriptFragment;

/// Events produced over the lifetime of a continuous call
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The call became active
    CallStarted,
    /// The call was stopped and all state cleared
    CallStopped,
    /// A transcript fragment (partial or final) arrived
    Transcription(TranscriptFragment),
    /// A reply was generated for a finalized utterance
    AiResponse {
        text: String,
        user_message: String,
    },
    /// Synthesized reply audio, ready for playback
    TtsAudio(Vec<u8>),
    /// Smoothed input level for UI metering (0.0 - 1.0)
    AudioLevel(f32),
    /// A turn cycle began
    ProcessingStarted,
    /// A turn cycle ended (success or failure)
    ProcessingFinished,
    /// Conversation history and call state were reset
    ConversationReset,
    /// A recoverable error; the call stays usable
    Error(String),
}

/// Point-in-time snapshot of call state, served on `get_status`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStatus {
    pub is_call_active: bool,
    pub is_processing: bool,
    pub is_synthesis_playing: bool,
    pub is_user_speaking: bool,
    pub is_connected: bool,
    pub pending_queue_length: usize,
    pub current_transcription: String,
    pub conversation_history_length: usize,
}
