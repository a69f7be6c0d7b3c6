//! Transcript fragments and transcriber link events

use serde::{Deserialize, Serialize};

/// A transcript fragment from the streaming transcriber.
///
/// Partial fragments (`is_final == false`) may be revised by later
/// fragments of the same utterance; final fragments end an utterance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptFragment {
    /// Transcribed text (may be empty for keep-alive style results)
    pub text: String,
    /// Whether the provider marked this fragment as final
    pub is_final: bool,
    /// Provider confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl TranscriptFragment {
    /// Create a final fragment
    pub fn final_text(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence,
        }
    }

    /// Create a partial fragment
    pub fn partial(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence,
        }
    }

    /// Whether the fragment carries any text after trimming
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Events produced by a live transcriber link.
///
/// A closed sum type instead of separate transcript/error callbacks so the
/// consumer sees one ordered stream.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A partial or final transcript arrived
    Transcript(TranscriptFragment),
    /// The link dropped; the handle is dead and must be reopened
    Closed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_is_empty() {
        assert!(TranscriptFragment::final_text("   ", 0.9).is_empty());
        assert!(!TranscriptFragment::final_text("hola", 0.9).is_empty());
    }
}
