//! Speech synthesis traits

use async_trait::async_trait;

use crate::Result;

/// Text-to-speech interface
///
/// Implementations:
/// - `ElevenLabsSynthesizer` - ElevenLabs REST TTS
///
/// Implementations own their pronunciation normalization: callers hand
/// over display text and get playback-ready audio bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Synthesize text to audio bytes.
    ///
    /// Must accept texts up to several thousand characters; longer inputs
    /// are chunked internally. Empty text is an `InvalidInput` error;
    /// callers short-circuit before reaching the synthesizer.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Voice identifier for logging
    fn voice_id(&self) -> &str;
}
