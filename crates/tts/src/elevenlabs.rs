//! ElevenLabs REST synthesizer

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use totem_config::TtsSettings;
use totem_core::{Error, Result, SpeechSynthesizer};

use crate::pronunciation::normalize_pronunciation;
use crate::text::{preprocess, split_into_chunks};

/// ElevenLabs text-to-speech client
pub struct ElevenLabsSynthesizer {
    client: Client,
    cfg: TtsSettings,
}

impl ElevenLabsSynthesizer {
    pub fn new(cfg: TtsSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, cfg })
    }

    fn speech_url(&self) -> String {
        format!("{}/text-to-speech/{}", self.cfg.base_url, self.cfg.voice_id)
    }

    /// One synthesis request for one already-normalized chunk
    async fn request_audio(&self, text: &str) -> Result<Vec<u8>> {
        let body = SpeechRequest {
            text,
            model_id: &self.cfg.model_id,
            voice_settings: VoiceSettings {
                stability: self.cfg.stability,
                similarity_boost: self.cfg.similarity_boost,
                style: self.cfg.style,
                use_speaker_boost: self.cfg.use_speaker_boost,
            },
        };

        let response = self
            .client
            .post(self.speech_url())
            .header("xi-api-key", &self.cfg.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!(
                "speech request failed: {status} {detail}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let normalized = normalize_pronunciation(text);
        let processed = preprocess(&normalized, self.cfg.max_text_chars)?;

        debug!(
            chars = processed.len(),
            voice = %self.cfg.voice_id,
            "synthesizing speech"
        );

        // Short texts go out as one request; long ones are chunked at
        // sentence boundaries and the audio concatenated.
        if processed.chars().count() <= self.cfg.chunk_chars {
            let audio = self.request_audio(&processed).await?;
            info!(bytes = audio.len(), "speech synthesized");
            return Ok(audio);
        }

        let chunks = split_into_chunks(&processed, self.cfg.chunk_chars);
        debug!(chunks = chunks.len(), "long text split for synthesis");

        let mut audio = Vec::new();
        for chunk in &chunks {
            let part = self.request_audio(chunk).await?;
            audio.extend_from_slice(&part);
        }

        info!(bytes = audio.len(), chunks = chunks.len(), "speech synthesized");
        Ok(audio)
    }

    fn voice_id(&self) -> &str {
        &self.cfg.voice_id
    }
}

/// Wrap audio bytes as a `data:audio/mpeg` URL for the kiosk frontend
pub fn audio_data_url(audio: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
    format!("data:audio/mpeg;base64,{encoded}")
}
