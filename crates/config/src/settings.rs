//! Settings for every subsystem

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub transcriber: TranscriberSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub tts: TtsSettings,
    #[serde(default)]
    pub call: CallSettings,
    #[serde(default)]
    pub silence: SilenceSettings,
}

/// HTTP/WebSocket server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty means permissive (kiosk deployments run
    /// on a closed network)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Streaming transcriber (Deepgram) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_transcriber_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_transcriber_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Empty-frame keep-alive cadence while a call is connected
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_interval_secs: u64,
}

fn default_transcriber_endpoint() -> String {
    "wss://api.deepgram.com/v1/listen".to_string()
}
fn default_transcriber_model() -> String {
    "nova-2".to_string()
}
fn default_language() -> String {
    "es-ES".to_string()
}
fn default_keep_alive_secs() -> u64 {
    30
}

impl Default for TranscriberSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_transcriber_endpoint(),
            model: default_transcriber_model(),
            language: default_language(),
            keep_alive_interval_secs: default_keep_alive_secs(),
        }
    }
}

/// Azure OpenAI chat-completions settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_deployment")]
    pub deployment: String,
    #[serde(default = "default_llm_api_version")]
    pub api_version: String,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String {
    "https://uyza-openai-iadium-dev-eastus2.openai.azure.com".to_string()
}
fn default_llm_deployment() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_llm_api_version() -> String {
    "2025-01-01-preview".to_string()
}
fn default_llm_max_tokens() -> u32 {
    500
}
fn default_llm_temperature() -> f32 {
    0.7
}
fn default_llm_timeout_secs() -> u64 {
    30
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_llm_endpoint(),
            deployment: default_llm_deployment(),
            api_version: default_llm_api_version(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Azure AI Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_index")]
    pub index_name: String,
    #[serde(default = "default_search_api_version")]
    pub api_version: String,
    /// Index filter applied when the caller does not supply one
    #[serde(default = "default_search_filter")]
    pub default_filter: String,
    #[serde(default = "default_search_top_k")]
    pub top_k: usize,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_endpoint() -> String {
    "https://uyza-srch-iadium-dev001.search.windows.net".to_string()
}
fn default_search_index() -> String {
    "iadium-knowledge".to_string()
}
fn default_search_api_version() -> String {
    "2023-07-01-Preview".to_string()
}
fn default_search_filter() -> String {
    "modulo eq 'mounjaro'".to_string()
}
fn default_search_top_k() -> usize {
    3
}
fn default_search_timeout_secs() -> u64 {
    10
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_search_endpoint(),
            index_name: default_search_index(),
            api_version: default_search_api_version(),
            default_filter: default_search_filter(),
            top_k: default_search_top_k(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

/// ElevenLabs TTS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,
    #[serde(default = "default_tts_voice")]
    pub voice_id: String,
    #[serde(default = "default_tts_model")]
    pub model_id: String,
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,
    #[serde(default)]
    pub style: f32,
    #[serde(default)]
    pub use_speaker_boost: bool,
    /// Hard cap before sentence-boundary truncation kicks in
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    /// Target chunk size when splitting long texts
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_tts_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tts_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}
fn default_tts_voice() -> String {
    // Rachel
    "21m00Tcm4TlvDq8ikWAM".to_string()
}
fn default_tts_model() -> String {
    "eleven_monolingual_v1".to_string()
}
fn default_stability() -> f32 {
    0.5
}
fn default_similarity_boost() -> f32 {
    0.75
}
fn default_max_text_chars() -> usize {
    2000
}
fn default_chunk_chars() -> usize {
    500
}
fn default_tts_timeout_secs() -> u64 {
    30
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_tts_base_url(),
            voice_id: default_tts_voice(),
            model_id: default_tts_model(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
            style: 0.0,
            use_speaker_boost: false,
            max_text_chars: default_max_text_chars(),
            chunk_chars: default_chunk_chars(),
            timeout_secs: default_tts_timeout_secs(),
        }
    }
}

/// Continuous-call orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSettings {
    /// Bound on one reply generation before the turn is abandoned
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
    /// Backoff before the single transcriber reconnect attempt
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// Conversation history bound, in turns
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_response_timeout_secs() -> u64 {
    15
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_history_capacity() -> usize {
    20
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            response_timeout_secs: default_response_timeout_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            history_capacity: default_history_capacity(),
        }
    }
}

/// Silence/level detector tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilenceSettings {
    /// Smoothed level below this counts as silence
    #[serde(default = "default_silence_threshold")]
    pub threshold: f32,
    /// Continuous silence needed before the span is confirmed
    #[serde(default = "default_min_silence_ms")]
    pub min_silence_duration_ms: u64,
    /// Trailing moving-average window, in frames
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// Exponential smoothing factor
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f32,
}

fn default_silence_threshold() -> f32 {
    0.001
}
fn default_min_silence_ms() -> u64 {
    300
}
fn default_history_size() -> usize {
    5
}
fn default_smoothing_factor() -> f32 {
    0.4
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            threshold: default_silence_threshold(),
            min_silence_duration_ms: default_min_silence_ms(),
            history_size: default_history_size(),
            smoothing_factor: default_smoothing_factor(),
        }
    }
}

/// Which API keys are present, for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct KeyPresence {
    pub transcriber: bool,
    pub llm: bool,
    pub search: bool,
    pub tts: bool,
}

impl KeyPresence {
    pub fn all_present(&self) -> bool {
        self.transcriber && self.llm && self.search && self.tts
    }
}

impl Settings {
    /// Report which provider keys are configured
    pub fn key_presence(&self) -> KeyPresence {
        KeyPresence {
            transcriber: !self.transcriber.api_key.is_empty(),
            llm: !self.llm.api_key.is_empty(),
            search: !self.search.api_key.is_empty(),
            tts: !self.tts.api_key.is_empty(),
        }
    }
}

/// Load settings from an optional TOML file layered under TOTEM_ env vars.
///
/// Env vars win over the file: `TOTEM_SERVER__PORT=8080`,
/// `TOTEM_TRANSCRIBER__API_KEY=...`, etc.
pub fn load_settings(path: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path).required(true));
    } else {
        builder = builder.add_source(config::File::with_name("totem").required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TOTEM")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;

    tracing::debug!(
        port = settings.server.port,
        model = %settings.transcriber.model,
        "settings loaded"
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3001);
        assert_eq!(settings.call.response_timeout_secs, 15);
        assert_eq!(settings.call.reconnect_delay_secs, 5);
        assert_eq!(settings.silence.min_silence_duration_ms, 300);
        assert_eq!(settings.search.default_filter, "modulo eq 'mounjaro'");
    }

    #[test]
    fn test_key_presence() {
        let mut settings = Settings::default();
        assert!(!settings.key_presence().all_present());

        settings.transcriber.api_key = "dg".into();
        settings.llm.api_key = "ai".into();
        settings.search.api_key = "srch".into();
        settings.tts.api_key = "xi".into();
        assert!(settings.key_presence().all_present());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 4000\n\n[transcriber]\nlanguage = \"es-MX\"\n"
        )
        .unwrap();

        let settings = load_settings(file.path().to_str()).unwrap();
        assert_eq!(settings.server.port, 4000);
        assert_eq!(settings.transcriber.language, "es-MX");
        // untouched sections keep their defaults
        assert_eq!(settings.tts.voice_id, "21m00Tcm4TlvDq8ikWAM");
    }
}
