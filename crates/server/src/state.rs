//! Shared application state

use std::sync::Arc;

use totem_config::Settings;
use totem_core::{KnowledgeSearch, LanguageModel, SpeechSynthesizer, TranscriberLink};
use totem_kiosk::QuestionService;
use totem_llm::AzureOpenAiBackend;
use totem_search::AzureSearchClient;
use totem_stt::DeepgramTranscriber;
use totem_tts::ElevenLabsSynthesizer;

use crate::ServerError;

/// Process-wide collaborators plus settings. Each WebSocket session gets
/// its own orchestrator and reply generator on top of these shared
/// clients; nothing mutable is shared between sessions.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub search: Arc<dyn KnowledgeSearch>,
    pub llm: Arc<dyn LanguageModel>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub transcriber: Arc<dyn TranscriberLink>,
    pub questions: Arc<QuestionService>,
}

impl AppState {
    /// Build state with the production provider clients
    pub fn new(settings: Settings) -> Result<Self, ServerError> {
        let search: Arc<dyn KnowledgeSearch> = Arc::new(
            AzureSearchClient::new(settings.search.clone())
                .map_err(|e| ServerError::Startup(e.to_string()))?,
        );
        let llm: Arc<dyn LanguageModel> = Arc::new(
            AzureOpenAiBackend::new(settings.llm.clone())
                .map_err(|e| ServerError::Startup(e.to_string()))?,
        );
        let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(
            ElevenLabsSynthesizer::new(settings.tts.clone())
                .map_err(|e| ServerError::Startup(e.to_string()))?,
        );
        let transcriber: Arc<dyn TranscriberLink> =
            Arc::new(DeepgramTranscriber::new(settings.transcriber.clone()));

        Ok(Self::with_collaborators(
            settings,
            search,
            llm,
            synthesizer,
            transcriber,
        ))
    }

    /// Build state around injected collaborators (tests, alternate
    /// providers)
    pub fn with_collaborators(
        settings: Settings,
        search: Arc<dyn KnowledgeSearch>,
        llm: Arc<dyn LanguageModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transcriber: Arc<dyn TranscriberLink>,
    ) -> Self {
        let questions = Arc::new(QuestionService::new(
            Arc::clone(&search),
            Arc::clone(&llm),
            Arc::clone(&synthesizer),
            settings.search.top_k,
        ));

        Self {
            settings: Arc::new(settings),
            search,
            llm,
            synthesizer,
            transcriber,
            questions,
        }
    }
}
