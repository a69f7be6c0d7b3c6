//! One-shot question flow for the kiosk HTTP surface
//!
//! The same search/LLM/speech pipeline the continuous call uses, but
//! stateless: one question in, one answer (text + audio data URL) out.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use totem_config::{
    find_predefined_question, GENERATION_FALLBACK_TEXT, GREETING_RESPONSE, SEARCH_FALLBACK_TEXT,
};
use totem_core::{GenerateRequest, KnowledgeSearch, LanguageModel, SpeechSynthesizer, TokenUsage};
use totem_search::extract_relevant_text;
use totem_tts::audio_data_url;

use crate::validation::QueryValidator;

/// Result of one question through the pipeline
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub success: bool,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub search_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuestionAnswer {
    fn failure(error: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
            audio_url: None,
            search_results: 0,
            usage: None,
            warning: None,
            error: Some(error.into()),
        }
    }
}

/// Per-service probe results for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ServiceValidation {
    pub search: bool,
    pub llm: bool,
    pub tts: bool,
}

impl ServiceValidation {
    pub fn all_ok(&self) -> bool {
        self.search && self.llm && self.tts
    }
}

/// The kiosk's one-shot question pipeline
pub struct QuestionService {
    search: Arc<dyn KnowledgeSearch>,
    llm: Arc<dyn LanguageModel>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    validator: QueryValidator,
    top_k: usize,
}

impl QuestionService {
    pub fn new(
        search: Arc<dyn KnowledgeSearch>,
        llm: Arc<dyn LanguageModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        top_k: usize,
    ) -> Self {
        let validator = QueryValidator::new(Arc::clone(&llm));
        Self {
            search,
            llm,
            synthesizer,
            validator,
            top_k,
        }
    }

    /// Run one question through the full pipeline
    pub async fn process_question(
        &self,
        question: &str,
        filter: Option<&str>,
        prompt_override: Option<&str>,
    ) -> QuestionAnswer {
        info!(%question, "processing kiosk question");

        // Greetings never touch search or the model.
        let normalized = question.to_lowercase();
        let normalized = normalized.trim();
        if matches!(normalized, "hola" | "hello" | "hi") {
            debug!("greeting detected, returning canned response");
            return self.spoken_answer(GREETING_RESPONSE.to_string(), 0, None).await;
        }

        // Off-topic questions get a rotating rejection message (validation
        // fails open, so a broken validator never blocks visitors).
        let verdict = self.validator.validate(question).await;
        if !verdict.is_valid {
            debug!(reason = verdict.reason, "question rejected by validation");
            let message = self.validator.rejection_message().to_string();
            return self.spoken_answer(message, 0, None).await;
        }

        let snippets = match self.search.search(question, filter, self.top_k).await {
            Ok(snippets) => snippets,
            Err(e) => {
                error!(error = %e, "knowledge search failed");
                return QuestionAnswer::failure(
                    "Error en la búsqueda de información",
                    SEARCH_FALLBACK_TEXT,
                );
            }
        };
        let context = extract_relevant_text(&snippets);

        let mut request = GenerateRequest::new(question).with_context(context);
        if let Some(prompt) = prompt_override {
            request = request.with_prompt_override(prompt);
        }

        let reply = match self.llm.generate(request).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "reply generation failed");
                return QuestionAnswer::failure(
                    "Error en la generación de respuesta",
                    GENERATION_FALLBACK_TEXT,
                );
            }
        };

        self.spoken_answer(reply.text, snippets.len(), reply.usage).await
    }

    /// Run a catalog question through the pipeline with its prompt
    /// override; `None` for unknown ids.
    pub async fn process_predefined(&self, id: &str) -> Option<QuestionAnswer> {
        let entry = find_predefined_question(id)?;
        info!(id, question = entry.question, "processing predefined question");
        Some(
            self.process_question(entry.question, None, entry.prompt)
                .await,
        )
    }

    /// Attach synthesized audio to a finished answer text. Synthesis
    /// failure degrades to a text-only success with a warning.
    async fn spoken_answer(
        &self,
        text: String,
        search_results: usize,
        usage: Option<TokenUsage>,
    ) -> QuestionAnswer {
        debug!(chars = text.len(), "synthesizing answer audio");
        match self.synthesizer.synthesize(&text).await {
            Ok(audio) => QuestionAnswer {
                success: true,
                audio_url: Some(audio_data_url(&audio)),
                text,
                search_results,
                usage,
                warning: None,
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "audio generation failed, returning text only");
                QuestionAnswer {
                    success: true,
                    audio_url: None,
                    text,
                    search_results,
                    usage,
                    warning: Some("Respuesta generada pero no se pudo crear el audio.".to_string()),
                    error: None,
                }
            }
        }
    }

    /// Exercise every provider with a tiny request; used by the health
    /// endpoint.
    pub async fn validate_services(&self) -> ServiceValidation {
        let search = self
            .search
            .search("test", None, 1)
            .await
            .map_err(|e| warn!(error = %e, "search probe failed"))
            .is_ok();

        let llm = self
            .llm
            .generate(GenerateRequest::new("test"))
            .await
            .map_err(|e| warn!(error = %e, "llm probe failed"))
            .is_ok();

        let tts = self
            .synthesizer
            .synthesize("Test de síntesis de voz.")
            .await
            .map_err(|e| warn!(error = %e, "tts probe failed"))
            .is_ok();

        ServiceValidation { search, llm, tts }
    }

    /// Guard for obviously invalid input before the pipeline runs
    pub fn is_valid_question(question: &str) -> bool {
        !question.trim().is_empty()
    }
}
