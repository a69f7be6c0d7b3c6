//! Domain query validation
//!
//! Cheap keyword checks decide most queries; only genuinely ambiguous ones
//! cost an LLM round trip. Validation fails open: when in doubt (or when
//! the model is down) the query goes through.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use totem_core::{GenerateRequest, LanguageModel};

/// Keywords that directly indicate an on-topic query
const DOMAIN_KEYWORDS: &[&str] = &[
    "mounjaro",
    "tirzepatide",
    "tirzepatida",
    "diabetes",
    "diabetes tipo 2",
    "glucosa",
    "azúcar",
    "insulina",
    "metformina",
    "peso",
    "obesidad",
    "adelgazar",
    "bajar de peso",
    "medicamento",
    "medicina",
    "tratamiento",
    "inyección",
    "inyecciones",
    "dosis",
    "efectos secundarios",
    "contraindicaciones",
    "interacciones",
    "seguridad",
    "administración",
];

/// Phrasings that implicitly refer to the medication on screen
const IMPLICIT_QUERIES: &[&str] = &[
    "qué es",
    "para qué sirve",
    "para qué se usa",
    "cómo funciona",
    "cuáles son los efectos",
    "efectos secundarios",
    "cómo se administra",
    "cómo se usa",
    "información",
    "datos",
    "detalles",
];

/// Demonstratives that lean on the kiosk context ("this medication")
const CONTEXT_INDICATORS: &[&str] = &["esto", "este medicamento", "esta medicina"];

const GREETINGS: &[&str] = &[
    "hola",
    "hello",
    "hi",
    "buenos días",
    "buenas tardes",
    "buenas noches",
    "saludos",
    "hey",
    "qué tal",
    "cómo estás",
];

const HELP_KEYWORDS: &[&str] = &[
    "ayuda",
    "help",
    "qué puedes hacer",
    "qué sabes",
    "qué información tienes",
    "para qué sirves",
    "qué haces",
];

const REJECTION_MESSAGES: &[&str] = &[
    "Lo siento, solo puedo responder preguntas relacionadas con Mounjaro y diabetes tipo 2. \
     ¿Hay algo específico sobre Mounjaro que te gustaría saber?",
    "Mi especialidad es Mounjaro y diabetes tipo 2. ¿Tienes alguna pregunta sobre este medicamento?",
    "Solo puedo ayudarte con información sobre Mounjaro. ¿Te gustaría saber qué es Mounjaro o \
     para qué se usa?",
    "Mi conocimiento se centra en Mounjaro. ¿Hay algo específico sobre este medicamento que te \
     interesa?",
];

/// How sure the validator is about its verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Validation verdict
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub reason: &'static str,
    pub confidence: Confidence,
}

impl ValidationOutcome {
    fn valid(reason: &'static str, confidence: Confidence) -> Self {
        Self {
            is_valid: true,
            reason,
            confidence,
        }
    }
}

/// Validates whether a query belongs to the kiosk's domain
pub struct QueryValidator {
    llm: Arc<dyn LanguageModel>,
    rejection_cursor: AtomicUsize,
}

impl QueryValidator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            rejection_cursor: AtomicUsize::new(0),
        }
    }

    /// Whether the query is a bare greeting
    pub fn is_greeting(query: &str) -> bool {
        let normalized = query.to_lowercase();
        let normalized = normalized.trim();
        GREETINGS.iter().any(|g| normalized.contains(g))
    }

    /// Whether the query asks what the kiosk can do
    pub fn is_help_query(query: &str) -> bool {
        let normalized = query.to_lowercase();
        let normalized = normalized.trim();
        HELP_KEYWORDS.iter().any(|k| normalized.contains(k))
    }

    /// Validate a query against the kiosk's domain
    pub async fn validate(&self, query: &str) -> ValidationOutcome {
        // Greetings and help queries are handled elsewhere; let them pass.
        if Self::is_greeting(query) || Self::is_help_query(query) {
            return ValidationOutcome::valid("saludo o consulta de ayuda", Confidence::High);
        }

        let normalized = query.to_lowercase();
        let normalized = normalized.trim();

        if DOMAIN_KEYWORDS.iter().any(|k| normalized.contains(k)) {
            debug!(%query, "domain keywords matched");
            return ValidationOutcome::valid("keywords del dominio detectados", Confidence::High);
        }

        if IMPLICIT_QUERIES.iter().any(|k| normalized.contains(k)) {
            debug!(%query, "implicit query matched");
            return ValidationOutcome::valid("consulta implícita detectada", Confidence::High);
        }

        if CONTEXT_INDICATORS.iter().any(|k| normalized.contains(k)) {
            debug!(%query, "context indicator matched");
            return ValidationOutcome::valid("consulta contextual detectada", Confidence::Medium);
        }

        // Ambiguous: ask the model for a yes/no.
        let prompt = format!(
            "Analiza la siguiente pregunta y determina si está relacionada con Mounjaro \
             (tirzepatide), diabetes tipo 2, control de peso, o información médica relacionada.\n\n\
             Pregunta: \"{query}\"\n\n\
             Responde únicamente con \"SÍ\" si la pregunta está relacionada, o \"NO\" si no lo está."
        );

        match self.llm.generate(GenerateRequest::new(prompt)).await {
            Ok(reply) => {
                let answer = reply.text.to_lowercase();
                let related = answer.contains("sí") || answer.contains("si");
                debug!(%query, related, "model validation verdict");
                ValidationOutcome {
                    is_valid: related,
                    reason: if related {
                        "el modelo determinó que está relacionada"
                    } else {
                        "el modelo determinó que no está relacionada"
                    },
                    confidence: Confidence::Medium,
                }
            }
            Err(e) => {
                // Fail open: a broken validator must not block visitors.
                warn!(error = %e, "model validation failed, allowing query");
                ValidationOutcome::valid("validación no disponible", Confidence::Low)
            }
        }
    }

    /// Next rejection message, rotating through the catalog
    pub fn rejection_message(&self) -> &'static str {
        let index = self.rejection_cursor.fetch_add(1, Ordering::Relaxed);
        REJECTION_MESSAGES[index % REJECTION_MESSAGES.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use totem_core::{Error, GenerateReply, Result};

    struct ScriptedLlm {
        answer: Option<&'static str>,
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<GenerateReply> {
            match self.answer {
                Some(answer) => Ok(GenerateReply::text(answer)),
                None => Err(Error::Generation("down".into())),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn validator(answer: Option<&'static str>) -> QueryValidator {
        QueryValidator::new(Arc::new(ScriptedLlm { answer }))
    }

    #[tokio::test]
    async fn test_keyword_match_skips_model() {
        // model would reject, but keywords win first
        let v = validator(Some("NO"));
        let outcome = v.validate("¿cuál es la dosis recomendada?").await;
        assert!(outcome.is_valid);
        assert_eq!(outcome.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn test_greeting_is_always_valid() {
        let v = validator(Some("NO"));
        assert!(QueryValidator::is_greeting("Hola, buenas tardes"));
        assert!(v.validate("hola").await.is_valid);
    }

    #[tokio::test]
    async fn test_ambiguous_query_uses_model() {
        let v = validator(Some("NO"));
        let outcome = v.validate("¿va a llover mañana?").await;
        assert!(!outcome.is_valid);

        let v = validator(Some("SÍ"));
        let outcome = v.validate("¿va a llover mañana?").await;
        assert!(outcome.is_valid);
    }

    #[tokio::test]
    async fn test_model_failure_fails_open() {
        let v = validator(None);
        let outcome = v.validate("¿va a llover mañana?").await;
        assert!(outcome.is_valid);
        assert_eq!(outcome.confidence, Confidence::Low);
    }

    #[test]
    fn test_rejection_messages_rotate() {
        let v = validator(Some("NO"));
        let first = v.rejection_message();
        let second = v.rejection_message();
        assert_ne!(first, second);
    }
}
