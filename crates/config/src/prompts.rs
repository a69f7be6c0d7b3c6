//! Prompt templates, canned responses, and the predefined question catalog
//!
//! All visitor-facing text is Spanish; the kiosk serves a Spanish-speaking
//! clinical audience.

use serde::Serialize;

/// System prompt used when no override is supplied
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
Eres un asistente especializado en Mounjaro (tirzepatide). Tu función es responder cualquier \
pregunta que te hagan basándote en la información de Mounjaro disponible.

IMPORTANTE: Cualquier pregunta que recibas, sin importar si menciona Mounjaro o no, debes \
responderla basándote en la información de Mounjaro que tienes disponible. Si la pregunta no \
está relacionada con Mounjaro, responde amablemente redirigiendo al usuario hacia información \
sobre Mounjaro.

Responde de manera clara y precisa en español.";

/// Prefix for appending knowledge snippets to the system prompt
pub const CONTEXT_PREAMBLE: &str = "Información de referencia sobre Mounjaro:";

/// Canned reply for bare greetings (no search or generation involved)
pub const GREETING_RESPONSE: &str = "Hola, ¿en qué puedo ayudarte hoy?";

/// Shown when knowledge search fails
pub const SEARCH_FALLBACK_TEXT: &str =
    "Lo siento, no pude buscar información relevante en este momento.";

/// Shown when reply generation fails
pub const GENERATION_FALLBACK_TEXT: &str =
    "Lo siento, no pude generar una respuesta en este momento.";

/// Shown on unexpected internal failures
pub const INTERNAL_ERROR_TEXT: &str =
    "Lo siento, ocurrió un error inesperado. Por favor, intenta de nuevo.";

/// Placeholder context when the index returns nothing usable
pub const NO_RESULTS_TEXT: &str = "No se encontró información relevante sobre tu consulta.";

/// A predefined clinical question offered by the kiosk interface
#[derive(Debug, Clone, Serialize)]
pub struct PredefinedQuestion {
    /// Stable identifier used by the frontend buttons
    pub id: &'static str,
    /// Button label
    pub text: &'static str,
    /// The full question sent through the pipeline
    pub question: &'static str,
    /// Optional system-prompt override for this question
    #[serde(skip_serializing)]
    pub prompt: Option<&'static str>,
}

/// The fixed catalog shown on the kiosk home screen
pub fn predefined_questions() -> &'static [PredefinedQuestion] {
    &[
        PredefinedQuestion {
            id: "info",
            text: "Información sobre Mounjaro",
            question: "¿Qué es Mounjaro y para qué se usa?",
            prompt: Some(
                "Eres un asistente especializado en Mounjaro (tirzepatide). Explica qué es \
                 Mounjaro y sus usos aprobados de forma breve y clara, en español.",
            ),
        },
        PredefinedQuestion {
            id: "effects",
            text: "Efectos secundarios",
            question: "¿Cuáles son los efectos secundarios de Mounjaro?",
            prompt: Some(
                "Eres un asistente especializado en Mounjaro (tirzepatide). Enumera los efectos \
                 secundarios más frecuentes y cuándo consultar al médico, en español.",
            ),
        },
        PredefinedQuestion {
            id: "dosage",
            text: "Dosis y administración",
            question: "¿Cómo se administra Mounjaro y cuál es la dosis recomendada?",
            prompt: None,
        },
        PredefinedQuestion {
            id: "safety",
            text: "Información de seguridad",
            question: "¿Qué información de seguridad debo conocer sobre Mounjaro?",
            prompt: None,
        },
        PredefinedQuestion {
            id: "interactions",
            text: "Interacciones medicamentosas",
            question: "¿Qué medicamentos pueden interactuar con Mounjaro?",
            prompt: None,
        },
    ]
}

/// Look up a predefined question by its id
pub fn find_predefined_question(id: &str) -> Option<&'static PredefinedQuestion> {
    predefined_questions().iter().find(|q| q.id == id)
}
