//! Kiosk question answering
//!
//! Three pieces built on the shared collaborator traits:
//! - [`generator`]: the per-session reply generator used by continuous
//!   calls (search then LLM, with bounded history)
//! - [`question`]: the one-shot HTTP question flow (greeting short-circuit,
//!   validation, then the full pipeline ending in a speech data URL)
//! - [`validation`]: domain query validation with an LLM fallback

pub mod generator;
pub mod question;
pub mod validation;

pub use generator::TotemReplyGenerator;
pub use question::{QuestionAnswer, QuestionService, ServiceValidation};
pub use validation::{Confidence, QueryValidator, ValidationOutcome};
