//! Speech synthesis
//!
//! ElevenLabs REST client implementing [`totem_core::SpeechSynthesizer`],
//! plus the text machinery in front of it: clinical pronunciation
//! normalization and sentence-aware truncation/chunking. Display text goes
//! in, playback-ready MP3 bytes come out.

pub mod elevenlabs;
pub mod pronunciation;
pub mod text;

pub use elevenlabs::{audio_data_url, ElevenLabsSynthesizer};
pub use pronunciation::normalize_pronunciation;
pub use text::{preprocess, split_into_chunks, truncate_at_sentence};
