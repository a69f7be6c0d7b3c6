//! Streaming speech-to-text link
//!
//! One implementation today: Deepgram's realtime `listen` endpoint over a
//! WebSocket. The connection is owned by two small tasks (reader and
//! writer); the caller holds a [`totem_core::LinkHandle`] and consumes a
//! [`totem_core::LinkEventStream`].

pub mod deepgram;

pub use deepgram::DeepgramTranscriber;
