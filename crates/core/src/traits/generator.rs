//! Reply generation trait consumed by the call orchestrator

use async_trait::async_trait;

use crate::Result;

/// Produces a reply for one finalized utterance.
///
/// The production implementation composes knowledge search and the LLM and
/// keeps the session's bounded conversation history; the orchestrator only
/// sees this narrow interface, which keeps the turn state machine testable
/// with a mock.
#[async_trait]
pub trait ReplyGenerator: Send + Sync + 'static {
    /// Generate a reply for the utterance and record the exchange in the
    /// session history
    async fn reply(&self, utterance: &str) -> Result<String>;

    /// Number of turns currently held in history
    fn history_len(&self) -> usize;

    /// Clear the conversation history
    fn reset(&self);
}
