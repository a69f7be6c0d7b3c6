//! Streaming transcriber traits

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::transcript::LinkEvent;
use crate::Result;

/// Ordered stream of events from one live link
pub type LinkEventStream = Pin<Box<dyn Stream<Item = LinkEvent> + Send>>;

/// Factory for streaming transcriber connections
///
/// Implementations:
/// - `DeepgramTranscriber` - Deepgram `wss://.../listen` streaming API
///
/// # Example
///
/// ```ignore
/// let transcriber: Arc<dyn TranscriberLink> = Arc::new(DeepgramTranscriber::new(config));
/// let (handle, mut events) = transcriber.open().await?;
/// handle.send_frame(&frame);
/// while let Some(event) = events.next().await {
///     // partial/final transcripts, then Closed
/// }
/// ```
#[async_trait]
pub trait TranscriberLink: Send + Sync + 'static {
    /// Open a streaming connection.
    ///
    /// On failure the caller must treat the link as "not connected", not
    /// as fatal; audio is dropped until a reconnect succeeds.
    async fn open(&self) -> Result<(Box<dyn LinkHandle>, LinkEventStream)>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}

/// Handle to one live transcriber connection.
///
/// Recreated on reconnect, never repaired in place.
pub trait LinkHandle: Send {
    /// Forward one PCM16 frame. No-op once the link has closed; never
    /// panics. An empty frame doubles as a keep-alive.
    fn send_frame(&self, frame: &[u8]);

    /// Close the connection. Idempotent; safe after the link already died.
    fn close(&mut self);

    /// Whether the link still accepts frames
    fn is_open(&self) -> bool;
}
