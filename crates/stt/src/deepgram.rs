//! Deepgram realtime transcription client

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use url::Url;

use async_trait::async_trait;
use totem_config::TranscriberSettings;
use totem_core::{
    Error, LinkEvent, LinkEventStream, LinkHandle, Result, TranscriberLink, TranscriptFragment,
    CHANNELS, SAMPLE_RATE_HZ,
};

/// Deepgram streaming transcriber
pub struct DeepgramTranscriber {
    cfg: TranscriberSettings,
}

impl DeepgramTranscriber {
    pub fn new(cfg: TranscriberSettings) -> Self {
        Self { cfg }
    }

    /// Build the listen URL with fixed streaming parameters
    fn listen_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.cfg.endpoint)
            .map_err(|e| Error::Configuration(format!("bad transcriber endpoint: {e}")))?;

        url.query_pairs_mut()
            .append_pair("model", &self.cfg.model)
            .append_pair("language", &self.cfg.language)
            .append_pair("smart_format", "true")
            .append_pair("punctuate", "true")
            .append_pair("interim_results", "true")
            .append_pair("diarize", "false")
            .append_pair("utterances", "false")
            .append_pair("profanity_filter", "false")
            // raw PCM frames carry no header, the format must be declared
            .append_pair("encoding", "linear16")
            .append_pair("sample_rate", &SAMPLE_RATE_HZ.to_string())
            .append_pair("channels", &CHANNELS.to_string());

        Ok(url)
    }
}

#[async_trait]
impl TranscriberLink for DeepgramTranscriber {
    async fn open(&self) -> Result<(Box<dyn LinkHandle>, LinkEventStream)> {
        if self.cfg.api_key.is_empty() {
            return Err(Error::Configuration("transcriber API key not configured".into()));
        }

        let url = self.listen_url()?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Transcriber(format!("invalid request: {e}")))?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.cfg.api_key))
            .map_err(|e| Error::Transcriber(format!("invalid API key header: {e}")))?;
        request.headers_mut().insert("Authorization", auth);

        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| Error::Transcriber(format!("connect failed: {e}")))?;
        debug!(model = %self.cfg.model, language = %self.cfg.language, "transcriber connected");

        let (mut sink, mut stream) = ws.split();
        let open = Arc::new(AtomicBool::new(true));

        // Writer task: owns the sink, drains outbound frames.
        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<WriterCommand>();
        let writer_open = Arc::clone(&open);
        tokio::spawn(async move {
            while let Some(command) = frame_rx.recv().await {
                match command {
                    WriterCommand::Frame(frame) => {
                        if sink.send(Message::Binary(frame)).await.is_err() {
                            writer_open.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                    WriterCommand::Close => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        // Reader task: parses provider messages into link events.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<LinkEvent>();
        let reader_open = Arc::clone(&open);
        tokio::spawn(async move {
            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(raw))) => {
                        if let Some(fragment) = parse_provider_message(&raw) {
                            if event_tx.send(LinkEvent::Transcript(fragment)).is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by provider".to_string());
                        reader_open.store(false, Ordering::SeqCst);
                        let _ = event_tx.send(LinkEvent::Closed { reason });
                        break;
                    }
                    Some(Ok(_)) => {
                        // ping/pong/binary from the provider: nothing to do
                        trace!("non-text provider message");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "transcriber stream error");
                        reader_open.store(false, Ordering::SeqCst);
                        let _ = event_tx.send(LinkEvent::Closed {
                            reason: e.to_string(),
                        });
                        break;
                    }
                    None => {
                        reader_open.store(false, Ordering::SeqCst);
                        let _ = event_tx.send(LinkEvent::Closed {
                            reason: "stream ended".to_string(),
                        });
                        break;
                    }
                }
            }
        });

        let handle = DeepgramHandle { frame_tx, open };
        let events: LinkEventStream = Box::pin(UnboundedReceiverStream::new(event_rx));
        Ok((Box::new(handle), events))
    }

    fn provider_name(&self) -> &str {
        "deepgram"
    }
}

enum WriterCommand {
    Frame(Vec<u8>),
    Close,
}

/// Handle to one live Deepgram connection
struct DeepgramHandle {
    frame_tx: mpsc::UnboundedSender<WriterCommand>,
    open: Arc<AtomicBool>,
}

impl LinkHandle for DeepgramHandle {
    fn send_frame(&self, frame: &[u8]) {
        if !self.open.load(Ordering::SeqCst) {
            return;
        }
        if self.frame_tx.send(WriterCommand::Frame(frame.to_vec())).is_err() {
            self.open.store(false, Ordering::SeqCst);
        }
    }

    fn close(&mut self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.frame_tx.send(WriterCommand::Close);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

// ---- provider message parsing ------------------------------------------

#[derive(Debug, Deserialize)]
struct ProviderMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    channel: Option<ProviderChannel>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderChannel {
    #[serde(default)]
    alternatives: Vec<ProviderAlternative>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: f32,
}

/// Extract a transcript fragment from a raw provider message.
///
/// Non-"Results" messages yield `None`. A "Results" message without
/// alternatives yields an empty non-final fragment rather than an error.
fn parse_provider_message(raw: &str) -> Option<TranscriptFragment> {
    let message: ProviderMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "unparseable transcriber message");
            return None;
        }
    };

    if message.kind != "Results" {
        return None;
    }

    let alternative = message
        .channel
        .unwrap_or_default()
        .alternatives
        .into_iter()
        .next();

    let fragment = match alternative {
        Some(alt) => TranscriptFragment {
            text: alt.transcript,
            is_final: message.is_final,
            confidence: alt.confidence,
        },
        None => TranscriptFragment::default(),
    };

    Some(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_url_parameters() {
        let transcriber = DeepgramTranscriber::new(TranscriberSettings::default());
        let url = transcriber.listen_url().unwrap();

        assert!(url.as_str().starts_with("wss://api.deepgram.com/v1/listen?"));
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(query.contains(&("model".into(), "nova-2".into())));
        assert!(query.contains(&("language".into(), "es-ES".into())));
        assert!(query.contains(&("interim_results".into(), "true".into())));
        assert!(query.contains(&("punctuate".into(), "true".into())));
        assert!(query.contains(&("encoding".into(), "linear16".into())));
        assert!(query.contains(&("sample_rate".into(), "16000".into())));
    }

    #[test]
    fn test_parse_final_result() {
        let raw = r#"{
            "type": "Results",
            "is_final": true,
            "channel": {
                "alternatives": [
                    { "transcript": "¿qué es mounjaro?", "confidence": 0.97 }
                ]
            }
        }"#;

        let fragment = parse_provider_message(raw).unwrap();
        assert!(fragment.is_final);
        assert_eq!(fragment.text, "¿qué es mounjaro?");
        assert!((fragment.confidence - 0.97).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_missing_alternatives_is_empty_nonfinal() {
        let raw = r#"{ "type": "Results", "is_final": true, "channel": { "alternatives": [] } }"#;
        let fragment = parse_provider_message(raw).unwrap();
        assert!(!fragment.is_final);
        assert!(fragment.text.is_empty());
    }

    #[test]
    fn test_parse_ignores_other_message_types() {
        let raw = r#"{ "type": "Metadata", "request_id": "abc" }"#;
        assert!(parse_provider_message(raw).is_none());
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_provider_message("not json").is_none());
    }

    #[tokio::test]
    async fn test_open_without_key_fails_soft() {
        let transcriber = DeepgramTranscriber::new(TranscriberSettings::default());
        let result = transcriber.open().await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
