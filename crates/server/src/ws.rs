//! WebSocket session adapter
//!
//! One session per connection: inbound transport messages become
//! orchestrator commands 1:1, orchestrator events become outbound JSON
//! messages. The session owns its orchestrator; when the socket goes away
//! the call is stopped and the actor released.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use base64::Engine;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use totem_core::{CallEvent, CallStatus, ReplyGenerator};
use totem_kiosk::TotemReplyGenerator;
use totem_pipeline::{CallHandle, CallOrchestrator, OrchestratorDeps};

use crate::metrics;
use crate::state::AppState;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Inbound transport messages
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    StartCall,
    StopCall,
    AudioChunk { data: String },
    ResetConversation,
    GetStatus,
    Ping,
}

/// The `status` field carries either a lifecycle state string or, on
/// `get_status`, a full snapshot
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum StatusBody {
    State(&'static str),
    Snapshot(Box<CallStatus>),
}

/// Outbound transport messages
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Connected {
        message: &'static str,
        timestamp: i64,
    },
    CallStarted {
        message: &'static str,
        timestamp: i64,
    },
    CallStopped {
        message: &'static str,
        timestamp: i64,
    },
    Status {
        status: StatusBody,
        timestamp: i64,
    },
    Transcription {
        text: String,
        #[serde(rename = "isFinal")]
        is_final: bool,
        confidence: f32,
        timestamp: i64,
    },
    AiResponse {
        text: String,
        #[serde(rename = "userMessage")]
        user_message: String,
        timestamp: i64,
    },
    Audio {
        data: String,
        timestamp: i64,
    },
    AudioLevel {
        level: f32,
        timestamp: i64,
    },
    ConversationReset {
        message: &'static str,
        timestamp: i64,
    },
    Error {
        message: String,
        timestamp: i64,
    },
    Pong {
        timestamp: i64,
    },
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl ServerMessage {
    fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            timestamp: now_ms(),
        }
    }

    fn status(state: &'static str) -> Self {
        ServerMessage::Status {
            status: StatusBody::State(state),
            timestamp: now_ms(),
        }
    }
}

/// Map one orchestrator event to its outbound messages (an event may also
/// carry a lifecycle status update for the UI)
fn event_messages(event: CallEvent) -> Vec<ServerMessage> {
    match event {
        CallEvent::CallStarted => vec![
            ServerMessage::CallStarted {
                message: "Llamada continua iniciada",
                timestamp: now_ms(),
            },
            ServerMessage::status("call_active"),
        ],
        CallEvent::CallStopped => vec![
            ServerMessage::CallStopped {
                message: "Llamada continua detenida",
                timestamp: now_ms(),
            },
            ServerMessage::status("ready"),
        ],
        CallEvent::Transcription(fragment) => {
            let mut messages = vec![ServerMessage::Transcription {
                text: fragment.text,
                is_final: fragment.is_final,
                confidence: fragment.confidence,
                timestamp: now_ms(),
            }];
            if fragment.is_final {
                messages.push(ServerMessage::status("processing"));
            }
            messages
        }
        CallEvent::AiResponse { text, user_message } => vec![ServerMessage::AiResponse {
            text,
            user_message,
            timestamp: now_ms(),
        }],
        CallEvent::TtsAudio(audio) => vec![
            ServerMessage::Audio {
                data: BASE64.encode(audio),
                timestamp: now_ms(),
            },
            ServerMessage::status("speaking"),
        ],
        CallEvent::AudioLevel(level) => vec![ServerMessage::AudioLevel {
            level,
            timestamp: now_ms(),
        }],
        CallEvent::ProcessingStarted => vec![ServerMessage::status("processing")],
        CallEvent::ProcessingFinished => vec![ServerMessage::status("call_active")],
        CallEvent::ConversationReset => vec![ServerMessage::ConversationReset {
            message: "Conversación reiniciada",
            timestamp: now_ms(),
        }],
        CallEvent::Error(message) => vec![
            ServerMessage::error(message),
            ServerMessage::status("error"),
        ],
    }
}

/// Upgrade handler for `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session(socket, state))
}

type WsSink = SplitSink<WebSocket, Message>;

async fn send(sink: &mut WsSink, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => sink.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "failed to serialize outbound message");
            true
        }
    }
}

/// One connected kiosk client
async fn session(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(%session_id, "session connected");
    metrics::record_session_opened();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let generator: Arc<dyn ReplyGenerator> = Arc::new(TotemReplyGenerator::new(
        Arc::clone(&state.search),
        Arc::clone(&state.llm),
        state.settings.call.history_capacity,
        state.settings.search.top_k,
    ));
    let call = CallOrchestrator::spawn(
        OrchestratorDeps {
            transcriber: Arc::clone(&state.transcriber),
            generator,
            synthesizer: Arc::clone(&state.synthesizer),
        },
        state.settings.call.clone(),
        state.settings.silence.clone(),
        Duration::from_secs(state.settings.transcriber.keep_alive_interval_secs),
        event_tx,
    );

    let (mut sink, mut stream) = socket.split();

    let connected = ServerMessage::Connected {
        message: "Connected to voice assistant",
        timestamp: now_ms(),
    };
    if !send(&mut sink, &connected).await {
        call.shutdown();
        metrics::record_session_closed();
        return;
    }

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(raw))) => {
                    if !handle_client_message(&raw, &call, &mut sink).await {
                        break;
                    }
                }
                Some(Ok(Message::Binary(frame))) => call.audio_frame(frame),
                Some(Ok(Message::Close(_))) | None => {
                    debug!(%session_id, "socket closed by client");
                    break;
                }
                Some(Ok(_)) => {} // ping/pong handled by axum
                Some(Err(e)) => {
                    warn!(%session_id, error = %e, "socket error");
                    break;
                }
            },
            event = event_rx.recv() => match event {
                Some(event) => {
                    if matches!(event, CallEvent::Error(_)) {
                        metrics::record_call_error();
                    }
                    let mut delivered = true;
                    for message in event_messages(event) {
                        if !send(&mut sink, &message).await {
                            delivered = false;
                            break;
                        }
                    }
                    if !delivered {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    // Every exit path releases the call: link closed, timers cancelled,
    // actor terminated.
    call.stop_call();
    call.shutdown();
    metrics::record_session_closed();
    info!(%session_id, "session disconnected");
}

/// Dispatch one parsed (or unparseable) client message. Returns `false`
/// when the socket is no longer writable.
async fn handle_client_message(raw: &str, call: &CallHandle, sink: &mut WsSink) -> bool {
    match serde_json::from_str::<ClientMessage>(raw) {
        Ok(ClientMessage::StartCall) => {
            call.start_call();
            true
        }
        Ok(ClientMessage::StopCall) => {
            call.stop_call();
            true
        }
        Ok(ClientMessage::AudioChunk { data }) => match BASE64.decode(data.as_bytes()) {
            Ok(frame) => {
                call.audio_frame(frame);
                true
            }
            Err(_) => send(sink, &ServerMessage::error("Invalid audio payload")).await,
        },
        Ok(ClientMessage::ResetConversation) => {
            call.reset();
            true
        }
        Ok(ClientMessage::GetStatus) => match call.status().await {
            Some(status) => {
                let message = ServerMessage::Status {
                    status: StatusBody::Snapshot(Box::new(status)),
                    timestamp: now_ms(),
                };
                send(sink, &message).await
            }
            None => send(sink, &ServerMessage::error(totem_config::INTERNAL_ERROR_TEXT)).await,
        },
        Ok(ClientMessage::Ping) => send(sink, &ServerMessage::Pong { timestamp: now_ms() }).await,
        Err(e) => {
            debug!(error = %e, "malformed client message");
            send(sink, &ServerMessage::error("Unknown message type")).await
        }
    }
}
