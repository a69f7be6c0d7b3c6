//! Continuous-call audio pipeline
//!
//! Two pieces:
//! - [`silence`]: a pure, resettable loudness/silence detector fed with raw
//!   PCM16 frames (telemetry only, it gates nothing)
//! - [`orchestrator`]: the per-call actor that ties transcription, reply
//!   generation, and speech synthesis into serialized turn cycles

pub mod orchestrator;
pub mod silence;

pub use orchestrator::{CallCommand, CallHandle, CallOrchestrator, OrchestratorDeps, PendingUtterance, TurnPhase};
pub use silence::{FrameAnalysis, LevelEvent, SilenceDetector};
