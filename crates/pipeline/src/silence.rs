//! Silence/level detection over PCM16 frames
//!
//! Computes a smoothed loudness level per frame and raises edge-triggered
//! events when the level crosses the silence threshold. Purely a function
//! of its rolling state: the caller supplies the clock, nothing here does
//! I/O. In the current pipeline the output feeds UI metering and logs
//! only; utterance finality comes from the transcriber.

use std::collections::VecDeque;
use std::time::Instant;

use totem_config::SilenceSettings;
use totem_core::pcm16_samples;

/// Maximum i16 amplitude, for level normalization
const MAX_AMPLITUDE: f32 = 32_767.0;

/// Target number of samples visited per frame when computing RMS
const LEVEL_SAMPLE_TARGET: usize = 100;

/// Edge-triggered level transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelEvent {
    /// Continuous silence reached the configured minimum. Fired once per
    /// silence span.
    SilenceConfirmed { duration_ms: u64 },
    /// Level rose back above the threshold. Fired immediately, no minimum.
    Resumed { level: f32 },
}

/// Per-frame analysis result
#[derive(Debug, Clone, Copy)]
pub struct FrameAnalysis {
    /// Smoothed loudness in [0, 1]
    pub level: f32,
    /// Whether the detector is inside an ongoing silence span
    pub is_silent: bool,
    /// Length of the ongoing silence span
    pub silence_duration_ms: u64,
    /// Edge transition, if this frame caused one
    pub event: Option<LevelEvent>,
}

/// Rolling silence/level detector
pub struct SilenceDetector {
    cfg: SilenceSettings,
    history: VecDeque<f32>,
    smoothed: f32,
    silence_started: Option<Instant>,
    confirmed: bool,
}

impl SilenceDetector {
    pub fn new(cfg: SilenceSettings) -> Self {
        let history = VecDeque::with_capacity(cfg.history_size.max(1));
        Self {
            cfg,
            history,
            smoothed: 0.0,
            silence_started: None,
            confirmed: false,
        }
    }

    /// Analyze one frame. `now` is supplied by the caller so silence spans
    /// are measured on the caller's clock.
    pub fn process_frame(&mut self, frame: &[u8], now: Instant) -> FrameAnalysis {
        let raw = rms_level(frame);
        let level = self.smooth(raw);

        let mut analysis = FrameAnalysis {
            level,
            is_silent: false,
            silence_duration_ms: 0,
            event: None,
        };

        if level < self.cfg.threshold {
            match self.silence_started {
                None => {
                    self.silence_started = Some(now);
                    self.confirmed = false;
                }
                Some(start) => {
                    let duration_ms = now.duration_since(start).as_millis() as u64;
                    analysis.is_silent = true;
                    analysis.silence_duration_ms = duration_ms;
                    if duration_ms >= self.cfg.min_silence_duration_ms && !self.confirmed {
                        self.confirmed = true;
                        analysis.event = Some(LevelEvent::SilenceConfirmed { duration_ms });
                    }
                }
            }
        } else if self.silence_started.take().is_some() {
            self.confirmed = false;
            analysis.event = Some(LevelEvent::Resumed { level });
        }

        analysis
    }

    fn smooth(&mut self, raw: f32) -> f32 {
        self.history.push_back(raw);
        while self.history.len() > self.cfg.history_size.max(1) {
            self.history.pop_front();
        }
        let average: f32 = self.history.iter().sum::<f32>() / self.history.len() as f32;
        let alpha = self.cfg.smoothing_factor;
        self.smoothed = self.smoothed * (1.0 - alpha) + average * alpha;
        self.smoothed
    }

    /// Clear history and span state
    pub fn reset(&mut self) {
        self.history.clear();
        self.smoothed = 0.0;
        self.silence_started = None;
        self.confirmed = false;
    }

    /// Replace tuning at runtime; span state survives, excess history is
    /// trimmed
    pub fn configure(&mut self, cfg: SilenceSettings) {
        self.cfg = cfg;
        while self.history.len() > self.cfg.history_size.max(1) {
            self.history.pop_front();
        }
    }

    pub fn is_currently_silent(&self) -> bool {
        self.silence_started.is_some()
    }

    pub fn config(&self) -> &SilenceSettings {
        &self.cfg
    }
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self::new(SilenceSettings::default())
    }
}

/// RMS of a down-sampled subset of the frame, normalized to [0, 1].
///
/// Visits ~100 evenly spaced samples per frame; enough for a meter, cheap
/// enough to run on every frame.
fn rms_level(frame: &[u8]) -> f32 {
    let samples: Vec<i16> = pcm16_samples(frame).collect();
    if samples.is_empty() {
        return 0.0;
    }

    let step = (samples.len() / LEVEL_SAMPLE_TARGET).max(1);
    let mut sum = 0.0f64;
    let mut count = 0u32;
    for sample in samples.iter().step_by(step) {
        let s = *sample as f64;
        sum += s * s;
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }

    let rms = (sum / count as f64).sqrt() as f32;
    rms / MAX_AMPLITUDE
}
