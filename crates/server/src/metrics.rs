//! Prometheus metrics

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::ServerError;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the recorder and describe the instruments. Call once at
/// startup, before any traffic.
pub fn init_metrics() -> Result<(), ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Startup(format!("failed to install metrics recorder: {e}")))?;

    describe_counter!("totem_sessions_total", "WebSocket sessions opened");
    describe_gauge!("totem_sessions_active", "Currently connected sessions");
    describe_counter!("totem_call_errors_total", "Recoverable call errors surfaced to clients");
    describe_counter!("totem_questions_total", "One-shot questions processed");
    describe_histogram!(
        "totem_question_duration_seconds",
        "End-to-end latency of one-shot questions"
    );

    let _ = HANDLE.set(handle);
    Ok(())
}

/// Rendered exposition text for `GET /metrics`
pub fn render() -> String {
    HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

pub fn record_session_opened() {
    counter!("totem_sessions_total").increment(1);
    gauge!("totem_sessions_active").increment(1.0);
}

pub fn record_session_closed() {
    gauge!("totem_sessions_active").decrement(1.0);
}

pub fn record_call_error() {
    counter!("totem_call_errors_total").increment(1);
}

pub fn record_question(duration: Duration, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    counter!("totem_questions_total", "outcome" => outcome).increment(1);
    histogram!("totem_question_duration_seconds").record(duration.as_secs_f64());
}
