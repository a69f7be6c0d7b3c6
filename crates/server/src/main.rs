//! Totem voice backend binary

use anyhow::Context;
use tracing::info;

use totem_config::load_settings;
use totem_server::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,totem_pipeline=debug".into()),
        )
        .init();

    let config_path = std::env::args().nth(1);
    let settings = load_settings(config_path.as_deref()).context("failed to load settings")?;

    let presence = settings.key_presence();
    if !presence.all_present() {
        tracing::warn!(
            transcriber = presence.transcriber,
            llm = presence.llm,
            search = presence.search,
            tts = presence.tts,
            "some provider API keys are missing; affected services will fail"
        );
    }

    totem_server::metrics::init_metrics().context("failed to initialize metrics")?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = AppState::new(settings).map_err(|e| anyhow::anyhow!(e))?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "totem voice backend listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
