//! Windowcast agent: mirrors a single application window over a
//! WebSocket stream and injects remote input back into it.

mod capture;
mod encoder;
mod ffmpeg;
mod http;
mod input;
mod platform;
mod session;
mod state;
mod tracker;
mod window;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use wc_common::AppConfig;

use crate::capture::EngineKind;
use crate::encoder::EncoderProbe;
use crate::state::AppState;
use crate::tracker::WindowTracker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "starting windowcast agent"
    );

    let probe = EncoderProbe::run(&config.encoder);
    tracing::info!(encoder = probe.primary_id(), "encoder chain selected");

    let engine = EngineKind::parse(&config.capture.engine).unwrap_or_else(|| {
        tracing::warn!(engine = %config.capture.engine, "unknown capture engine, using auto");
        EngineKind::Auto
    });

    let tracker = WindowTracker::new(config.tracker.clone(), config.stream.default_fps, engine);
    let state = Arc::new(AppState {
        config: config.clone(),
        tracker,
        windows: platform::window_system(),
        probe,
    });

    let app = http::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
