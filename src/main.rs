use anyhow::{Context, Result};
use render_worker::config::Config;
use render_worker::init;
use render_worker::server::{AppState, build_router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::resolve()?;
    init::ensure_work_dir(&config.work_dir).await?;

    if !init::check_tool(&config.ffmpeg_bin).await {
        tracing::warn!(bin = %config.ffmpeg_bin, "ffmpeg not found; renders will fail");
    }
    if !init::check_tool(&config.ffprobe_bin).await {
        tracing::warn!(bin = %config.ffprobe_bin, "ffprobe not found; renders will fail");
    }

    let state = AppState::from_config(&config);
    // Logged on purpose so operators can look up the header value.
    tracing::info!(api_key = %state.gate.expected_key(), "valid x-api-key");

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, work_dir = %config.work_dir.display(), "render worker listening");

    axum::serve(listener, build_router(state))
        .await
        .context("server error")?;
    Ok(())
}
