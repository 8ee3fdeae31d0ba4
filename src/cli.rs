use anyhow::{Context, Result};
use clap::Parser;
use render_worker::command::Orientation;
use render_worker::config::{Config, process_env};
use render_worker::ffmpeg::FfmpegToolchain;
use render_worker::init;
use render_worker::job::RenderJob;
use render_worker::render::{RenderInputs, RenderService};
use std::path::PathBuf;
use std::sync::Arc;

/// Render a slideshow video from local files without going through HTTP.
#[derive(Debug, Parser)]
#[command(name = "render-cli", version)]
struct Args {
    #[arg(long)]
    narration: PathBuf,

    #[arg(long)]
    background: Option<PathBuf>,

    #[arg(long, default_value = "landscape")]
    orientation: String,

    #[arg(long, short, default_value = "video.mp4")]
    output: PathBuf,

    /// JSON config file; environment overrides still apply.
    #[arg(long, env = "RENDER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref(), process_env())?;
    init::ensure_work_dir(&config.work_dir).await?;

    if !init::check_tool(&config.ffmpeg_bin).await {
        eprintln!("[WARNING] FFmpeg not found in PATH. Please install FFmpeg.");
    }

    let tools = Arc::new(FfmpegToolchain::new(
        config.ffmpeg_bin.clone(),
        config.ffprobe_bin.clone(),
        config.tool_timeout(),
    ));
    let service = RenderService::new(tools.clone(), tools, config.encode_settings());

    let inputs = RenderInputs {
        orientation: Orientation::parse(&args.orientation),
        narration: args.narration,
        background: args.background,
        images: args.images,
    };

    let mut job = RenderJob::new(&config.work_dir);
    let rendered = service.render(&inputs, &mut job).await?;
    tokio::fs::copy(&rendered, &args.output)
        .await
        .with_context(|| format!("Failed to copy video to {}", args.output.display()))?;

    println!("{}", args.output.display());
    Ok(())
}
