use crate::error::RenderError;
use crate::{logd, logi};
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe_duration(&self, path: &Path) -> Result<f64, RenderError>;
}

#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// `args` excludes the program name. Succeeds only if `output` exists afterwards.
    async fn encode(&self, args: &[String], output: &Path) -> Result<(), RenderError>;
}

#[derive(Debug, thiserror::Error)]
enum ToolFailure {
    #[error("failed to start: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

async fn run_cmd(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<Output, ToolFailure> {
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => result.map_err(ToolFailure::Spawn),
        Err(_) => Err(ToolFailure::TimedOut(timeout)),
    }
}

pub fn parse_duration_output(stdout: &str) -> Option<f64> {
    let duration = stdout.trim().lines().next()?.trim().parse::<f64>().ok()?;
    duration.is_finite().then_some(duration)
}

#[derive(Debug, Clone)]
pub struct FfmpegToolchain {
    ffmpeg_bin: String,
    ffprobe_bin: String,
    timeout: Duration,
}

impl FfmpegToolchain {
    pub fn new(
        ffmpeg_bin: impl Into<String>,
        ffprobe_bin: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MediaProber for FfmpegToolchain {
    async fn probe_duration(&self, path: &Path) -> Result<f64, RenderError> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path.display().to_string(),
        ];

        let output = run_cmd(&self.ffprobe_bin, &args, self.timeout)
            .await
            .map_err(|e| RenderError::Probe {
                details: format!("{}: {}", self.ffprobe_bin, e),
            })?;

        if !output.status.success() {
            return Err(RenderError::Probe {
                details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let duration = parse_duration_output(&text).ok_or_else(|| RenderError::Probe {
            details: format!("unparsable duration output: {:?}", text.trim()),
        })?;

        logi(format!("Audio duration: {:.3}s ({})", duration, path.display()));
        Ok(duration)
    }
}

#[async_trait]
impl MediaEncoder for FfmpegToolchain {
    async fn encode(&self, args: &[String], output: &Path) -> Result<(), RenderError> {
        logi(format!("Running {} -> {}", self.ffmpeg_bin, output.display()));
        logd(format!("{} {}", self.ffmpeg_bin, args.join(" ")));

        let result = run_cmd(&self.ffmpeg_bin, args, self.timeout)
            .await
            .map_err(|e| RenderError::Encode {
                details: format!("{}: {}", self.ffmpeg_bin, e),
            })?;

        // ffmpeg reports on stderr, not stdout
        let diagnostics = String::from_utf8_lossy(&result.stderr).trim().to_string();
        if !result.status.success() {
            return Err(RenderError::Encode {
                details: diagnostics,
            });
        }
        if !diagnostics.is_empty() {
            logd(format!("ffmpeg output: {}", diagnostics));
        }

        if tokio::fs::metadata(output).await.is_err() {
            return Err(RenderError::Encode {
                details: format!("ffmpeg exited cleanly but {} is missing", output.display()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_duration() {
        assert_eq!(parse_duration_output("10.031020\n"), Some(10.03102));
        assert_eq!(parse_duration_output("  7\n"), Some(7.0));
    }

    #[test]
    fn rejects_missing_or_garbage_duration() {
        assert_eq!(parse_duration_output(""), None);
        assert_eq!(parse_duration_output("N/A\n"), None);
        assert_eq!(parse_duration_output("inf"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_binary_is_a_probe_failure() {
        let tools = FfmpegToolchain::new(
            "/nonexistent/ffmpeg",
            "/nonexistent/ffprobe",
            Duration::from_secs(5),
        );
        let err = tools
            .probe_duration(Path::new("/tmp/narration.mp3"))
            .await
            .expect_err("binary does not exist");
        match err {
            RenderError::Probe { details } => {
                assert!(details.starts_with("/nonexistent/ffprobe: failed to start:"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_surfaces_stderr() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tools = FfmpegToolchain::new("sh", "sh", Duration::from_secs(5));
        let args = vec![
            "-c".to_string(),
            "echo 'Invalid data found' >&2; exit 1".to_string(),
        ];

        let err = tools
            .encode(&args, &dir.path().join("video.mp4"))
            .await
            .expect_err("script fails");
        match err {
            RenderError::Encode { details } => assert_eq!(details, "Invalid data found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_tool_times_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tools = FfmpegToolchain::new("sh", "sh", Duration::from_millis(200));
        let args = vec!["-c".to_string(), "sleep 5".to_string()];

        let err = tools
            .encode(&args, &dir.path().join("video.mp4"))
            .await
            .expect_err("timeout");
        match err {
            RenderError::Encode { details } => {
                assert!(details.contains("timed out after 0s"), "{details}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clean_exit_without_output_is_a_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tools = FfmpegToolchain::new("sh", "sh", Duration::from_secs(5));
        let args = vec!["-c".to_string(), "exit 0".to_string()];

        let err = tools
            .encode(&args, &dir.path().join("video.mp4"))
            .await
            .expect_err("no output written");
        assert!(matches!(err, RenderError::Encode { .. }));
    }
}
