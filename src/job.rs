//! Per-request scratch files.
//!
//! Every file a job creates is tracked and removed when the job is dropped.
//! For the HTTP path the job rides along with the response body so the
//! cleanup happens once the body stream ends, fails, or is abandoned.

use chrono::Utc;
use futures::Stream;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::{logd, loge, logw};

#[derive(Debug)]
pub struct RenderJob {
    id: String,
    dir: PathBuf,
    artifacts: Vec<PathBuf>,
}

impl RenderJob {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let id = format!(
            "{}-{:08x}",
            Utc::now().timestamp_millis(),
            rand::random::<u32>()
        );
        Self {
            id,
            dir: dir.into(),
            artifacts: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn artifact_path(&self, label: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}-{}.{}", label, self.id, ext))
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.artifacts.push(path.into());
    }

    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Best-effort; failures are logged, never returned.
    pub fn cleanup(&mut self) {
        for path in self.artifacts.drain(..) {
            remove_artifact(&path);
        }
    }
}

fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => logd(format!("Removed {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => logw(format!("Failed to remove {}: {}", path.display(), err)),
    }
}

impl Drop for RenderJob {
    fn drop(&mut self) {
        if !self.artifacts.is_empty() {
            logd(format!("Cleaning up job {} ({} files)", self.id, self.artifacts.len()));
            self.cleanup();
        }
    }
}

/// Byte stream that owns the job whose output it is sending.
pub struct CleanupStream<S> {
    inner: S,
    job: RenderJob,
}

impl<S> CleanupStream<S> {
    pub fn new(inner: S, job: RenderJob) -> Self {
        Self { inner, job }
    }
}

impl<S, T> Stream for CleanupStream<S>
where
    S: Stream<Item = io::Result<T>> + Unpin,
{
    type Item = io::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_next(cx);
        if let Poll::Ready(Some(Err(err))) = &polled {
            loge(format!("Failed to read output for job {}: {}", this.job.id(), err));
        }
        polled
    }
}
