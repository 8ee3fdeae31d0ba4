use std::path::PathBuf;
use std::sync::Arc;

use crate::command::{EncodePlan, EncodeSettings, Orientation, build_encode_args};
use crate::error::RenderError;
use crate::ffmpeg::{MediaEncoder, MediaProber};
use crate::job::RenderJob;
use crate::manifest::{ConcatManifest, MIN_IMAGE_SECONDS};
use crate::{logi, logok};

pub const MAX_IMAGES: usize = 20;

#[derive(Debug, Clone)]
pub struct RenderInputs {
    pub orientation: Orientation,
    pub narration: PathBuf,
    pub background: Option<PathBuf>,
    pub images: Vec<PathBuf>,
}

impl RenderInputs {
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.images.is_empty() {
            return Err(RenderError::validation("narration and images are required"));
        }
        if self.images.len() > MAX_IMAGES {
            return Err(RenderError::validation(format!(
                "at most {MAX_IMAGES} images are allowed, got {}",
                self.images.len()
            )));
        }
        Ok(())
    }
}

/// Narration length spread evenly over the images, never under one second.
pub fn per_image_duration(total_seconds: f64, image_count: usize) -> f64 {
    if image_count == 0 {
        return MIN_IMAGE_SECONDS;
    }
    let seconds = total_seconds / image_count as f64;
    if seconds.is_finite() && seconds >= MIN_IMAGE_SECONDS {
        seconds
    } else {
        MIN_IMAGE_SECONDS
    }
}

#[derive(Clone)]
pub struct RenderService {
    prober: Arc<dyn MediaProber>,
    encoder: Arc<dyn MediaEncoder>,
    settings: EncodeSettings,
}

impl RenderService {
    pub fn new(
        prober: Arc<dyn MediaProber>,
        encoder: Arc<dyn MediaEncoder>,
        settings: EncodeSettings,
    ) -> Self {
        Self {
            prober,
            encoder,
            settings,
        }
    }

    /// Produces the video inside `job` and returns its path. Generated files
    /// are tracked on `job`; the inputs are left alone.
    pub async fn render(
        &self,
        inputs: &RenderInputs,
        job: &mut RenderJob,
    ) -> Result<PathBuf, RenderError> {
        inputs.validate()?;

        logi(format!(
            "Job {}: {} images, orientation {}, background {}",
            job.id(),
            inputs.images.len(),
            inputs.orientation.as_str(),
            if inputs.background.is_some() { "yes" } else { "no" }
        ));

        let total = self.prober.probe_duration(&inputs.narration).await?;
        let seconds = per_image_duration(total, inputs.images.len());
        logi(format!("Job {}: {:.3}s per image", job.id(), seconds));

        let manifest_path = job.artifact_path("images", "txt");
        let manifest = ConcatManifest::new(&inputs.images, seconds)?;
        job.track(&manifest_path);
        manifest.write(&manifest_path).await?;

        let output = job.artifact_path("video", "mp4");
        job.track(&output);

        let plan = EncodePlan {
            manifest: &manifest_path,
            narration: &inputs.narration,
            background: inputs.background.as_deref(),
            orientation: inputs.orientation,
            output: &output,
            seconds_per_image: seconds,
            image_count: inputs.images.len(),
        };
        let args = build_encode_args(&plan, &self.settings);
        self.encoder.encode(&args, &output).await?;

        logok(format!("Job {}: video rendered {}", job.id(), output.display()));
        Ok(output)
    }
}
