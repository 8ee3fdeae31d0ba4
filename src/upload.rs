//! Multipart ingestion for `POST /render`.

use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::command::Orientation;
use crate::error::RenderError;
use crate::job::RenderJob;
use crate::render::{MAX_IMAGES, RenderInputs};

#[derive(Debug, Default)]
pub struct RenderUpload {
    pub orientation: Orientation,
    pub narration: Option<PathBuf>,
    pub background: Option<PathBuf>,
    pub images: Vec<PathBuf>,
}

impl RenderUpload {
    pub fn into_inputs(self) -> Result<RenderInputs, RenderError> {
        let narration = match self.narration {
            Some(path) if !self.images.is_empty() => path,
            _ => return Err(RenderError::validation("narration and images are required")),
        };
        Ok(RenderInputs {
            orientation: self.orientation,
            narration,
            background: self.background,
            images: self.images,
        })
    }
}

/// Extension of the client's file name, if it is short and alphanumeric.
pub fn upload_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "bin".to_string())
}

fn multipart_error(err: MultipartError) -> RenderError {
    RenderError::Upload {
        status: err.status(),
        details: err.body_text(),
    }
}

async fn save_field(
    mut field: Field<'_>,
    job: &mut RenderJob,
    label: &str,
) -> Result<PathBuf, RenderError> {
    let ext = upload_extension(field.file_name());
    let path = job.artifact_path(label, &ext);
    job.track(&path);

    let mut file = File::create(&path).await?;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(path)
}

/// Streams every file field to disk under `job`. Files are tracked before
/// the first byte is written so a failed upload is still cleaned up.
pub async fn receive_render_upload(
    mut multipart: Multipart,
    job: &mut RenderJob,
) -> Result<RenderUpload, RenderError> {
    let mut upload = RenderUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "orientation" => {
                let value = field.text().await.map_err(multipart_error)?;
                upload.orientation = Orientation::parse(&value);
            }
            "narration" | "audio" => {
                if upload.narration.is_some() {
                    return Err(RenderError::validation("only one narration file is allowed"));
                }
                upload.narration = Some(save_field(field, job, "narration").await?);
            }
            "background" => {
                if upload.background.is_some() {
                    return Err(RenderError::validation("only one background file is allowed"));
                }
                upload.background = Some(save_field(field, job, "background").await?);
            }
            "images" => {
                if upload.images.len() >= MAX_IMAGES {
                    return Err(RenderError::validation(format!(
                        "at most {MAX_IMAGES} images are allowed"
                    )));
                }
                let label = format!("image-{:02}", upload.images.len());
                upload.images.push(save_field(field, job, &label).await?);
            }
            _ => continue,
        }
    }

    Ok(upload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_short_extensions() {
        assert_eq!(upload_extension(Some("voice.MP3")), "mp3");
        assert_eq!(upload_extension(Some("photo.final.jpeg")), "jpeg");
    }

    #[test]
    fn falls_back_to_bin() {
        assert_eq!(upload_extension(None), "bin");
        assert_eq!(upload_extension(Some("README")), "bin");
        assert_eq!(upload_extension(Some("x.")), "bin");
        assert_eq!(upload_extension(Some("../../etc/passwd.sh;rm")), "bin");
        assert_eq!(upload_extension(Some("clip.averyverylongext")), "bin");
    }

    #[test]
    fn missing_narration_or_images_is_a_validation_error() {
        let upload = RenderUpload {
            images: vec![PathBuf::from("/tmp/a.jpg")],
            ..RenderUpload::default()
        };
        assert!(matches!(upload.into_inputs(), Err(RenderError::Validation(_))));

        let upload = RenderUpload {
            narration: Some(PathBuf::from("/tmp/n.mp3")),
            ..RenderUpload::default()
        };
        assert!(matches!(upload.into_inputs(), Err(RenderError::Validation(_))));
    }
}
