use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0}")]
    Validation(String),
    #[error("upload failed")]
    Upload { status: StatusCode, details: String },
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("ffprobe failed")]
    Probe { details: String },
    #[error("ffmpeg failed")]
    Encode { details: String },
    #[error("Failed to read output file")]
    Stream(#[source] std::io::Error),
    #[error("render job i/o failed")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RenderError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upload { status, .. } => *status,
            Self::Auth(AuthError::Missing) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::Invalid) => StatusCode::FORBIDDEN,
            Self::Probe { .. } | Self::Encode { .. } | Self::Stream(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Upload { details, .. }
            | Self::Probe { details }
            | Self::Encode { details } => Some(details.clone()),
            Self::Stream(err) | Self::Io(err) => Some(err.to_string()),
            Self::Validation(_) | Self::Auth(_) => None,
        }
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            crate::loge(format!("{}: {}", self, self.details().unwrap_or_default()));
        } else {
            crate::logw(format!("request rejected ({}): {}", status.as_u16(), self));
        }

        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_split_between_401_and_403() {
        assert_eq!(
            RenderError::from(AuthError::Missing).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RenderError::from(AuthError::Invalid).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn encode_failure_carries_stderr_as_details() {
        let err = RenderError::Encode {
            details: "Invalid data found when processing input".to_string(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.details().as_deref(),
            Some("Invalid data found when processing input")
        );
        assert_eq!(err.to_string(), "ffmpeg failed");
    }

    #[test]
    fn validation_has_no_details() {
        let err = RenderError::validation("narration and images are required");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.details().is_none());
    }
}
