//! Pre-shared key gate for the render endpoint.
//!
//! Clients send the lowercase hex SHA-256 digest of the server secret in
//! `x-api-key`, byte for byte. The server only keeps the digest.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::error::RenderError;
use crate::server::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing api key")]
    Missing,
    #[error("invalid api key")]
    Invalid,
}

pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct ApiKeyGate {
    expected: String,
}

impl ApiKeyGate {
    pub fn new(secret: &str) -> Self {
        Self {
            expected: hash_secret(secret),
        }
    }

    /// The header value clients must present.
    pub fn expected_key(&self) -> &str {
        &self.expected
    }

    pub fn verify(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let presented = presented.ok_or(AuthError::Missing)?;
        if bool::from(presented.as_bytes().ct_eq(self.expected.as_bytes())) {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| value.to_str().unwrap_or_default());

    if let Err(err) = state.gate.verify(presented) {
        return RenderError::from(err).into_response();
    }

    next.run(request).await
}
