//! Image generation backends used by the studio controller.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use shared::domain::{GenerationRequest, ImageRef};
use thiserror::Error;

pub mod gemini;
pub mod pollinations;
pub mod prompt;

pub use gemini::GeminiGenerator;
pub use pollinations::PollinationsGenerator;
pub use prompt::compose_prompt;

/// Upper bound for an error body kept in [`GenerationError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid generator payload: {0}")]
    InvalidPayload(String),
    #[error("generator response contained no image")]
    MissingImage,
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    pub(crate) fn status(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }
}

/// External collaborator that turns an outfit description into an image.
///
/// Implementations own their timeout policy; the controller never aborts an
/// in-flight call.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerationRequest) -> Result<ImageRef, GenerationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Pollinations,
    Gemini,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Pollinations => f.write_str("pollinations"),
            BackendKind::Gemini => f.write_str("gemini"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pollinations" => Ok(BackendKind::Pollinations),
            "gemini" => Ok(BackendKind::Gemini),
            other => Err(format!("unknown generator backend: {other}")),
        }
    }
}

impl BackendKind {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            BackendKind::Pollinations => "https://image.pollinations.ai",
            BackendKind::Gemini => "https://generativelanguage.googleapis.com",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            BackendKind::Pollinations => "flux",
            BackendKind::Gemini => "gemini-2.5-flash-image",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub base_url: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl GeneratorSettings {
    pub fn for_backend(kind: BackendKind) -> Self {
        Self {
            base_url: kind.default_base_url().to_string(),
            model: kind.default_model().to_string(),
            width: 768,
            height: 1024,
            api_key: None,
            request_timeout: Duration::from_secs(120),
        }
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, GenerationError> {
        Ok(reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()?)
    }

    pub(crate) fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

pub fn build_generator(
    kind: BackendKind,
    settings: GeneratorSettings,
) -> Result<Arc<dyn ImageGenerator>, GenerationError> {
    Ok(match kind {
        BackendKind::Pollinations => Arc::new(PollinationsGenerator::new(settings)?),
        BackendKind::Gemini => Arc::new(GeminiGenerator::new(settings)?),
    })
}

/// Accepts `image/png` or `image/jpeg; charset=...`, rejects everything else.
pub(crate) fn image_mime_type(content_type: &str) -> Option<&str> {
    let mime_type = content_type.split(';').next()?.trim();
    let subtype = mime_type.strip_prefix("image/")?;
    (!subtype.is_empty()).then_some(mime_type)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
