//! Free URL-addressed text-to-image backend.
//!
//! Every prompt maps to a GET URL; the image bytes are downloaded and turned
//! into a self-contained `data:` URI so results survive as history entries.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use shared::domain::{GenerationRequest, ImageRef};
use tracing::{debug, info};
use url::Url;

use crate::{compose_prompt, image_mime_type, GenerationError, GeneratorSettings, ImageGenerator};

const SEED_RANGE: std::ops::Range<u32> = 0..1_000_000;

pub struct PollinationsGenerator {
    http: Client,
    settings: GeneratorSettings,
}

impl PollinationsGenerator {
    pub fn new(settings: GeneratorSettings) -> Result<Self, GenerationError> {
        Ok(Self {
            http: settings.http_client()?,
            settings,
        })
    }

    /// Builds the request URL; the prompt becomes a single percent-encoded
    /// path segment.
    pub fn request_url(&self, prompt: &str, seed: u32) -> Result<Url, GenerationError> {
        let base = format!("{}/prompt/", self.settings.trimmed_base_url());
        let mut url = Url::parse(&base)
            .map_err(|err| GenerationError::InvalidRequest(format!("bad base url {base}: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| GenerationError::InvalidRequest(format!("base url {base} cannot hold a path")))?
            .pop_if_empty()
            .push(prompt);
        url.query_pairs_mut()
            .append_pair("width", &self.settings.width.to_string())
            .append_pair("height", &self.settings.height.to_string())
            .append_pair("seed", &seed.to_string())
            .append_pair("model", &self.settings.model)
            .append_pair("nologo", "true");
        Ok(url)
    }
}

#[async_trait]
impl ImageGenerator for PollinationsGenerator {
    fn name(&self) -> &'static str {
        "pollinations"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ImageRef, GenerationError> {
        if request.is_edit() {
            // No upload channel: the reference image cannot be sent, only the edit wording.
            debug!(preset = %request.preset, "pollinations ignores identity pixels");
        }
        let prompt = compose_prompt(&request.prompt_modifier, request.is_edit());
        let seed = rand::random_range(SEED_RANGE);
        let url = self.request_url(&prompt, seed)?;
        info!(preset = %request.preset, seed, "requesting pollinations image");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::status(status, &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let mime_type = image_mime_type(&content_type).ok_or_else(|| {
            GenerationError::InvalidPayload(format!("unexpected content type {content_type:?}"))
        })?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(GenerationError::MissingImage);
        }
        debug!(preset = %request.preset, bytes = bytes.len(), "pollinations image downloaded");
        Ok(ImageRef::from_bytes(mime_type, &bytes))
    }
}

#[cfg(test)]
#[path = "tests/pollinations_tests.rs"]
mod tests;
