//! Hosted generative-AI backend with true edit support: the identity image is
//! uploaded inline next to the edit instruction.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::domain::{GenerationRequest, ImageRef};
use tracing::{debug, info, warn};

use crate::{compose_prompt, image_mime_type, GenerationError, GeneratorSettings, ImageGenerator};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

pub struct GeminiGenerator {
    http: Client,
    api_key: String,
    settings: GeneratorSettings,
}

impl GeminiGenerator {
    pub fn new(settings: GeneratorSettings) -> Result<Self, GenerationError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerationError::InvalidRequest("gemini backend requires an API key".into()))?;
        Ok(Self {
            http: settings.http_client()?,
            api_key,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.trimmed_base_url(),
            self.settings.model
        )
    }

    pub(crate) fn build_body(
        request: &GenerationRequest,
    ) -> Result<GenerateContentRequest, GenerationError> {
        let mut parts = Vec::with_capacity(2);
        if let Some(identity) = &request.identity {
            let (mime_type, data) = identity.data_uri_parts().map_err(|err| {
                GenerationError::InvalidRequest(format!("identity image must be inline: {err}"))
            })?;
            parts.push(Part {
                inline_data: Some(InlineData {
                    mime_type: mime_type.to_string(),
                    data: data.to_string(),
                }),
                ..Part::default()
            });
        }
        parts.push(Part {
            text: Some(compose_prompt(&request.prompt_modifier, request.is_edit())),
            ..Part::default()
        });

        Ok(GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        })
    }
}

fn extract_image(response: GenerateContentResponse) -> Result<ImageRef, GenerationError> {
    let inline = response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.inline_data);

    let Some(inline) = inline else {
        if let Some(reason) = response.prompt_feedback.and_then(|fb| fb.block_reason) {
            return Err(GenerationError::InvalidPayload(format!("prompt blocked: {reason}")));
        }
        return Err(GenerationError::MissingImage);
    };

    let mime_type = image_mime_type(&inline.mime_type).ok_or_else(|| {
        GenerationError::InvalidPayload(format!("unexpected inline mime type {:?}", inline.mime_type))
    })?;
    let bytes = STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|err| GenerationError::InvalidPayload(format!("inline image is not base64: {err}")))?;
    if bytes.is_empty() {
        return Err(GenerationError::MissingImage);
    }
    Ok(ImageRef::from_bytes(mime_type, &bytes))
}

#[async_trait]
impl ImageGenerator for GeminiGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ImageRef, GenerationError> {
        let body = Self::build_body(request)?;
        info!(
            preset = %request.preset,
            edit = request.is_edit(),
            model = %self.settings.model,
            "requesting gemini image"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(preset = %request.preset, status = status.as_u16(), "gemini request rejected");
            return Err(GenerationError::status(status, &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|err| GenerationError::InvalidPayload(format!("malformed response body: {err}")))?;
        let image = extract_image(parsed)?;
        debug!(preset = %request.preset, image = %image, "gemini image decoded");
        Ok(image)
    }
}

#[cfg(test)]
#[path = "tests/gemini_tests.rs"]
mod tests;
