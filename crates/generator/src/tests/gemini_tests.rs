use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use shared::{catalog::preset, domain::OutfitKind};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;

#[derive(Clone)]
struct ServerState {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    reply: Arc<Mutex<(StatusCode, Value)>>,
}

async fn handle_generate(
    State(state): State<ServerState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state
        .requests
        .lock()
        .await
        .push((uri.path().to_string(), api_key, body));
    let (status, reply) = state.reply.lock().await.clone();
    (status, Json(reply))
}

async fn spawn_gemini_server(status: StatusCode, reply: Value) -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState {
        requests: Arc::new(Mutex::new(Vec::new())),
        reply: Arc::new(Mutex::new((status, reply))),
    };
    let app = Router::new()
        .fallback(handle_generate)
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn generator_for(base_url: &str) -> GeminiGenerator {
    let mut settings = GeneratorSettings::for_backend(crate::BackendKind::Gemini);
    settings.base_url = base_url.to_string();
    settings.model = "test-model".into();
    settings.api_key = Some("secret-key".into());
    GeminiGenerator::new(settings).expect("generator")
}

fn image_reply(mime_type: &str, data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "here is your character" },
                    { "inlineData": { "mimeType": mime_type, "data": data } }
                ]
            }
        }]
    })
}

#[test]
fn create_body_has_only_a_text_part() {
    let request = GenerationRequest::new(preset(OutfitKind::Base), None);
    let body = serde_json::to_value(GeminiGenerator::build_body(&request).expect("body"))
        .expect("json");

    let parts = body["contents"][0]["parts"].as_array().expect("parts");
    assert_eq!(parts.len(), 1);
    assert!(parts[0]["text"].as_str().expect("text").contains("synthskin"));
    assert!(parts[0].get("inlineData").is_none());
    assert_eq!(body["generationConfig"]["responseModalities"], json!(["TEXT", "IMAGE"]));
}

#[test]
fn edit_body_sends_identity_before_instruction() {
    let identity = ImageRef::from_bytes("image/jpeg", b"identity-pixels");
    let (_, payload) = identity.data_uri_parts().expect("parts");
    let payload = payload.to_string();
    let request = GenerationRequest::new(preset(OutfitKind::Office), Some(identity));
    let body = serde_json::to_value(GeminiGenerator::build_body(&request).expect("body"))
        .expect("json");

    let parts = body["contents"][0]["parts"].as_array().expect("parts");
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[0]["inlineData"]["data"], payload.as_str());
    assert!(parts[1]["text"].as_str().expect("text").contains("Change only the clothing"));
}

#[test]
fn url_identity_cannot_be_uploaded() {
    let identity = ImageRef::from_url("https://images.example/base.jpg");
    let request = GenerationRequest::new(preset(OutfitKind::Space), Some(identity));
    let err = GeminiGenerator::build_body(&request).expect_err("must fail");
    assert!(matches!(err, GenerationError::InvalidRequest(_)));
}

#[tokio::test]
async fn returns_first_inline_image_as_data_uri() {
    let encoded = STANDARD.encode(b"generated-pixels");
    let (base_url, state) = spawn_gemini_server(StatusCode::OK, image_reply("image/png", &encoded))
        .await
        .expect("spawn server");
    let generator = generator_for(&base_url);
    let request = GenerationRequest::new(preset(OutfitKind::Base), None);

    let image = generator.generate(&request).await.expect("generate");

    let (mime_type, bytes) = image.decode_data_uri().expect("data uri");
    assert_eq!(mime_type, "image/png");
    assert_eq!(bytes, b"generated-pixels");

    let requests = state.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "/v1beta/models/test-model:generateContent");
    assert_eq!(requests[0].1.as_deref(), Some("secret-key"));
}

#[tokio::test]
async fn response_without_image_is_missing_image() {
    let reply = json!({ "candidates": [{ "content": { "parts": [{ "text": "sorry" }] } }] });
    let (base_url, _state) = spawn_gemini_server(StatusCode::OK, reply)
        .await
        .expect("spawn server");
    let generator = generator_for(&base_url);
    let request = GenerationRequest::new(preset(OutfitKind::Base), None);

    let err = generator.generate(&request).await.expect_err("must fail");
    assert!(matches!(err, GenerationError::MissingImage), "{err}");
}

#[tokio::test]
async fn blocked_prompt_is_an_invalid_payload() {
    let reply = json!({ "candidates": [], "promptFeedback": { "blockReason": "SAFETY" } });
    let (base_url, _state) = spawn_gemini_server(StatusCode::OK, reply)
        .await
        .expect("spawn server");
    let generator = generator_for(&base_url);
    let request = GenerationRequest::new(preset(OutfitKind::Evening), None);

    let err = generator.generate(&request).await.expect_err("must fail");
    assert!(err.to_string().contains("SAFETY"), "{err}");
}

#[tokio::test]
async fn quota_errors_surface_status_and_body() {
    let reply = json!({ "error": { "code": 429, "message": "quota exhausted" } });
    let (base_url, _state) = spawn_gemini_server(StatusCode::TOO_MANY_REQUESTS, reply)
        .await
        .expect("spawn server");
    let generator = generator_for(&base_url);
    let request = GenerationRequest::new(preset(OutfitKind::Base), None);

    match generator.generate(&request).await.expect_err("must fail") {
        GenerationError::Status { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("quota exhausted"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_base64_inline_data_is_rejected() {
    let (base_url, _state) = spawn_gemini_server(StatusCode::OK, image_reply("image/png", "@@@"))
        .await
        .expect("spawn server");
    let generator = generator_for(&base_url);
    let request = GenerationRequest::new(preset(OutfitKind::Base), None);

    let err = generator.generate(&request).await.expect_err("must fail");
    assert!(matches!(err, GenerationError::InvalidPayload(_)), "{err}");
}
