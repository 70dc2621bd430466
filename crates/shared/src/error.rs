use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageRefError {
    #[error("image reference is not a data URI")]
    NotDataUri,
    #[error("data URI is not base64 encoded")]
    MissingBase64Marker,
    #[error("invalid data URI mime type: {0:?}")]
    InvalidMimeType(String),
    #[error("invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown outfit preset: {0:?}")]
pub struct UnknownOutfit(pub String);
