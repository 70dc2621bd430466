use std::{fmt, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ImageRefError, UnknownOutfit};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(EntryId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutfitKind {
    Base,
    School,
    Office,
    Space,
    Street,
    Netrunner,
    Evening,
}

impl OutfitKind {
    pub const ALL: [OutfitKind; 7] = [
        OutfitKind::Base,
        OutfitKind::School,
        OutfitKind::Office,
        OutfitKind::Space,
        OutfitKind::Street,
        OutfitKind::Netrunner,
        OutfitKind::Evening,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutfitKind::Base => "BASE",
            OutfitKind::School => "SCHOOL",
            OutfitKind::Office => "OFFICE",
            OutfitKind::Space => "SPACE",
            OutfitKind::Street => "STREET",
            OutfitKind::Netrunner => "NETRUNNER",
            OutfitKind::Evening => "EVENING",
        }
    }

    /// The distinguished preset that establishes the character identity.
    pub fn is_base(&self) -> bool {
        matches!(self, OutfitKind::Base)
    }
}

impl fmt::Display for OutfitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for OutfitKind {
    type Err = UnknownOutfit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OutfitKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownOutfit(wanted.to_string()))
    }
}

/// Static catalog entry describing one wearable outfit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutfitPreset {
    pub id: OutfitKind,
    pub label: &'static str,
    pub description: &'static str,
    pub prompt_modifier: &'static str,
    pub icon: &'static str,
}

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Opaque handle to a displayable image: either a remote URL or a
/// self-contained `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self(format!(
            "{DATA_URI_PREFIX}{mime_type}{BASE64_MARKER}{}",
            STANDARD.encode(bytes)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_uri(&self) -> bool {
        self.0.starts_with(DATA_URI_PREFIX)
    }

    /// Splits a `data:` URI into its mime type and raw payload without decoding.
    pub fn data_uri_parts(&self) -> Result<(&str, &str), ImageRefError> {
        let rest = self
            .0
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or(ImageRefError::NotDataUri)?;
        let (mime_type, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or(ImageRefError::MissingBase64Marker)?;
        if mime_type.is_empty() || !mime_type.contains('/') {
            return Err(ImageRefError::InvalidMimeType(mime_type.to_string()));
        }
        Ok((mime_type, payload))
    }

    pub fn decode_data_uri(&self) -> Result<(String, Vec<u8>), ImageRefError> {
        let (mime_type, payload) = self.data_uri_parts()?;
        let bytes = STANDARD.decode(payload)?;
        Ok((mime_type.to_string(), bytes))
    }

    /// Short human-readable form for logs and terminal output.
    pub fn summary(&self) -> String {
        match self.data_uri_parts() {
            Ok((mime_type, payload)) => {
                format!("<{mime_type}, ~{} bytes inline>", payload.len() / 4 * 3)
            }
            Err(_) => self.0.clone(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// One call to the image generator. Carries the identity image when the
/// call is an edit of the established character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub preset: OutfitKind,
    pub prompt_modifier: String,
    pub identity: Option<ImageRef>,
}

impl GenerationRequest {
    pub fn new(preset: &OutfitPreset, identity: Option<ImageRef>) -> Self {
        Self {
            preset: preset.id,
            prompt_modifier: preset.prompt_modifier.to_string(),
            identity,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.identity.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub image: ImageRef,
    pub preset: OutfitKind,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(image: ImageRef, preset: OutfitKind, prompt: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(),
            image,
            preset,
            prompt: prompt.into(),
            created_at: Utc::now(),
        }
    }
}
