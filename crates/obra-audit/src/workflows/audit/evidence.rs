use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Photo attached to a response, stored inline as a base64 `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceImage {
    pub mime_type: String,
    pub data_url: String,
}

impl EvidenceImage {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Result<Self, EvidenceError> {
        let parsed: mime::Mime = mime_type
            .parse()
            .map_err(|_| EvidenceError::NotAnImage(mime_type.to_string()))?;
        if parsed.type_() != mime::IMAGE {
            return Err(EvidenceError::NotAnImage(mime_type.to_string()));
        }
        if bytes.is_empty() {
            return Err(EvidenceError::Empty);
        }

        let essence = parsed.essence_str().to_string();
        let data_url = format!("data:{essence};base64,{}", STANDARD.encode(bytes));
        Ok(Self {
            mime_type: essence,
            data_url,
        })
    }

    /// Decode a base64 payload posted by a client, with or without a `data:` prefix.
    pub fn from_base64(mime_type: &str, encoded: &str) -> Result<Self, EvidenceError> {
        let payload = match encoded.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => encoded,
        };
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|err| EvidenceError::Encoding(err.to_string()))?;
        Self::from_bytes(mime_type, &bytes)
    }

    /// Size of the decoded image in bytes.
    pub fn byte_len(&self) -> usize {
        let encoded = self
            .data_url
            .split_once(',')
            .map(|(_, payload)| payload)
            .unwrap_or_default();
        STANDARD.decode(encoded).map(|raw| raw.len()).unwrap_or(0)
    }
}

/// Evidence read for a specific question. Applying it only ever touches that
/// question's evidence list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvidence {
    pub question_id: String,
    pub image: EvidenceImage,
}

#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("unable to read evidence file: {0}")]
    Io(#[from] std::io::Error),
    #[error("evidence must be an image, got {0}")]
    NotAnImage(String),
    #[error("evidence file is empty")]
    Empty,
    #[error("evidence payload is not valid base64: {0}")]
    Encoding(String),
}

/// Read an image from disk into storable form for `question_id`.
pub async fn capture_evidence(
    question_id: &str,
    path: impl AsRef<Path>,
) -> Result<CapturedEvidence, EvidenceError> {
    let path = path.as_ref();
    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    let bytes = tokio::fs::read(path).await?;
    let image = EvidenceImage::from_bytes(guessed.essence_str(), &bytes)?;

    tracing::debug!(question_id, bytes = bytes.len(), "evidence captured");

    Ok(CapturedEvidence {
        question_id: question_id.to_string(),
        image,
    })
}
