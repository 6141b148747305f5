//! Uploaded documents as `data:<mime>;base64,<payload>` URIs.
//!
//! Every document that reaches the extraction gateway or the PDF renderer passes
//! through `DocumentData`, so media-type checks happen in one place.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

pub const SUPPORTED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
];

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("document is empty")]
    Empty,

    #[error("malformed data URI: {0}")]
    Malformed(&'static str),

    #[error("unsupported media type '{0}'")]
    UnsupportedMediaType(String),

    #[error("invalid base64 payload")]
    InvalidBase64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentData {
    media_type: String,
    base64: String,
}

impl DocumentData {
    /// Parses and checks a data URI. The payload is base64-validated eagerly.
    pub fn parse(data_uri: &str) -> Result<Self, DocumentError> {
        let data_uri = data_uri.trim();
        if data_uri.is_empty() {
            return Err(DocumentError::Empty);
        }
        let rest = data_uri
            .strip_prefix("data:")
            .ok_or(DocumentError::Malformed("missing 'data:' prefix"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or(DocumentError::Malformed("missing ',' separator"))?;

        let mut params = header.split(';');
        let media_type = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(DocumentError::Malformed("payload must be base64"));
        }

        let media_type = normalize_media_type(&media_type);
        if !SUPPORTED_MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(DocumentError::UnsupportedMediaType(media_type));
        }
        if payload.is_empty() {
            return Err(DocumentError::Empty);
        }
        STANDARD
            .decode(payload)
            .map_err(|_| DocumentError::InvalidBase64)?;

        Ok(Self {
            media_type,
            base64: payload.to_string(),
        })
    }

    /// File → data URI conversion for multipart uploads.
    pub fn from_bytes(media_type: &str, bytes: &[u8]) -> Result<Self, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        let media_type = normalize_media_type(&media_type.trim().to_ascii_lowercase());
        if !SUPPORTED_MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(DocumentError::UnsupportedMediaType(media_type));
        }
        Ok(Self {
            media_type,
            base64: STANDARD.encode(bytes),
        })
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == "application/pdf"
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn decode(&self) -> Result<Vec<u8>, DocumentError> {
        STANDARD
            .decode(&self.base64)
            .map_err(|_| DocumentError::InvalidBase64)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

fn normalize_media_type(media_type: &str) -> String {
    match media_type {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        other => other.to_string(),
    }
}
