//! Error types for image generation and processing.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur while generating or processing images.
#[derive(Debug, thiserror::Error)]
pub enum GenImgError {
    /// No API credential was configured.
    #[error("{0}")]
    MissingCredential(String),

    /// API key rejected by the service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized message from the response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An input image does not exist.
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The service answered without any image part.
    #[error("no image generated")]
    NoImageGenerated,

    /// Response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Image decode/encode support was not compiled in.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pixel codec error.
    #[error("image error: {0}")]
    Image(String),
}

#[cfg(feature = "transparency")]
impl From<image::ImageError> for GenImgError {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err.to_string())
    }
}

/// Broad classification of a [`GenImgError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unusable configuration; nothing was sent.
    Configuration,
    /// Bad arguments or missing input files; nothing was sent.
    InputValidation,
    /// The remote exchange failed.
    Transport,
    /// The service answered without an image.
    EmptyResult,
    /// Image codec support is not available in this build.
    CapabilityUnavailable,
    /// Local filesystem or codec failure.
    Local,
}

impl GenImgError {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential(_) => ErrorKind::Configuration,
            Self::InvalidRequest(_) | Self::InputNotFound(_) => ErrorKind::InputValidation,
            Self::Auth(_)
            | Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::ContentBlocked(_)
            | Self::UnexpectedResponse(_)
            | Self::Network(_)
            | Self::Decode(_)
            | Self::Json(_) => ErrorKind::Transport,
            Self::NoImageGenerated => ErrorKind::EmptyResult,
            Self::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            Self::Io(_) | Self::Image(_) => ErrorKind::Local,
        }
    }

    /// Returns the HTTP status reported by the service, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for genimg operations.
pub type Result<T> = std::result::Result<T, GenImgError>;

const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Strips credentials from a service error body and bounds its length.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for (i, word) in text.split(' ').enumerate() {
        if i > 0 {
            cleaned.push(' ');
        }
        // Google API keys start with "AIza"
        if word.contains("AIza") || word.contains("key=") {
            cleaned.push_str("[REDACTED]");
        } else {
            cleaned.push_str(word);
        }
    }
    let cleaned = cleaned.trim();

    if cleaned.chars().count() > MAX_ERROR_MESSAGE_CHARS {
        let truncated: String = cleaned.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
        format!("{truncated}...")
    } else {
        cleaned.to_string()
    }
}

/// Reads a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(
            GenImgError::MissingCredential("GEMINI_API_KEY".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            GenImgError::InputNotFound("a.png".into()).kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            GenImgError::InvalidRequest("too many".into()).kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            GenImgError::RateLimited { retry_after: None }.kind(),
            ErrorKind::Transport
        );
        assert_eq!(GenImgError::NoImageGenerated.kind(), ErrorKind::EmptyResult);
        assert_eq!(
            GenImgError::CapabilityUnavailable("png".into()).kind(),
            ErrorKind::CapabilityUnavailable
        );
    }

    #[test]
    fn test_status() {
        let err = GenImgError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(
            GenImgError::RateLimited { retry_after: None }.status(),
            Some(429)
        );
        assert_eq!(GenImgError::NoImageGenerated.status(), None);
    }

    #[test]
    fn test_error_display() {
        let err = GenImgError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = GenImgError::InputNotFound("missing/cat.png".into());
        assert_eq!(err.to_string(), "input file not found: missing/cat.png");

        assert_eq!(
            GenImgError::NoImageGenerated.to_string(),
            "no image generated"
        );
    }

    #[test]
    fn test_sanitize_redacts_keys() {
        let msg = sanitize_error_message("bad request for key=AIzaSyABC123 please retry");
        assert_eq!(msg, "bad request for [REDACTED] please retry");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(MAX_ERROR_MESSAGE_CHARS + 10);
        let msg = sanitize_error_message(&long);
        assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_CHARS + 3);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));
    }
}
