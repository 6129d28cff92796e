//! Core types for image generation.

use crate::error::{GenImgError, Result};
use crate::processing::PostProcessReport;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum number of reference images accepted in one request.
pub const MAX_REFERENCE_IMAGES: usize = 14;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// GIF format.
    Gif,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Picks the format from a path's extension, defaulting to PNG.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or_default()
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // GIF87a / GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Aspect ratios accepted by the image models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 2:3 portrait.
    #[serde(rename = "2:3")]
    TwoThree,
    /// 3:2 landscape.
    #[serde(rename = "3:2")]
    ThreeTwo,
    /// 3:4 standard portrait.
    #[serde(rename = "3:4")]
    StandardPortrait,
    /// 4:3 standard landscape.
    #[serde(rename = "4:3")]
    Standard,
    /// 4:5 portrait.
    #[serde(rename = "4:5")]
    FourFive,
    /// 5:4 landscape.
    #[serde(rename = "5:4")]
    FiveFour,
    /// 9:16 portrait (tall).
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9 landscape (widescreen).
    #[serde(rename = "16:9")]
    Landscape,
    /// 21:9 ultrawide.
    #[serde(rename = "21:9")]
    Ultrawide,
}

impl AspectRatio {
    /// All supported ratios.
    pub const ALL: [AspectRatio; 10] = [
        Self::Square,
        Self::TwoThree,
        Self::ThreeTwo,
        Self::StandardPortrait,
        Self::Standard,
        Self::FourFive,
        Self::FiveFour,
        Self::Portrait,
        Self::Landscape,
        Self::Ultrawide,
    ];

    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::TwoThree => "2:3",
            Self::ThreeTwo => "3:2",
            Self::StandardPortrait => "3:4",
            Self::Standard => "4:3",
            Self::FourFive => "4:5",
            Self::FiveFour => "5:4",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
            Self::Ultrawide => "21:9",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = GenImgError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|ar| ar.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<_> = Self::ALL.iter().map(|ar| ar.as_str()).collect();
                GenImgError::InvalidRequest(format!(
                    "unsupported aspect ratio '{s}' (expected one of {})",
                    supported.join(", ")
                ))
            })
    }
}

/// A kind of content requested in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    /// Text commentary.
    Text,
    /// Image output.
    Image,
}

/// An encoded image sent to the service as a reference.
#[derive(Debug, Clone)]
pub struct InputImage {
    /// Raw encoded bytes, as read from disk.
    pub data: Vec<u8>,
    /// Declared container format.
    pub format: ImageFormat,
}

impl InputImage {
    /// Creates an input image from bytes and a known format.
    pub fn new(data: Vec<u8>, format: ImageFormat) -> Self {
        Self { data, format }
    }

    /// Reads an input image.
    ///
    /// The format is sniffed from the content, falling back to the file
    /// extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GenImgError::InputNotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path)?;
        let format =
            ImageFormat::from_magic_bytes(&data).unwrap_or_else(|| ImageFormat::from_path(path));
        Ok(Self::new(data, format))
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// A request to the image model.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The text prompt.
    pub prompt: String,
    /// Reference images, sent in order before the prompt.
    pub reference_images: Vec<InputImage>,
    /// Requested output aspect ratio.
    pub aspect_ratio: Option<AspectRatio>,
    /// Requested response content kinds.
    pub modalities: Vec<Modality>,
}

impl GenerationRequest {
    /// Creates a new request asking for both text and image output.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            reference_images: Vec::new(),
            aspect_ratio: None,
            modalities: vec![Modality::Text, Modality::Image],
        }
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }

    /// Appends a reference image.
    pub fn with_reference_image(mut self, image: InputImage) -> Self {
        self.reference_images.push(image);
        self
    }

    /// Checks the reference image count.
    pub fn validate(&self) -> Result<()> {
        if self.reference_images.len() > MAX_REFERENCE_IMAGES {
            return Err(GenImgError::InvalidRequest(format!(
                "maximum {MAX_REFERENCE_IMAGES} input images supported"
            )));
        }
        Ok(())
    }
}

/// Inline image payload as received from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// Already-decoded bytes.
    Raw(Vec<u8>),
    /// Base64 text.
    Base64(String),
}

impl ImageData {
    /// Returns the decoded image bytes.
    pub fn decode(self) -> Result<Vec<u8>> {
        match self {
            Self::Raw(bytes) => Ok(bytes),
            Self::Base64(text) => {
                let cleaned: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                base64::engine::general_purpose::STANDARD
                    .decode(&cleaned)
                    .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned))
                    .map_err(|e| GenImgError::Decode(e.to_string()))
            }
        }
    }
}

/// An image part of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// Declared MIME type.
    pub mime_type: String,
    /// Payload.
    pub data: ImageData,
}

/// One part of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    /// Text commentary.
    Text(String),
    /// An inline image.
    InlineImage(InlineImage),
}

/// The parts of the first response candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    /// Parts in the order the service sent them.
    pub parts: Vec<ResponsePart>,
    /// Finish reason reported for the candidate.
    pub finish_reason: Option<String>,
    /// Why the service refused to produce an image, if it did.
    pub blocked: Option<String>,
}

impl ModelResponse {
    /// Creates a response from parts.
    pub fn new(parts: Vec<ResponsePart>) -> Self {
        Self {
            parts,
            finish_reason: None,
            blocked: None,
        }
    }

    /// Splits the response into the commentary and the first image.
    ///
    /// Commentary is the last non-empty text part.
    pub fn into_scan(self) -> (Option<String>, Option<InlineImage>) {
        let mut text = None;
        let mut image = None;
        for part in self.parts {
            match part {
                ResponsePart::Text(t) => {
                    if !t.trim().is_empty() {
                        text = Some(t);
                    }
                }
                ResponsePart::InlineImage(inline) => {
                    if image.is_none() {
                        image = Some(inline);
                    }
                }
            }
        }
        (text, image)
    }
}

/// Outcome of a generate/edit/mix call.
///
/// Never carries a panic or a propagated error: failures live in
/// `outcome`.
#[derive(Debug)]
#[must_use = "generation result should be checked"]
pub struct GenerationResult {
    /// Saved image path on success.
    pub outcome: Result<PathBuf>,
    /// Last text commentary returned by the model.
    pub text_response: Option<String>,
    /// What the transparency passes did, when requested.
    pub post_processing: Option<PostProcessReport>,
}

impl GenerationResult {
    /// Creates a successful result.
    pub fn saved(path: PathBuf, text_response: Option<String>) -> Self {
        Self {
            outcome: Ok(path),
            text_response,
            post_processing: None,
        }
    }

    /// Creates a failed result.
    pub fn failed(error: GenImgError, text_response: Option<String>) -> Self {
        Self {
            outcome: Err(error),
            text_response,
            post_processing: None,
        }
    }

    /// True if an image was saved.
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Saved path, if any.
    pub fn saved_path(&self) -> Option<&Path> {
        self.outcome.as_ref().ok().map(PathBuf::as_path)
    }

    /// Error, if the call failed.
    pub fn error(&self) -> Option<&GenImgError> {
        self.outcome.as_ref().err()
    }

    /// Renders the result as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "success": self.success(),
            "path": self.saved_path().map(|p| p.display().to_string()),
            "text_response": self.text_response,
        });
        if let Some(err) = self.error() {
            value["error"] = serde_json::json!(err.to_string());
            if let Some(status) = err.status() {
                value["status"] = serde_json::json!(status);
            }
        }
        if let Some(ref report) = self.post_processing {
            value["post_processing"] = report.to_json();
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const GIF_MAGIC: [u8; 12] = *b"GIF89a\x00\x00\x00\x00\x00\x00";
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&GIF_MAGIC),
            Some(ImageFormat::Gif)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"short"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ImageFormat::from_path(Path::new("a.PNG")), ImageFormat::Png);
        assert_eq!(ImageFormat::from_path(Path::new("a.jpeg")), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_path(Path::new("a.jpg")), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_path(Path::new("a.gif")), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_path(Path::new("a.webp")), ImageFormat::WebP);
        assert_eq!(ImageFormat::from_path(Path::new("a.bmp")), ImageFormat::Png);
        assert_eq!(ImageFormat::from_path(Path::new("noext")), ImageFormat::Png);
    }

    #[test]
    fn test_input_format_prefers_content_over_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mislabeled = dir.path().join("photo.png");
        std::fs::write(&mislabeled, JPEG_MAGIC).unwrap();
        let image = InputImage::from_path(&mislabeled).unwrap();
        assert_eq!(image.format, ImageFormat::Jpeg);
        assert_eq!(image.format.mime_type(), "image/jpeg");

        let unknown = dir.path().join("sprite.webp");
        std::fs::write(&unknown, [1u8, 2, 3]).unwrap();
        assert_eq!(
            InputImage::from_path(&unknown).unwrap().format,
            ImageFormat::WebP
        );
    }

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Landscape);
        assert_eq!(" 1:1 ".parse::<AspectRatio>().unwrap(), AspectRatio::Square);
        for ar in AspectRatio::ALL {
            assert_eq!(ar.as_str().parse::<AspectRatio>().unwrap(), ar);
        }
        let err = "7:5".parse::<AspectRatio>().unwrap_err();
        assert!(err.to_string().contains("7:5"));
        assert_eq!(AspectRatio::default().to_string(), "1:1");
    }

    #[test]
    fn test_modality_serialization() {
        let json = serde_json::to_value([Modality::Text, Modality::Image]).unwrap();
        assert_eq!(json, serde_json::json!(["TEXT", "IMAGE"]));
    }

    #[test]
    fn test_request_defaults() {
        let req = GenerationRequest::new("A cat");
        assert_eq!(req.modalities, vec![Modality::Text, Modality::Image]);
        assert!(req.reference_images.is_empty());
        assert!(req.aspect_ratio.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_rejects_too_many_references() {
        let mut req = GenerationRequest::new("mix");
        for _ in 0..=MAX_REFERENCE_IMAGES {
            req = req.with_reference_image(InputImage::new(vec![1], ImageFormat::Png));
        }
        assert!(matches!(req.validate(), Err(GenImgError::InvalidRequest(_))));
    }

    #[test]
    fn test_input_image_missing_file() {
        let err = InputImage::from_path("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, GenImgError::InputNotFound(_)));
    }

    #[test]
    fn test_image_data_decode() {
        let raw = ImageData::Raw(vec![1, 2, 3]).decode().unwrap();
        let b64 = ImageData::Base64("AQID".into()).decode().unwrap();
        let unpadded = ImageData::Base64("AQI".into()).decode().unwrap();
        assert_eq!(raw, vec![1, 2, 3]);
        assert_eq!(b64, raw);
        assert_eq!(unpadded, vec![1, 2]);
        assert!(ImageData::Base64("@@@".into()).decode().is_err());
    }

    #[test]
    fn test_scan_takes_last_text_and_first_image() {
        let first = InlineImage {
            mime_type: "image/png".into(),
            data: ImageData::Raw(vec![1]),
        };
        let second = InlineImage {
            mime_type: "image/png".into(),
            data: ImageData::Raw(vec![2]),
        };
        let response = ModelResponse::new(vec![
            ResponsePart::Text("first".into()),
            ResponsePart::InlineImage(first.clone()),
            ResponsePart::Text("second".into()),
            ResponsePart::InlineImage(second),
            ResponsePart::Text("   ".into()),
        ]);
        let (text, image) = response.into_scan();
        assert_eq!(text.as_deref(), Some("second"));
        assert_eq!(image, Some(first));
    }

    #[test]
    fn test_result_json() {
        let ok = GenerationResult::saved("out.png".into(), Some("hi".into()));
        let json = ok.to_json();
        assert_eq!(json["success"], true);
        assert_eq!(json["path"], "out.png");
        assert_eq!(json["text_response"], "hi");

        let failed = GenerationResult::failed(
            GenImgError::Api {
                status: 500,
                message: "down".into(),
            },
            None,
        );
        let json = failed.to_json();
        assert_eq!(json["success"], false);
        assert_eq!(json["status"], 500);
        assert!(json["path"].is_null());
    }
}
