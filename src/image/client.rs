//! Generate, edit and mix operations.
//!
//! Every operation sends at most one request and always returns a
//! [`GenerationResult`]; errors are folded into the result instead of
//! being propagated.

use crate::config::{Config, API_KEY_ENV, DEFAULT_MODEL};
use crate::error::{GenImgError, Result};
use crate::image::provider::ImageProvider;
use crate::image::providers::GeminiProvider;
use crate::image::types::{
    AspectRatio, GenerationRequest, GenerationResult, InlineImage, InputImage, ModelResponse,
    MAX_REFERENCE_IMAGES,
};
use crate::processing::PostProcessReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Appended to the prompt in transparent mode so the background can be
/// keyed out afterwards.
pub const GREEN_SCREEN_PROMPT_SUFFIX: &str = ", solid bright green background #00FF00";

/// Client for the generate/edit/mix operations.
pub struct GenerationClient {
    provider: Option<Arc<dyn ImageProvider>>,
    default_model: String,
}

impl GenerationClient {
    /// Creates a Gemini-backed client from configuration.
    ///
    /// A missing API key is not an error here; each operation reports it.
    pub fn new(config: &Config) -> Self {
        Self {
            provider: GeminiProvider::from_config(config)
                .ok()
                .map(|p| Arc::new(p) as Arc<dyn ImageProvider>),
            default_model: config.default_model().to_string(),
        }
    }

    /// Creates a client around an existing provider.
    pub fn with_provider(provider: Arc<dyn ImageProvider>) -> Self {
        Self {
            provider: Some(provider),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Sets the model used when an operation does not name one.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn provider(&self) -> Result<&dyn ImageProvider> {
        self.provider.as_deref().ok_or_else(|| {
            GenImgError::MissingCredential(format!("{API_KEY_ENV} environment variable not set"))
        })
    }

    /// Generates a new image from a text prompt and saves it to `output`.
    ///
    /// In transparent mode the prompt asks for a green screen, which is
    /// then removed and the transparent border cropped.
    pub async fn generate(
        &self,
        prompt: &str,
        output: impl AsRef<Path>,
        aspect_ratio: AspectRatio,
        model: Option<&str>,
        transparent: bool,
    ) -> GenerationResult {
        let output = output.as_ref();
        let provider = match self.provider() {
            Ok(p) => p,
            Err(e) => return GenerationResult::failed(e, None),
        };

        let prompt = if transparent {
            format!("{prompt}{GREEN_SCREEN_PROMPT_SUFFIX}")
        } else {
            prompt.to_string()
        };
        let request = GenerationRequest::new(prompt).with_aspect_ratio(aspect_ratio);

        let mut result = self.exchange(provider, model, &request, output).await;
        if transparent {
            if let Some(path) = result.saved_path() {
                let report = PostProcessReport::run(path);
                if let Some(ref bg) = report.background {
                    tracing::info!(path = %path.display(), "removed background: {bg}");
                }
                result.post_processing = Some(report);
            }
        }
        result
    }

    /// Edits the image at `input` according to `prompt`, saving to `output`.
    pub async fn edit(
        &self,
        prompt: &str,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        model: Option<&str>,
    ) -> GenerationResult {
        let provider = match self.provider() {
            Ok(p) => p,
            Err(e) => return GenerationResult::failed(e, None),
        };
        let image = match InputImage::from_path(input) {
            Ok(image) => image,
            Err(e) => return GenerationResult::failed(e, None),
        };

        let request = GenerationRequest::new(prompt).with_reference_image(image);
        self.exchange(provider, model, &request, output.as_ref())
            .await
    }

    /// Combines 1 to 14 input images according to `prompt`.
    ///
    /// Count and existence of every input are checked before anything is
    /// sent.
    pub async fn mix<P: AsRef<Path>>(
        &self,
        prompt: &str,
        inputs: &[P],
        output: impl AsRef<Path>,
        aspect_ratio: AspectRatio,
        model: Option<&str>,
    ) -> GenerationResult {
        let provider = match self.provider() {
            Ok(p) => p,
            Err(e) => return GenerationResult::failed(e, None),
        };
        let request = match build_mix_request(prompt, inputs, aspect_ratio) {
            Ok(r) => r,
            Err(e) => return GenerationResult::failed(e, None),
        };
        self.exchange(provider, model, &request, output.as_ref())
            .await
    }

    async fn exchange(
        &self,
        provider: &dyn ImageProvider,
        model: Option<&str>,
        request: &GenerationRequest,
        output: &Path,
    ) -> GenerationResult {
        let model = model.unwrap_or(&self.default_model);
        tracing::debug!(provider = provider.name(), model, output = %output.display(), "requesting image");

        match provider.generate_content(model, request).await {
            Ok(response) => save_response(response, output),
            Err(e) => {
                tracing::debug!("image request failed: {e}");
                GenerationResult::failed(e, None)
            }
        }
    }
}

fn build_mix_request<P: AsRef<Path>>(
    prompt: &str,
    inputs: &[P],
    aspect_ratio: AspectRatio,
) -> Result<GenerationRequest> {
    if inputs.is_empty() {
        return Err(GenImgError::InvalidRequest(
            "at least one input image is required".into(),
        ));
    }
    if inputs.len() > MAX_REFERENCE_IMAGES {
        return Err(GenImgError::InvalidRequest(format!(
            "maximum {MAX_REFERENCE_IMAGES} input images supported"
        )));
    }
    if let Some(missing) = inputs.iter().map(|p| p.as_ref()).find(|p| !p.exists()) {
        return Err(GenImgError::InputNotFound(missing.to_path_buf()));
    }

    let mut request = GenerationRequest::new(prompt).with_aspect_ratio(aspect_ratio);
    for path in inputs {
        request = request.with_reference_image(InputImage::from_path(path)?);
    }
    Ok(request)
}

/// Saves the first image part and keeps the last text part.
fn save_response(mut response: ModelResponse, output: &Path) -> GenerationResult {
    let blocked = response.blocked.take();
    let (text, image) = response.into_scan();
    let Some(image) = image else {
        let error = blocked.map_or(GenImgError::NoImageGenerated, GenImgError::ContentBlocked);
        return GenerationResult::failed(error, text);
    };
    match write_image(image, output) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "image saved");
            GenerationResult::saved(path, text)
        }
        Err(e) => GenerationResult::failed(e, text),
    }
}

fn write_image(image: InlineImage, output: &Path) -> Result<PathBuf> {
    let bytes = image.data.decode()?;
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, bytes)?;
    Ok(output.to_path_buf())
}
