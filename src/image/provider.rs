//! Image provider trait.

use crate::error::Result;
use crate::image::types::{GenerationRequest, ModelResponse};
use async_trait::async_trait;

/// A remote model that answers a [`GenerationRequest`] with response parts.
///
/// Implementations perform exactly one outbound request per call.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Sends the request to `model` and returns the parsed response.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<ModelResponse>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;
}
