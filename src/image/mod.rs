//! Image generation module.

mod client;
mod provider;
pub mod providers;
mod types;

pub use client::{GenerationClient, GREEN_SCREEN_PROMPT_SUFFIX};
pub use provider::ImageProvider;
pub use types::{
    AspectRatio, GenerationRequest, GenerationResult, ImageData, ImageFormat, InlineImage,
    InputImage, Modality, ModelResponse, ResponsePart, MAX_REFERENCE_IMAGES,
};
