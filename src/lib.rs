#![warn(missing_docs)]
//! genimg - Gemini image generation with green-screen transparency.
//!
//! This crate generates, edits and mixes images through the Gemini
//! `generateContent` API and can post-process the result locally:
//! green-screen background removal and transparent-border cropping.
//!
//! # Quick Start
//!
//! ```no_run
//! use genimg::{AspectRatio, Config, GenerationClient};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = GenerationClient::new(&Config::load());
//!     let result = client
//!         .generate("A wagon sprite", "wagon.png", AspectRatio::Square, None, true)
//!         .await;
//!     match result.saved_path() {
//!         Some(path) => println!("saved {}", path.display()),
//!         None => eprintln!("failed: {}", result.error().unwrap()),
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - `transparency` (default): decode/encode images for the local
//!   processing passes. Without it those passes report
//!   [`GenImgError::CapabilityUnavailable`].
//! - `cli` (default): the `genimg` command-line tool.

mod config;
mod error;

pub mod image;
pub mod processing;

// Re-export error types at crate root
pub use error::{ErrorKind, GenImgError, Result};

pub use config::{
    parse_env_file, Config, API_KEY_ENV, DEFAULT_ENV_FILE, DEFAULT_MODEL, FALLBACK_API_KEY_ENV,
    MODEL_ENV,
};

pub use crate::image::providers::{GeminiProvider, GeminiProviderBuilder};
pub use crate::image::{
    AspectRatio, GenerationClient, GenerationRequest, GenerationResult, ImageFormat,
    ImageProvider, InputImage, ModelResponse, ResponsePart,
};

pub use processing::{
    auto_crop_file, remove_green_screen_file, CropOutcome, CropReport, GreenScreenReport,
    PostProcessReport,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{GenImgError, Result};
    pub use crate::image::{AspectRatio, GenerationClient, GenerationResult, ImageProvider};
    pub use crate::processing::{auto_crop_file, remove_green_screen_file, CropOutcome};
}
