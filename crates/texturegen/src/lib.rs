//! Texture synthesis through a remote multimodal image-generation API.
//!
//! A [`GenerationRequest`] carries the prompt, an optional reference image and the
//! file the result should land in. [`GeminiClient`] performs exactly one request per
//! call and either returns a [`GeneratedTexture`] on disk or a [`GenerationError`];
//! there is no retry and no partial result.

mod error;
mod mime;
mod remote;

pub use error::GenerationError;
pub use mime::{mime_from_extension, sniff_image_mime};
pub use remote::{
    parse_inline_image, persist_image, GeminiClient, GenerationConfig, InlineImage,
    DEFAULT_ENDPOINT,
};

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub reference_image: Option<PathBuf>,
    pub output: PathBuf,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
}

/// A texture written to disk by a generator. The file is never removed by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTexture {
    pub path: PathBuf,
    pub mime_type: String,
}

pub trait TextureGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedTexture, GenerationError>;
}
