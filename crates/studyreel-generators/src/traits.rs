//! Collaborator contracts.

use std::path::Path;

use async_trait::async_trait;

use studyreel_models::{Outline, Script};

use crate::error::GeneratorResult;

/// Inputs for a motion clip.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub title: String,
    pub description: String,
    pub narration: Option<String>,
    /// Requested clip length
    pub duration_secs: u32,
}

/// Inputs for a still image.
#[derive(Debug, Clone, Default)]
pub struct ImageRequest {
    pub title: String,
    pub description: String,
    pub narration: Option<String>,
    pub key_points: Vec<String>,
}

impl From<&ClipRequest> for ImageRequest {
    fn from(req: &ClipRequest) -> Self {
        Self {
            title: req.title.clone(),
            description: req.description.clone(),
            narration: req.narration.clone(),
            key_points: Vec::new(),
        }
    }
}

/// Builds an outline from raw study text.
#[async_trait]
pub trait OutlineGenerator: Send + Sync {
    async fn generate(&self, content: &str) -> GeneratorResult<Outline>;
}

/// Builds a narration script from an outline.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, outline: &Outline) -> GeneratorResult<Script>;
}

/// Speaks one scene's narration into `output`. Returns the audio duration in
/// seconds.
#[async_trait]
pub trait SceneAudioGenerator: Send + Sync {
    async fn generate(&self, narration: &str, output: &Path) -> GeneratorResult<f64>;
}

/// Renders a still image for a scene into `output`.
#[async_trait]
pub trait SceneImageGenerator: Send + Sync {
    async fn generate(&self, request: &ImageRequest, output: &Path) -> GeneratorResult<()>;
}

/// Renders a short motion clip for a scene into `output`. May fail.
#[async_trait]
pub trait SceneClipGenerator: Send + Sync {
    async fn generate(&self, request: &ClipRequest, output: &Path) -> GeneratorResult<()>;
}
