//! Content generators consumed by the pipeline.
//!
//! This crate provides:
//! - One trait per collaborator: outline, script, scene audio, scene image
//!   and scene clip generation
//! - Mock implementations that run offline (paragraph outlines, template
//!   scripts, tone audio, palette slides, Ken Burns clips)
//! - OpenAI chat/TTS and Runway text-to-video providers
//! - `Generators::from_config`, resolving providers once at startup

pub mod config;
pub mod error;
pub mod mock;
pub mod openai;
pub mod runway;
pub mod traits;
pub mod wav;

pub use config::{
    AiProvider, ClipProvider, GeneratorConfig, Generators, OpenAiConfig, RunwayConfig,
    VoiceProvider,
};
pub use error::{GeneratorError, GeneratorResult};
pub use mock::{
    MockClipGenerator, MockImageGenerator, MockOutlineGenerator, MockScriptGenerator,
    MockVoiceGenerator,
};
pub use openai::OpenAiClient;
pub use runway::RunwayClipGenerator;
pub use traits::{
    ClipRequest, ImageRequest, OutlineGenerator, SceneAudioGenerator, SceneClipGenerator,
    SceneImageGenerator, ScriptGenerator,
};
