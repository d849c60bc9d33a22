//! Persisted scenes and the per-scene assembly input.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{ProjectId, ScriptScene};

/// Narration speaking rate used for duration estimates.
pub const NARRATION_WORDS_PER_MINUTE: f64 = 150.0;

/// Lower bound for an estimated scene duration.
pub const MIN_ESTIMATED_SCENE_SECONDS: f64 = 2.0;

/// Estimate how long `narration` takes to read aloud.
pub fn estimate_narration_seconds(narration: &str) -> f64 {
    let words = narration.split_whitespace().count() as f64;
    (words / NARRATION_WORDS_PER_MINUTE * 60.0).max(MIN_ESTIMATED_SCENE_SECONDS)
}

/// Kind of visual a scene carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    Image,
    Clip,
}

impl VisualKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualKind::Image => "image",
            VisualKind::Clip => "clip",
        }
    }
}

impl fmt::Display for VisualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual asset of a scene, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum VisualAsset {
    /// Still image held for the whole scene
    Image(PathBuf),
    /// Short motion clip, looped or trimmed to the narration
    Clip(PathBuf),
}

impl VisualAsset {
    pub fn kind(&self) -> VisualKind {
        match self {
            VisualAsset::Image(_) => VisualKind::Image,
            VisualAsset::Clip(_) => VisualKind::Clip,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            VisualAsset::Image(p) | VisualAsset::Clip(p) => p,
        }
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, VisualAsset::Clip(_))
    }
}

/// A scene row, one per script scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub id: String,
    pub project_id: ProjectId,
    /// Position in the script, contiguous from 0
    pub order_index: u32,
    pub title: String,
    pub narration: String,
    pub visual_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual: Option<VisualAsset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,
    /// Measured audio duration once generated, otherwise a word-count estimate
    pub duration_secs: f64,
}

impl Scene {
    /// Derive a fresh scene row from a script scene.
    pub fn from_script(project_id: &ProjectId, order_index: u32, scene: &ScriptScene) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.clone(),
            order_index,
            title: scene.title.clone(),
            narration: scene.narration.clone(),
            visual_description: scene.visual_description.clone(),
            visual: None,
            audio_path: None,
            duration_secs: estimate_narration_seconds(&scene.narration),
        }
    }

    /// Build the assembly input for this scene, if both tracks exist.
    pub fn to_segment(&self) -> Option<SceneSegment> {
        Some(SceneSegment {
            visual: self.visual.clone()?,
            audio_path: self.audio_path.clone()?,
            title: self.title.clone(),
            duration_secs: self.duration_secs,
        })
    }
}

/// Everything the assembler needs to render one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneSegment {
    pub visual: VisualAsset,
    pub audio_path: PathBuf,
    pub title: String,
    /// Audio duration in seconds; the segment is aligned to this
    pub duration_secs: f64,
}
