//! Narration script derived from an outline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One scene of the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptScene {
    pub title: String,
    pub narration: String,
    /// What the scene should show
    #[serde(alias = "visual_desc")]
    pub visual_description: String,
}

impl ScriptScene {
    pub fn new(
        title: impl Into<String>,
        narration: impl Into<String>,
        visual_description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            narration: narration.into(),
            visual_description: visual_description.into(),
        }
    }
}

/// Ordered scenes. A scene's position is its correlation key to outline
/// sections and persisted scene rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Script {
    pub scenes: Vec<ScriptScene>,
}

impl Script {
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
