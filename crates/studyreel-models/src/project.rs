//! Project records and lifecycle status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::{Outline, Scene, Script};

/// Unique identifier for a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Generate a new random project ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Pipeline stage a project has reached.
///
/// Advances on every successful stage. Re-running an earlier stage moves it
/// back (a regenerated script resets to `ScriptReady`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Draft,
    OutlineReady,
    ScriptReady,
    AssetsReady,
    VideoReady,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::OutlineReady => "outline_ready",
            ProjectStatus::ScriptReady => "script_ready",
            ProjectStatus::AssetsReady => "assets_ready",
            ProjectStatus::VideoReady => "video_ready",
        }
    }

    /// Whether the video stage may run from this status.
    pub fn can_assemble_video(&self) -> bool {
        matches!(self, ProjectStatus::AssetsReady | ProjectStatus::VideoReady)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown project status: {0}")]
pub struct ProjectStatusParseError(String);

impl FromStr for ProjectStatus {
    type Err = ProjectStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProjectStatus::Draft),
            "outline_ready" => Ok(ProjectStatus::OutlineReady),
            "script_ready" => Ok(ProjectStatus::ScriptReady),
            "assets_ready" => Ok(ProjectStatus::AssetsReady),
            "video_ready" => Ok(ProjectStatus::VideoReady),
            other => Err(ProjectStatusParseError(other.to_string())),
        }
    }
}

/// A study project and everything derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: ProjectId,

    pub title: String,

    /// Raw study text supplied by the user
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,

    #[serde(default)]
    pub status: ProjectStatus,

    /// Final assembled video, once the video stage has succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,

    /// Scenes ordered by `order_index`, contiguous from 0
    #[serde(default)]
    pub scenes: Vec<Scene>,

    /// Store revision this snapshot was read at. Commits are rejected when
    /// the stored revision moved on in the meantime.
    #[serde(default)]
    pub revision: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a draft project.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            title: title.into(),
            content: content.into(),
            outline: None,
            script: None,
            status: ProjectStatus::Draft,
            video_path: None,
            scenes: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the script and re-derive every scene from it.
    ///
    /// Old scenes are dropped wholesale; nothing from them is carried over.
    pub fn replace_script(&mut self, script: Script) {
        self.scenes = script
            .scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| Scene::from_script(&self.id, index as u32, scene))
            .collect();
        self.script = Some(script);
        self.status = ProjectStatus::ScriptReady;
        self.touch();
    }

    /// Bump the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
