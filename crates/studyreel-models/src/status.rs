//! Ephemeral stage progress snapshots.
//!
//! These live only in process memory and are polled by whoever triggered a
//! background stage.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Background stages whose progress is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Assets,
    Video,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Assets => "assets",
            Stage::Video => "video",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageState::Pending => "pending",
            StageState::InProgress => "in_progress",
            StageState::Completed => "completed",
            StageState::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageState::Completed | StageState::Failed)
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a stage run. Replaced wholesale on every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageStatus {
    pub status: StageState,
    /// Fraction of work done, 0.0 to 1.0
    pub progress: f64,
    pub message: String,
    /// Output of the video stage once completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::pending()
    }
}

impl StageStatus {
    /// Status reported for a project that never ran the stage.
    pub fn pending() -> Self {
        Self {
            status: StageState::Pending,
            progress: 0.0,
            message: "Not started".to_string(),
            video_path: None,
        }
    }

    pub fn in_progress(progress: f64, message: impl Into<String>) -> Self {
        Self {
            status: StageState::InProgress,
            progress: clamp_progress(progress),
            message: message.into(),
            video_path: None,
        }
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            status: StageState::Completed,
            progress: 1.0,
            message: message.into(),
            video_path: None,
        }
    }

    pub fn failed(progress: f64, message: impl Into<String>) -> Self {
        Self {
            status: StageState::Failed,
            progress: clamp_progress(progress),
            message: message.into(),
            video_path: None,
        }
    }

    pub fn with_video_path(mut self, path: impl Into<String>) -> Self {
        self.video_path = Some(path.into());
        self
    }
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_default() {
        let status = StageStatus::default();
        assert_eq!(status.status, StageState::Pending);
        assert_eq!(status.progress, 0.0);
        assert_eq!(status.message, "Not started");
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(StageStatus::in_progress(1.7, "x").progress, 1.0);
        assert_eq!(StageStatus::failed(-0.5, "x").progress, 0.0);
        assert_eq!(StageStatus::in_progress(f64::NAN, "x").progress, 0.0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(StageState::Completed.is_terminal());
        assert!(StageState::Failed.is_terminal());
        assert!(!StageState::InProgress.is_terminal());
    }

    #[test]
    fn test_serialized_shape() {
        let status = StageStatus::completed("Video ready").with_video_path("/storage/p/video/output.mp4");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["progress"], 1.0);
        assert_eq!(json["video_path"], "/storage/p/video/output.mp4");
    }
}
