//! Shared data models for the StudyReel pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Projects and their lifecycle status
//! - Outlines, scripts and persisted scenes
//! - Visual assets tagged by kind (image or clip)
//! - Stage progress snapshots
//! - Clip budgets and encoding defaults

pub mod budget;
pub mod encoding;
pub mod outline;
pub mod project;
pub mod scene;
pub mod script;
pub mod status;

// Re-export common types
pub use budget::ClipBudget;
pub use encoding::EncodingConfig;
pub use outline::{Outline, OutlineSection};
pub use project::{Project, ProjectId, ProjectStatus, ProjectStatusParseError};
pub use scene::{estimate_narration_seconds, Scene, SceneSegment, VisualAsset, VisualKind};
pub use script::{Script, ScriptScene};
pub use status::{Stage, StageState, StageStatus};
