//! Clip duration budget.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default length of a generated motion clip.
pub const DEFAULT_CLIP_SECONDS: u32 = 6;

/// Default ceiling on the total motion-clip footage per video.
pub const DEFAULT_MAX_VIDEO_SECONDS: u32 = 90;

/// How much motion-clip footage a project may generate.
///
/// Only the leading `max_clip_scenes()` scenes are eligible for clips; the
/// rest get static images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClipBudget {
    /// Requested length of each clip
    pub clip_seconds: u32,
    /// Total clip footage allowed
    pub max_video_seconds: u32,
}

impl Default for ClipBudget {
    fn default() -> Self {
        Self {
            clip_seconds: DEFAULT_CLIP_SECONDS,
            max_video_seconds: DEFAULT_MAX_VIDEO_SECONDS,
        }
    }
}

impl ClipBudget {
    pub fn new(clip_seconds: u32, max_video_seconds: u32) -> Self {
        Self {
            clip_seconds,
            max_video_seconds,
        }
    }

    /// Number of leading scenes eligible for a motion clip.
    pub fn max_clip_scenes(&self) -> usize {
        if self.clip_seconds == 0 {
            return 0;
        }
        (self.max_video_seconds / self.clip_seconds) as usize
    }

    /// Whether the scene at `index` may receive a motion clip.
    pub fn allows_clip(&self, index: usize) -> bool {
        index < self.max_clip_scenes()
    }
}
