//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use studyreel_generators::GeneratorConfig;
use studyreel_models::budget::{DEFAULT_CLIP_SECONDS, DEFAULT_MAX_VIDEO_SECONDS};
use studyreel_models::ClipBudget;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root of the per-project directories
    pub storage_dir: PathBuf,
    /// Parent of per-call assembly scratch directories (system temp if unset)
    pub work_dir: Option<PathBuf>,
    /// Requested motion clip length
    pub clip_seconds: u32,
    /// Ceiling on total motion clip footage per video
    pub max_video_seconds: u32,
    /// Pause before the single clip retry
    pub clip_retry_delay: Duration,
    /// Crossfade between scenes; hard cuts when unset
    pub crossfade_secs: Option<f64>,
    /// Per-subprocess timeout
    pub ffmpeg_timeout_secs: u64,
    /// Background stage runs allowed at once
    pub max_concurrent_stages: usize,
    pub generators: GeneratorConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./storage"),
            work_dir: None,
            clip_seconds: DEFAULT_CLIP_SECONDS,
            max_video_seconds: DEFAULT_MAX_VIDEO_SECONDS,
            clip_retry_delay: Duration::from_millis(500),
            crossfade_secs: None,
            ffmpeg_timeout_secs: 600,
            max_concurrent_stages: 2,
            generators: GeneratorConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            storage_dir: std::env::var("STUDYREEL_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./storage")),
            work_dir: std::env::var("STUDYREEL_WORK_DIR").ok().map(PathBuf::from),
            clip_seconds: std::env::var("STUDYREEL_CLIP_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CLIP_SECONDS),
            max_video_seconds: std::env::var("STUDYREEL_MAX_VIDEO_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_VIDEO_SECONDS),
            clip_retry_delay: Duration::from_millis(
                std::env::var("STUDYREEL_CLIP_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            crossfade_secs: std::env::var("STUDYREEL_CROSSFADE_SECONDS")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|s| *s > 0.0),
            ffmpeg_timeout_secs: std::env::var("STUDYREEL_FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
            max_concurrent_stages: std::env::var("STUDYREEL_MAX_CONCURRENT_STAGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(2),
            generators: GeneratorConfig::from_env(),
        }
    }

    pub fn clip_budget(&self) -> ClipBudget {
        ClipBudget::new(self.clip_seconds, self.max_video_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_allows_fifteen_clips() {
        let config = WorkerConfig::default();
        assert_eq!(config.clip_budget().max_clip_scenes(), 15);
        assert!(config.crossfade_secs.is_none());
    }
}
