//! Pipeline metrics.
//!
//! Emitted through the `metrics` facade; the host installs a recorder.

use metrics::{counter, histogram};

use studyreel_models::Stage;

/// Metric names as constants for consistency.
pub mod names {
    pub const STAGE_RUNS_TOTAL: &str = "studyreel_stage_runs_total";
    pub const STAGE_DURATION_SECONDS: &str = "studyreel_stage_duration_seconds";

    pub const CLIP_CACHE_HITS_TOTAL: &str = "studyreel_clip_cache_hits_total";
    pub const CLIP_CACHE_CORRUPT_TOTAL: &str = "studyreel_clip_cache_corrupt_total";
    pub const CLIP_ATTEMPTS_TOTAL: &str = "studyreel_clip_attempts_total";
    pub const CLIP_FALLBACKS_TOTAL: &str = "studyreel_clip_fallbacks_total";

    pub const SCENE_VISUALS_TOTAL: &str = "studyreel_scene_visuals_total";
}

/// Record the end of a stage run.
pub fn record_stage(stage: &str, outcome: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string()), ("outcome", outcome.to_string())];
    counter!(names::STAGE_RUNS_TOTAL, &labels).increment(1);
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.to_string()).record(duration_secs);
}

pub fn record_tracked_stage(stage: Stage, success: bool, duration_secs: f64) {
    record_stage(stage.as_str(), if success { "success" } else { "failure" }, duration_secs);
}

pub fn record_cache_hit() {
    counter!(names::CLIP_CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_corrupt() {
    counter!(names::CLIP_CACHE_CORRUPT_TOTAL).increment(1);
}

pub fn record_clip_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(names::CLIP_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_clip_fallback() {
    counter!(names::CLIP_FALLBACKS_TOTAL).increment(1);
}

/// Record which kind of visual a scene ended up with.
pub fn record_scene_visual(kind: &str, source: &str) {
    let labels = [("kind", kind.to_string()), ("source", source.to_string())];
    counter!(names::SCENE_VISUALS_TOTAL, &labels).increment(1);
}
