//! Stage orchestration pipeline for StudyReel.
//!
//! This crate provides:
//! - The orchestrator driving outline, script, assets and video stages
//! - The asset stage: clip budget, clip retry with image fallback, and the
//!   content-hash clip cache
//! - In-process stage status tracking
//! - A background dispatcher for asset and video runs
//! - Worker configuration, stage logging and metrics

pub mod assets;
pub mod clip_cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod status;

pub use assets::{AssetStage, StagedAssets};
pub use clip_cache::{CacheEntry, CacheError, ClipCache};
pub use config::WorkerConfig;
pub use dispatcher::{StageDispatcher, StageTicket};
pub use error::{PipelineError, PipelineResult};
pub use logging::StageLogger;
pub use orchestrator::Orchestrator;
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use status::{InMemoryStatusTracker, StatusTracker};
