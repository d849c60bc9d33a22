#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper and scene assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building (multiple inputs, lavfi sources)
//! - A `ToolRunner` seam returning structured subprocess results
//! - FFprobe duration probing and one-time capability detection
//! - The scene assembler: clip/audio alignment, per-scene muxing and
//!   final concatenation (with optional crossfade)

pub mod align;
pub mod assembly;
pub mod capability;
pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;

pub use align::{plan_clip_alignment, ClipAlignment};
pub use assembly::{AssemblyOptions, SceneAssembler, VideoAssembler};
pub use capability::MediaCapabilities;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, ProcessRunner, ToolOutput, ToolRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{probe_duration, MediaInfo};
