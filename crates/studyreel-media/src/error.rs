//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("{tool} not found in PATH")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {message}")]
    ToolFailed {
        tool: String,
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe could not read {path}: {message}")]
    ProbeFailed { path: PathBuf, message: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    #[error("No scene segments to assemble")]
    NoSegments,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a tool failure error.
    pub fn tool_failed(
        tool: impl Into<String>,
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a probe failure error.
    pub fn probe_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ProbeFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Missing-binary error for a named tool.
    pub fn not_found(tool: &str) -> Self {
        match tool {
            "ffmpeg" => Self::FfmpegNotFound,
            "ffprobe" => Self::FfprobeNotFound,
            other => Self::ToolNotFound {
                tool: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        assert!(matches!(MediaError::not_found("ffmpeg"), MediaError::FfmpegNotFound));
        assert!(matches!(MediaError::not_found("ffprobe"), MediaError::FfprobeNotFound));
        assert!(matches!(MediaError::not_found("sox"), MediaError::ToolNotFound { .. }));
    }

    #[test]
    fn test_tool_failed_display() {
        let err = MediaError::tool_failed("ffmpeg", "exit status 1", Some("boom".into()), Some(1));
        assert_eq!(err.to_string(), "ffmpeg failed: exit status 1");
    }
}
