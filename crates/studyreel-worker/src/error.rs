//! Pipeline error types.

use thiserror::Error;

use studyreel_generators::GeneratorError;
use studyreel_media::MediaError;
use studyreel_storage::StoreError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Media processing failed: {0}")]
    MediaProcessing(#[from] MediaError),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Caller misuse: surfaced directly to whoever triggered the stage.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::PreconditionFailed(_))
    }

    /// Another run committed first.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<GeneratorError> for PipelineError {
    fn from(e: GeneratorError) -> Self {
        match e {
            GeneratorError::Timeout(secs) => Self::Timeout(format!("generation exceeded {}s", secs)),
            GeneratorError::Media(media) => Self::MediaProcessing(media),
            GeneratorError::Io(io) => Self::Io(io),
            other => Self::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_fault_classification() {
        assert!(PipelineError::NotFound("p".into()).is_client_fault());
        assert!(PipelineError::precondition("no script").is_client_fault());
        assert!(!PipelineError::upstream("boom").is_client_fault());
        assert!(!PipelineError::Timeout("x".into()).is_client_fault());
    }

    #[test]
    fn test_store_errors_map() {
        let err: PipelineError = StoreError::not_found("p1").into();
        assert!(matches!(err, PipelineError::NotFound(ref id) if id == "p1"));

        let err: PipelineError = StoreError::Conflict { expected: 1, found: 2 }.into();
        assert!(err.is_conflict());
        assert!(!err.is_client_fault());
    }

    #[test]
    fn test_generator_errors_map() {
        let err: PipelineError = GeneratorError::Timeout(300).into();
        assert!(matches!(err, PipelineError::Timeout(_)));

        let err: PipelineError = GeneratorError::upstream("bad json").into();
        assert!(matches!(err, PipelineError::Upstream(ref m) if m.contains("bad json")));

        let err: PipelineError = GeneratorError::Media(MediaError::FfmpegNotFound).into();
        assert!(matches!(err, PipelineError::MediaProcessing(_)));
    }
}
