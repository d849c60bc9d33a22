//! Structured stage logging.

use tracing::{error, info, Span};

use studyreel_models::{ProjectId, Stage};

/// Logger carrying the project and stage on every line.
#[derive(Debug, Clone)]
pub struct StageLogger {
    project_id: String,
    stage: &'static str,
}

impl StageLogger {
    pub fn new(project_id: &ProjectId, stage: Stage) -> Self {
        Self::named(project_id, stage.as_str())
    }

    /// Logger for a stage without tracked status (outline, script).
    pub fn named(project_id: &ProjectId, stage: &'static str) -> Self {
        Self {
            project_id: project_id.to_string(),
            stage,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(project_id = %self.project_id, stage = self.stage, "Stage started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(project_id = %self.project_id, stage = self.stage, "Stage progress: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(project_id = %self.project_id, stage = self.stage, "Stage failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(project_id = %self.project_id, stage = self.stage, "Stage completed: {}", message);
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn stage(&self) -> &str {
        self.stage
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("stage", project_id = %self.project_id, stage = self.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_logger_fields() {
        let id = ProjectId::from_string("p-42");
        let logger = StageLogger::new(&id, Stage::Assets);
        assert_eq!(logger.project_id(), "p-42");
        assert_eq!(logger.stage(), "assets");

        let logger = StageLogger::named(&id, "outline");
        assert_eq!(logger.stage(), "outline");
    }
}
