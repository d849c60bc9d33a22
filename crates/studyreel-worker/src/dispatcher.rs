//! Background stage dispatch.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use studyreel_models::{ProjectId, Stage};

use crate::error::{PipelineError, PipelineResult};
use crate::orchestrator::Orchestrator;

/// Handle to a stage running in the background.
#[derive(Debug)]
pub struct StageTicket {
    pub project_id: ProjectId,
    pub stage: Stage,
    handle: JoinHandle<PipelineResult<()>>,
}

impl StageTicket {
    /// Wait for the stage to finish.
    pub async fn wait(self) -> PipelineResult<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::upstream(format!("{} task aborted: {}", self.stage, e))),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Validates a trigger, then runs the stage on a spawned task.
///
/// Client faults come back from `dispatch_*` directly. Anything that fails
/// inside the task is logged and left in the status tracker.
#[derive(Clone)]
pub struct StageDispatcher {
    orchestrator: Arc<Orchestrator>,
    permits: Arc<Semaphore>,
}

impl StageDispatcher {
    pub fn new(orchestrator: Arc<Orchestrator>, max_concurrent_stages: usize) -> Self {
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(max_concurrent_stages.max(1))),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub async fn dispatch_assets(&self, project_id: ProjectId) -> PipelineResult<StageTicket> {
        self.orchestrator.check_assets_preconditions(&project_id).await?;
        Ok(self.spawn(project_id, Stage::Assets))
    }

    pub async fn dispatch_video(&self, project_id: ProjectId) -> PipelineResult<StageTicket> {
        self.orchestrator.check_video_preconditions(&project_id).await?;
        Ok(self.spawn(project_id, Stage::Video))
    }

    fn spawn(&self, project_id: ProjectId, stage: Stage) -> StageTicket {
        let orchestrator = Arc::clone(&self.orchestrator);
        let permits = Arc::clone(&self.permits);
        let id = project_id.clone();

        info!(project_id = %id, stage = %stage, "Dispatching stage");
        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::upstream(format!("dispatcher closed: {}", e)))?;
            debug!(project_id = %id, stage = %stage, "Stage permit acquired");

            let result = match stage {
                Stage::Assets => orchestrator.generate_assets(&id).await,
                Stage::Video => orchestrator.generate_video(&id).await.map(|_| ()),
            };
            if let Err(e) = &result {
                error!(project_id = %id, stage = %stage, "Background stage failed: {}", e);
            }
            result
        });

        StageTicket {
            project_id,
            stage,
            handle,
        }
    }
}
