//! Stage orchestrator: outline, script, assets, video.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::Instrument;

use studyreel_generators::Generators;
use studyreel_media::VideoAssembler;
use studyreel_models::{
    ClipBudget, Outline, Project, ProjectId, ProjectStatus, SceneSegment, Script, Stage, StageStatus,
};
use studyreel_storage::{LocalStorage, ProjectStore};

use crate::assets::AssetStage;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::StageLogger;
use crate::metrics;
use crate::retry::RetryConfig;
use crate::status::StatusTracker;

/// Drives a project through its stages.
///
/// Every stage reads a snapshot, works on it in memory and commits once.
/// Asset and video runs report progress through the [`StatusTracker`].
pub struct Orchestrator {
    store: Arc<dyn ProjectStore>,
    storage: LocalStorage,
    generators: Generators,
    assembler: Arc<dyn VideoAssembler>,
    tracker: Arc<dyn StatusTracker>,
    clip_budget: ClipBudget,
    clip_retry_delay: Duration,
    assets_in_flight: Mutex<HashSet<ProjectId>>,
}

/// Marks a project's asset run as in flight until dropped.
struct AssetRunGuard<'a> {
    in_flight: &'a Mutex<HashSet<ProjectId>>,
    id: ProjectId,
}

impl Drop for AssetRunGuard<'_> {
    fn drop(&mut self) {
        let mut ids = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        ids.remove(&self.id);
    }
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        storage: LocalStorage,
        generators: Generators,
        assembler: Arc<dyn VideoAssembler>,
        tracker: Arc<dyn StatusTracker>,
    ) -> Self {
        Self {
            store,
            storage,
            generators,
            assembler,
            tracker,
            clip_budget: ClipBudget::default(),
            clip_retry_delay: Duration::from_millis(500),
            assets_in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_clip_budget(mut self, budget: ClipBudget) -> Self {
        self.clip_budget = budget;
        self
    }

    pub fn with_clip_retry_delay(mut self, delay: Duration) -> Self {
        self.clip_retry_delay = delay;
        self
    }

    pub fn tracker(&self) -> &Arc<dyn StatusTracker> {
        &self.tracker
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    // ========================================================================
    // Projects
    // ========================================================================

    pub async fn create_project(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> PipelineResult<Project> {
        let project = self.store.create(Project::new(title, content)).await?;
        tracing::info!(project_id = %project.id, "Project created");
        Ok(project)
    }

    pub async fn get_project(&self, id: &ProjectId) -> PipelineResult<Project> {
        Ok(self.store.get(id).await?)
    }

    pub fn asset_status(&self, id: &ProjectId) -> StageStatus {
        self.tracker.asset_status(id)
    }

    pub fn video_status(&self, id: &ProjectId) -> StageStatus {
        self.tracker.video_status(id)
    }

    // ========================================================================
    // Outline and script
    // ========================================================================

    pub async fn generate_outline(&self, id: &ProjectId) -> PipelineResult<Outline> {
        let mut project = self.store.get(id).await?;
        let logger = StageLogger::named(id, "outline");
        logger.log_start("Generating outline");

        let outline = self.generators.outline.generate(&project.content).await.map_err(|e| {
            logger.log_error(&e.to_string());
            PipelineError::from(e)
        })?;

        project.outline = Some(outline.clone());
        project.status = ProjectStatus::OutlineReady;
        project.touch();
        self.store.commit(project).await?;

        logger.log_completion(&format!("{} sections", outline.sections.len()));
        Ok(outline)
    }

    /// Persist a caller-supplied outline as is.
    pub async fn save_outline(&self, id: &ProjectId, outline: Outline) -> PipelineResult<Project> {
        let mut project = self.store.get(id).await?;
        project.outline = Some(outline);
        project.status = ProjectStatus::OutlineReady;
        project.touch();
        Ok(self.store.commit(project).await?)
    }

    pub async fn generate_script(&self, id: &ProjectId) -> PipelineResult<Script> {
        let mut project = self.store.get(id).await?;
        let outline = project
            .outline
            .clone()
            .ok_or_else(|| PipelineError::precondition("Outline required before script generation"))?;

        let logger = StageLogger::named(id, "script");
        logger.log_start("Generating script");

        let script = self.generators.script.generate(&outline).await.map_err(|e| {
            logger.log_error(&e.to_string());
            PipelineError::from(e)
        })?;

        project.replace_script(script.clone());
        self.store.commit(project).await?;

        logger.log_completion(&format!("{} scenes", script.len()));
        Ok(script)
    }

    /// Persist a caller-supplied script and re-derive its scenes.
    pub async fn save_script(&self, id: &ProjectId, script: Script) -> PipelineResult<Project> {
        let mut project = self.store.get(id).await?;
        project.replace_script(script);
        Ok(self.store.commit(project).await?)
    }

    // ========================================================================
    // Assets
    // ========================================================================

    /// Client-fault checks for the asset stage.
    pub async fn check_assets_preconditions(&self, id: &ProjectId) -> PipelineResult<()> {
        let project = self.store.get(id).await?;
        require_script(&project)?;
        if self.assets_running(id) {
            return Err(already_running());
        }
        Ok(())
    }

    pub fn assets_running(&self, id: &ProjectId) -> bool {
        let ids = self.assets_in_flight.lock().unwrap_or_else(|e| e.into_inner());
        ids.contains(id)
    }

    /// At most one asset run per project; a second one is turned away
    /// before it touches the tracker or the project files.
    fn claim_assets(&self, id: &ProjectId) -> PipelineResult<AssetRunGuard<'_>> {
        let mut ids = self.assets_in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !ids.insert(id.clone()) {
            return Err(already_running());
        }
        Ok(AssetRunGuard {
            in_flight: &self.assets_in_flight,
            id: id.clone(),
        })
    }

    pub async fn generate_assets(&self, id: &ProjectId) -> PipelineResult<()> {
        let logger = StageLogger::new(id, Stage::Assets);
        let span = logger.create_span();
        let started = Instant::now();

        let result = self.run_assets(id, &logger).instrument(span).await;
        metrics::record_tracked_stage(Stage::Assets, result.is_ok(), started.elapsed().as_secs_f64());
        result
    }

    async fn run_assets(&self, id: &ProjectId, logger: &StageLogger) -> PipelineResult<()> {
        let _guard = self.claim_assets(id)?;
        let mut project = self.store.get(id).await?;
        require_script(&project)?;

        self.tracker
            .set(Stage::Assets, id, StageStatus::in_progress(0.0, "Starting asset generation..."));

        let stage = AssetStage::new(
            self.generators.clone(),
            self.storage.clone(),
            Arc::clone(&self.tracker),
            self.clip_budget,
            RetryConfig::new("clip generation")
                .with_max_retries(1)
                .with_base_delay(self.clip_retry_delay),
        );
        let staged = stage.run(&mut project).await?;

        project.status = ProjectStatus::AssetsReady;
        project.touch();
        if let Err(e) = self.store.commit(project).await {
            staged.discard().await;
            let e = PipelineError::from(e);
            let message = if e.is_conflict() {
                format!("Another asset run finished first: {}", e)
            } else {
                e.to_string()
            };
            logger.log_error(&message);
            self.tracker.set(Stage::Assets, id, StageStatus::failed(1.0, message));
            return Err(e);
        }

        if let Err(e) = staged.promote().await {
            logger.log_error(&e.to_string());
            self.tracker.set(Stage::Assets, id, StageStatus::failed(1.0, e.to_string()));
            return Err(e);
        }

        logger.log_completion("All assets generated");
        self.tracker
            .set(Stage::Assets, id, StageStatus::completed("All assets generated"));
        Ok(())
    }

    // ========================================================================
    // Video
    // ========================================================================

    /// Client-fault checks for the video stage.
    pub async fn check_video_preconditions(&self, id: &ProjectId) -> PipelineResult<()> {
        let project = self.store.get(id).await?;
        require_video_ready(&project)?;
        collect_segments(&project).map(|_| ())
    }

    pub async fn generate_video(&self, id: &ProjectId) -> PipelineResult<String> {
        let logger = StageLogger::new(id, Stage::Video);
        let span = logger.create_span();
        let started = Instant::now();

        let result = self.run_video(id, &logger).instrument(span).await;
        if let Err(e) = &result {
            if !matches!(e, PipelineError::NotFound(_)) {
                logger.log_error(&e.to_string());
                self.tracker.set(Stage::Video, id, StageStatus::failed(0.0, e.to_string()));
            }
        }
        metrics::record_tracked_stage(Stage::Video, result.is_ok(), started.elapsed().as_secs_f64());
        result
    }

    async fn run_video(&self, id: &ProjectId, logger: &StageLogger) -> PipelineResult<String> {
        let mut project = self.store.get(id).await?;
        require_video_ready(&project)?;
        let segments = collect_segments(&project)?;

        self.tracker
            .set(Stage::Video, id, StageStatus::in_progress(0.3, "Stitching video..."));
        logger.log_start(&format!("Stitching {} segments", segments.len()));

        let output = self.storage.video_output_path(id);
        self.storage.ensure_project_dirs(id).await?;
        self.assembler.assemble(&segments, &output).await?;

        let video_path = output.display().to_string();
        project.video_path = Some(video_path.clone());
        project.status = ProjectStatus::VideoReady;
        project.touch();
        self.store.commit(project).await?;

        logger.log_completion(&video_path);
        self.tracker.set(
            Stage::Video,
            id,
            StageStatus::completed("Video ready").with_video_path(video_path.clone()),
        );
        Ok(video_path)
    }

    /// Run every stage in order.
    pub async fn run_all(&self, id: &ProjectId) -> PipelineResult<String> {
        self.generate_outline(id).await?;
        self.generate_script(id).await?;
        self.generate_assets(id).await?;
        self.generate_video(id).await
    }
}

fn already_running() -> PipelineError {
    PipelineError::precondition("Asset generation is already running for this project")
}

fn require_script(project: &Project) -> PipelineResult<()> {
    if project.script.is_none() {
        return Err(PipelineError::precondition("Script required before asset generation"));
    }
    Ok(())
}

fn require_video_ready(project: &Project) -> PipelineResult<()> {
    if !project.status.can_assemble_video() {
        return Err(PipelineError::precondition(format!(
            "Assets must be generated before the video (status: {})",
            project.status
        )));
    }
    Ok(())
}

/// Assembly inputs in scene order.
fn collect_segments(project: &Project) -> PipelineResult<Vec<SceneSegment>> {
    let mut scenes: Vec<_> = project.scenes.iter().collect();
    scenes.sort_by_key(|scene| scene.order_index);
    scenes
        .into_iter()
        .map(|scene| {
            scene.to_segment().ok_or_else(|| {
                PipelineError::precondition(format!(
                    "Scene {} ('{}') is missing its visual or audio",
                    scene.order_index, scene.title
                ))
            })
        })
        .collect()
}
