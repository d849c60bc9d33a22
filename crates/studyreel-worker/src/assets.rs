//! Asset generation stage: one visual and one audio track per scene.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use studyreel_generators::{ClipRequest, Generators, ImageRequest};
use studyreel_media::move_file;
use studyreel_models::{ClipBudget, Project, ProjectId, Stage, StageStatus, VisualAsset};
use studyreel_storage::LocalStorage;

use crate::clip_cache::ClipCache;
use crate::error::PipelineResult;
use crate::logging::StageLogger;
use crate::metrics;
use crate::retry::{retry_async, RetryConfig};
use crate::status::StatusTracker;

/// Generates every scene's visual and audio in index order.
///
/// Works on an in-memory project snapshot and writes into a per-run staging
/// directory. Scene rows already point at the final paths; the caller commits
/// the snapshot and then promotes the staged files.
pub struct AssetStage {
    generators: Generators,
    storage: LocalStorage,
    tracker: Arc<dyn StatusTracker>,
    budget: ClipBudget,
    clip_retry: RetryConfig,
}

/// Units of work done so far, two per scene.
struct Progress {
    done: usize,
    total: usize,
}

impl Progress {
    fn new(scenes: usize) -> Self {
        Self {
            done: 0,
            total: scenes * 2,
        }
    }

    fn advance(&mut self) -> f64 {
        self.done += 1;
        self.fraction()
    }

    fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}

/// Files produced by one asset run, still in staging.
#[derive(Debug)]
pub struct StagedAssets {
    staging_dir: PathBuf,
    moves: Vec<(PathBuf, PathBuf)>,
    cache_path: PathBuf,
    cache_updates: Vec<(usize, String, PathBuf)>,
}

impl StagedAssets {
    fn new(staging_dir: PathBuf, cache_path: PathBuf) -> Self {
        Self {
            staging_dir,
            moves: Vec::new(),
            cache_path,
            cache_updates: Vec::new(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Where a generated file is written before promotion.
    fn stage(&mut self, final_path: PathBuf) -> PathBuf {
        let name = final_path.file_name().map(PathBuf::from).unwrap_or_default();
        let staged = self.staging_dir.join(name);
        self.moves.push((staged.clone(), final_path));
        staged
    }

    /// Move every staged file over its final path and record new clips in
    /// the cache. Call only after the project commit succeeded.
    pub async fn promote(self) -> PipelineResult<()> {
        for (staged, final_path) in &self.moves {
            move_file(staged, final_path).await?;
        }
        if !self.cache_updates.is_empty() {
            let mut cache = ClipCache::load(&self.cache_path).await;
            for (index, hash, path) in &self.cache_updates {
                cache.set(*index, hash.clone(), path).await;
            }
        }
        debug!(files = self.moves.len(), "Promoted staged assets");
        remove_staging(&self.staging_dir).await;
        Ok(())
    }

    /// Drop everything this run generated.
    pub async fn discard(self) {
        remove_staging(&self.staging_dir).await;
    }
}

async fn remove_staging(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), "Failed to remove asset staging: {}", e),
    }
}

impl AssetStage {
    pub fn new(
        generators: Generators,
        storage: LocalStorage,
        tracker: Arc<dyn StatusTracker>,
        budget: ClipBudget,
        clip_retry: RetryConfig,
    ) -> Self {
        Self {
            generators,
            storage,
            tracker,
            budget,
            clip_retry,
        }
    }

    /// Fill in `visual`, `audio_path` and `duration_secs` for every scene.
    ///
    /// On error the staging directory is removed and the tracker is left at
    /// `failed` with the progress reached.
    pub async fn run(&self, project: &mut Project) -> PipelineResult<StagedAssets> {
        let logger = StageLogger::new(&project.id, Stage::Assets);
        let mut progress = Progress::new(project.scenes.len());
        let run_id = Uuid::new_v4().simple().to_string();
        let mut staged = StagedAssets::new(
            self.storage.staging_dir(&project.id, &run_id),
            self.storage.clip_cache_path(&project.id),
        );

        match self.generate_all(project, &mut staged, &logger, &mut progress).await {
            Ok(()) => Ok(staged),
            Err(e) => {
                staged.discard().await;
                logger.log_error(&e.to_string());
                self.tracker.set(
                    Stage::Assets,
                    &project.id,
                    StageStatus::failed(progress.fraction(), e.to_string()),
                );
                Err(e)
            }
        }
    }

    async fn generate_all(
        &self,
        project: &mut Project,
        staged: &mut StagedAssets,
        logger: &StageLogger,
        progress: &mut Progress,
    ) -> PipelineResult<()> {
        let project_id = project.id.clone();
        self.storage.ensure_project_dirs(&project_id).await?;
        tokio::fs::create_dir_all(staged.staging_dir()).await?;

        let cache = ClipCache::load(self.storage.clip_cache_path(&project_id)).await;
        let total = project.scenes.len();
        let clip_seconds = self.budget.clip_seconds;

        logger.log_start(&format!(
            "{} scenes, {} eligible for clips",
            total,
            self.budget.max_clip_scenes().min(total)
        ));

        for index in 0..total {
            let key_points = project
                .outline
                .as_ref()
                .and_then(|outline| outline.key_points(index))
                .map(<[String]>::to_vec)
                .unwrap_or_default();
            let scene = &mut project.scenes[index];

            let clip_request = ClipRequest {
                title: scene.title.clone(),
                description: scene.visual_description.clone(),
                narration: Some(scene.narration.clone()),
                duration_secs: clip_seconds,
            };
            let image_request = ImageRequest {
                key_points,
                ..ImageRequest::from(&clip_request)
            };

            // Only budget-eligible scenes consult the cache, so a hit can never
            // put more clip seconds into the video than the budget allows.
            let visual = if self.budget.allows_clip(index) {
                let clip_path = self.storage.scene_clip_path(&project_id, index);
                let hash = ClipCache::compute_hash(&scene.visual_description, &scene.title, clip_seconds);

                if cache.is_valid(index, &hash, &clip_path) {
                    info!(project_id = %project_id, scene = index, "Clip cache hit for '{}'", scene.title);
                    metrics::record_cache_hit();
                    metrics::record_scene_visual("clip", "cache");
                    VisualAsset::Clip(clip_path)
                } else {
                    let image_path = self.storage.scene_image_path(&project_id, index);
                    let visual = self
                        .clip_with_fallback(index, &clip_request, &image_request, &clip_path, &image_path, staged)
                        .await?;
                    if visual.is_clip() {
                        staged.cache_updates.push((index, hash, clip_path));
                    }
                    visual
                }
            } else {
                let image_path = self.storage.scene_image_path(&project_id, index);
                let target = staged.stage(image_path.clone());
                self.generators.image.generate(&image_request, &target).await?;
                metrics::record_scene_visual("image", "budget");
                VisualAsset::Image(image_path)
            };

            let kind = visual.kind();
            scene.visual = Some(visual);
            self.report(&project_id, progress.advance(), format!("Generated {} {}/{}", kind, index + 1, total));

            let audio_path = self.storage.scene_audio_path(&project_id, index);
            let target = staged.stage(audio_path.clone());
            let duration = self.generators.audio.generate(&scene.narration, &target).await?;
            scene.audio_path = Some(audio_path);
            scene.duration_secs = duration;
            self.report(&project_id, progress.advance(), format!("Generated audio {}/{}", index + 1, total));
            logger.log_progress(&format!("Scene {}/{} ready ({:.1}s)", index + 1, total, duration));
        }

        Ok(())
    }

    /// Try the clip twice, then settle for a still image.
    ///
    /// Clip errors never escape; only a failing image fallback does. The
    /// returned asset names the final path; the file itself is staged.
    async fn clip_with_fallback(
        &self,
        index: usize,
        clip_request: &ClipRequest,
        image_request: &ImageRequest,
        clip_path: &Path,
        image_path: &Path,
        staged: &mut StagedAssets,
    ) -> PipelineResult<VisualAsset> {
        let started = Instant::now();
        let clip_target = staged.staging_dir().join(clip_path.file_name().unwrap_or_default());
        let target = clip_target.as_path();
        let outcome = retry_async(&self.clip_retry, |attempt| async move {
            info!(scene = index, attempt, "Generating clip for '{}'", clip_request.title);
            let result = self.generators.clip.generate(clip_request, target).await;
            metrics::record_clip_attempt(result.is_ok());
            result
        })
        .await;

        let attempts = outcome.attempts();
        match outcome.into_result() {
            Ok(()) => {
                info!(
                    scene = index,
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Clip ready for '{}'",
                    clip_request.title
                );
                metrics::record_scene_visual("clip", "generated");
                staged.stage(clip_path.to_path_buf());
                Ok(VisualAsset::Clip(clip_path.to_path_buf()))
            }
            Err(e) => {
                warn!(
                    scene = index,
                    attempts,
                    "Clip generation failed for '{}', falling back to image: {}",
                    clip_request.title,
                    e
                );
                metrics::record_clip_fallback();
                let image_target = staged.stage(image_path.to_path_buf());
                self.generators.image.generate(image_request, &image_target).await?;
                metrics::record_scene_visual("image", "fallback");
                Ok(VisualAsset::Image(image_path.to_path_buf()))
            }
        }
    }

    fn report(&self, project_id: &ProjectId, progress: f64, message: String) {
        self.tracker
            .set(Stage::Assets, project_id, StageStatus::in_progress(progress, message));
    }
}
