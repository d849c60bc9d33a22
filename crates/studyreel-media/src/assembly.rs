//! Scene assembly: turning per-scene media into one video.
//!
//! # Pipeline
//!
//! 1. Each scene becomes one `segment_NNN.mp4` in a per-call scratch directory:
//!    - motion clips are probed, looped or trimmed to the narration length,
//!      then muxed with the scene audio (`-shortest`)
//!    - still images are held for the narration and optionally carry the
//!      scene title via `drawtext`
//! 2. A single segment is moved into place as-is.
//! 3. Several segments are joined by stream copy with `+faststart`, or by an
//!    `xfade` chain when a crossfade is configured (falling back to the copy
//!    join if that fails).
//!
//! The scratch directory is removed when the call returns, whatever the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use studyreel_models::{EncodingConfig, SceneSegment, VisualAsset};

use crate::align::{plan_clip_alignment, ClipAlignment};
use crate::capability::MediaCapabilities;
use crate::command::{FfmpegCommand, ToolRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{clip_filter, concat_list, crossfade_filter, still_image_filter};
use crate::fs_utils::{ensure_parent, move_file};
use crate::probe::probe_duration;

/// Assembly settings.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub encoding: EncodingConfig,
    /// Crossfade length between scenes; `None` joins with a hard cut
    pub crossfade_secs: Option<f64>,
    /// Parent of the per-call scratch directory (system temp when unset)
    pub work_dir: Option<PathBuf>,
    /// Burn scene titles into still images when drawtext is available
    pub title_overlay: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            encoding: EncodingConfig::default(),
            crossfade_secs: None,
            work_dir: None,
            title_overlay: true,
        }
    }
}

/// Produces the final video from ordered scene segments.
#[async_trait]
pub trait VideoAssembler: Send + Sync {
    async fn assemble(&self, segments: &[SceneSegment], output: &Path) -> MediaResult<()>;
}

/// FFmpeg-backed [`VideoAssembler`].
pub struct SceneAssembler {
    runner: Arc<dyn ToolRunner>,
    options: AssemblyOptions,
    capabilities: MediaCapabilities,
}

impl SceneAssembler {
    /// Create an assembler, probing FFmpeg capabilities once.
    pub async fn new(runner: Arc<dyn ToolRunner>, options: AssemblyOptions) -> Self {
        let capabilities = MediaCapabilities::detect(runner.as_ref()).await;
        Self::with_capabilities(runner, options, capabilities)
    }

    /// Create an assembler with already-known capabilities.
    pub fn with_capabilities(
        runner: Arc<dyn ToolRunner>,
        options: AssemblyOptions,
        capabilities: MediaCapabilities,
    ) -> Self {
        Self {
            runner,
            options,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> MediaCapabilities {
        self.capabilities
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    fn scratch_dir(&self) -> MediaResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("studyreel_");
        let dir = match &self.options.work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn assemble_in(
        &self,
        segments: &[SceneSegment],
        output: &Path,
        scratch: &Path,
    ) -> MediaResult<()> {
        let mut rendered = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let path = scratch.join(format!("segment_{:03}.mp4", index));
            self.render_segment(index, segment, &path, scratch).await?;
            rendered.push(path);
        }

        ensure_parent(output).await?;

        if let [only] = rendered.as_slice() {
            debug!("Single segment, moving into place");
            return move_file(only, output).await;
        }

        if let Some(fade) = self.options.crossfade_secs {
            match self.join_crossfade(&rendered, fade, output).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Crossfade join failed, falling back to concat: {}", e),
            }
        }

        self.join_concat(&rendered, output, scratch).await
    }

    async fn render_segment(
        &self,
        index: usize,
        segment: &SceneSegment,
        output: &Path,
        scratch: &Path,
    ) -> MediaResult<()> {
        let audio_secs = self.audio_duration(segment).await?;
        match &segment.visual {
            VisualAsset::Clip(clip) => {
                self.render_clip(index, clip, segment, audio_secs, output, scratch)
                    .await
            }
            VisualAsset::Image(image) => self.render_image(image, segment, audio_secs, output).await,
        }
    }

    async fn audio_duration(&self, segment: &SceneSegment) -> MediaResult<f64> {
        if segment.duration_secs > 0.0 {
            return Ok(segment.duration_secs);
        }
        probe_duration(self.runner.as_ref(), &segment.audio_path).await
    }

    async fn render_clip(
        &self,
        index: usize,
        clip: &Path,
        segment: &SceneSegment,
        audio_secs: f64,
        output: &Path,
        scratch: &Path,
    ) -> MediaResult<()> {
        let enc = &self.options.encoding;
        let clip_secs = probe_duration(self.runner.as_ref(), clip).await?;
        if clip_secs <= 0.0 {
            warn!(clip = %clip.display(), "Clip reports no duration, using it as-is");
        }

        let alignment = plan_clip_alignment(clip_secs, audio_secs);
        info!(
            "Aligning clip {} ({:.2}s) to {:.2}s of audio: {:?}",
            clip.display(),
            clip_secs,
            audio_secs,
            alignment
        );

        let video_source = match alignment {
            ClipAlignment::AsIs => clip.to_path_buf(),
            ClipAlignment::Loop {
                extra_loops,
                target_secs,
            } => {
                let aligned = scratch.join(format!("aligned_{:03}.mp4", index));
                let cmd = FfmpegCommand::new(&aligned).stream_loop(extra_loops).input(clip);
                self.runner
                    .ffmpeg(&self.retime(cmd, target_secs))
                    .await?;
                aligned
            }
            ClipAlignment::Trim { target_secs } => {
                let aligned = scratch.join(format!("aligned_{:03}.mp4", index));
                let cmd = FfmpegCommand::new(&aligned).input(clip);
                self.runner
                    .ffmpeg(&self.retime(cmd, target_secs))
                    .await?;
                aligned
            }
        };

        let mux = FfmpegCommand::new(output)
            .input(&video_source)
            .input(&segment.audio_path)
            .map("0:v:0")
            .map("1:a:0")
            .video_filter(clip_filter(enc))
            .video_codec(&enc.codec)
            .pixel_format(&enc.pixel_format)
            .frame_rate(enc.fps)
            .audio_codec(&enc.audio_codec)
            .audio_bitrate(&enc.audio_bitrate)
            .shortest();
        self.runner.ffmpeg(&mux).await?;
        Ok(())
    }

    /// Video-only re-encode cut at `target_secs`.
    fn retime(&self, cmd: FfmpegCommand, target_secs: f64) -> FfmpegCommand {
        let enc = &self.options.encoding;
        cmd.duration(target_secs)
            .no_audio()
            .video_codec(&enc.codec)
            .pixel_format(&enc.pixel_format)
            .frame_rate(enc.fps)
    }

    async fn render_image(
        &self,
        image: &Path,
        segment: &SceneSegment,
        audio_secs: f64,
        output: &Path,
    ) -> MediaResult<()> {
        let enc = &self.options.encoding;
        let title = (self.options.title_overlay && self.capabilities.drawtext)
            .then_some(segment.title.as_str());

        let cmd = FfmpegCommand::new(output)
            .loop_image()
            .input(image)
            .input(&segment.audio_path)
            .map("0:v:0")
            .map("1:a:0")
            .video_filter(still_image_filter(enc, title))
            .video_codec(&enc.codec)
            .output_args(["-tune", "stillimage"])
            .pixel_format(&enc.pixel_format)
            .frame_rate(enc.fps)
            .audio_codec(&enc.audio_codec)
            .audio_bitrate(&enc.audio_bitrate)
            .duration(audio_secs)
            .shortest();
        self.runner.ffmpeg(&cmd).await?;
        Ok(())
    }

    async fn join_concat(&self, segments: &[PathBuf], output: &Path, scratch: &Path) -> MediaResult<()> {
        let list = scratch.join("concat.txt");
        tokio::fs::write(&list, concat_list(segments)).await?;

        let cmd = FfmpegCommand::new(output)
            .input_arg("-f")
            .input_arg("concat")
            .input_arg("-safe")
            .input_arg("0")
            .input(&list)
            .codec_copy()
            .faststart();
        self.runner.ffmpeg(&cmd).await?;
        Ok(())
    }

    async fn join_crossfade(&self, segments: &[PathBuf], fade_secs: f64, output: &Path) -> MediaResult<()> {
        let mut durations = Vec::with_capacity(segments.len());
        for segment in segments {
            durations.push(probe_duration(self.runner.as_ref(), segment).await?);
        }

        let graph = crossfade_filter(&durations, fade_secs).ok_or_else(|| {
            MediaError::InvalidMedia(format!(
                "cannot crossfade {} segments with a {:.2}s fade",
                segments.len(),
                fade_secs
            ))
        })?;

        let enc = &self.options.encoding;
        let mut cmd = FfmpegCommand::new(output);
        for segment in segments {
            cmd = cmd.input(segment);
        }
        let cmd = cmd
            .filter_complex(graph)
            .map("[vout]")
            .map("[aout]")
            .video_codec(&enc.codec)
            .pixel_format(&enc.pixel_format)
            .frame_rate(enc.fps)
            .audio_codec(&enc.audio_codec)
            .audio_bitrate(&enc.audio_bitrate)
            .faststart();
        self.runner.ffmpeg(&cmd).await?;
        Ok(())
    }
}

#[async_trait]
impl VideoAssembler for SceneAssembler {
    async fn assemble(&self, segments: &[SceneSegment], output: &Path) -> MediaResult<()> {
        if segments.is_empty() {
            return Err(MediaError::NoSegments);
        }

        info!(
            "Assembling {} scenes -> {}",
            segments.len(),
            output.display()
        );
        let started = Instant::now();

        let scratch = self.scratch_dir()?;
        let result = self.assemble_in(segments, output, scratch.path()).await;
        if let Err(e) = scratch.close() {
            warn!("Failed to remove assembly scratch directory: {}", e);
        }

        let outcome = if result.is_ok() { "success" } else { "failure" };
        counter!("studyreel_assemblies_total", "outcome" => outcome).increment(1);
        histogram!("studyreel_assembly_duration_seconds").record(started.elapsed().as_secs_f64());

        if result.is_ok() {
            info!("Video assembled: {}", output.display());
        }
        result
    }
}
