use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use studyreel_media::{FfmpegCommand, ToolRunner};

use crate::error::GeneratorResult;
use crate::mock::slide::MockImageGenerator;
use crate::traits::{ClipRequest, ImageRequest, SceneClipGenerator, SceneImageGenerator};

const CLIP_FPS: u32 = 30;

/// Slow zoom-and-pan over a mock slide.
pub struct MockClipGenerator {
    runner: Arc<dyn ToolRunner>,
    slides: MockImageGenerator,
}

impl MockClipGenerator {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            slides: MockImageGenerator::new(),
        }
    }
}

/// Ken Burns `zoompan` filter covering `duration_secs`.
pub(crate) fn ken_burns_filter(duration_secs: u32) -> String {
    let frames = duration_secs.max(1) * CLIP_FPS;
    format!(
        "zoompan=z='1+0.3*on/{frames}':x='iw/2-(iw/zoom/2)+on*0.5':y='ih/2-(ih/zoom/2)+on*0.3':d={frames}:s=1280x720:fps={fps}",
        frames = frames,
        fps = CLIP_FPS
    )
}

#[async_trait]
impl SceneClipGenerator for MockClipGenerator {
    async fn generate(&self, request: &ClipRequest, output: &Path) -> GeneratorResult<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Removed on drop
        let slide = tempfile::Builder::new()
            .prefix("studyreel_slide_")
            .suffix(".png")
            .tempfile()?;
        self.slides
            .generate(&ImageRequest::from(request), slide.path())
            .await?;

        let cmd = FfmpegCommand::new(output)
            .input(slide.path())
            .video_filter(ken_burns_filter(request.duration_secs))
            .video_codec("libx264")
            .pixel_format("yuv420p")
            .duration(request.duration_secs as f64);
        self.runner.ffmpeg(&cmd).await?;

        info!(
            "Mock clip: '{}' -> {} ({}s)",
            request.title,
            output.display(),
            request.duration_secs
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::test_support::StubRunner;
    use tempfile::TempDir;

    #[test]
    fn test_ken_burns_frames() {
        let filter = ken_burns_filter(6);
        assert!(filter.starts_with("zoompan=z='1+0.3*on/180'"));
        assert!(filter.contains(":d=180:s=1280x720:fps=30"));
    }

    #[tokio::test]
    async fn test_renders_from_temp_slide() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(StubRunner::default());
        let generator = MockClipGenerator::new(runner.clone());
        let output = dir.path().join("clips").join("scene_000.mp4");

        let request = ClipRequest {
            title: "Cells".into(),
            description: "slide".into(),
            narration: None,
            duration_secs: 6,
        };
        generator.generate(&request, &output).await.unwrap();

        assert!(output.exists());
        let calls = runner.calls.lock().unwrap();
        let args = &calls[0];
        let slide = &args[args.iter().position(|a| a == "-i").unwrap() + 1];
        assert!(slide.ends_with(".png"));
        // Temporary slide is gone once the clip exists
        assert!(!Path::new(slide).exists());
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "6.000"));
    }
}
