use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use studyreel_media::{FfmpegCommand, ToolRunner};
use studyreel_models::estimate_narration_seconds;

use crate::error::GeneratorResult;
use crate::traits::SceneAudioGenerator;

/// Quiet sine tone lasting as long as the narration would take to read.
pub struct MockVoiceGenerator {
    runner: Arc<dyn ToolRunner>,
}

impl MockVoiceGenerator {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }
}

pub(crate) fn tone_command(output: &Path, duration_secs: f64) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .lavfi(format!(
            "sine=frequency=440:sample_rate=24000:duration={:.3}",
            duration_secs
        ))
        .output_args(["-af", "volume=-40dB", "-ac", "1"])
        .audio_codec("pcm_s16le")
}

#[async_trait]
impl SceneAudioGenerator for MockVoiceGenerator {
    async fn generate(&self, narration: &str, output: &Path) -> GeneratorResult<f64> {
        let duration = estimate_narration_seconds(narration);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        self.runner.ffmpeg(&tone_command(output, duration)).await?;
        debug!("Mock narration: {:.1}s -> {}", duration, output.display());
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::test_support::StubRunner;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_duration_is_word_estimate() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(StubRunner::default());
        let generator = MockVoiceGenerator::new(runner.clone());
        let output = dir.path().join("audio").join("scene_000.wav");

        let narration = vec!["word"; 75].join(" ");
        let duration = generator.generate(&narration, &output).await.unwrap();

        assert!((duration - 30.0).abs() < 1e-9);
        assert!(output.exists());
        let calls = runner.calls.lock().unwrap();
        assert!(calls[0]
            .iter()
            .any(|a| a == "sine=frequency=440:sample_rate=24000:duration=30.000"));
    }

    #[tokio::test]
    async fn test_short_narration_gets_floor() {
        let dir = TempDir::new().unwrap();
        let generator = MockVoiceGenerator::new(Arc::new(StubRunner::default()));
        let duration = generator
            .generate("Hi", &dir.path().join("a.wav"))
            .await
            .unwrap();
        assert_eq!(duration, 2.0);
    }
}
