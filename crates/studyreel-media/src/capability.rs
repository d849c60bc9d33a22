//! One-time detection of optional FFmpeg features.

use tracing::{info, warn};

use crate::command::{ToolRunner, FFMPEG};

/// Optional features of the installed FFmpeg build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaCapabilities {
    /// `drawtext` filter is compiled in (needs libfreetype)
    pub drawtext: bool,
}

impl MediaCapabilities {
    /// Probe the FFmpeg build. Any failure reports the feature as missing.
    pub async fn detect(runner: &dyn ToolRunner) -> Self {
        let args = vec!["-hide_banner".to_string(), "-filters".to_string()];
        let drawtext = match runner.run(FFMPEG, &args).await {
            Ok(output) if output.success() => lists_filter(&output.stdout, "drawtext"),
            Ok(output) => {
                warn!("ffmpeg -filters exited with {:?}", output.exit_code);
                false
            }
            Err(e) => {
                warn!("Could not probe ffmpeg filters: {}", e);
                false
            }
        };

        info!(drawtext = drawtext, "Detected FFmpeg capabilities");
        Self { drawtext }
    }
}

/// Whether `ffmpeg -filters` output lists `name`.
///
/// Lines look like ` T.C drawtext          V->V       Draw text ...`.
fn lists_filter(filters_output: &str, name: &str) -> bool {
    filters_output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|filter| filter == name)
}
