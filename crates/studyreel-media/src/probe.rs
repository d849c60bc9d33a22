//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::command::{ToolRunner, FFPROBE};
use crate::error::{MediaError, MediaResult};

/// Container-level information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Whether a video stream is present
    pub has_video: bool,
    /// Whether an audio stream is present
    pub has_audio: bool,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
}

/// Probe a media file.
pub async fn probe_media(runner: &dyn ToolRunner, path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        path.to_string_lossy().to_string(),
    ];

    let output = runner.run(FFPROBE, &args).await?;
    if !output.success() {
        return Err(MediaError::probe_failed(path, output.stderr_tail().trim().to_string()));
    }

    parse_probe_output(path, &output.stdout)
}

/// Get media duration in seconds.
pub async fn probe_duration(runner: &dyn ToolRunner, path: impl AsRef<Path>) -> MediaResult<f64> {
    let info = probe_media(runner, path).await?;
    Ok(info.duration)
}

fn parse_probe_output(path: &Path, stdout: &str) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_str(stdout)?;

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MediaError::probe_failed(path, "no duration in ffprobe output"))?;

    Ok(MediaInfo {
        duration,
        has_video: probe.streams.iter().any(|s| s.codec_type == "video"),
        has_audio: probe.streams.iter().any(|s| s.codec_type == "audio"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "streams": [{"codec_type": "video"}, {"codec_type": "audio"}],
            "format": {"duration": "6.041667"}
        }"#;
        let info = parse_probe_output(Path::new("clip.mp4"), json).unwrap();
        assert!((info.duration - 6.041667).abs() < 1e-6);
        assert!(info.has_video);
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_missing_duration() {
        let json = r#"{"streams": [{"codec_type": "video"}], "format": {}}"#;
        let err = parse_probe_output(Path::new("clip.mp4"), json).unwrap_err();
        assert!(matches!(err, MediaError::ProbeFailed { .. }));
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_probe_output(Path::new("clip.mp4"), "not json").unwrap_err();
        assert!(matches!(err, MediaError::JsonParse(_)));
    }
}
