//! Output encoding settings for assembled videos.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Pixel format accepted by every common player
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Output frame rate
pub const DEFAULT_FPS: u32 = 30;
/// Output frame size
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    #[serde(default = "default_video_codec")]
    pub codec: String,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_fps() -> u32 {
    DEFAULT_FPS
}
fn default_width() -> u32 {
    DEFAULT_WIDTH
}
fn default_height() -> u32 {
    DEFAULT_HEIGHT
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            pixel_format: default_pixel_format(),
            fps: DEFAULT_FPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

impl EncodingConfig {
    /// Scale filter for the configured frame size.
    pub fn scale_filter(&self) -> String {
        format!("scale={}:{}", self.width, self.height)
    }

    /// Frame size as `WxH`.
    pub fn frame_size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: EncodingConfig = serde_json::from_str(r#"{"fps": 25}"#).unwrap();
        assert_eq!(config.fps, 25);
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.scale_filter(), "scale=1280:720");
    }
}
