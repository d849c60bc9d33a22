//! Provider selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use studyreel_media::ToolRunner;

use crate::error::{GeneratorError, GeneratorResult};
use crate::mock::{
    MockClipGenerator, MockImageGenerator, MockOutlineGenerator, MockScriptGenerator,
    MockVoiceGenerator,
};
use crate::openai::OpenAiClient;
use crate::runway::RunwayClipGenerator;
use crate::traits::{
    OutlineGenerator, SceneAudioGenerator, SceneClipGenerator, SceneImageGenerator,
    ScriptGenerator,
};

macro_rules! provider_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub enum $name {
            #[default]
            Mock,
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::Mock => "mock",
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = GeneratorError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    "mock" => Ok($name::Mock),
                    $($text => Ok($name::$variant),)+
                    other => Err(GeneratorError::config(format!(
                        "unsupported {} provider: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

provider_enum!(AiProvider { OpenAi => "openai" });
provider_enum!(VoiceProvider { OpenAi => "openai" });
provider_enum!(ClipProvider { Runway => "runway" });

/// OpenAI settings.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Chat model for outlines and scripts
    pub model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Runway settings.
#[derive(Debug, Clone)]
pub struct RunwayConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub ratio: String,
    pub api_version: String,
    pub poll_interval: Duration,
    /// Total polling budget before giving up
    pub poll_timeout: Duration,
}

impl Default for RunwayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.dev.runwayml.com".to_string(),
            model: "gen3a_turbo".to_string(),
            ratio: "1280:720".to_string(),
            api_version: "2024-11-06".to_string(),
            poll_interval: Duration::from_secs(10),
            poll_timeout: Duration::from_secs(300),
        }
    }
}

/// Which provider backs each collaborator.
///
/// Provider names are kept as strings until [`Generators::from_config`] so a
/// typo surfaces as one startup error rather than a silent fallback.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub ai_provider: String,
    pub voice_provider: String,
    pub clip_provider: String,
    pub openai: OpenAiConfig,
    pub runway: RunwayConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            ai_provider: "mock".to_string(),
            voice_provider: "mock".to_string(),
            clip_provider: "mock".to_string(),
            openai: OpenAiConfig::default(),
            runway: RunwayConfig::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(key)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}

impl GeneratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let openai_defaults = OpenAiConfig::default();
        let runway_defaults = RunwayConfig::default();
        Self {
            ai_provider: env_or("STUDYREEL_AI_PROVIDER", "mock"),
            voice_provider: env_or("STUDYREEL_VOICE_PROVIDER", "mock"),
            clip_provider: env_or("STUDYREEL_CLIP_PROVIDER", "mock"),
            openai: OpenAiConfig {
                api_key: std::env::var("OPENAI_API_KEY").ok(),
                base_url: env_or("OPENAI_BASE_URL", &openai_defaults.base_url),
                model: env_or("OPENAI_MODEL", &openai_defaults.model),
                tts_voice: env_or("OPENAI_TTS_VOICE", &openai_defaults.tts_voice),
                ..openai_defaults
            },
            runway: RunwayConfig {
                api_key: std::env::var("RUNWAY_API_KEY").ok(),
                base_url: env_or("RUNWAY_BASE_URL", &runway_defaults.base_url),
                poll_interval: env_secs("RUNWAY_POLL_INTERVAL_SECS", 10),
                poll_timeout: env_secs("RUNWAY_POLL_TIMEOUT_SECS", 300),
                ..runway_defaults
            },
        }
    }
}

/// The resolved set of collaborators, built once and shared.
#[derive(Clone)]
pub struct Generators {
    pub outline: Arc<dyn OutlineGenerator>,
    pub script: Arc<dyn ScriptGenerator>,
    pub audio: Arc<dyn SceneAudioGenerator>,
    pub image: Arc<dyn SceneImageGenerator>,
    pub clip: Arc<dyn SceneClipGenerator>,
}

impl Generators {
    /// Offline generators for every role.
    pub fn mock(runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            outline: Arc::new(MockOutlineGenerator::new()),
            script: Arc::new(MockScriptGenerator::new()),
            audio: Arc::new(MockVoiceGenerator::new(runner.clone())),
            image: Arc::new(MockImageGenerator::new()),
            clip: Arc::new(MockClipGenerator::new(runner)),
        }
    }

    /// Resolve every configured provider. Unknown names or missing API keys
    /// fail here.
    pub fn from_config(config: &GeneratorConfig, runner: Arc<dyn ToolRunner>) -> GeneratorResult<Self> {
        let ai: AiProvider = config.ai_provider.parse()?;
        let voice: VoiceProvider = config.voice_provider.parse()?;
        let clip: ClipProvider = config.clip_provider.parse()?;

        let mut generators = Self::mock(runner.clone());

        let needs_openai = ai == AiProvider::OpenAi || voice == VoiceProvider::OpenAi;
        if needs_openai {
            let client = Arc::new(OpenAiClient::new(config.openai.clone(), runner)?);
            if ai == AiProvider::OpenAi {
                generators.outline = client.clone();
                generators.script = client.clone();
            }
            if voice == VoiceProvider::OpenAi {
                generators.audio = client;
            }
        }

        if clip == ClipProvider::Runway {
            generators.clip = Arc::new(RunwayClipGenerator::new(config.runway.clone())?);
        }

        info!(ai = %ai, voice = %voice, clip = %clip, "Resolved generator providers");
        Ok(generators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::test_support::StubRunner;

    fn runner() -> Arc<dyn ToolRunner> {
        Arc::new(StubRunner::default())
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("mock".parse::<AiProvider>().unwrap(), AiProvider::Mock);
        assert_eq!(" OpenAI ".parse::<AiProvider>().unwrap(), AiProvider::OpenAi);
        assert_eq!("runway".parse::<ClipProvider>().unwrap(), ClipProvider::Runway);
        assert!("runway".parse::<VoiceProvider>().is_err());
    }

    #[test]
    fn test_default_config_is_all_mock() {
        assert!(Generators::from_config(&GeneratorConfig::default(), runner()).is_ok());
    }

    #[test]
    fn test_real_provider_without_key_fails_at_startup() {
        let config = GeneratorConfig {
            clip_provider: "runway".into(),
            ..Default::default()
        };
        let err = Generators::from_config(&config, runner()).err().unwrap();
        assert!(matches!(err, GeneratorError::Config(_)));

        let config = GeneratorConfig {
            ai_provider: "gemini".into(),
            ..Default::default()
        };
        assert!(Generators::from_config(&config, runner()).is_err());
    }

    #[test]
    fn test_openai_with_key_resolves() {
        let mut config = GeneratorConfig {
            ai_provider: "openai".into(),
            voice_provider: "openai".into(),
            ..Default::default()
        };
        config.openai.api_key = Some("k".into());
        assert!(Generators::from_config(&config, runner()).is_ok());
    }
}
