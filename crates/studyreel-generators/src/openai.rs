//! OpenAI chat-completions and speech providers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use studyreel_media::{probe_duration, ToolRunner};
use studyreel_models::{Outline, Script};

use crate::config::OpenAiConfig;
use crate::error::{GeneratorError, GeneratorResult};
use crate::traits::{OutlineGenerator, SceneAudioGenerator, ScriptGenerator};
use crate::wav::wav_duration;

const OUTLINE_PROMPT: &str = "You generate structured outlines from study material.\n\
Return ONLY valid JSON, no markdown fences, no extra text.\n\
Format: {\"sections\": [{\"title\": \"...\", \"key_points\": [\"...\", \"...\"]}]}\n\
Rules: 4-8 sections, 3-6 key_points per section.";

const SCRIPT_PROMPT: &str = "You turn study outlines into narrated video scripts.\n\
Return ONLY valid JSON, no markdown fences, no extra text.\n\
Format: {\"scenes\": [{\"title\": \"...\", \"narration\": \"...\", \"visual_description\": \"...\"}]}\n\
Rules: exactly one scene per outline section, in the same order; narration is 40-90 spoken words; \
visual_description describes a single shot for an illustrator.";

/// Bytes of an error body kept in messages.
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI client implementing the outline, script and audio contracts.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    config: OpenAiConfig,
    runner: Arc<dyn ToolRunner>,
}

impl OpenAiClient {
    /// Create a client. Fails without an API key.
    pub fn new(config: OpenAiConfig, runner: Arc<dyn ToolRunner>) -> GeneratorResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GeneratorError::config("OPENAI_API_KEY not set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            config,
            runner,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn chat(&self, system: &str, user: &str) -> GeneratorResult<String> {
        info!("Calling OpenAI chat (model={})", self.config.model);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::upstream(format!("OpenAI request failed: {}", e)))?;

        let response = check_status(response, "OpenAI").await?;
        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::upstream(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GeneratorError::upstream("No content in OpenAI response"))?;
        debug!("OpenAI raw response: {}", content);
        Ok(content)
    }
}

/// Turn a non-success response into an upstream error carrying the body.
async fn check_status(response: reqwest::Response, provider: &str) -> GeneratorResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    error!("{} returned {}: {}", provider, status, body);
    Err(GeneratorError::upstream(format!(
        "{} returned {}: {}",
        provider, status, body
    )))
}

/// Strip a surrounding markdown code fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[async_trait]
impl OutlineGenerator for OpenAiClient {
    async fn generate(&self, content: &str) -> GeneratorResult<Outline> {
        let raw = self.chat(OUTLINE_PROMPT, content).await?;
        let outline: Outline = serde_json::from_str(strip_code_fence(&raw))
            .map_err(|e| GeneratorError::upstream(format!("Failed to parse outline: {}", e)))?;
        outline
            .validate()
            .map_err(|e| GeneratorError::upstream(format!("Invalid outline: {}", e)))?;
        info!("OpenAI outline: {} sections", outline.sections.len());
        Ok(outline)
    }
}

#[async_trait]
impl ScriptGenerator for OpenAiClient {
    async fn generate(&self, outline: &Outline) -> GeneratorResult<Script> {
        let raw = self
            .chat(SCRIPT_PROMPT, &serde_json::to_string_pretty(outline)?)
            .await?;
        let script: Script = serde_json::from_str(strip_code_fence(&raw))
            .map_err(|e| GeneratorError::upstream(format!("Failed to parse script: {}", e)))?;

        if script.len() != outline.sections.len() {
            return Err(GeneratorError::upstream(format!(
                "Script has {} scenes for {} outline sections",
                script.len(),
                outline.sections.len()
            )));
        }
        info!("OpenAI script: {} scenes", script.len());
        Ok(script)
    }
}

#[async_trait]
impl SceneAudioGenerator for OpenAiClient {
    async fn generate(&self, narration: &str, output: &Path) -> GeneratorResult<f64> {
        let body = json!({
            "model": self.config.tts_model,
            "voice": self.config.tts_voice,
            "input": narration,
            "response_format": "wav",
        });

        let response = self
            .client
            .post(self.url("audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeneratorError::upstream(format!("OpenAI TTS request failed: {}", e)))?;
        let bytes = check_status(response, "OpenAI TTS").await?.bytes().await?;

        if bytes.is_empty() {
            return Err(GeneratorError::upstream("OpenAI TTS returned empty audio"));
        }
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &bytes).await?;

        let duration = match wav_duration(&bytes) {
            Some(d) => d,
            None => probe_duration(self.runner.as_ref(), output).await?,
        };
        info!("OpenAI TTS: {:.1}s audio written to {}", duration, output.display());
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::test_support::StubRunner;
    use crate::wav::tests::pcm_wav;
    use studyreel_models::OutlineSection;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiClient {
        let config = OpenAiConfig {
            api_key: Some("test-key".into()),
            base_url: server.uri(),
            ..Default::default()
        };
        OpenAiClient::new(config, Arc::new(StubRunner::default())).unwrap()
    }

    fn chat_reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn test_missing_api_key() {
        let err = OpenAiClient::new(OpenAiConfig::default(), Arc::new(StubRunner::default()))
            .err()
            .unwrap();
        assert!(matches!(err, GeneratorError::Config(_)));
    }

    #[tokio::test]
    async fn test_outline_parsed_from_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
            .respond_with(chat_reply(
                "```json\n{\"sections\": [{\"title\": \"Cells\", \"key_points\": [\"a\", \"b\", \"c\"]}]}\n```",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let outline = OutlineGenerator::generate(&client(&server), "Cells are small.")
            .await
            .unwrap();
        assert_eq!(outline.sections.len(), 1);
        assert_eq!(outline.sections[0].key_points.len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_outline_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(chat_reply("Sure! Here is your outline."))
            .mount(&server)
            .await;

        let err = OutlineGenerator::generate(&client(&server), "text")
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = OutlineGenerator::generate(&client(&server), "text")
            .await
            .unwrap_err();
        match err {
            GeneratorError::Upstream(msg) => assert!(msg.contains("429") && msg.contains("rate limited")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_script_must_match_outline_length() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(chat_reply(
                r#"{"scenes": [{"title": "A", "narration": "n", "visual_description": "v"}]}"#,
            ))
            .mount(&server)
            .await;

        let outline = Outline {
            sections: vec![
                OutlineSection::new("A", ["x"]),
                OutlineSection::new("B", ["y"]),
            ],
        };
        let err = ScriptGenerator::generate(&client(&server), &outline)
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_speech_written_and_measured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .and(body_partial_json(json!({"model": "tts-1", "response_format": "wav"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pcm_wav(24_000, 72_000, None)))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("audio").join("scene_000.wav");
        let duration = SceneAudioGenerator::generate(&client(&server), "Hello there", &output)
            .await
            .unwrap();

        assert!((duration - 3.0).abs() < 1e-9);
        assert!(output.exists());
    }
}
