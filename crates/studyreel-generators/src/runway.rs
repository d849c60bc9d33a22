//! Runway text-to-video provider.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::RunwayConfig;
use crate::error::{GeneratorError, GeneratorResult};
use crate::traits::{ClipRequest, SceneClipGenerator};

/// Clip lengths the API accepts.
pub const VALID_DURATIONS: [u32; 3] = [4, 6, 8];

/// Longest prompt the API accepts.
pub const MAX_PROMPT_CHARS: usize = 1000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TaskCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TaskState {
    status: String,
    #[serde(default)]
    output: Vec<String>,
    #[serde(default)]
    failure: Option<String>,
}

/// Submits a generation task, polls it to completion and downloads the clip.
pub struct RunwayClipGenerator {
    client: Client,
    api_key: String,
    config: RunwayConfig,
}

impl RunwayClipGenerator {
    /// Create a generator. Fails without an API key.
    pub fn new(config: RunwayConfig) -> GeneratorResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GeneratorError::config("RUNWAY_API_KEY not set"))?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("X-Runway-Version", &self.config.api_version)
    }

    async fn submit(&self, prompt: &str, duration: u32) -> GeneratorResult<String> {
        let body = json!({
            "model": self.config.model,
            "promptText": prompt,
            "ratio": self.config.ratio,
            "duration": duration,
        });
        let response = self
            .authed(self.client.post(self.url("/v1/text_to_video")))
            .json(&body)
            .send()
            .await?;
        let response = ensure_ok(response, "Runway API error").await?;
        let task: TaskCreated = response
            .json()
            .await
            .map_err(|e| GeneratorError::upstream(format!("Malformed Runway task response: {}", e)))?;
        Ok(task.id)
    }

    /// Poll until the task succeeds; returns the first output URL.
    async fn wait_for_output(&self, task_id: &str) -> GeneratorResult<String> {
        let mut waited = Duration::ZERO;
        while waited < self.config.poll_timeout {
            tokio::time::sleep(self.config.poll_interval).await;
            waited += self.config.poll_interval;

            let response = self
                .authed(self.client.get(self.url(&format!("/v1/tasks/{}", task_id))))
                .send()
                .await?;
            let response = ensure_ok(response, "Runway poll error").await?;
            let state: TaskState = response
                .json()
                .await
                .map_err(|e| GeneratorError::upstream(format!("Malformed Runway task state: {}", e)))?;
            debug!("Runway task {} status: {}", task_id, state.status);

            match state.status.as_str() {
                "SUCCEEDED" => {
                    return state.output.into_iter().next().ok_or_else(|| {
                        GeneratorError::upstream(format!("Runway task {} succeeded without output", task_id))
                    })
                }
                "FAILED" => {
                    return Err(GeneratorError::upstream(format!(
                        "Runway task failed: {}",
                        state.failure.as_deref().unwrap_or("unknown")
                    )))
                }
                _ => {}
            }
        }
        Err(GeneratorError::Timeout(self.config.poll_timeout.as_secs()))
    }

    async fn download(&self, url: &str, output: &Path) -> GeneratorResult<()> {
        let response = self.client.get(url).send().await?;
        let bytes = ensure_ok(response, "Runway download error").await?.bytes().await?;
        tokio::fs::write(output, &bytes).await?;
        Ok(())
    }
}

async fn ensure_ok(response: reqwest::Response, context: &str) -> GeneratorResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(500)
        .collect();
    Err(GeneratorError::upstream(format!("{} {}: {}", context, status.as_u16(), body)))
}

/// Nearest accepted duration; ties go to the shorter clip.
pub fn clamp_duration(requested: u32) -> u32 {
    VALID_DURATIONS
        .iter()
        .copied()
        .min_by_key(|d| d.abs_diff(requested))
        .unwrap_or(VALID_DURATIONS[0])
}

/// Prompt text: title, description and optional narration context.
pub fn build_prompt(request: &ClipRequest) -> String {
    let mut prompt = format!("{}: {}", request.title, request.description);
    if let Some(narration) = request.narration.as_deref().filter(|n| !n.is_empty()) {
        prompt.push_str(" Context: ");
        prompt.push_str(narration);
    }
    prompt.chars().take(MAX_PROMPT_CHARS).collect()
}

#[async_trait]
impl SceneClipGenerator for RunwayClipGenerator {
    async fn generate(&self, request: &ClipRequest, output: &Path) -> GeneratorResult<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let duration = clamp_duration(request.duration_secs);
        let task_id = self.submit(&build_prompt(request), duration).await?;
        info!("Runway task created: {} for '{}'", task_id, request.title);

        let url = self.wait_for_output(&task_id).await?;
        self.download(&url, output).await?;
        info!("Runway clip saved: {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer, timeout_ms: u64) -> RunwayClipGenerator {
        RunwayClipGenerator::new(RunwayConfig {
            api_key: Some("rw-key".into()),
            base_url: server.uri(),
            poll_interval: Duration::from_millis(10),
            poll_timeout: Duration::from_millis(timeout_ms),
            ..Default::default()
        })
        .unwrap()
    }

    fn request() -> ClipRequest {
        ClipRequest {
            title: "Cells".into(),
            description: "Microscope view of dividing cells".into(),
            narration: Some("Cells divide.".into()),
            duration_secs: 5,
        }
    }

    async fn mount_submit(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/text_to_video"))
            .and(header("X-Runway-Version", "2024-11-06"))
            .and(header("authorization", "Bearer rw-key"))
            .and(body_partial_json(json!({"model": "gen3a_turbo", "ratio": "1280:720", "duration": 4})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-1"})))
            .mount(server)
            .await;
    }

    #[test]
    fn test_clamp_duration() {
        assert_eq!(clamp_duration(1), 4);
        assert_eq!(clamp_duration(5), 4);
        assert_eq!(clamp_duration(6), 6);
        assert_eq!(clamp_duration(7), 6);
        assert_eq!(clamp_duration(30), 8);
    }

    #[test]
    fn test_prompt_capped() {
        let mut req = request();
        req.description = "x".repeat(2000);
        let prompt = build_prompt(&req);
        assert_eq!(prompt.chars().count(), MAX_PROMPT_CHARS);
        assert!(prompt.starts_with("Cells: xxx"));

        let mut req = request();
        req.narration = None;
        assert_eq!(build_prompt(&req), "Cells: Microscope view of dividing cells");
    }

    #[tokio::test]
    async fn test_polls_until_succeeded_and_downloads() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/task-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "RUNNING"})))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/task-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCEEDED",
                "output": [format!("{}/files/clip.mp4", server.uri())]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4 bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("clips").join("scene_000.mp4");
        generator(&server, 5_000).generate(&request(), &output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"mp4 bytes");
    }

    #[tokio::test]
    async fn test_failed_task_is_upstream_error() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/task-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "FAILED",
                "failure": "content moderation"
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = generator(&server, 5_000)
            .generate(&request(), &dir.path().join("c.mp4"))
            .await
            .unwrap_err();
        match err {
            GeneratorError::Upstream(msg) => assert!(msg.contains("content moderation")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_polling_is_bounded() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/task-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "PENDING"})))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = generator(&server, 50)
            .generate(&request(), &dir.path().join("c.mp4"))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_submit_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text_to_video"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad ratio"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = generator(&server, 50)
            .generate(&request(), &dir.path().join("c.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Upstream(_)));
    }
}
