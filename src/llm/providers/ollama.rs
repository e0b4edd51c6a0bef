//! Ollama provider implementation.
//!
//! [`OllamaClient`] speaks the daemon's REST contract (`/api/generate`,
//! `/api/tags`, `/api/pull`). [`OllamaGenerator`] layers the canonical
//! generate/stream surface on top of it using the shared wire family and
//! stream reconstructor.

use crate::config::OllamaSettings;
use crate::error::{GeneratorError, Result};
use crate::llm::providers::daemon::{DaemonLauncher, DaemonSupervisor};
use crate::llm::providers::wire::WireFamily;
use crate::llm::traits::{ChunkStream, ContentGenerator, HealthStatus, ProviderType, RawEventStream};
use crate::streaming::{reconstruct, strip_reasoning};
use crate::types::{GenerateResponse, GenerationParams, Messages};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One entry of `GET /api/tags`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

/// One progress line of `POST /api/pull`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PullProgress {
    pub status: String,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
}

impl PullProgress {
    /// `"<status> - NN% (x.xMB / y.yMB)"` when byte counts are known, else the status
    pub fn describe(&self) -> String {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) if total > 0 => {
                let percent = (completed as f64 / total as f64 * 100.0).round() as u64;
                format!(
                    "{} - {}% ({:.1}MB / {:.1}MB)",
                    self.status,
                    percent,
                    completed as f64 / 1_048_576.0,
                    total as f64 / 1_048_576.0
                )
            }
            _ => self.status.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// HTTP client for a single Ollama daemon
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, model: &str, message: impl Into<String>, source: Option<reqwest::Error>) -> GeneratorError {
        GeneratorError::transport(
            ProviderType::Ollama,
            model,
            None,
            message,
            source.map(|e| Box::new(e) as crate::error::BoxError),
        )
    }

    async fn post_json(&self, path: &str, model: &str, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                self.transport_error(model, format!("request to {} failed: {}", self.base_url, e), Some(e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(self.transport_error(model, format!("HTTP {}: {}", status, error_text), None));
        }
        Ok(response)
    }

    /// Health probe: true when `GET /api/tags` answers with a success status
    pub async fn is_healthy(&self) -> bool {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("🔄 Ollama health probe failed: {}", e);
                false
            }
        }
    }

    pub async fn list_models(&self) -> Result<Vec<OllamaModel>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| self.transport_error("", format!("failed to list models: {}", e), Some(e)))?;
        if !response.status().is_success() {
            return Err(self.transport_error("", format!("HTTP {} listing models", response.status()), None));
        }
        let tags: TagsResponse = response.json().await.map_err(|e| {
            GeneratorError::malformed(ProviderType::Ollama, "", format!("invalid tags response: {}", e))
        })?;
        Ok(tags.models)
    }

    /// Whether the daemon has `name` locally; a bare name matches its `:latest` tag
    pub async fn has_model(&self, name: &str) -> Result<bool> {
        let latest = format!("{}:latest", name);
        Ok(self
            .list_models()
            .await?
            .iter()
            .any(|m| m.name == name || m.name == latest))
    }

    /// Unary `POST /api/generate`, returning the raw body
    pub async fn generate(&self, model: &str, body: &Value) -> Result<Vec<u8>> {
        let response = self.post_json("/api/generate", model, body).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(model, format!("failed to read response: {}", e), Some(e)))?;
        Ok(bytes.to_vec())
    }

    /// Streaming `POST /api/generate`, one NDJSON line per item
    pub async fn generate_stream(&self, model: &str, body: &Value) -> Result<RawEventStream> {
        let response = self.post_json("/api/generate", model, body).await?;
        let model = model.to_string();
        let base_url = self.base_url.clone();
        let bytes = response.bytes_stream().map(move |chunk| {
            chunk.map(|b| b.to_vec()).map_err(|e| {
                GeneratorError::transport(
                    ProviderType::Ollama,
                    model.clone(),
                    None,
                    format!("stream from {} interrupted: {}", base_url, e),
                    Some(Box::new(e)),
                )
            })
        });
        Ok(Box::new(ndjson_lines(bytes).boxed()))
    }

    /// `POST /api/pull` with progress reporting.
    ///
    /// Malformed progress lines are skipped. If the daemon never reports
    /// `success`, a final success report is emitted once the stream ends.
    pub async fn pull_model<F>(&self, name: &str, mut on_progress: F) -> Result<()>
    where
        F: FnMut(&PullProgress),
    {
        info!("📥 Pulling Ollama model {}", name);
        let response = self
            .post_json("/api/pull", name, &json!({ "name": name, "stream": true }))
            .await?;

        let name_owned = name.to_string();
        let bytes = response.bytes_stream().map(move |chunk| {
            chunk.map(|b| b.to_vec()).map_err(|e| {
                GeneratorError::transport(
                    ProviderType::Ollama,
                    name_owned.clone(),
                    None,
                    format!("pull interrupted: {}", e),
                    Some(Box::new(e)),
                )
            })
        });
        let mut lines = Box::pin(ndjson_lines(bytes));
        let mut succeeded = false;

        while let Some(line) = lines.next().await {
            let line = line?;
            let value: Value = match serde_json::from_slice(&line) {
                Ok(value) => value,
                Err(e) => {
                    debug!("📥 Skipping malformed pull line: {}", e);
                    continue;
                }
            };
            if let Some(error) = value.get("error").and_then(Value::as_str) {
                return Err(self.transport_error(name, format!("pull failed: {}", error), None));
            }
            match serde_json::from_value::<PullProgress>(value) {
                Ok(progress) => {
                    succeeded |= progress.is_success();
                    debug!("📥 {}", progress.describe());
                    on_progress(&progress);
                }
                Err(e) => debug!("📥 Skipping pull line without status: {}", e),
            }
        }

        if !succeeded {
            on_progress(&PullProgress {
                status: "success".to_string(),
                ..Default::default()
            });
        }
        info!("✅ Pulled Ollama model {}", name);
        Ok(())
    }
}

/// Split a byte stream into non-blank newline-delimited lines
fn ndjson_lines<S>(bytes: S) -> impl Stream<Item = Result<Vec<u8>>> + Send
where
    S: Stream<Item = Result<Vec<u8>>> + Send + 'static,
{
    async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    buffer.extend_from_slice(&chunk);
                    while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buffer.drain(..=newline).collect();
                        let line = line.trim_ascii();
                        if !line.is_empty() {
                            yield Ok(line.to_vec());
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        let rest = buffer.trim_ascii();
        if !rest.is_empty() {
            yield Ok(rest.to_vec());
        }
    }
}

/// Ollama content generator for a single model
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Make sure the daemon answers (spawning it if allowed), then check that
    /// the model is present. A missing model is logged, or pulled when
    /// `auto_pull` is set.
    pub async fn connect(
        settings: &OllamaSettings,
        model: &str,
        launcher: &dyn DaemonLauncher,
    ) -> Result<Self> {
        let client = OllamaClient::new(settings.base_url.clone());
        let mut supervisor = DaemonSupervisor::new(client.clone(), settings);
        supervisor.ensure_running(model, launcher).await?;

        let generator = Self::new(client, model);
        generator.check_model(settings.auto_pull).await;

        info!("🦙 Ollama initialized for {} at {}", model, settings.base_url);
        Ok(generator)
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    async fn check_model(&self, auto_pull: bool) {
        match self.client.has_model(&self.model).await {
            Ok(true) => debug!("🦙 Model {} is available", self.model),
            Ok(false) if auto_pull => {
                if let Err(e) = self
                    .client
                    .pull_model(&self.model, |p| info!("📥 {}", p.describe()))
                    .await
                {
                    warn!("⚠️ Auto-pull of {} failed: {}", self.model, e);
                }
            }
            Ok(false) => warn!(
                "⚠️ Model {} not found locally. Run: ollama pull {}",
                self.model, self.model
            ),
            Err(e) => warn!("⚠️ Could not list Ollama models: {}", e),
        }
    }

    fn request(&self, messages: &Messages, params: &GenerationParams, streaming: bool) -> Value {
        WireFamily::OllamaGenerate.translate_request(&self.model, messages, params, streaming)
    }
}

#[async_trait]
impl ContentGenerator for OllamaGenerator {
    async fn generate_content(
        &self,
        messages: &Messages,
        params: &GenerationParams,
    ) -> Result<GenerateResponse> {
        let operation_id = Uuid::new_v4();
        let start_time = Instant::now();
        info!("[{}] 🚀 Ollama request to {}", operation_id, self.model);

        let body = self.request(messages, params, false);
        let raw = self.client.generate(&self.model, &body).await?;
        let mut response = WireFamily::OllamaGenerate
            .parse_unary(&raw)
            .map_err(|e| GeneratorError::malformed(ProviderType::Ollama, self.model.clone(), e.to_string()))?;
        response.text = strip_reasoning(&response.text);

        info!(
            "[{}] ✅ Ollama call completed in {:.2}s",
            operation_id,
            start_time.elapsed().as_secs_f64()
        );
        Ok(response)
    }

    async fn generate_content_stream(
        &self,
        messages: &Messages,
        params: &GenerationParams,
    ) -> Result<ChunkStream> {
        info!("🌊 Ollama streaming request to {}", self.model);
        let body = self.request(messages, params, true);
        let raw = self.client.generate_stream(&self.model, &body).await?;
        Ok(reconstruct(
            raw,
            WireFamily::OllamaGenerate,
            ProviderType::Ollama,
            self.model.clone(),
        ))
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        let start = Instant::now();
        let healthy = self.client.is_healthy().await;
        Ok(HealthStatus {
            healthy,
            provider: ProviderType::Ollama,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: (!healthy).then(|| format!("Ollama not reachable at {}", self.client.base_url())),
        })
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_progress_describe() {
        let progress = PullProgress {
            status: "pulling manifest".to_string(),
            total: None,
            completed: None,
        };
        assert_eq!(progress.describe(), "pulling manifest");

        let progress = PullProgress {
            status: "downloading".to_string(),
            total: Some(2 * 1_048_576),
            completed: Some(1_048_576),
        };
        assert_eq!(progress.describe(), "downloading - 50% (1.0MB / 2.0MB)");
    }

    #[tokio::test]
    async fn test_ndjson_lines_split_across_chunks() {
        let chunks: Vec<Result<Vec<u8>>> = vec![
            Ok(b"{\"a\":1}\n{\"b\"".to_vec()),
            Ok(b":2}\n\n".to_vec()),
            Ok(b"{\"c\":3}".to_vec()),
        ];
        let lines: Vec<Vec<u8>> = ndjson_lines(futures::stream::iter(chunks))
            .map(|l| l.unwrap())
            .collect()
            .await;
        assert_eq!(
            lines,
            vec![b"{\"a\":1}".to_vec(), b"{\"b\":2}".to_vec(), b"{\"c\":3}".to_vec()]
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.url("/api/tags"), "http://localhost:11434/api/tags");
    }

    #[tokio::test]
    async fn test_embedding_not_supported() {
        let generator = OllamaGenerator::new(OllamaClient::new("http://localhost:1"), "llama3.2:1b");
        let error = generator.embed_content(&[]).await.unwrap_err();
        assert!(matches!(
            error,
            GeneratorError::NotSupported {
                provider: ProviderType::Ollama,
                ..
            }
        ));
    }
}
