//! Generator facade.
//!
//! [`Generator`] is what callers hold. It owns exactly one backend generator
//! chosen by the [`ProviderSelector`], remembers the selection, and logs each
//! request and response.

use crate::error::{GeneratorError, Result};
use crate::llm::providers::{BedrockGenerator, DaemonLauncher, OllamaGenerator, OllamaServeLauncher};
use crate::llm::registry::{ProviderSelection, ProviderSelector};
use crate::llm::traits::{ChunkStream, ContentGenerator, HealthStatus, ProviderType};
use crate::types::{GenerateResponse, GenerationParams, Messages, TokenCount};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Public facade over one backend generator
#[derive(Debug)]
pub struct Generator {
    inner: Box<dyn ContentGenerator>,
    selection: ProviderSelection,
}

impl Generator {
    /// Wrap an already-built backend, e.g. a host-provided vendor client
    pub fn from_parts(inner: Box<dyn ContentGenerator>, selection: ProviderSelection) -> Self {
        Self { inner, selection }
    }

    /// Resolve a provider and build its generator, spawning `ollama serve`
    /// when the local daemon is not running
    pub async fn connect(
        selector: &ProviderSelector,
        explicit: Option<ProviderType>,
        hint: Option<&str>,
    ) -> Result<Self> {
        Self::connect_with_launcher(selector, explicit, hint, &OllamaServeLauncher::default()).await
    }

    /// [`connect`](Self::connect) with a custom daemon launcher
    pub async fn connect_with_launcher(
        selector: &ProviderSelector,
        explicit: Option<ProviderType>,
        hint: Option<&str>,
        launcher: &dyn DaemonLauncher,
    ) -> Result<Self> {
        let selection = selector.resolve(explicit, hint).into_result()?;
        let settings = selector.settings();

        let inner: Box<dyn ContentGenerator> = match (selection.provider, selection.model.as_deref()) {
            (ProviderType::Bedrock, Some(model)) => {
                Box::new(BedrockGenerator::connect(&settings.bedrock, model, selector.env()).await?)
            }
            (ProviderType::Ollama, Some(model)) => {
                Box::new(OllamaGenerator::connect(&settings.ollama, model, launcher).await?)
            }
            (provider, _) => {
                return Err(GeneratorError::NotSupported {
                    feature: "Built-in client".to_string(),
                    provider,
                    hint: "Build the vendor client in the host and wrap it with Generator::from_parts.".to_string(),
                })
            }
        };

        info!(
            "✅ Generator ready: {} / {} ({:?})",
            selection.provider.display_name(),
            inner.model_id(),
            selection.rule
        );
        Ok(Self::from_parts(inner, selection))
    }

    /// Like [`connect`](Self::connect), but a daemon startup failure prints
    /// its remediation and ends the process with status 1
    pub async fn connect_or_exit(
        selector: &ProviderSelector,
        explicit: Option<ProviderType>,
        hint: Option<&str>,
    ) -> Result<Self> {
        match Self::connect(selector, explicit, hint).await {
            Err(e) if e.is_fatal() => {
                error!("❌ {}", e);
                eprintln!("{}", e);
                if let Some(remediation) = e.remediation() {
                    eprintln!("\n{}", remediation);
                }
                std::process::exit(1);
            }
            other => other,
        }
    }

    pub fn selection(&self) -> &ProviderSelection {
        &self.selection
    }
}

#[async_trait]
impl ContentGenerator for Generator {
    async fn generate_content(
        &self,
        messages: &Messages,
        params: &GenerationParams,
    ) -> Result<GenerateResponse> {
        let operation_id = Uuid::new_v4();
        let start_time = Instant::now();
        debug!(
            "[{}] 📤 generate: {} messages to {}",
            operation_id,
            messages.len(),
            self.inner.model_id()
        );

        match self.inner.generate_content(messages, params).await {
            Ok(response) => {
                debug!(
                    "[{}] 📥 {} chars, finish {} in {:.2}s",
                    operation_id,
                    response.text.len(),
                    response.finish_reason,
                    start_time.elapsed().as_secs_f64()
                );
                Ok(response)
            }
            Err(e) => {
                error!("[{}] ❌ generate failed: {}", operation_id, e);
                Err(e)
            }
        }
    }

    async fn generate_content_stream(
        &self,
        messages: &Messages,
        params: &GenerationParams,
    ) -> Result<ChunkStream> {
        let operation_id = Uuid::new_v4();
        debug!(
            "[{}] 📤 stream: {} messages to {}",
            operation_id,
            messages.len(),
            self.inner.model_id()
        );

        let stream = self
            .inner
            .generate_content_stream(messages, params)
            .await
            .inspect_err(|e| error!("[{}] ❌ stream failed to start: {}", operation_id, e))?;

        let logged = stream.inspect(move |item| match item {
            Ok(chunk) if chunk.finish_reason.is_some() => {
                debug!("[{}] 📥 stream finished: {:?}", operation_id, chunk.finish_reason)
            }
            Ok(_) => {}
            Err(e) => error!("[{}] ❌ stream error: {}", operation_id, e),
        });
        Ok(Box::new(logged))
    }

    async fn count_tokens(&self, messages: &Messages) -> Result<TokenCount> {
        self.inner.count_tokens(messages).await
    }

    async fn embed_content(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.inner.embed_content(texts).await
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        self.inner.health_check().await
    }

    fn provider_type(&self) -> ProviderType {
        self.inner.provider_type()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::registry::SelectionRule;
    use crate::types::{Message, StreamChunk};

    #[derive(Debug)]
    struct CannedGenerator;

    #[async_trait]
    impl ContentGenerator for CannedGenerator {
        async fn generate_content(&self, _: &Messages, _: &GenerationParams) -> Result<GenerateResponse> {
            Ok(GenerateResponse {
                text: "canned".to_string(),
                finish_reason: Default::default(),
                usage: None,
            })
        }

        async fn generate_content_stream(&self, _: &Messages, _: &GenerationParams) -> Result<ChunkStream> {
            let chunks: Vec<Result<StreamChunk>> = vec![Ok(StreamChunk::text("can")), Ok(StreamChunk::text("ned"))];
            Ok(Box::new(futures::stream::iter(chunks)))
        }

        async fn health_check(&self) -> Result<HealthStatus> {
            Ok(HealthStatus {
                healthy: true,
                provider: ProviderType::Gemini,
                latency_ms: None,
                error: None,
            })
        }

        fn provider_type(&self) -> ProviderType {
            ProviderType::Gemini
        }

        fn model_id(&self) -> &str {
            "gemini-2.5-pro"
        }
    }

    fn facade() -> Generator {
        Generator::from_parts(
            Box::new(CannedGenerator),
            ProviderSelection {
                provider: ProviderType::Gemini,
                model: Some("gemini-2.5-pro".to_string()),
                rule: SelectionRule::VendorMode,
            },
        )
    }

    #[tokio::test]
    async fn test_facade_delegates() {
        let generator = facade();
        let messages = Messages::from(vec![Message::user("hello there")]);

        let response = generator
            .generate_content(&messages, &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(response.text, "canned");

        let text: String = generator
            .generate_content_stream(&messages, &GenerationParams::default())
            .await
            .unwrap()
            .map(|c| c.unwrap().text)
            .collect()
            .await;
        assert_eq!(text, "canned");
        assert_eq!(generator.model_id(), "gemini-2.5-pro");
        assert_eq!(generator.selection().rule, SelectionRule::VendorMode);
    }

    #[tokio::test]
    async fn test_token_count_is_quarter_of_serialized_length() {
        let generator = facade();
        let messages = Messages::from(vec![Message::user("hello there")]);
        let expected = serde_json::to_string(&messages).unwrap().chars().count().div_ceil(4) as u32;
        let count = generator.count_tokens(&messages).await.unwrap();
        assert_eq!(count.total_tokens, expected);
    }

    #[tokio::test]
    async fn test_unresolved_selection_is_invalid_provider() {
        let selector = ProviderSelector::new(
            crate::llm::models::ModelCatalog::builtin(),
            Default::default(),
            Default::default(),
        );
        let error = Generator::connect(&selector, None, None).await.unwrap_err();
        assert!(matches!(error, GeneratorError::InvalidProvider { .. }));
    }
}
