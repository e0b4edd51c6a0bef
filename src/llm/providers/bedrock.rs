//! AWS Bedrock provider implementation.
//!
//! [`BedrockGenerator`] owns request formatting, response parsing and
//! streaming for every Bedrock model family (Nova, Llama, OpenAI-chat,
//! Anthropic). The network boundary is the [`BedrockTransport`] trait;
//! [`SdkBedrockTransport`] implements it with the AWS SDK.

use crate::config::{BedrockSettings, EnvSnapshot};
use crate::error::{GeneratorError, Result};
use crate::llm::credentials::{obscure_credential, resolve_credentials, ResolvedCredentials};
use crate::llm::models::ModelCatalog;
use crate::llm::providers::wire::WireFamily;
use crate::llm::traits::{ChunkStream, ContentGenerator, HealthStatus, ProviderType, RawEventStream};
use crate::streaming::{reconstruct, strip_reasoning};
use crate::types::{GenerateResponse, GenerationParams, Message, Messages};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::types::ResponseStream;
use aws_sdk_bedrockruntime::Client as BedrockRuntimeClient;
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const BEDROCK_CONSOLE_URL: &str = "https://console.aws.amazon.com/bedrock/";

/// Model that needs no access approval, suggested when access is denied
pub const NO_APPROVAL_MODEL: &str = "amazon.nova-pro-v1:0";

/// Raw invoke boundary: JSON bytes in, JSON bytes (or JSON events) out
#[async_trait]
pub trait BedrockTransport: Send + Sync + std::fmt::Debug {
    /// Unary `InvokeModel`
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>>;

    /// `InvokeModelWithResponseStream`, one chunk payload per item
    async fn invoke_stream(&self, model_id: &str, body: Vec<u8>) -> Result<RawEventStream>;

    fn region(&self) -> &str;
}

/// AWS SDK transport with SDK retries capped at a single attempt
#[derive(Debug)]
pub struct SdkBedrockTransport {
    client: BedrockRuntimeClient,
    region: String,
    explicit_credentials: bool,
}

impl SdkBedrockTransport {
    /// Build the SDK client for the configured region, endpoint and credentials
    pub async fn connect(settings: &BedrockSettings, credentials: &ResolvedCredentials) -> Self {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()))
            .retry_config(aws_config::retry::RetryConfig::standard().with_max_attempts(1));

        if let ResolvedCredentials::Explicit(pair) = credentials {
            debug!(
                "🔑 Bedrock client using explicit credentials {}",
                obscure_credential(&pair.access_key_id)
            );
            config_loader = config_loader.credentials_provider(pair.to_sdk_credentials());
        }
        if let Some(endpoint_url) = &settings.endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint_url.clone());
        }

        let aws_config = config_loader.load().await;

        Self {
            client: BedrockRuntimeClient::new(&aws_config),
            region: settings.region.clone(),
            explicit_credentials: credentials.is_explicit(),
        }
    }

    /// Turn an SDK failure into a transport or credential error
    fn classify<E, R>(&self, model_id: &str, sdk_error: SdkError<E, R>) -> GeneratorError
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug + Send + Sync + 'static,
    {
        let (code, message) = match &sdk_error {
            SdkError::ServiceError(context) => {
                let service_error = context.err();
                (
                    service_error.code().unwrap_or("UnknownServiceError").to_string(),
                    service_error
                        .message()
                        .map(str::to_string)
                        .unwrap_or_else(|| service_error.to_string()),
                )
            }
            SdkError::ConstructionFailure(_) => (
                "ConstructionFailure".to_string(),
                DisplayErrorContext(&sdk_error).to_string(),
            ),
            SdkError::DispatchFailure(_) => (
                "DispatchFailure".to_string(),
                DisplayErrorContext(&sdk_error).to_string(),
            ),
            SdkError::TimeoutError(_) => (
                "TimeoutError".to_string(),
                DisplayErrorContext(&sdk_error).to_string(),
            ),
            SdkError::ResponseError(_) => (
                "ResponseError".to_string(),
                DisplayErrorContext(&sdk_error).to_string(),
            ),
            _ => ("SdkError".to_string(), DisplayErrorContext(&sdk_error).to_string()),
        };

        classify_failure(
            model_id,
            &self.region,
            self.explicit_credentials,
            &code,
            &message,
            Some(Box::new(sdk_error)),
        )
    }
}

/// Map an error code and message onto the error taxonomy
fn classify_failure(
    model_id: &str,
    region: &str,
    explicit_credentials: bool,
    code: &str,
    message: &str,
    source: Option<crate::error::BoxError>,
) -> GeneratorError {
    let lowered = message.to_ascii_lowercase();
    let credential_shaped = matches!(
        code,
        "UnrecognizedClientException" | "InvalidSignatureException" | "ExpiredTokenException"
    ) || lowered.contains("no credentials")
        || lowered.contains("failed to resolve identity")
        || lowered.contains("credentials provider");

    if credential_shaped && !explicit_credentials {
        return GeneratorError::CredentialMissing {
            provider: ProviderType::Bedrock,
            model: model_id.to_string(),
            region: Some(region.to_string()),
            remediation: "Export AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, set AWS_BEARER_TOKEN_BEDROCK, or configure an AWS profile.".to_string(),
            source,
        };
    }

    let detail = format!("{}: {}", code, message);
    if code == "AccessDeniedException" || code == "ResourceNotFoundException" {
        return GeneratorError::Transport {
            provider: ProviderType::Bedrock,
            model: model_id.to_string(),
            region: Some(region.to_string()),
            message: detail,
            remediation: access_remediation(model_id),
            service_code: Some(code.to_string()),
            source,
        };
    }

    GeneratorError::transport(
        ProviderType::Bedrock,
        model_id,
        Some(region.to_string()),
        detail,
        source,
    )
    .with_service_code(code)
}

/// Transport error for a failure after the stream was established
fn stream_failure<E, R>(model_id: &str, region: &str, sdk_error: SdkError<E, R>) -> GeneratorError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = format!("stream interrupted: {}", DisplayErrorContext(&sdk_error));
    let code = sdk_error.code().map(str::to_string);
    let error = GeneratorError::transport(
        ProviderType::Bedrock,
        model_id,
        Some(region.to_string()),
        message,
        Some(Box::new(sdk_error)),
    );
    match code {
        Some(code) => error.with_service_code(code),
        None => error,
    }
}

fn access_remediation(model_id: &str) -> String {
    format!(
        "Request access to {} at {}\nOr switch to a model that needs no approval: export BEDROCK_MODEL=\"{}\"",
        model_id, BEDROCK_CONSOLE_URL, NO_APPROVAL_MODEL
    )
}

#[async_trait]
impl BedrockTransport for SdkBedrockTransport {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| self.classify(model_id, e))?;

        Ok(response.body().as_ref().to_vec())
    }

    async fn invoke_stream(&self, model_id: &str, body: Vec<u8>) -> Result<RawEventStream> {
        let response = self
            .client
            .invoke_model_with_response_stream()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| self.classify(model_id, e))?;

        let model = model_id.to_string();
        let region = self.region.clone();
        let mut receiver = response.body;

        let events = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(Some(ResponseStream::Chunk(part))) => {
                        if let Some(bytes) = part.bytes() {
                            yield Ok(bytes.as_ref().to_vec());
                        }
                    }
                    Ok(Some(other)) => {
                        tracing::trace!("🌊 Unhandled Bedrock stream event: {:?}", other);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(stream_failure(&model, &region, e));
                        break;
                    }
                }
            }
        };

        Ok(Box::new(events.boxed()))
    }

    fn region(&self) -> &str {
        &self.region
    }
}

/// Outcome of the advisory model-access probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessCheck {
    Verified,
    Denied { message: String },
    Failed { message: String },
}

/// Result of [`BedrockGenerator::check_connection`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    /// Whether the model appears in the gateway's text model listing
    pub listed: bool,
    pub access: AccessCheck,
}

/// AWS Bedrock content generator for a single model
#[derive(Debug, Clone)]
pub struct BedrockGenerator {
    transport: Arc<dyn BedrockTransport>,
    model_id: String,
    family: WireFamily,
}

impl BedrockGenerator {
    /// Create a generator over any transport
    pub fn new(transport: Arc<dyn BedrockTransport>, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        let family = WireFamily::for_bedrock_model(&model_id);
        Self {
            transport,
            model_id,
            family,
        }
    }

    /// Resolve credentials, build the SDK client and, when enabled, schedule
    /// the advisory access check. Never blocks on the network.
    pub async fn connect(settings: &BedrockSettings, model_id: &str, env: &EnvSnapshot) -> Result<Self> {
        let credentials = resolve_credentials(env)?;
        let transport = SdkBedrockTransport::connect(settings, &credentials).await;
        let generator = Self::new(Arc::new(transport), model_id);

        info!(
            "🌟 Bedrock initialized for {} in {} ({} format); credentials are validated on first request",
            generator.model_id,
            settings.region,
            generator.family.name()
        );

        if settings.verify_model_access {
            generator.spawn_access_verification(settings.verify_delay);
        }

        Ok(generator)
    }

    pub fn family(&self) -> WireFamily {
        self.family
    }

    pub fn region(&self) -> &str {
        self.transport.region()
    }

    /// Run [`verify_model_access`](Self::verify_model_access) on a background
    /// task after `delay`. The result is only logged.
    pub fn spawn_access_verification(&self, delay: Duration) -> tokio::task::JoinHandle<AccessCheck> {
        let generator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            generator.verify_model_access().await
        })
    }

    /// Stream a tiny prompt and report whether the first chunk arrives
    pub async fn verify_model_access(&self) -> AccessCheck {
        debug!("🔍 Verifying Bedrock model access for {}", self.model_id);
        let messages = Messages::from(vec![Message::user("test")]);
        let params = GenerationParams::default()
            .with_temperature(0.1)
            .with_max_output_tokens(5);

        let first = match self.generate_content_stream(&messages, &params).await {
            Ok(mut stream) => stream.next().await,
            Err(e) => Some(Err(e)),
        };

        match first {
            Some(Ok(_)) => {
                info!("✅ Model access verified: {}", self.model_id);
                AccessCheck::Verified
            }
            Some(Err(e)) => {
                let message = e.to_string();
                error!("❌ Model access check failed for {}: {}", self.model_id, message);
                if e.is_access_denied() {
                    warn!(
                        "🔑 Request model access at {} or switch models: export BEDROCK_MODEL=\"{}\"",
                        BEDROCK_CONSOLE_URL, NO_APPROVAL_MODEL
                    );
                    AccessCheck::Denied { message }
                } else {
                    AccessCheck::Failed { message }
                }
            }
            None => {
                let message = "stream ended before the first chunk".to_string();
                warn!("⚠️ Model access check for {}: {}", self.model_id, message);
                AccessCheck::Failed { message }
            }
        }
    }

    /// Listing lookup plus an access probe
    pub async fn check_connection(&self, catalog: &ModelCatalog) -> ConnectionReport {
        let listed = catalog
            .bedrock_models()
            .iter()
            .any(|m| m.model_id == self.model_id && m.supports_text())
            || catalog.provider_for(&self.model_id) == Some(ProviderType::Bedrock);
        ConnectionReport {
            listed,
            access: self.verify_model_access().await,
        }
    }

    fn request_bytes(&self, messages: &Messages, params: &GenerationParams, streaming: bool) -> Result<Vec<u8>> {
        let body = self
            .family
            .translate_request(&self.model_id, messages, params, streaming);
        serde_json::to_vec(&body).map_err(|e| {
            GeneratorError::malformed(
                ProviderType::Bedrock,
                self.model_id.clone(),
                format!("failed to encode request: {}", e),
            )
        })
    }
}

#[async_trait]
impl ContentGenerator for BedrockGenerator {
    async fn generate_content(
        &self,
        messages: &Messages,
        params: &GenerationParams,
    ) -> Result<GenerateResponse> {
        let operation_id = Uuid::new_v4();
        let start_time = Instant::now();
        let body = self.request_bytes(messages, params, false)?;

        info!(
            "[{}] 🚀 Bedrock {} request to {} ({} bytes)",
            operation_id,
            self.family.name(),
            self.model_id,
            body.len()
        );

        let raw = self.transport.invoke(&self.model_id, body).await?;
        let mut response = self.family.parse_unary(&raw).map_err(|e| {
            GeneratorError::malformed(ProviderType::Bedrock, self.model_id.clone(), e.to_string())
        })?;
        response.text = strip_reasoning(&response.text);

        info!(
            "[{}] ✅ Bedrock call completed in {:.2}s ({})",
            operation_id,
            start_time.elapsed().as_secs_f64(),
            response.finish_reason
        );
        Ok(response)
    }

    async fn generate_content_stream(
        &self,
        messages: &Messages,
        params: &GenerationParams,
    ) -> Result<ChunkStream> {
        let body = self.request_bytes(messages, params, true)?;
        info!(
            "🌊 Bedrock {} streaming request to {} ({} bytes)",
            self.family.name(),
            self.model_id,
            body.len()
        );

        let raw = self.transport.invoke_stream(&self.model_id, body).await?;
        Ok(reconstruct(
            raw,
            self.family,
            ProviderType::Bedrock,
            self.model_id.clone(),
        ))
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        let start_time = Instant::now();
        let access = self.verify_model_access().await;
        let error = match &access {
            AccessCheck::Verified => None,
            AccessCheck::Denied { message } | AccessCheck::Failed { message } => Some(message.clone()),
        };
        Ok(HealthStatus {
            healthy: error.is_none(),
            provider: ProviderType::Bedrock,
            latency_ms: Some(start_time.elapsed().as_millis() as u64),
            error,
        })
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Bedrock
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
