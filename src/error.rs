//! Error handling for the provider adapter layer.
//!
//! Every failure a caller can see is a [`GeneratorError`]. Variants that come
//! from a backend carry the provider, model and (for the cloud gateway)
//! region they happened against, plus a remediation hint that tells the user
//! what to do next: which variable to set, which console to visit, which
//! command to run.
//!
//! # Error Categories
//!
//! - **Credentials** - a malformed bearer token, or no usable credentials at all
//! - **Selection** - no provider could be resolved from the caller and environment
//! - **Transport** - network or service failures, and unparseable backend payloads
//! - **Streaming** - a stream that completed without a single content event
//! - **Capability** - an operation the selected backend cannot perform
//! - **Daemon** - the local inference daemon never came up
//!
//! Only [`GeneratorError::DaemonStartup`] is fatal. Everything else is
//! recoverable by the caller, for example by switching provider.
//!
//! ```rust
//! use hive_llm::error::GeneratorError;
//! use hive_llm::llm::ProviderType;
//!
//! let error = GeneratorError::empty_stream(ProviderType::Bedrock, "amazon.nova-lite-v1:0");
//! assert!(!error.is_fatal());
//! assert_eq!(error.provider(), Some(ProviderType::Bedrock));
//! ```

use crate::llm::traits::ProviderType;
use thiserror::Error;

/// Boxed underlying cause kept for `Error::source` chains
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Main error type for the adapter layer
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// A bearer-token credential was present but could not be decoded
    #[error("Malformed credential in {variable}: {message}\n\n{remediation}")]
    CredentialFormat {
        variable: String,
        message: String,
        remediation: String,
    },

    /// The backend rejected the call and no explicit credentials were supplied
    #[error("No usable credentials for {} (model {model}{})\n\n{remediation}", provider_name(.provider), region_suffix(.region))]
    CredentialMissing {
        provider: ProviderType,
        model: String,
        region: Option<String>,
        remediation: String,
        source: Option<BoxError>,
    },

    /// The selector could not resolve any provider
    #[error("No LLM provider could be selected: {message}\n\n{remediation}")]
    InvalidProvider { message: String, remediation: String },

    /// Network, service or process-level failure talking to a backend
    #[error("{} API error: {message}\n\nModel: {model}{}\n\n{remediation}", provider_name(.provider), region_line(.region))]
    Transport {
        provider: ProviderType,
        model: String,
        region: Option<String>,
        message: String,
        remediation: String,
        /// Service error code reported by the backend (`ThrottlingException`)
        service_code: Option<String>,
        source: Option<BoxError>,
    },

    /// The backend answered with a payload that does not match its family
    #[error("Unexpected {} response for model {model}: {message}", provider_name(.provider))]
    MalformedResponse {
        provider: ProviderType,
        model: String,
        message: String,
    },

    /// A stream finished without delivering any content
    #[error("{} stream for model {model} completed without any content", provider_name(.provider))]
    EmptyStream { provider: ProviderType, model: String },

    /// The selected backend cannot perform this operation
    #[error("{feature} is not supported with {}. {hint}", provider_name(.provider))]
    NotSupported {
        feature: String,
        provider: ProviderType,
        hint: String,
    },

    /// The local daemon could not be reached after bounded retries
    #[error("Ollama at {base_url} did not become healthy after {attempts} attempts (model {model})\n\n{remediation}")]
    DaemonStartup {
        base_url: String,
        model: String,
        attempts: u32,
        remediation: String,
    },

    /// Settings could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

fn provider_name(provider: &ProviderType) -> &'static str {
    provider.display_name()
}

fn region_suffix(region: &Option<String>) -> String {
    region
        .as_ref()
        .map(|r| format!(", region {}", r))
        .unwrap_or_default()
}

fn region_line(region: &Option<String>) -> String {
    region
        .as_ref()
        .map(|r| format!("\nRegion: {}", r))
        .unwrap_or_default()
}

impl GeneratorError {
    /// Create a credential format error naming the offending variable
    pub fn credential_format(variable: impl Into<String>, message: impl Into<String>) -> Self {
        let variable = variable.into();
        let remediation = format!(
            "Set {} to the base64 bearer token issued by the AWS console, or unset it and export AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY instead.",
            variable
        );
        GeneratorError::CredentialFormat {
            variable,
            message: message.into(),
            remediation,
        }
    }

    /// Create a transport error with the provider's default remediation
    pub fn transport(
        provider: ProviderType,
        model: impl Into<String>,
        region: Option<String>,
        message: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        let model = model.into();
        let remediation = default_remediation(provider, &model);
        GeneratorError::Transport {
            provider,
            model,
            region,
            message: message.into(),
            remediation,
            service_code: None,
            source,
        }
    }

    /// Attach the backend's service error code to a transport error
    pub fn with_service_code(mut self, code: impl Into<String>) -> Self {
        if let GeneratorError::Transport { service_code, .. } = &mut self {
            *service_code = Some(code.into());
        }
        self
    }

    /// Create a malformed response error
    pub fn malformed(
        provider: ProviderType,
        model: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        GeneratorError::MalformedResponse {
            provider,
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create an empty stream error
    pub fn empty_stream(provider: ProviderType, model: impl Into<String>) -> Self {
        GeneratorError::EmptyStream {
            provider,
            model: model.into(),
        }
    }

    /// Embeddings are not available on the local daemon or cloud gateway families
    pub fn embedding_not_supported(provider: ProviderType) -> Self {
        let hint = match provider {
            ProviderType::Bedrock => {
                "Use a dedicated embedding model such as Amazon Titan Embeddings."
            }
            ProviderType::Ollama => {
                "Use a dedicated embedding model or a vendor-hosted API for embeddings."
            }
            _ => "Use a provider that exposes an embedding endpoint.",
        };
        GeneratorError::NotSupported {
            feature: "Embedding".to_string(),
            provider,
            hint: hint.to_string(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        GeneratorError::Configuration {
            message: message.into(),
        }
    }

    /// True only for the local daemon startup failure, which ends the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, GeneratorError::DaemonStartup { .. })
    }

    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            GeneratorError::CredentialFormat { .. } | GeneratorError::CredentialMissing { .. }
        )
    }

    /// Service error code, when the backend reported one
    pub fn service_code(&self) -> Option<&str> {
        match self {
            GeneratorError::Transport { service_code, .. } => service_code.as_deref(),
            _ => None,
        }
    }

    /// The backend refused the model itself: no access granted or unknown id
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self.service_code(),
            Some("AccessDeniedException" | "ResourceNotFoundException")
        )
    }

    /// Provider the error happened against, if any
    pub fn provider(&self) -> Option<ProviderType> {
        match self {
            GeneratorError::CredentialMissing { provider, .. }
            | GeneratorError::Transport { provider, .. }
            | GeneratorError::MalformedResponse { provider, .. }
            | GeneratorError::EmptyStream { provider, .. }
            | GeneratorError::NotSupported { provider, .. } => Some(*provider),
            GeneratorError::DaemonStartup { .. } => Some(ProviderType::Ollama),
            GeneratorError::CredentialFormat { .. } => Some(ProviderType::Bedrock),
            GeneratorError::InvalidProvider { .. } | GeneratorError::Configuration { .. } => None,
        }
    }

    /// Human-actionable hint, if the variant carries one
    pub fn remediation(&self) -> Option<&str> {
        match self {
            GeneratorError::CredentialFormat { remediation, .. }
            | GeneratorError::CredentialMissing { remediation, .. }
            | GeneratorError::InvalidProvider { remediation, .. }
            | GeneratorError::Transport { remediation, .. }
            | GeneratorError::DaemonStartup { remediation, .. } => Some(remediation),
            GeneratorError::NotSupported { hint, .. } => Some(hint),
            _ => None,
        }
    }
}

/// Troubleshooting text appended to transport failures
pub fn default_remediation(provider: ProviderType, model: &str) -> String {
    match provider {
        ProviderType::Bedrock => format!(
            "Troubleshooting:\n\
             1. Check AWS credentials are loaded (echo $AWS_ACCESS_KEY_ID)\n\
             2. Verify access to {} is enabled at https://console.aws.amazon.com/bedrock/\n\
             3. Try switching to Ollama (HIVECODE_USE_OLLAMA=true)",
            model
        ),
        ProviderType::Ollama => ollama_remediation(model),
        _ => "Check the provider's API key and model availability.".to_string(),
    }
}

/// Install, start and pull instructions for the local daemon
pub fn ollama_remediation(model: &str) -> String {
    format!(
        "To use Ollama:\n\
         1. Start the daemon: ollama serve\n\
         2. Pull the model: ollama pull {}\n\
         3. Install Ollama if needed: https://ollama.ai/download\n\
         Alternatively switch to AWS Bedrock (HIVECODE_USE_BEDROCK=true)",
        model
    )
}

impl From<crate::config::ConfigError> for GeneratorError {
    fn from(error: crate::config::ConfigError) -> Self {
        GeneratorError::configuration(error.to_string())
    }
}
