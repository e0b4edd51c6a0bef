//! Provider configuration
//!
//! Settings for the cloud gateway (AWS Bedrock) and the local daemon (Ollama),
//! loadable from a TOML, YAML or JSON file and overridable from environment
//! variables. The environment is read exactly once into an [`EnvSnapshot`];
//! everything downstream works from that immutable copy.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, fs, path::Path, time::Duration};
use thiserror::Error;

pub const HIVECODE_USE_BEDROCK: &str = "HIVECODE_USE_BEDROCK";
pub const HIVECODE_USE_OLLAMA: &str = "HIVECODE_USE_OLLAMA";
pub const BEDROCK_MODEL: &str = "BEDROCK_MODEL";
pub const BEDROCK_REGION: &str = "BEDROCK_REGION";
pub const BEDROCK_ENDPOINT_URL: &str = "BEDROCK_ENDPOINT_URL";
pub const BEDROCK_VERIFY_MODEL_ACCESS: &str = "BEDROCK_VERIFY_MODEL_ACCESS";
pub const OLLAMA_MODEL: &str = "OLLAMA_MODEL";
pub const OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
pub const OLLAMA_START_ATTEMPTS: &str = "OLLAMA_START_ATTEMPTS";
pub const AWS_BEARER_TOKEN_BEDROCK: &str = "AWS_BEARER_TOKEN_BEDROCK";
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
pub const GOOGLE_CLOUD_LOCATION: &str = "GOOGLE_CLOUD_LOCATION";

/// Every variable this crate reads
pub const KNOWN_VARIABLES: &[&str] = &[
    HIVECODE_USE_BEDROCK,
    HIVECODE_USE_OLLAMA,
    BEDROCK_MODEL,
    BEDROCK_REGION,
    BEDROCK_ENDPOINT_URL,
    BEDROCK_VERIFY_MODEL_ACCESS,
    OLLAMA_MODEL,
    OLLAMA_BASE_URL,
    OLLAMA_START_ATTEMPTS,
    AWS_BEARER_TOKEN_BEDROCK,
    AWS_ACCESS_KEY_ID,
    AWS_SECRET_ACCESS_KEY,
    AWS_SESSION_TOKEN,
    GEMINI_API_KEY,
    GOOGLE_API_KEY,
    GOOGLE_CLOUD_PROJECT,
    GOOGLE_CLOUD_LOCATION,
];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable parsing error: {0}")]
    EnvVarParse(String),
    #[error("File parsing error: {0}")]
    FileParse(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable copy of the environment variables this crate cares about.
///
/// Empty values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Read [`KNOWN_VARIABLES`] from the process environment
    pub fn capture() -> Self {
        Self::from_pairs(
            KNOWN_VARIABLES
                .iter()
                .filter_map(|name| env::var(name).ok().map(|value| (*name, value))),
        )
    }

    /// Build a snapshot from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(_, v)| !v.is_empty())
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Boolean flag: only the literal `"true"` enables it
    pub fn flag(&self, name: &str) -> bool {
        self.get(name) == Some("true")
    }
}

/// Complete provider configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// AWS Bedrock configuration
    #[serde(default)]
    pub bedrock: BedrockSettings,
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaSettings,
    /// Provider enable flags
    #[serde(default)]
    pub flags: ProviderFlags,
}

/// AWS Bedrock configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedrockSettings {
    /// Default model when none is detected from a hint
    #[serde(default = "default_bedrock_model")]
    pub model: String,
    /// AWS region for the runtime endpoint
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for testing)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Run the advisory model-access check after connecting
    #[serde(default = "default_true")]
    pub verify_model_access: bool,
    /// Delay before the advisory check starts
    #[serde(with = "duration_millis", default = "default_verify_delay")]
    pub verify_delay: Duration,
}

/// Ollama configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaSettings {
    /// Default model when none is detected from a hint
    #[serde(default = "default_ollama_model")]
    pub model: String,
    /// Daemon base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Spawn `ollama serve` when the daemon is not reachable
    #[serde(default = "default_true")]
    pub auto_start: bool,
    /// Pull the model when the daemon does not have it
    #[serde(default)]
    pub auto_pull: bool,
    /// Interval between health probes while waiting for the daemon
    #[serde(with = "duration_millis", default = "default_poll_interval")]
    pub poll_interval: Duration,
    /// Health probes before giving up
    #[serde(default = "default_start_attempts")]
    pub max_start_attempts: u32,
}

/// Legacy provider enable flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFlags {
    #[serde(default)]
    pub use_bedrock: bool,
    #[serde(default)]
    pub use_ollama: bool,
}

impl Default for BedrockSettings {
    fn default() -> Self {
        Self {
            model: default_bedrock_model(),
            region: default_region(),
            endpoint_url: None,
            verify_model_access: true,
            verify_delay: default_verify_delay(),
        }
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            model: default_ollama_model(),
            base_url: default_base_url(),
            auto_start: true,
            auto_pull: false,
            poll_interval: default_poll_interval(),
            max_start_attempts: default_start_attempts(),
        }
    }
}

impl ProviderSettings {
    /// Load configuration from a file (supports TOML, YAML, JSON)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let extension = path.extension().and_then(|s| s.to_str());

        match extension {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| ConfigError::FileParse(e.to_string()))
            }
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| ConfigError::FileParse(e.to_string()))
            }
            _ => Err(ConfigError::FileParse(
                "Unsupported file format. Use .toml, .yaml, .yml, or .json".to_string(),
            )),
        }
    }

    /// Load configuration from an environment snapshot
    pub fn from_env(env: &EnvSnapshot) -> Result<Self, ConfigError> {
        Self::default().merge_with_env(env)
    }

    /// Apply environment overrides (environment takes precedence)
    pub fn merge_with_env(mut self, env: &EnvSnapshot) -> Result<Self, ConfigError> {
        if env.has(HIVECODE_USE_BEDROCK) {
            self.flags.use_bedrock = env.flag(HIVECODE_USE_BEDROCK);
        }
        if env.has(HIVECODE_USE_OLLAMA) {
            self.flags.use_ollama = env.flag(HIVECODE_USE_OLLAMA);
        }

        if let Some(model) = env.get(BEDROCK_MODEL) {
            self.bedrock.model = model.to_string();
        }
        if let Some(region) = env.get(BEDROCK_REGION) {
            self.bedrock.region = region.to_string();
        }
        if let Some(endpoint) = env.get(BEDROCK_ENDPOINT_URL) {
            self.bedrock.endpoint_url = Some(endpoint.to_string());
        }
        if let Some(verify) = env.get(BEDROCK_VERIFY_MODEL_ACCESS) {
            self.bedrock.verify_model_access = verify != "false";
        }

        if let Some(model) = env.get(OLLAMA_MODEL) {
            self.ollama.model = model.to_string();
        }
        if let Some(base_url) = env.get(OLLAMA_BASE_URL) {
            self.ollama.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(attempts) = env.get(OLLAMA_START_ATTEMPTS) {
            self.ollama.max_start_attempts = attempts
                .parse()
                .map_err(|e| ConfigError::EnvVarParse(format!("{}: {}", OLLAMA_START_ATTEMPTS, e)))?;
        }

        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bedrock.region.is_empty() {
            return Err(ConfigError::Validation(
                "Bedrock region cannot be empty".to_string(),
            ));
        }
        if self.bedrock.model.is_empty() {
            return Err(ConfigError::Validation(
                "Bedrock model cannot be empty".to_string(),
            ));
        }
        if self.ollama.model.is_empty() {
            return Err(ConfigError::Validation(
                "Ollama model cannot be empty".to_string(),
            ));
        }
        if !self.ollama.base_url.starts_with("http://") && !self.ollama.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "Ollama base URL must start with http:// or https://, got '{}'",
                self.ollama.base_url
            )));
        }
        if self.ollama.max_start_attempts == 0 {
            return Err(ConfigError::Validation(
                "Ollama max_start_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Custom serialization for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Default value functions for serde
fn default_bedrock_model() -> String {
    "amazon.nova-lite-v1:0".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:1b".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_verify_delay() -> Duration {
    Duration::from_millis(2000)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_start_attempts() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = ProviderSettings::default();
        assert_eq!(settings.bedrock.model, "amazon.nova-lite-v1:0");
        assert_eq!(settings.bedrock.region, "us-east-1");
        assert_eq!(settings.ollama.model, "llama3.2:1b");
        assert_eq!(settings.ollama.base_url, "http://localhost:11434");
        assert_eq!(settings.ollama.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.ollama.max_start_attempts, 10);
        assert!(!settings.flags.use_bedrock);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env = EnvSnapshot::from_pairs([
            (HIVECODE_USE_OLLAMA, "true"),
            (HIVECODE_USE_BEDROCK, "yes"),
            (OLLAMA_MODEL, "qwen2.5-coder:latest"),
            (OLLAMA_BASE_URL, "http://10.0.0.5:11434/"),
            (BEDROCK_REGION, "eu-west-1"),
        ]);

        let settings = ProviderSettings::from_env(&env).unwrap();
        assert!(settings.flags.use_ollama);
        assert!(!settings.flags.use_bedrock);
        assert_eq!(settings.ollama.model, "qwen2.5-coder:latest");
        assert_eq!(settings.ollama.base_url, "http://10.0.0.5:11434");
        assert_eq!(settings.bedrock.region, "eu-west-1");
        assert_eq!(settings.bedrock.model, "amazon.nova-lite-v1:0");
    }

    #[test]
    fn test_env_parse_error_names_variable() {
        let env = EnvSnapshot::from_pairs([(OLLAMA_START_ATTEMPTS, "many")]);
        let error = ProviderSettings::from_env(&env).unwrap_err();
        assert!(matches!(error, ConfigError::EnvVarParse(ref m) if m.contains(OLLAMA_START_ATTEMPTS)));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let env = EnvSnapshot::from_pairs([(BEDROCK_MODEL, ""), (HIVECODE_USE_BEDROCK, "true")]);
        assert!(!env.has(BEDROCK_MODEL));
        assert!(env.flag(HIVECODE_USE_BEDROCK));
        assert_eq!(env.get(BEDROCK_MODEL), None);
    }

    #[test]
    fn test_toml_settings_loading() {
        let toml_content = r#"
[bedrock]
model = "anthropic.claude-3-5-haiku-20241022-v1:0"
region = "us-west-2"
verify_delay = 250

[ollama]
model = "gemma:7b"
poll_interval = 100
max_start_attempts = 3

[flags]
use_ollama = true
"#;

        let temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        std::fs::write(temp_file.path(), toml_content).unwrap();

        let settings = ProviderSettings::from_file(temp_file.path()).unwrap();
        assert_eq!(settings.bedrock.region, "us-west-2");
        assert_eq!(settings.bedrock.verify_delay, Duration::from_millis(250));
        assert_eq!(settings.ollama.model, "gemma:7b");
        assert_eq!(settings.ollama.base_url, "http://localhost:11434");
        assert_eq!(settings.ollama.max_start_attempts, 3);
        assert!(settings.flags.use_ollama);
    }

    #[test]
    fn test_yaml_settings_loading() {
        let yaml_content = "ollama:\n  base_url: http://gpu-box:11434\n  auto_pull: true\n";
        let temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        std::fs::write(temp_file.path(), yaml_content).unwrap();

        let settings = ProviderSettings::from_file(temp_file.path()).unwrap();
        assert_eq!(settings.ollama.base_url, "http://gpu-box:11434");
        assert!(settings.ollama.auto_pull);
        assert_eq!(settings.bedrock, BedrockSettings::default());
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_file = NamedTempFile::with_suffix(".ini").unwrap();
        std::fs::write(temp_file.path(), "x=1").unwrap();
        assert!(matches!(
            ProviderSettings::from_file(temp_file.path()),
            Err(ConfigError::FileParse(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = ProviderSettings::default();
        settings.ollama.base_url = "localhost:11434".to_string();
        assert!(settings.validate().is_err());

        let mut settings = ProviderSettings::default();
        settings.ollama.max_start_attempts = 0;
        assert!(settings.validate().is_err());

        let mut settings = ProviderSettings::default();
        settings.bedrock.region = String::new();
        assert!(settings.validate().is_err());
    }
}
