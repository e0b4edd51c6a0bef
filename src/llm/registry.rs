//! Provider selection.
//!
//! [`ProviderSelector`] decides which backend and model serve a session. It
//! is built from an immutable [`ModelCatalog`], the merged [`ProviderSettings`]
//! and an [`EnvSnapshot`]; nothing is read from global state.
//!
//! Rules, first match wins:
//!
//! 1. An explicit provider from the caller (hot-swap) always wins.
//! 2. The configured model detects as a provider *and* that provider's enable
//!    flag is set.
//! 3. The enable flag alone, with the provider's default model.
//! 4. Vendor-hosted and federated modes, validated only for their own
//!    variables.

use crate::config::{
    EnvSnapshot, ProviderSettings, AWS_ACCESS_KEY_ID, AWS_BEARER_TOKEN_BEDROCK, AWS_SECRET_ACCESS_KEY,
    BEDROCK_MODEL, GEMINI_API_KEY, GOOGLE_API_KEY, GOOGLE_CLOUD_LOCATION, GOOGLE_CLOUD_PROJECT,
    HIVECODE_USE_BEDROCK, HIVECODE_USE_OLLAMA, OLLAMA_MODEL,
};
use crate::error::{GeneratorError, Result};
use crate::llm::models::ModelCatalog;
use crate::llm::traits::ProviderType;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which rule produced a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    Explicit,
    Detected,
    EnvironmentFlag,
    VendorMode,
}

/// A resolved provider and model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSelection {
    pub provider: ProviderType,
    /// Always set for Bedrock and Ollama; vendor modes get no default
    pub model: Option<String>,
    pub rule: SelectionRule,
}

/// Outcome of [`ProviderSelector::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ProviderSelection),
    /// No rule matched; `missing` lists the variable pairs that would enable one
    Unresolved { missing: Vec<String> },
}

impl Resolution {
    /// Turn an unresolved outcome into `InvalidProvider`
    pub fn into_result(self) -> Result<ProviderSelection> {
        match self {
            Resolution::Resolved(selection) => Ok(selection),
            Resolution::Unresolved { missing } => Err(GeneratorError::InvalidProvider {
                message: "no provider could be resolved from the environment".to_string(),
                remediation: format!("Set one of:\n{}", missing.join("\n")),
            }),
        }
    }
}

/// Priority-ordered provider resolution
#[derive(Debug, Clone)]
pub struct ProviderSelector {
    catalog: ModelCatalog,
    settings: ProviderSettings,
    env: EnvSnapshot,
}

impl ProviderSelector {
    pub fn new(catalog: ModelCatalog, settings: ProviderSettings, env: EnvSnapshot) -> Self {
        Self {
            catalog,
            settings,
            env,
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    /// Resolve a provider and model. `hint` is a model name from the caller,
    /// e.g. the session's current model.
    pub fn resolve(&self, explicit: Option<ProviderType>, hint: Option<&str>) -> Resolution {
        if let Some(provider) = explicit {
            return self.resolve_explicit(provider, hint);
        }

        if let Some(selection) = self.resolve_detected(hint) {
            return Resolution::Resolved(selection);
        }

        let flags = &self.settings.flags;
        if flags.use_bedrock {
            info!("🔄 Using AWS Bedrock for {} (from environment)", self.settings.bedrock.model);
            return Resolution::Resolved(self.selection(
                ProviderType::Bedrock,
                self.settings.bedrock.model.clone(),
                SelectionRule::EnvironmentFlag,
            ));
        }
        if flags.use_ollama {
            info!("🔄 Using Ollama for {} (from environment)", self.settings.ollama.model);
            return Resolution::Resolved(self.selection(
                ProviderType::Ollama,
                self.settings.ollama.model.clone(),
                SelectionRule::EnvironmentFlag,
            ));
        }

        Resolution::Unresolved {
            missing: missing_variables(),
        }
    }

    fn resolve_explicit(&self, provider: ProviderType, hint: Option<&str>) -> Resolution {
        match provider {
            ProviderType::Bedrock | ProviderType::Ollama => {
                let model = self.model_for(provider, hint);
                info!("🔄 Using {} for {} (explicit)", provider.display_name(), model);
                Resolution::Resolved(self.selection(provider, model, SelectionRule::Explicit))
            }
            vendor => match validate_auth_method(vendor, &self.env) {
                None => Resolution::Resolved(ProviderSelection {
                    provider: vendor,
                    model: hint.map(str::to_string),
                    rule: SelectionRule::VendorMode,
                }),
                Some(message) => {
                    debug!("🔄 {} not usable: {}", vendor.display_name(), message);
                    Resolution::Unresolved {
                        missing: vendor_variables(vendor),
                    }
                }
            },
        }
    }

    fn resolve_detected(&self, hint: Option<&str>) -> Option<ProviderSelection> {
        let flags = &self.settings.flags;
        let candidates = [
            (ProviderType::Bedrock, flags.use_bedrock, &self.settings.bedrock.model),
            (ProviderType::Ollama, flags.use_ollama, &self.settings.ollama.model),
        ];

        for (provider, enabled, configured) in candidates {
            if !enabled {
                continue;
            }
            let model = hint
                .filter(|h| self.catalog.detect_provider(h) == Some(provider))
                .unwrap_or(configured.as_str());
            if self.catalog.detect_provider(model) == Some(provider) {
                info!("🔄 Using {} for {} (auto-detected)", provider.display_name(), model);
                return Some(self.selection(provider, model.to_string(), SelectionRule::Detected));
            }
        }
        None
    }

    /// Hint if it belongs to `provider`, else its alias, else the configured default
    fn model_for(&self, provider: ProviderType, hint: Option<&str>) -> String {
        let configured = match provider {
            ProviderType::Ollama => &self.settings.ollama.model,
            _ => &self.settings.bedrock.model,
        };
        match hint {
            Some(h) if self.catalog.detect_provider(h) == Some(provider) => h.to_string(),
            Some(h) => self
                .catalog
                .resolve_alias(provider, h)
                .map(str::to_string)
                .unwrap_or_else(|| configured.clone()),
            None => configured.clone(),
        }
    }

    fn selection(&self, provider: ProviderType, model: String, rule: SelectionRule) -> ProviderSelection {
        ProviderSelection {
            provider,
            model: Some(model),
            rule,
        }
    }
}

fn missing_variables() -> Vec<String> {
    vec![
        format!("  {}=true and {}=<model id> for AWS Bedrock", HIVECODE_USE_BEDROCK, BEDROCK_MODEL),
        format!("  {}=true and {}=<model tag> for Ollama", HIVECODE_USE_OLLAMA, OLLAMA_MODEL),
        format!("  {} for the Gemini API", GEMINI_API_KEY),
        format!(
            "  {} and {} (or {}) for Vertex AI",
            GOOGLE_CLOUD_PROJECT, GOOGLE_CLOUD_LOCATION, GOOGLE_API_KEY
        ),
    ]
}

fn vendor_variables(provider: ProviderType) -> Vec<String> {
    match provider {
        ProviderType::Gemini => vec![format!("  {}", GEMINI_API_KEY)],
        ProviderType::VertexAi => vec![format!(
            "  {} and {} (or {})",
            GOOGLE_CLOUD_PROJECT, GOOGLE_CLOUD_LOCATION, GOOGLE_API_KEY
        )],
        _ => missing_variables(),
    }
}

/// Check that an auth method has what it needs in the environment.
///
/// Returns a user-facing message when something is missing.
pub fn validate_auth_method(provider: ProviderType, env: &EnvSnapshot) -> Option<String> {
    match provider {
        ProviderType::GoogleLogin | ProviderType::CloudShell | ProviderType::Ollama => None,
        ProviderType::Gemini if env.has(GEMINI_API_KEY) => None,
        ProviderType::Gemini => Some(format!(
            "{} not found. Find your existing key or generate a new one at: https://aistudio.google.com/apikey\n\n\
             To continue, please set the {} environment variable.",
            GEMINI_API_KEY, GEMINI_API_KEY
        )),
        ProviderType::VertexAi => {
            let project_location = env.has(GOOGLE_CLOUD_PROJECT) && env.has(GOOGLE_CLOUD_LOCATION);
            if project_location || env.has(GOOGLE_API_KEY) {
                None
            } else {
                Some(format!(
                    "When using Vertex AI, you must specify either:\n\
                     • {} and {} environment variables.\n\
                     • {} environment variable (if using express mode).",
                    GOOGLE_CLOUD_PROJECT, GOOGLE_CLOUD_LOCATION, GOOGLE_API_KEY
                ))
            }
        }
        ProviderType::Bedrock => {
            let key_pair = env.has(AWS_ACCESS_KEY_ID) && env.has(AWS_SECRET_ACCESS_KEY);
            if key_pair || env.has(AWS_BEARER_TOKEN_BEDROCK) {
                None
            } else {
                Some(format!(
                    "AWS credentials not found. Please set {} and {}, or {}.",
                    AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_BEARER_TOKEN_BEDROCK
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(pairs: &[(&str, &str)]) -> ProviderSelector {
        let env = EnvSnapshot::from_pairs(pairs.iter().copied());
        let settings = ProviderSettings::from_env(&env).unwrap();
        ProviderSelector::new(ModelCatalog::builtin(), settings, env)
    }

    fn resolved(resolution: Resolution) -> ProviderSelection {
        match resolution {
            Resolution::Resolved(selection) => selection,
            other => panic!("expected a selection, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_provider_beats_detection() {
        let selector = selector(&[
            (HIVECODE_USE_BEDROCK, "true"),
            (BEDROCK_MODEL, "amazon.nova-pro-v1:0"),
        ]);

        let selection = resolved(selector.resolve(Some(ProviderType::Ollama), Some("amazon.nova-pro-v1:0")));
        assert_eq!(selection.provider, ProviderType::Ollama);
        assert_eq!(selection.model.as_deref(), Some("llama3.2:1b"));
        assert_eq!(selection.rule, SelectionRule::Explicit);
    }

    #[test]
    fn test_explicit_provider_keeps_matching_hint() {
        let selector = selector(&[]);
        let selection = resolved(selector.resolve(Some(ProviderType::Ollama), Some("mistral:7b")));
        assert_eq!(selection.model.as_deref(), Some("mistral:7b"));

        let selection = resolved(selector.resolve(Some(ProviderType::Ollama), Some("llama3.2-vision:11b")));
        assert_eq!(selection.model.as_deref(), Some("llama3.2-vision:11b"));

        let selection = resolved(selector.resolve(Some(ProviderType::Bedrock), Some("llama3.2-vision:11b")));
        assert_ne!(selection.model.as_deref(), Some("llama3.2-vision:11b"));
    }

    #[test]
    fn test_explicit_provider_translates_alias() {
        let selector = selector(&[]);
        let selection = resolved(selector.resolve(Some(ProviderType::Bedrock), Some("gemini-2.5-pro")));
        assert_eq!(selection.provider, ProviderType::Bedrock);
        assert!(selection.model.unwrap().starts_with("amazon.nova"));
    }

    #[test]
    fn test_detection_requires_flag() {
        let selector = selector(&[(BEDROCK_MODEL, "anthropic.claude-3-haiku-20240307-v1:0")]);
        assert!(matches!(selector.resolve(None, None), Resolution::Unresolved { .. }));

        let selector = selector_with_flag(HIVECODE_USE_BEDROCK, "anthropic.claude-3-haiku-20240307-v1:0");
        let selection = resolved(selector.resolve(None, None));
        assert_eq!(selection.provider, ProviderType::Bedrock);
        assert_eq!(selection.rule, SelectionRule::Detected);
    }

    fn selector_with_flag(flag: &str, bedrock_model: &str) -> ProviderSelector {
        selector(&[(flag, "true"), (BEDROCK_MODEL, bedrock_model)])
    }

    #[test]
    fn test_flag_alone_defaults_model() {
        let selector = selector(&[(HIVECODE_USE_BEDROCK, "true"), (BEDROCK_MODEL, "custom-model")]);
        let selection = resolved(selector.resolve(None, None));
        assert_eq!(selection.provider, ProviderType::Bedrock);
        assert_eq!(selection.model.as_deref(), Some("custom-model"));
        assert_eq!(selection.rule, SelectionRule::EnvironmentFlag);
    }

    #[test]
    fn test_ollama_detected_when_only_ollama_enabled() {
        let selector = selector(&[(HIVECODE_USE_OLLAMA, "true"), (OLLAMA_MODEL, "qwen2.5:7b")]);
        let selection = resolved(selector.resolve(None, None));
        assert_eq!(selection.provider, ProviderType::Ollama);
        assert_eq!(selection.model.as_deref(), Some("qwen2.5:7b"));
    }

    #[test]
    fn test_flag_must_be_literal_true() {
        let selector = selector(&[(HIVECODE_USE_OLLAMA, "1")]);
        assert!(matches!(selector.resolve(None, None), Resolution::Unresolved { .. }));
    }

    #[test]
    fn test_unresolved_names_both_variables() {
        let error = selector(&[]).resolve(None, None).into_result().unwrap_err();
        let remediation = error.remediation().unwrap().to_string();
        assert!(remediation.contains(HIVECODE_USE_BEDROCK) && remediation.contains(BEDROCK_MODEL));
        assert!(remediation.contains(HIVECODE_USE_OLLAMA) && remediation.contains(OLLAMA_MODEL));
        assert!(matches!(error, GeneratorError::InvalidProvider { .. }));
    }

    #[test]
    fn test_vendor_modes_validate_their_variables() {
        let without_key = selector(&[]);
        assert!(matches!(
            without_key.resolve(Some(ProviderType::Gemini), None),
            Resolution::Unresolved { .. }
        ));

        let with_key = selector(&[(GEMINI_API_KEY, "key")]);
        let selection = resolved(with_key.resolve(Some(ProviderType::Gemini), None));
        assert_eq!(selection.rule, SelectionRule::VendorMode);
        assert_eq!(selection.model, None);

        let vertex = selector(&[(GOOGLE_CLOUD_PROJECT, "p"), (GOOGLE_CLOUD_LOCATION, "us-central1")]);
        assert!(matches!(
            vertex.resolve(Some(ProviderType::VertexAi), None),
            Resolution::Resolved(_)
        ));
        assert!(matches!(
            selector(&[]).resolve(Some(ProviderType::CloudShell), None),
            Resolution::Resolved(_)
        ));
    }

    #[test]
    fn test_validate_auth_method() {
        let empty = EnvSnapshot::default();
        assert!(validate_auth_method(ProviderType::Ollama, &empty).is_none());
        assert!(validate_auth_method(ProviderType::Bedrock, &empty).unwrap().contains(AWS_ACCESS_KEY_ID));

        let bearer = EnvSnapshot::from_pairs([(AWS_BEARER_TOKEN_BEDROCK, "token")]);
        assert!(validate_auth_method(ProviderType::Bedrock, &bearer).is_none());

        let api_key = EnvSnapshot::from_pairs([(GOOGLE_API_KEY, "key")]);
        assert!(validate_auth_method(ProviderType::VertexAi, &api_key).is_none());
        assert!(validate_auth_method(ProviderType::Gemini, &api_key).is_some());
    }
}
