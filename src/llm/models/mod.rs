//! Model metadata: which provider serves a model, what to call it, and what
//! the cloud gateway offers.
//!
//! The catalog is a plain value built once with [`ModelCatalog::builtin`] and
//! passed to whoever needs it. Nothing here is global or mutable.

use crate::llm::traits::ProviderType;
use std::collections::HashMap;

/// Local daemon tags known to this layer
const OLLAMA_MODELS: &[&str] = &[
    "llama3.2:1b",
    "llama3.2:3b",
    "llama3.2:latest",
    "llama3:8b",
    "llama3:70b",
    "qwen2.5:3b",
    "qwen2.5:7b",
    "qwen2.5-coder:latest",
    "qwen3:4b",
    "gemma:2b",
    "gemma:7b",
    "gpt-oss:20b",
];

/// Cloud gateway model ids known to this layer
const BEDROCK_MODELS: &[&str] = &[
    "openai.gpt-oss-120b-1:0",
    "amazon.nova-micro-v1:0",
    "amazon.nova-lite-v1:0",
    "amazon.nova-pro-v1:0",
    "anthropic.claude-3-5-sonnet-20241022-v2:0",
    "anthropic.claude-3-5-sonnet-20240620-v1:0",
    "anthropic.claude-3-5-haiku-20241022-v1:0",
    "anthropic.claude-3-opus-20240229-v1:0",
    "anthropic.claude-3-sonnet-20240229-v1:0",
    "anthropic.claude-3-haiku-20240307-v1:0",
];

/// Friendly names and descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    pub display_name: &'static str,
    pub short_name: &'static str,
    pub description: &'static str,
}

/// How [`ModelCatalog::display_name`] renders a model id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayFormat {
    #[default]
    Full,
    Short,
    Id,
}

/// A model offered by the cloud gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedrockModel {
    pub model_id: &'static str,
    pub model_name: &'static str,
    pub vendor: &'static str,
    pub capabilities: &'static [&'static str],
}

impl BedrockModel {
    pub fn supports_text(&self) -> bool {
        self.capabilities.contains(&"text")
    }
}

/// Immutable model catalog
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    providers: HashMap<&'static str, ProviderType>,
    display: HashMap<&'static str, DisplayInfo>,
    bedrock_models: Vec<BedrockModel>,
    aliases: Vec<(ProviderType, &'static str, &'static str)>,
}

impl ModelCatalog {
    /// The catalog shipped with this crate
    pub fn builtin() -> Self {
        let providers = OLLAMA_MODELS
            .iter()
            .map(|id| (*id, ProviderType::Ollama))
            .chain(BEDROCK_MODELS.iter().map(|id| (*id, ProviderType::Bedrock)))
            .collect();

        let display = [
            ("openai.gpt-oss-120b-1:0", "OpenAI GPT-OSS 120B", "GPT-OSS 120B", "120B parameter open-source GPT model via AWS Bedrock"),
            ("amazon.nova-lite-v1:0", "Amazon Nova Lite", "Nova Lite", "Fast, lightweight multimodal model (text/image/video)"),
            ("amazon.nova-pro-v1:0", "Amazon Nova Pro", "Nova Pro", "Professional-grade multimodal model"),
            ("amazon.nova-micro-v1:0", "Amazon Nova Micro", "Nova Micro", "Ultra-fast micro model for simple tasks"),
            ("anthropic.claude-3-5-sonnet-20241022-v2:0", "Claude 3.5 Sonnet V2", "Claude 3.5 Sonnet", "Latest Claude 3.5 Sonnet with enhanced capabilities"),
            ("anthropic.claude-3-5-sonnet-20240620-v1:0", "Claude 3.5 Sonnet V1", "Claude 3.5 Sonnet", "Claude 3.5 Sonnet (June 2024)"),
            ("anthropic.claude-3-5-haiku-20241022-v1:0", "Claude 3.5 Haiku", "Claude 3.5 Haiku", "Fast, efficient Claude model"),
            ("anthropic.claude-3-opus-20240229-v1:0", "Claude 3 Opus", "Claude 3 Opus", "Most capable Claude 3 model"),
            ("meta.llama3-3-70b-instruct-v1:0", "Meta Llama 3.3 70B", "Llama 3.3 70B", "Llama 3.3 with 70B parameters"),
            ("meta.llama3-2-90b-instruct-v1:0", "Meta Llama 3.2 90B", "Llama 3.2 90B", "Llama 3.2 with 90B parameters"),
        ]
        .into_iter()
        .map(|(id, display_name, short_name, description)| {
            (
                id,
                DisplayInfo {
                    display_name,
                    short_name,
                    description,
                },
            )
        })
        .collect();

        let bedrock_models = vec![
            bedrock_model("amazon.nova-micro-v1:0", "Amazon Nova Micro", "Amazon", &["text"]),
            bedrock_model("amazon.nova-lite-v1:0", "Amazon Nova Lite", "Amazon", &["text", "image", "video"]),
            bedrock_model("amazon.nova-pro-v1:0", "Amazon Nova Pro", "Amazon", &["text", "image", "video"]),
            bedrock_model("amazon.nova-canvas-v1:0", "Amazon Nova Canvas", "Amazon", &["image-generation"]),
            bedrock_model("amazon.nova-reel-v1:0", "Amazon Nova Reel", "Amazon", &["video-generation"]),
            bedrock_model("meta.llama3-2-1b-instruct-v1:0", "Meta Llama 3.2 1B", "Meta", &["text"]),
            bedrock_model("meta.llama3-2-3b-instruct-v1:0", "Meta Llama 3.2 3B", "Meta", &["text"]),
            bedrock_model("meta.llama3-8b-instruct-v1:0", "Meta Llama 3 8B", "Meta", &["text"]),
            bedrock_model("meta.llama3-1-8b-instruct-v1:0", "Meta Llama 3.1 8B", "Meta", &["text"]),
            bedrock_model("meta.llama3-2-11b-instruct-v1:0", "Meta Llama 3.2 11B", "Meta", &["text", "image"]),
        ];

        let aliases = [
            (ProviderType::Bedrock, "gemini-2.5-pro", "amazon.nova-pro-v1:0"),
            (ProviderType::Bedrock, "gemini-2.5-flash", "amazon.nova-lite-v1:0"),
            (ProviderType::Bedrock, "gemini-2.5-flash-lite", "amazon.nova-micro-v1:0"),
            (ProviderType::Ollama, "gemini-2.5-pro", "qwen2.5-coder"),
            (ProviderType::Ollama, "gemini-2.5-flash", "llama3.2:3b"),
            (ProviderType::Ollama, "gemini-2.5-flash-lite", "llama3.2:1b"),
        ]
        .to_vec();

        Self {
            providers,
            display,
            bedrock_models,
            aliases,
        }
    }

    /// Provider from the lookup table only
    pub fn provider_for(&self, model: &str) -> Option<ProviderType> {
        self.providers.get(model).copied()
    }

    /// Provider from the lookup table, then from the identifier's shape.
    ///
    /// A cloud gateway id has a lowercase vendor prefix, a `-vN` version and
    /// an optional numeric revision (`meta.llama3-8b-instruct-v1:0`). Any
    /// other id with a `:` is a local daemon tag (`llama3.2-vision:11b`).
    pub fn detect_provider(&self, model: &str) -> Option<ProviderType> {
        if let Some(provider) = self.provider_for(model) {
            return Some(provider);
        }

        if is_gateway_id(model) {
            Some(ProviderType::Bedrock)
        } else if model.contains(':') {
            Some(ProviderType::Ollama)
        } else {
            None
        }
    }

    /// Known model ids for a provider, in table order
    pub fn models_for(&self, provider: ProviderType) -> Vec<&'static str> {
        match provider {
            ProviderType::Ollama => OLLAMA_MODELS.to_vec(),
            ProviderType::Bedrock => BEDROCK_MODELS.to_vec(),
            _ => Vec::new(),
        }
    }

    /// Friendly name for a model id; unknown ids are returned unchanged
    pub fn display_name(&self, model: &str, format: DisplayFormat) -> String {
        match (self.display.get(model), format) {
            (Some(info), DisplayFormat::Full) => info.display_name.to_string(),
            (Some(info), DisplayFormat::Short) => info.short_name.to_string(),
            _ => model.to_string(),
        }
    }

    pub fn description(&self, model: &str) -> &'static str {
        self.display.get(model).map(|info| info.description).unwrap_or("")
    }

    /// Models offered by the cloud gateway
    pub fn bedrock_models(&self) -> &[BedrockModel] {
        &self.bedrock_models
    }

    /// Translate a vendor-hosted model alias (`gemini-2.5-flash`) into the
    /// provider's equivalent. Unknown `gemini-*` names fall back to the
    /// provider's general-purpose model; anything else is not an alias.
    pub fn resolve_alias(&self, provider: ProviderType, model: &str) -> Option<&'static str> {
        if let Some((_, _, target)) = self
            .aliases
            .iter()
            .find(|(p, alias, _)| *p == provider && *alias == model)
        {
            return Some(target);
        }
        if !model.starts_with("gemini-") {
            return None;
        }
        match provider {
            ProviderType::Bedrock => Some("amazon.nova-lite-v1:0"),
            ProviderType::Ollama => Some("qwen2.5-coder"),
            _ => None,
        }
    }
}

fn bedrock_model(
    model_id: &'static str,
    model_name: &'static str,
    vendor: &'static str,
    capabilities: &'static [&'static str],
) -> BedrockModel {
    BedrockModel {
        model_id,
        model_name,
        vendor,
        capabilities,
    }
}

/// `vendor.name-vN` with an optional `:N` revision
fn is_gateway_id(model: &str) -> bool {
    let (name, revision) = match model.split_once(':') {
        Some((name, revision)) => (name, Some(revision)),
        None => (model, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    if revision.is_some_and(|r| !all_digits(r)) {
        return false;
    }
    let Some((vendor, rest)) = name.split_once('.') else {
        return false;
    };
    if vendor.is_empty() || !vendor.chars().all(|c| c.is_ascii_lowercase()) {
        return false;
    }
    rest.rsplit_once("-v")
        .is_some_and(|(_, version)| all_digits(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup_wins_over_pattern() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(catalog.detect_provider("amazon.nova-lite-v1:0"), Some(ProviderType::Bedrock));
        assert_eq!(catalog.detect_provider("llama3.2:1b"), Some(ProviderType::Ollama));
        assert_eq!(catalog.detect_provider("gpt-oss:20b"), Some(ProviderType::Ollama));
        assert_eq!(catalog.detect_provider("openai.gpt-oss-120b-1:0"), Some(ProviderType::Bedrock));
    }

    #[test]
    fn test_pattern_fallback() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(catalog.detect_provider("mistral:7b"), Some(ProviderType::Ollama));
        assert_eq!(catalog.detect_provider("llava:7b-v1.6"), Some(ProviderType::Ollama));
        assert_eq!(
            catalog.detect_provider("meta.llama3-8b-instruct-v1:0"),
            Some(ProviderType::Bedrock)
        );
        assert_eq!(
            catalog.detect_provider("us.anthropic.claude-3-5-haiku-20241022-v1:0"),
            Some(ProviderType::Bedrock)
        );
        assert_eq!(catalog.detect_provider("gemini-2.5-pro"), None);
        assert_eq!(catalog.detect_provider("mystery"), None);
    }

    #[test]
    fn test_dotted_daemon_tags_stay_local() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(catalog.detect_provider("llama3.2-vision:11b"), Some(ProviderType::Ollama));
        assert_eq!(catalog.detect_provider("qwen2.5-coder-v2:7b"), Some(ProviderType::Ollama));
        assert_eq!(catalog.detect_provider("hf.co/org/model-v1:latest"), Some(ProviderType::Ollama));
        assert_eq!(catalog.detect_provider("amazon.titan-text-express-v1"), Some(ProviderType::Bedrock));
    }

    #[test]
    fn test_display_names() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(
            catalog.display_name("openai.gpt-oss-120b-1:0", DisplayFormat::Full),
            "OpenAI GPT-OSS 120B"
        );
        assert_eq!(
            catalog.display_name("anthropic.claude-3-5-sonnet-20241022-v2:0", DisplayFormat::Short),
            "Claude 3.5 Sonnet"
        );
        assert_eq!(
            catalog.display_name("amazon.nova-pro-v1:0", DisplayFormat::Id),
            "amazon.nova-pro-v1:0"
        );
        assert_eq!(catalog.display_name("unknown:tag", DisplayFormat::Full), "unknown:tag");
        assert_eq!(catalog.description("unknown:tag"), "");
    }

    #[test]
    fn test_aliases() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(
            catalog.resolve_alias(ProviderType::Bedrock, "gemini-2.5-pro"),
            Some("amazon.nova-pro-v1:0")
        );
        assert_eq!(
            catalog.resolve_alias(ProviderType::Ollama, "gemini-2.5-flash-lite"),
            Some("llama3.2:1b")
        );
        assert_eq!(
            catalog.resolve_alias(ProviderType::Ollama, "gemini-1.5-ultra"),
            Some("qwen2.5-coder")
        );
        assert_eq!(catalog.resolve_alias(ProviderType::Bedrock, "llama3.2:1b"), None);
    }

    #[test]
    fn test_bedrock_listing() {
        let catalog = ModelCatalog::builtin();
        let text_models: Vec<_> = catalog
            .bedrock_models()
            .iter()
            .filter(|m| m.supports_text())
            .map(|m| m.model_id)
            .collect();
        assert!(text_models.contains(&"amazon.nova-lite-v1:0"));
        assert!(!text_models.contains(&"amazon.nova-canvas-v1:0"));
        assert_eq!(catalog.models_for(ProviderType::Ollama).len(), 12);
        assert_eq!(catalog.models_for(ProviderType::Bedrock).len(), 10);
    }
}
