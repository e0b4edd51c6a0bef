//! Generation parameters and the canonical response shapes.

use serde::{Deserialize, Serialize};

/// Sampling parameters. Every field is optional; backends apply their own
/// defaults and enforce their own bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

impl GenerationParams {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Why the backend stopped generating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    #[default]
    Stop,
    MaxTokens,
    Safety,
}

impl FinishReason {
    /// Map a backend stop reason onto the canonical set. Unknown or missing
    /// reasons count as a normal stop.
    pub fn from_backend(reason: Option<&str>) -> Self {
        match reason {
            Some("max_tokens") | Some("length") => FinishReason::MaxTokens,
            Some("content_filtered") | Some("content_filter") | Some("guardrail_intervened") => {
                FinishReason::Safety
            }
            _ => FinishReason::Stop,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "STOP",
            FinishReason::MaxTokens => "MAX_TOKENS",
            FinishReason::Safety => "SAFETY",
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token accounting as reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Usage from separately reported input and output counters
    pub fn from_counts(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Complete response of a unary generate call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Authoritative response text
    pub text: String,
    pub finish_reason: FinishReason,
    /// Best effort; absent when the backend did not report counts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One fragment of a streamed response.
///
/// Concatenating the `text` of every chunk in delivery order yields the
/// full response text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// True when the chunk carries neither text nor a finish marker nor usage
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.finish_reason.is_none() && self.usage.is_none()
    }
}

/// Result of an approximate token count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_backend(Some("end_turn")), FinishReason::Stop);
        assert_eq!(FinishReason::from_backend(Some("stop")), FinishReason::Stop);
        assert_eq!(FinishReason::from_backend(Some("max_tokens")), FinishReason::MaxTokens);
        assert_eq!(FinishReason::from_backend(Some("length")), FinishReason::MaxTokens);
        assert_eq!(FinishReason::from_backend(Some("content_filtered")), FinishReason::Safety);
        assert_eq!(FinishReason::from_backend(Some("guardrail_intervened")), FinishReason::Safety);
        assert_eq!(FinishReason::from_backend(Some("something_new")), FinishReason::Stop);
        assert_eq!(FinishReason::from_backend(None), FinishReason::Stop);
    }

    #[test]
    fn test_usage_sums_counters() {
        let usage = Usage::from_counts(12, 30);
        assert_eq!(usage.total_tokens, 42);
    }

    #[test]
    fn test_finish_reason_wire_names() {
        assert_eq!(serde_json::to_string(&FinishReason::MaxTokens).unwrap(), "\"MAX_TOKENS\"");
        assert_eq!(FinishReason::Safety.to_string(), "SAFETY");
    }
}
