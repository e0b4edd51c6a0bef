//! Wire formats spoken by the backends.
//!
//! Each backend family nests messages, sampling parameters, text, stop
//! reasons and token counts differently. [`WireFamily`] is chosen once per
//! generator and owns all three translations for its family: building the
//! request payload, parsing a unary body, and parsing one streaming event.

use crate::types::{FinishReason, GenerateResponse, GenerationParams, Message, MessageRole, Messages, Usage};
use serde_json::{json, Map, Value};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TOP_P: f32 = 0.9;
pub const ANTHROPIC_BEDROCK_VERSION: &str = "bedrock-2023-05-31";

/// Cross-region inference profile prefixes
const REGION_PREFIXES: &[&str] = &["us.", "eu.", "apac.", "global."];

/// A payload that did not match its family's shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct WireError(pub String);

/// One parsed streaming event. Lifecycle events carry no text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireEvent {
    pub text: Option<String>,
    pub finish_reason: Option<FinishReason>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl WireEvent {
    fn content(text: &str) -> Self {
        Self {
            text: (!text.is_empty()).then(|| text.to_string()),
            ..Default::default()
        }
    }

    /// True when the event carries non-empty text
    pub fn has_content(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Backend payload families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFamily {
    /// Amazon Nova on Bedrock
    Nova,
    /// Meta Llama on Bedrock, flat prompt string
    LlamaPrompt,
    /// OpenAI-style chat on Bedrock (gpt-oss)
    OpenAiChat,
    /// Anthropic messages on Bedrock; the default for unknown Bedrock ids
    Anthropic,
    /// Ollama `/api/generate`
    OllamaGenerate,
}

impl WireFamily {
    /// Family for a Bedrock model id, ignoring any cross-region prefix
    pub fn for_bedrock_model(model_id: &str) -> Self {
        let base = REGION_PREFIXES
            .iter()
            .find_map(|prefix| model_id.strip_prefix(prefix))
            .unwrap_or(model_id);

        if base.starts_with("amazon.nova") {
            WireFamily::Nova
        } else if base.starts_with("meta.llama") {
            WireFamily::LlamaPrompt
        } else if base.starts_with("openai.") {
            WireFamily::OpenAiChat
        } else {
            WireFamily::Anthropic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WireFamily::Nova => "nova",
            WireFamily::LlamaPrompt => "llama",
            WireFamily::OpenAiChat => "openai-chat",
            WireFamily::Anthropic => "anthropic",
            WireFamily::OllamaGenerate => "ollama",
        }
    }

    /// Whether streamed deltas arrive with inter-word spaces stripped
    pub fn needs_spacing_repair(&self) -> bool {
        matches!(self, WireFamily::Nova | WireFamily::OpenAiChat)
    }

    /// Build the request payload.
    ///
    /// Consecutive same-role messages are merged first. The Bedrock Nova,
    /// Llama and Anthropic shapes never carry a `stream` field (the invoke
    /// call decides); OpenAI-chat carries `stream: true` only when streaming
    /// and Ollama always states it.
    pub fn translate_request(
        &self,
        model: &str,
        messages: &Messages,
        params: &GenerationParams,
        streaming: bool,
    ) -> Value {
        let turns = messages.alternating_turns();
        let system = messages.system_text();
        let temperature = params.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        let max_tokens = params.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let top_p = params.top_p.unwrap_or(DEFAULT_TOP_P);

        match self {
            WireFamily::Nova => {
                let mut inference = json!({
                    "maxTokens": max_tokens,
                    "temperature": temperature,
                    "topP": top_p,
                });
                if let Some(top_k) = params.top_k {
                    inference["topK"] = json!(top_k);
                }

                let mut body = json!({
                    "messages": turns
                        .iter()
                        .map(|m| json!({"role": m.role.as_str(), "content": [{"text": m.text}]}))
                        .collect::<Vec<_>>(),
                    "inferenceConfig": inference,
                });
                if let Some(system) = system {
                    body["system"] = json!([{ "text": system }]);
                }
                body
            }
            WireFamily::LlamaPrompt => json!({
                "prompt": llama_prompt(system.as_deref(), &turns),
                "temperature": temperature,
                "max_gen_len": max_tokens,
                "top_p": top_p,
            }),
            WireFamily::OpenAiChat => {
                let mut chat: Vec<Value> = Vec::with_capacity(turns.len() + 1);
                if let Some(system) = system {
                    chat.push(json!({"role": "system", "content": system}));
                }
                chat.extend(
                    turns
                        .iter()
                        .map(|m| json!({"role": m.role.as_str(), "content": m.text})),
                );

                let mut body = json!({
                    "messages": chat,
                    "max_completion_tokens": max_tokens,
                    "temperature": temperature,
                    "top_p": top_p,
                });
                if streaming {
                    body["stream"] = json!(true);
                }
                body
            }
            WireFamily::Anthropic => {
                let mut body = json!({
                    "anthropic_version": ANTHROPIC_BEDROCK_VERSION,
                    "max_tokens": max_tokens,
                    "messages": turns
                        .iter()
                        .map(|m| json!({
                            "role": m.role.as_str(),
                            "content": [{"type": "text", "text": m.text}],
                        }))
                        .collect::<Vec<_>>(),
                    "temperature": temperature,
                    "top_p": top_p,
                });
                if let Some(top_k) = params.top_k {
                    body["top_k"] = json!(top_k);
                }
                if let Some(system) = system {
                    body["system"] = json!(system);
                }
                body
            }
            WireFamily::OllamaGenerate => {
                let mut options = Map::new();
                options.insert("temperature".into(), json!(temperature));
                options.insert("num_predict".into(), json!(max_tokens));
                if let Some(top_p) = params.top_p {
                    options.insert("top_p".into(), json!(top_p));
                }
                if let Some(top_k) = params.top_k {
                    options.insert("top_k".into(), json!(top_k));
                }

                let mut body = json!({
                    "model": model,
                    "prompt": transcript_prompt(&turns),
                    "stream": streaming,
                    "options": options,
                });
                if let Some(system) = system {
                    body["system"] = json!(system);
                }
                body
            }
        }
    }

    /// Parse a complete unary response body
    pub fn parse_unary(&self, body: &[u8]) -> Result<GenerateResponse, WireError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| WireError(format!("response is not valid JSON: {}", e)))?;

        let (text, stop, usage) = match self {
            WireFamily::Nova => {
                let blocks = value
                    .pointer("/output/message/content")
                    .and_then(Value::as_array)
                    .ok_or_else(|| WireError("missing output.message.content".to_string()))?;
                (
                    join_text(blocks, "text"),
                    str_at(&value, "/stopReason"),
                    counts(&value, "/usage/inputTokens", "/usage/outputTokens"),
                )
            }
            WireFamily::LlamaPrompt => {
                let text = str_at(&value, "/generation")
                    .ok_or_else(|| WireError("missing generation".to_string()))?;
                (
                    text.to_string(),
                    str_at(&value, "/stop_reason"),
                    counts(&value, "/prompt_token_count", "/generation_token_count"),
                )
            }
            WireFamily::OpenAiChat => {
                let choice = value
                    .pointer("/choices/0")
                    .ok_or_else(|| WireError("missing choices[0]".to_string()))?;
                (
                    str_at(choice, "/message/content").unwrap_or("").to_string(),
                    str_at(choice, "/finish_reason"),
                    counts(&value, "/usage/prompt_tokens", "/usage/completion_tokens"),
                )
            }
            WireFamily::Anthropic => {
                let blocks = value
                    .get("content")
                    .and_then(Value::as_array)
                    .ok_or_else(|| WireError("missing content".to_string()))?;
                let text_blocks: Vec<Value> = blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
                    .cloned()
                    .collect();
                (
                    join_text(&text_blocks, "text"),
                    str_at(&value, "/stop_reason"),
                    counts(&value, "/usage/input_tokens", "/usage/output_tokens"),
                )
            }
            WireFamily::OllamaGenerate => {
                let text = str_at(&value, "/response")
                    .ok_or_else(|| WireError("missing response".to_string()))?;
                (
                    text.to_string(),
                    str_at(&value, "/done_reason"),
                    counts(&value, "/prompt_eval_count", "/eval_count"),
                )
            }
        };

        Ok(GenerateResponse {
            text,
            finish_reason: FinishReason::from_backend(stop),
            usage: usage.map(|(prompt, completion)| Usage::from_counts(prompt, completion)),
        })
    }

    /// Parse one raw streaming event (a Bedrock chunk payload or one NDJSON line)
    pub fn parse_stream_event(&self, event: &[u8]) -> Result<WireEvent, WireError> {
        let value: Value = serde_json::from_slice(event)
            .map_err(|e| WireError(format!("stream event is not valid JSON: {}", e)))?;

        let mut parsed = match self {
            WireFamily::Nova => {
                if let Some(text) = str_at(&value, "/contentBlockDelta/delta/text") {
                    WireEvent::content(text)
                } else if let Some(text) = str_at(&value, "/outputText") {
                    WireEvent::content(text)
                } else if let Some(stop) = value.get("messageStop") {
                    WireEvent {
                        finish_reason: Some(FinishReason::from_backend(str_at(stop, "/stopReason"))),
                        ..Default::default()
                    }
                } else {
                    WireEvent {
                        prompt_tokens: u32_at(&value, "/metadata/usage/inputTokens"),
                        completion_tokens: u32_at(&value, "/metadata/usage/outputTokens"),
                        ..Default::default()
                    }
                }
            }
            WireFamily::LlamaPrompt => WireEvent {
                text: str_at(&value, "/generation")
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
                finish_reason: str_at(&value, "/stop_reason").map(|r| FinishReason::from_backend(Some(r))),
                prompt_tokens: u32_at(&value, "/prompt_token_count"),
                completion_tokens: u32_at(&value, "/generation_token_count"),
            },
            WireFamily::OpenAiChat => WireEvent {
                text: str_at(&value, "/choices/0/delta/content")
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
                finish_reason: str_at(&value, "/choices/0/finish_reason")
                    .map(|r| FinishReason::from_backend(Some(r))),
                prompt_tokens: u32_at(&value, "/usage/prompt_tokens"),
                completion_tokens: u32_at(&value, "/usage/completion_tokens"),
            },
            WireFamily::Anthropic => match str_at(&value, "/type") {
                Some("content_block_delta") => {
                    WireEvent::content(str_at(&value, "/delta/text").unwrap_or(""))
                }
                Some("message_start") => WireEvent {
                    prompt_tokens: u32_at(&value, "/message/usage/input_tokens"),
                    ..Default::default()
                },
                Some("message_delta") => WireEvent {
                    finish_reason: str_at(&value, "/delta/stop_reason")
                        .map(|r| FinishReason::from_backend(Some(r))),
                    completion_tokens: u32_at(&value, "/usage/output_tokens"),
                    ..Default::default()
                },
                _ => WireEvent::default(),
            },
            WireFamily::OllamaGenerate => {
                let done = value.get("done").and_then(Value::as_bool).unwrap_or(false);
                WireEvent {
                    text: str_at(&value, "/response")
                        .filter(|t| !t.is_empty())
                        .map(str::to_string),
                    finish_reason: done
                        .then(|| FinishReason::from_backend(str_at(&value, "/done_reason"))),
                    prompt_tokens: u32_at(&value, "/prompt_eval_count"),
                    completion_tokens: u32_at(&value, "/eval_count"),
                }
            }
        };

        // Bedrock attaches invocation metrics to the final event of every family
        if let Some(metrics) = value.get("amazon-bedrock-invocationMetrics") {
            parsed.prompt_tokens = parsed.prompt_tokens.or(u32_at(metrics, "/inputTokenCount"));
            parsed.completion_tokens = parsed
                .completion_tokens
                .or(u32_at(metrics, "/outputTokenCount"));
        }

        Ok(parsed)
    }
}

/// `<|begin_of_text|>` grammar with one header/eot pair per turn, ending in an
/// open assistant header
fn llama_prompt(system: Option<&str>, turns: &[Message]) -> String {
    let mut prompt = String::from("<|begin_of_text|>");
    if let Some(system) = system {
        prompt.push_str(&format!(
            "<|start_header_id|>system<|end_header_id|>\n\n{}<|eot_id|>",
            system
        ));
    }
    for turn in turns {
        prompt.push_str(&format!(
            "<|start_header_id|>{}<|end_header_id|>\n\n{}<|eot_id|>",
            turn.role.as_str(),
            turn.text
        ));
    }
    prompt.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
    prompt
}

/// `User: ...` / `Assistant: ...` transcript for the local daemon
fn transcript_prompt(turns: &[Message]) -> String {
    turns
        .iter()
        .map(|turn| match turn.role {
            MessageRole::Assistant => format!("Assistant: {}", turn.text),
            _ => format!("User: {}", turn.text),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

fn u32_at(value: &Value, pointer: &str) -> Option<u32> {
    value
        .pointer(pointer)
        .and_then(Value::as_u64)
        .map(|n| n.min(u32::MAX as u64) as u32)
}

fn counts(value: &Value, prompt: &str, completion: &str) -> Option<(u32, u32)> {
    match (u32_at(value, prompt), u32_at(value, completion)) {
        (None, None) => None,
        (p, c) => Some((p.unwrap_or(0), c.unwrap_or(0))),
    }
}

fn join_text(blocks: &[Value], field: &str) -> String {
    blocks
        .iter()
        .filter_map(|block| block.get(field).and_then(Value::as_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Messages {
        let mut messages = Messages::with_system_prompt("You are terse.");
        messages.push(Message::user("Hi"));
        messages.push(Message::assistant("Hello"));
        messages.push(Message::assistant("there"));
        messages.push(Message::user("Bye"));
        messages
    }

    const ALL_FAMILIES: [WireFamily; 5] = [
        WireFamily::Nova,
        WireFamily::LlamaPrompt,
        WireFamily::OpenAiChat,
        WireFamily::Anthropic,
        WireFamily::OllamaGenerate,
    ];

    #[test]
    fn test_family_detection() {
        assert_eq!(WireFamily::for_bedrock_model("amazon.nova-lite-v1:0"), WireFamily::Nova);
        assert_eq!(WireFamily::for_bedrock_model("us.amazon.nova-pro-v1:0"), WireFamily::Nova);
        assert_eq!(
            WireFamily::for_bedrock_model("meta.llama3-8b-instruct-v1:0"),
            WireFamily::LlamaPrompt
        );
        assert_eq!(
            WireFamily::for_bedrock_model("openai.gpt-oss-120b-1:0"),
            WireFamily::OpenAiChat
        );
        assert_eq!(
            WireFamily::for_bedrock_model("anthropic.claude-3-5-haiku-20241022-v1:0"),
            WireFamily::Anthropic
        );
        assert_eq!(WireFamily::for_bedrock_model("cohere.command-r-v1:0"), WireFamily::Anthropic);
    }

    #[test]
    fn test_nova_request_shape() {
        let body = WireFamily::Nova.translate_request(
            "amazon.nova-lite-v1:0",
            &conversation(),
            &GenerationParams::default().with_max_output_tokens(256).with_top_k(40),
            true,
        );

        assert_eq!(body["system"], json!([{"text": "You are terse."}]));
        assert_eq!(body["messages"][1], json!({"role": "assistant", "content": [{"text": "Hello\n\nthere"}]}));
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["inferenceConfig"]["maxTokens"], 256);
        assert_eq!(body["inferenceConfig"]["topK"], 40);
        assert!((body["inferenceConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((body["inferenceConfig"]["topP"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn test_llama_prompt_grammar() {
        let body = WireFamily::LlamaPrompt.translate_request(
            "meta.llama3-8b-instruct-v1:0",
            &conversation(),
            &GenerationParams::default(),
            false,
        );

        let expected = "<|begin_of_text|>\
            <|start_header_id|>system<|end_header_id|>\n\nYou are terse.<|eot_id|>\
            <|start_header_id|>user<|end_header_id|>\n\nHi<|eot_id|>\
            <|start_header_id|>assistant<|end_header_id|>\n\nHello\n\nthere<|eot_id|>\
            <|start_header_id|>user<|end_header_id|>\n\nBye<|eot_id|>\
            <|start_header_id|>assistant<|end_header_id|>\n\n";
        assert_eq!(body["prompt"], expected);
        assert_eq!(body["max_gen_len"], 4096);
        assert!(body.get("messages").is_none());
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn test_llama_prompt_without_system() {
        let messages = Messages::from(vec![Message::user("Hi")]);
        let body = WireFamily::LlamaPrompt.translate_request("m", &messages, &GenerationParams::default(), true);
        assert_eq!(
            body["prompt"],
            "<|begin_of_text|><|start_header_id|>user<|end_header_id|>\n\nHi<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n"
        );
    }

    #[test]
    fn test_openai_request_unshifts_system() {
        let params = GenerationParams::default();
        let unary = WireFamily::OpenAiChat.translate_request("openai.gpt-oss-120b-1:0", &conversation(), &params, false);
        let streaming = WireFamily::OpenAiChat.translate_request("openai.gpt-oss-120b-1:0", &conversation(), &params, true);

        assert_eq!(unary["messages"][0], json!({"role": "system", "content": "You are terse."}));
        assert_eq!(unary["messages"][2], json!({"role": "assistant", "content": "Hello\n\nthere"}));
        assert_eq!(unary["max_completion_tokens"], 4096);
        assert!(unary.get("stream").is_none());
        assert_eq!(streaming["stream"], true);
    }

    #[test]
    fn test_anthropic_request_shape() {
        let body = WireFamily::Anthropic.translate_request(
            "anthropic.claude-3-5-haiku-20241022-v1:0",
            &conversation(),
            &GenerationParams::default().with_temperature(0.0),
            true,
        );

        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["system"], "You are terse.");
        assert_eq!(
            body["messages"][1]["content"],
            json!([{"type": "text", "text": "Hello\n\nthere"}])
        );
        // An explicit zero is sent, not replaced by the default
        assert_eq!(body["temperature"].as_f64().unwrap(), 0.0);
        assert!(body.get("top_k").is_none());
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn test_ollama_request_shape() {
        let body = WireFamily::OllamaGenerate.translate_request(
            "llama3.2:1b",
            &conversation(),
            &GenerationParams::default().with_top_p(0.5),
            false,
        );

        assert_eq!(body["model"], "llama3.2:1b");
        assert_eq!(body["prompt"], "User: Hi\n\nAssistant: Hello\n\nthere\n\nUser: Bye");
        assert_eq!(body["system"], "You are terse.");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 4096);
        assert!((body["options"]["top_p"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert!(body["options"].get("top_k").is_none());
    }

    #[test]
    fn test_every_family_merges_same_role_run() {
        let messages = Messages::from(vec![
            Message::user("Hi"),
            Message::assistant("Hello"),
            Message::assistant("there"),
        ]);
        for family in ALL_FAMILIES {
            let body = family.translate_request("m", &messages, &GenerationParams::default(), false);
            let rendered = body.to_string();
            assert!(
                rendered.contains("Hello\\n\\nthere"),
                "{} did not merge: {}",
                family.name(),
                rendered
            );
        }
    }

    #[test]
    fn test_parse_unary_per_family() {
        let nova = br#"{"output":{"message":{"role":"assistant","content":[{"text":"Hi "},{"text":"there"}]}},"stopReason":"end_turn","usage":{"inputTokens":5,"outputTokens":2,"totalTokens":7}}"#;
        let parsed = WireFamily::Nova.parse_unary(nova).unwrap();
        assert_eq!(parsed.text, "Hi there");
        assert_eq!(parsed.finish_reason, FinishReason::Stop);
        assert_eq!(parsed.usage, Some(Usage::from_counts(5, 2)));

        let llama = br#"{"generation":"Sure.","prompt_token_count":10,"generation_token_count":3,"stop_reason":"length"}"#;
        let parsed = WireFamily::LlamaPrompt.parse_unary(llama).unwrap();
        assert_eq!(parsed.text, "Sure.");
        assert_eq!(parsed.finish_reason, FinishReason::MaxTokens);
        assert_eq!(parsed.usage.unwrap().total_tokens, 13);

        let openai = br#"{"choices":[{"message":{"role":"assistant","content":"Yes"},"finish_reason":"stop"}],"usage":{"prompt_tokens":4,"completion_tokens":1}}"#;
        let parsed = WireFamily::OpenAiChat.parse_unary(openai).unwrap();
        assert_eq!(parsed.text, "Yes");
        assert_eq!(parsed.usage.unwrap().total_tokens, 5);

        let anthropic = br#"{"content":[{"type":"text","text":"Blocked"}],"stop_reason":"content_filtered","usage":{"input_tokens":8,"output_tokens":1}}"#;
        let parsed = WireFamily::Anthropic.parse_unary(anthropic).unwrap();
        assert_eq!(parsed.text, "Blocked");
        assert_eq!(parsed.finish_reason, FinishReason::Safety);

        let ollama = br#"{"model":"llama3.2:1b","response":"ok","done":true,"prompt_eval_count":12,"eval_count":1}"#;
        let parsed = WireFamily::OllamaGenerate.parse_unary(ollama).unwrap();
        assert_eq!(parsed.text, "ok");
        assert_eq!(parsed.usage, Some(Usage::from_counts(12, 1)));
    }

    #[test]
    fn test_parse_unary_is_idempotent() {
        let body = br#"{"output":{"message":{"content":[{"text":"same"}]}},"stopReason":"max_tokens"}"#;
        let first = WireFamily::Nova.parse_unary(body).unwrap();
        let second = WireFamily::Nova.parse_unary(body).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.usage, None);
    }

    #[test]
    fn test_parse_unary_rejects_wrong_shape() {
        assert!(WireFamily::Nova.parse_unary(b"not json").is_err());
        assert!(WireFamily::Nova.parse_unary(br#"{"content":[]}"#).is_err());
        assert!(WireFamily::LlamaPrompt.parse_unary(br#"{"text":"x"}"#).is_err());
        assert!(WireFamily::OpenAiChat.parse_unary(br#"{"choices":[]}"#).is_err());
    }

    #[test]
    fn test_anthropic_stream_events() {
        let family = WireFamily::Anthropic;
        let start = family
            .parse_stream_event(br#"{"type":"message_start","message":{"usage":{"input_tokens":9}}}"#)
            .unwrap();
        assert!(!start.has_content());
        assert_eq!(start.prompt_tokens, Some(9));

        let delta = family
            .parse_stream_event(br#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#)
            .unwrap();
        assert_eq!(delta.text.as_deref(), Some("Hi"));

        let stop = family
            .parse_stream_event(br#"{"type":"message_delta","delta":{"stop_reason":"max_tokens"},"usage":{"output_tokens":4}}"#)
            .unwrap();
        assert!(!stop.has_content());
        assert_eq!(stop.finish_reason, Some(FinishReason::MaxTokens));
        assert_eq!(stop.completion_tokens, Some(4));

        let end = family
            .parse_stream_event(br#"{"type":"message_stop","amazon-bedrock-invocationMetrics":{"inputTokenCount":9,"outputTokenCount":4}}"#)
            .unwrap();
        assert_eq!(end.prompt_tokens, Some(9));
        assert_eq!(end.completion_tokens, Some(4));
    }

    #[test]
    fn test_nova_stream_events() {
        let family = WireFamily::Nova;
        assert!(!family
            .parse_stream_event(br#"{"messageStart":{"role":"assistant"}}"#)
            .unwrap()
            .has_content());
        assert_eq!(
            family
                .parse_stream_event(br#"{"contentBlockDelta":{"delta":{"text":"world"},"contentBlockIndex":0}}"#)
                .unwrap()
                .text
                .as_deref(),
            Some("world")
        );
        assert_eq!(
            family.parse_stream_event(br#"{"outputText":"legacy"}"#).unwrap().text.as_deref(),
            Some("legacy")
        );
        assert_eq!(
            family
                .parse_stream_event(br#"{"messageStop":{"stopReason":"end_turn"}}"#)
                .unwrap()
                .finish_reason,
            Some(FinishReason::Stop)
        );
        let meta = family
            .parse_stream_event(br#"{"metadata":{"usage":{"inputTokens":3,"outputTokens":7}}}"#)
            .unwrap();
        assert_eq!((meta.prompt_tokens, meta.completion_tokens), (Some(3), Some(7)));
    }

    #[test]
    fn test_openai_llama_and_ollama_stream_events() {
        let openai = WireFamily::OpenAiChat
            .parse_stream_event(br#"{"choices":[{"delta":{"content":"tok"},"finish_reason":null}]}"#)
            .unwrap();
        assert_eq!(openai.text.as_deref(), Some("tok"));
        assert_eq!(openai.finish_reason, None);

        let finish = WireFamily::OpenAiChat
            .parse_stream_event(br#"{"choices":[{"delta":{},"finish_reason":"length"}]}"#)
            .unwrap();
        assert!(!finish.has_content());
        assert_eq!(finish.finish_reason, Some(FinishReason::MaxTokens));

        let llama = WireFamily::LlamaPrompt
            .parse_stream_event(br#"{"generation":"","prompt_token_count":null,"generation_token_count":12,"stop_reason":"stop"}"#)
            .unwrap();
        assert!(!llama.has_content());
        assert_eq!(llama.finish_reason, Some(FinishReason::Stop));

        let ollama = WireFamily::OllamaGenerate
            .parse_stream_event(br#"{"response":"","done":true,"done_reason":"length","prompt_eval_count":2,"eval_count":8}"#)
            .unwrap();
        assert_eq!(ollama.finish_reason, Some(FinishReason::MaxTokens));
        assert_eq!(ollama.completion_tokens, Some(8));

        assert!(WireFamily::OllamaGenerate.parse_stream_event(b"{broken").is_err());
    }
}
