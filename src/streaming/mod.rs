//! Stream reconstruction.
//!
//! Backends deliver a sequence of raw events: content deltas mixed with
//! lifecycle events (start, stop, metadata). [`StreamReconstructor`] turns
//! parsed [`WireEvent`]s into canonical [`StreamChunk`]s:
//!
//! - lifecycle events never produce an empty chunk; their stop reason and
//!   token counts are folded into one terminal chunk emitted at the end
//! - `<reasoning>…</reasoning>` spans are removed, including spans split
//!   across deltas and an unterminated trailing span
//! - for families that lose inter-word spaces, a space is put back in front
//!   of every delta after the first unless it starts with whitespace or
//!   punctuation, or the previous delta already ended in whitespace. Text
//!   held back as a possible tag prefix belongs to its original delta and is
//!   never separated from it
//! - a stream with no content events at all is an [`GeneratorError::EmptyStream`]

use crate::error::{GeneratorError, Result};
use crate::llm::providers::wire::{WireEvent, WireFamily};
use crate::llm::traits::{ChunkStream, ProviderType};
use crate::types::{FinishReason, StreamChunk, Usage};
use futures::{Stream, StreamExt};

const REASONING_OPEN: &str = "<reasoning>";
const REASONING_CLOSE: &str = "</reasoning>";

/// Characters that attach to the previous word without a space
const NO_SPACE_BEFORE: &[char] = &[
    '.', ',', '!', '?', ';', ':', ')', ']', '}', '\'', '"', '%', '…',
];

/// Stateful chunk builder for one stream
#[derive(Debug)]
pub struct StreamReconstructor {
    provider: ProviderType,
    model: String,
    spacing_repair: bool,
    reasoning: ReasoningFilter,
    emitted_any: bool,
    last_ended_with_whitespace: bool,
    content_events: usize,
    finish_reason: Option<FinishReason>,
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

impl StreamReconstructor {
    pub fn new(family: WireFamily, provider: ProviderType, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            spacing_repair: family.needs_spacing_repair(),
            reasoning: ReasoningFilter::default(),
            emitted_any: false,
            last_ended_with_whitespace: false,
            content_events: 0,
            finish_reason: None,
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    /// Content-bearing events seen so far, before any stripping
    pub fn content_events(&self) -> usize {
        self.content_events
    }

    /// Feed one parsed event; returns a chunk when there is text to show
    pub fn push(&mut self, event: WireEvent) -> Option<StreamChunk> {
        if let Some(reason) = event.finish_reason {
            self.finish_reason = Some(reason);
        }
        if event.prompt_tokens.is_some() {
            self.prompt_tokens = event.prompt_tokens;
        }
        if event.completion_tokens.is_some() {
            self.completion_tokens = event.completion_tokens;
        }

        let text = match event.text {
            Some(text) if !text.is_empty() => text,
            _ => return None,
        };
        self.content_events += 1;

        let (visible, continues) = self.reasoning.filter(&text);
        self.emit(visible, continues)
    }

    /// End of the backend stream: flush held-back text and produce the
    /// terminal chunk, or fail if nothing was ever received.
    pub fn finish(&mut self) -> Result<Vec<StreamChunk>> {
        if self.content_events == 0 {
            return Err(GeneratorError::empty_stream(self.provider, self.model.clone()));
        }

        let mut chunks = Vec::new();
        let held = self.reasoning.flush();
        if let Some(chunk) = self.emit(held, true) {
            chunks.push(chunk);
        }

        let usage = match (self.prompt_tokens, self.completion_tokens) {
            (None, None) => None,
            (p, c) => Some(Usage::from_counts(p.unwrap_or(0), c.unwrap_or(0))),
        };
        if self.finish_reason.is_some() || usage.is_some() {
            chunks.push(StreamChunk {
                text: String::new(),
                finish_reason: self.finish_reason,
                usage,
            });
        }
        Ok(chunks)
    }

    /// `continues` is set when `text` picks up where the previously emitted
    /// text left off inside one provider delta; no space is repaired there.
    fn emit(&mut self, text: String, continues: bool) -> Option<StreamChunk> {
        if text.is_empty() {
            return None;
        }

        let mut out = text;
        if self.spacing_repair
            && self.emitted_any
            && !continues
            && needs_leading_space(&out, self.last_ended_with_whitespace)
        {
            out.insert(0, ' ');
        }

        self.emitted_any = true;
        self.last_ended_with_whitespace = out.ends_with(char::is_whitespace);
        Some(StreamChunk::text(out))
    }
}

fn needs_leading_space(text: &str, previous_ended_with_whitespace: bool) -> bool {
    if previous_ended_with_whitespace {
        return false;
    }
    match text.chars().next() {
        Some(first) => !first.is_whitespace() && !NO_SPACE_BEFORE.contains(&first),
        None => false,
    }
}

/// Removes reasoning spans from a sequence of text fragments.
///
/// A fragment ending in what could be the start of a tag is held back until
/// the next fragment shows whether it really is one.
#[derive(Debug, Default)]
struct ReasoningFilter {
    inside: bool,
    held: String,
}

impl ReasoningFilter {
    /// Visible text of `fragment`, and whether that text starts with text
    /// held back from the previous fragment.
    fn filter(&mut self, fragment: &str) -> (String, bool) {
        let mut continues = !self.held.is_empty() && !self.inside;
        let mut input = std::mem::take(&mut self.held);
        input.push_str(fragment);

        let mut output = String::with_capacity(input.len());
        let mut rest = input.as_str();

        loop {
            if self.inside {
                match rest.find(REASONING_CLOSE) {
                    Some(end) => {
                        rest = &rest[end + REASONING_CLOSE.len()..];
                        self.inside = false;
                    }
                    None => {
                        self.held = partial_tag_suffix(rest, REASONING_CLOSE).to_string();
                        break;
                    }
                }
            } else {
                match rest.find(REASONING_OPEN) {
                    Some(start) => {
                        if start == 0 && output.is_empty() {
                            continues = false;
                        }
                        output.push_str(&rest[..start]);
                        rest = &rest[start + REASONING_OPEN.len()..];
                        self.inside = true;
                    }
                    None => {
                        let held = partial_tag_suffix(rest, REASONING_OPEN);
                        output.push_str(&rest[..rest.len() - held.len()]);
                        self.held = held.to_string();
                        break;
                    }
                }
            }
        }

        (output, continues)
    }

    /// Text held back at end of stream. Inside an unterminated span it is
    /// discarded along with the rest of the span.
    fn flush(&mut self) -> String {
        let held = std::mem::take(&mut self.held);
        if self.inside {
            String::new()
        } else {
            held
        }
    }
}

/// Longest suffix of `text` that is a proper prefix of `tag`
fn partial_tag_suffix<'a>(text: &'a str, tag: &str) -> &'a str {
    let max = (tag.len() - 1).min(text.len());
    (1..=max)
        .rev()
        .filter(|&n| text.is_char_boundary(text.len() - n))
        .map(|n| &text[text.len() - n..])
        .find(|suffix| tag.starts_with(suffix))
        .unwrap_or("")
}

/// Remove reasoning spans from a complete response text
pub fn strip_reasoning(text: &str) -> String {
    let mut filter = ReasoningFilter::default();
    let (mut out, _) = filter.filter(text);
    out.push_str(&filter.flush());
    out
}

/// Turn a stream of raw backend events into canonical chunks.
///
/// Parse failures and transport errors are yielded once and end the stream.
/// Dropping the returned stream drops `raw` and with it the connection.
pub fn reconstruct<S>(raw: S, family: WireFamily, provider: ProviderType, model: String) -> ChunkStream
where
    S: Stream<Item = Result<Vec<u8>>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut raw = Box::pin(raw);
        let mut reconstructor = StreamReconstructor::new(family, provider, model.clone());
        let mut failed = false;

        while let Some(item) = raw.next().await {
            let event = item.and_then(|bytes| {
                family
                    .parse_stream_event(&bytes)
                    .map_err(|e| GeneratorError::malformed(provider, model.clone(), e.to_string()))
            });

            match event {
                Ok(event) => {
                    if let Some(chunk) = reconstructor.push(event) {
                        yield Ok(chunk);
                    }
                }
                Err(e) => {
                    tracing::error!("❌ {} stream failed for {}: {}", provider.display_name(), model, e);
                    yield Err(e);
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            match reconstructor.finish() {
                Ok(chunks) => {
                    tracing::debug!(
                        "🌊 {} stream completed - {} content events",
                        provider.display_name(),
                        reconstructor.content_events()
                    );
                    for chunk in chunks {
                        yield Ok(chunk);
                    }
                }
                Err(e) => {
                    tracing::warn!("⚠️ {}", e);
                    yield Err(e);
                }
            }
        }
    };

    Box::new(stream.boxed())
}
