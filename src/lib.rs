//! Talk to AWS Bedrock and a local Ollama daemon through one content
//! generation contract.
//!
//! `hive-llm` is the provider adapter layer of a coding assistant. You hand
//! it role-tagged messages and generation parameters; it picks a backend,
//! translates the request into that backend's wire format, and gives you back
//! a canonical response or a stream of canonical chunks.
//!
//! # Quick Start
//!
//! ```no_run
//! use hive_llm::config::{EnvSnapshot, ProviderSettings};
//! use hive_llm::llm::{ContentGenerator, Generator, ModelCatalog, ProviderSelector};
//! use hive_llm::types::{GenerationParams, Messages};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> hive_llm::Result<()> {
//!     // HIVECODE_USE_BEDROCK=true BEDROCK_MODEL=amazon.nova-lite-v1:0
//!     let env = EnvSnapshot::capture();
//!     let settings = ProviderSettings::from_env(&env)?;
//!     let selector = ProviderSelector::new(ModelCatalog::builtin(), settings, env);
//!     let generator = Generator::connect_or_exit(&selector, None, None).await?;
//!
//!     let mut messages = Messages::with_system_prompt("You are terse.");
//!     messages.add_user_message("Name three Rust web frameworks.");
//!
//!     let mut stream = generator
//!         .generate_content_stream(&messages, &GenerationParams::default())
//!         .await?;
//!     while let Some(chunk) = stream.next().await {
//!         print!("{}", chunk?.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - **AWS Bedrock** - Amazon Nova, Meta Llama, OpenAI gpt-oss and Anthropic
//!   Claude families, each with its own request and response shape
//! - **Ollama** - a local daemon, started on demand when it is not running
//!
//! Streams are repaired on the way out: words glued together at delta
//! boundaries get their space back, `<reasoning>` spans are removed, and a
//! stream that produced no content at all is reported as an error.
//!
//! # Module Organization
//!
//! - [`llm`] - selector, facade, providers, credentials and model catalog
//! - [`streaming`] - stream reconstruction and reasoning-span removal
//! - [`types`] - canonical messages, parameters, responses and chunks
//! - [`config`] - environment snapshot and provider settings
//! - [`error`] - the error taxonomy with remediation hints
//! - [`telemetry`] - logging setup

pub mod config;
pub mod error;
pub mod llm;
pub mod streaming;
pub mod telemetry;
pub mod types;

pub use error::{GeneratorError, Result};
pub use llm::{ContentGenerator, Generator, ProviderSelector, ProviderType};
pub use types::*;
