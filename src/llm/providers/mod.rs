//! Backend implementations.
//!
//! - `bedrock` - AWS Bedrock (Nova, Llama, OpenAI-chat and Anthropic families)
//! - `ollama` - local Ollama daemon client and generator
//! - `daemon` - spawn-and-poll lifecycle for the local daemon
//! - `wire` - per-family request/response translation

pub mod bedrock;
pub mod daemon;
pub mod ollama;
pub mod wire;

pub use bedrock::{AccessCheck, BedrockGenerator, BedrockTransport, ConnectionReport, SdkBedrockTransport};
pub use daemon::{DaemonLauncher, DaemonState, DaemonSupervisor, OllamaServeLauncher};
pub use ollama::{OllamaClient, OllamaGenerator, OllamaModel, PullProgress};
pub use wire::{WireError, WireEvent, WireFamily};
