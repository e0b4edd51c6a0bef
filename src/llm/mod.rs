//! Provider adapter layer.
//!
//! ```text
//! ProviderSelector ──▶ Generator ──▶ BedrockGenerator ──▶ BedrockTransport (aws-sdk-bedrockruntime)
//!   (registry)         (facade)   └─▶ OllamaGenerator  ──▶ OllamaClient (reqwest)
//!                                          │
//!                          WireFamily + StreamReconstructor
//! ```
//!
//! Callers build a [`ProviderSelector`] from the catalog, settings and an
//! environment snapshot, then [`Generator::connect`] to get a
//! [`ContentGenerator`].
//!
//! ```no_run
//! use hive_llm::config::{EnvSnapshot, ProviderSettings};
//! use hive_llm::llm::{ContentGenerator, Generator, ModelCatalog, ProviderSelector};
//! use hive_llm::types::{GenerationParams, Messages};
//!
//! # async fn run() -> hive_llm::Result<()> {
//! let env = EnvSnapshot::capture();
//! let settings = ProviderSettings::from_env(&env)?;
//! let selector = ProviderSelector::new(ModelCatalog::builtin(), settings, env);
//! let generator = Generator::connect(&selector, None, None).await?;
//!
//! let mut messages = Messages::new();
//! messages.add_user_message("Hello");
//! let response = generator.generate_content(&messages, &GenerationParams::default()).await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod generator;
pub mod models;
pub mod providers;
pub mod registry;
pub mod traits;

pub use credentials::{resolve_credentials, AwsCredentialPair, CredentialSource, ResolvedCredentials};
pub use generator::Generator;
pub use models::{DisplayFormat, ModelCatalog};
pub use registry::{validate_auth_method, ProviderSelection, ProviderSelector, Resolution, SelectionRule};
pub use traits::{ChunkStream, ContentGenerator, HealthStatus, ProviderType};
